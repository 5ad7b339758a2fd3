//! The registrar service registers shared validators on the network contract.

use std::{fs, path::Path};

use clap::Parser;
use config::Config;
use constants::{DEFAULT_THREAD_COUNT, DEFAULT_THREAD_STACK_SIZE};
use dvt_registrar_common::{logging, logging::LoggerConfig};
use serde::de::DeserializeOwned;
use tokio::runtime;
use tracing::{debug, error, info, trace};

mod args;
mod bootstrap;
mod config;
mod rpc_server;

mod constants;

fn main() {
    let mut logger_config = LoggerConfig::with_base_name("dvt-registrar");
    if let Some(otlp_url) = logging::get_otlp_url_from_env() {
        logger_config.set_otlp_url(otlp_url);
    }
    logging::init(logger_config);

    let cli = args::Cli::parse();
    info!(config = %cli.config.display(), "starting registrar service");

    let config = parse_toml::<Config>(cli.config);

    let runtime = runtime::Builder::new_multi_thread()
        .worker_threads(config.num_threads.unwrap_or(DEFAULT_THREAD_COUNT).into())
        .thread_stack_size(DEFAULT_THREAD_STACK_SIZE)
        .enable_all()
        .build()
        .expect("must be able to create runtime");

    if let Err(e) = runtime.block_on(bootstrap::bootstrap(config)) {
        error!(?e, "registrar service crashed");
        panic!("registrar service crashed: {e:?}");
    }

    info!("registrar service shutdown complete");
}

/// Reads and parses a TOML file from the given path into the given type `T`.
///
/// # Panics
///
/// 1. If the file is not readable.
/// 2. If the contents of the file cannot be deserialized into the given type `T`.
fn parse_toml<T>(path: impl AsRef<Path>) -> T
where
    T: std::fmt::Debug + DeserializeOwned,
{
    fs::read_to_string(path)
        .map(|p| {
            trace!(?p, "read file");

            let parsed = toml::from_str::<T>(&p).unwrap_or_else(|e| {
                panic!("failed to parse TOML file: {e:?}");
            });
            debug!(?parsed, "parsed TOML file");

            parsed
        })
        .unwrap_or_else(|_| {
            panic!("failed to read TOML file");
        })
}
