//! Parses command-line arguments for the registrar service.

use std::path::PathBuf;

use clap::{crate_version, Parser};

#[derive(Debug, Parser)]
#[clap(
    name = "dvt-registrar",
    about = "Registration service for shared validators",
    version = crate_version!()
)]
pub(crate) struct Cli {
    #[clap(
        long,
        short = 'c',
        help = "The file containing the configuration for the service",
        default_value = "config.toml"
    )]
    pub config: PathBuf,
}
