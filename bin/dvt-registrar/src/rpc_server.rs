//! Bootstraps an RPC server for the registrar.

use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dvt_registrar_orchestrator::{Registrar, RegistrarError};
use dvt_registrar_rpc::{
    traits::{RegistrarApiServer, RegistrarControlApiServer},
    types::{RpcRegisterRequest, RpcTxOutcome},
};
use jsonrpsee::{
    core::RpcResult,
    types::{ErrorCode, ErrorObjectOwned},
    RpcModule,
};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Starts the RPC server and blocks until the process is interrupted.
pub(crate) async fn start_rpc<T>(rpc_impl: &T, rpc_addr: &str) -> anyhow::Result<()>
where
    T: RegistrarControlApiServer + RegistrarApiServer + Clone + Sync + Send,
{
    let mut rpc_module = RpcModule::new(rpc_impl.clone());

    let control_api = RegistrarControlApiServer::into_rpc(rpc_impl.clone());
    let registrar_api = RegistrarApiServer::into_rpc(rpc_impl.clone());

    rpc_module.merge(control_api).context("merge control api")?;
    rpc_module
        .merge(registrar_api)
        .context("merge registrar api")?;

    info!("starting registrar rpc server at {rpc_addr}");
    let rpc_server = jsonrpsee::server::ServerBuilder::new()
        .build(&rpc_addr)
        .await
        .context("build registrar rpc server")?;

    let rpc_handle = rpc_server.start(rpc_module);
    debug!("registrar rpc server started");

    let _ = tokio::signal::ctrl_c().await;
    info!("stopping rpc server");

    if rpc_handle.stop().is_err() {
        warn!("rpc server already stopped");
    }

    Ok(())
}

/// RPC server for the registrar service.
///
/// Hands each incoming request a fresh request id for log correlation; id `0` is reserved for
/// maintenance transactions.
#[derive(Clone)]
pub(crate) struct RegistrarRpc {
    /// Service start time.
    start_time: DateTime<Utc>,

    /// The registration pipelines.
    registrar: Arc<Registrar>,

    /// Source of per-request correlation ids.
    next_request_id: Arc<AtomicU64>,
}

impl RegistrarRpc {
    /// Creates a new RPC server over the given registrar.
    pub(crate) fn new(registrar: Arc<Registrar>) -> Self {
        Self {
            start_time: Utc::now(),
            registrar,
            next_request_id: Arc::new(AtomicU64::new(1)),
        }
    }

    fn next_request_id(&self) -> u64 {
        self.next_request_id.fetch_add(1, Ordering::SeqCst)
    }
}

#[async_trait]
impl RegistrarControlApiServer for RegistrarRpc {
    async fn get_uptime(&self) -> RpcResult<u64> {
        let current_time = Utc::now().timestamp();
        let start_time = self.start_time.timestamp();

        // The user might care about their system time being incorrect.
        if current_time <= start_time {
            return Err(rpc_error(
                ErrorCode::InternalError,
                "system time may be inaccurate", // `start_time` may have been incorrect too
                current_time.saturating_sub(start_time),
            ));
        }

        Ok(current_time.abs_diff(start_time))
    }
}

#[async_trait]
impl RegistrarApiServer for RegistrarRpc {
    async fn register_validator(&self, request: RpcRegisterRequest) -> RpcResult<RpcTxOutcome> {
        let request_id = self.next_request_id();

        let outcome = self
            .registrar
            .register_validator(&request.keystore, request_id)
            .await
            .map_err(to_rpc_error)?;

        Ok(RpcTxOutcome {
            tx_hash: outcome.tx_hash,
            confirmed: outcome.confirmed,
        })
    }

    async fn remove_validator(&self, public_key: String) -> RpcResult<RpcTxOutcome> {
        let request_id = self.next_request_id();

        let outcome = self
            .registrar
            .remove_validator(&public_key, request_id)
            .await
            .map_err(to_rpc_error)?;

        Ok(RpcTxOutcome {
            tx_hash: outcome.tx_hash,
            confirmed: outcome.confirmed,
        })
    }

    async fn is_validator_registered(&self, public_key: String) -> RpcResult<bool> {
        self.registrar
            .is_validator_registered(&public_key)
            .await
            .map_err(to_rpc_error)
    }
}

/// Maps pipeline errors to RPC error objects, keeping caller mistakes distinguishable from server
/// faults.
fn to_rpc_error(err: RegistrarError) -> ErrorObjectOwned {
    let code = match &err {
        RegistrarError::AlreadyRegistered(_)
        | RegistrarError::NotRegistered(_)
        | RegistrarError::InvalidPublicKey(_) => ErrorCode::InvalidParams,
        _ => ErrorCode::InternalError,
    };

    rpc_error(code, "request failed", err.to_string())
}

/// Useful for creating custom error objects in RPC responses.
fn rpc_error<T: fmt::Display + Serialize>(
    err_code: ErrorCode,
    message: &str,
    data: T,
) -> ErrorObjectOwned {
    ErrorObjectOwned::owned::<_>(err_code.code(), message, Some(data))
}
