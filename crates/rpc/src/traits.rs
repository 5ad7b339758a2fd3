//! Traits for the RPC server.

use jsonrpsee::{core::RpcResult, proc_macros::rpc};

use crate::types::{RpcRegisterRequest, RpcTxOutcome};

/// RPCs related to information about the service itself.
#[cfg_attr(not(feature = "client"), rpc(server, namespace = "registrar"))]
#[cfg_attr(feature = "client", rpc(server, client, namespace = "registrar"))]
pub trait RegistrarControlApi {
    /// Get the uptime for the service in seconds assuming the clock is strictly monotonically
    /// increasing.
    #[method(name = "uptime")]
    async fn get_uptime(&self) -> RpcResult<u64>;
}

/// RPCs that register and remove shared validators on the network.
#[cfg_attr(not(feature = "client"), rpc(server, namespace = "registrar"))]
#[cfg_attr(feature = "client", rpc(server, client, namespace = "registrar"))]
pub trait RegistrarApi {
    /// Split the keystore's validator key across the configured operators and register it on the
    /// network. Returns once the registration transaction is broadcast.
    #[method(name = "registerValidator")]
    async fn register_validator(&self, request: RpcRegisterRequest) -> RpcResult<RpcTxOutcome>;

    /// Remove a validator previously registered by this service.
    #[method(name = "removeValidator")]
    async fn remove_validator(&self, public_key: String) -> RpcResult<RpcTxOutcome>;

    /// Whether the given validator public key is actively registered on the network.
    #[method(name = "isValidatorRegistered")]
    async fn is_validator_registered(&self, public_key: String) -> RpcResult<bool>;
}
