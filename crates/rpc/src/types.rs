//! Types for the RPC server.

use alloy::primitives::B256;
use serde::{Deserialize, Serialize};

/// Outcome of a submitted transaction as reported to RPC clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcTxOutcome {
    /// Hash of the broadcast transaction.
    pub tx_hash: B256,

    /// Whether the transaction is already known to be mined.
    ///
    /// Submission normally returns as soon as the transaction is broadcast; `true` only appears
    /// when the server had to confirm inclusion while recovering from a broadcast error.
    pub confirmed: bool,
}

/// Parameters of a registration request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRegisterRequest {
    /// The validator's encrypted keystore (EIP-2335 JSON).
    pub keystore: serde_json::Value,
}
