//! Error types for contract interactions.

use alloy::primitives::{Address, B256};
use thiserror::Error;

/// Error from the underlying ledger RPC node.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The RPC transport failed or the node rejected the request.
    #[error("ledger rpc call failed: {0}")]
    Transport(#[from] alloy::transports::TransportError),
}

/// Unified error type for everything that can go wrong while talking to the network contracts.
#[derive(Debug, Error)]
pub enum ContractError {
    /// Errors related to reading from or writing to the ledger RPC node.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// A previously broadcast transaction never confirmed within the polling ceiling.
    ///
    /// This is a deliberate safety stop: building a new transaction on top of an unconfirmed one
    /// would double-spend the account nonce. The abandoned hash must be investigated out-of-band.
    #[error("transaction {0} could not be mined or checked within the polling ceiling")]
    StuckTransaction(B256),

    /// The pending and latest nonce views for the signing account never converged.
    #[error("pending and latest nonces for {0} did not converge within the polling ceiling")]
    NonceDesync(Address),

    /// The transaction could not be signed locally.
    #[error("failed to sign transaction: {0}")]
    Signing(String),

    /// Broadcast failed and the settle-and-recheck pass found no successful receipt.
    #[error("failed to broadcast transaction {tx_hash}: {source}")]
    Broadcast {
        /// Hash of the transaction that was being broadcast.
        tx_hash: B256,
        /// The original broadcast error.
        source: LedgerError,
    },

    /// A contract view call returned bytes that did not decode as the expected ABI type.
    #[error("malformed view call response: {0}")]
    AbiDecode(#[from] alloy::sol_types::Error),
}
