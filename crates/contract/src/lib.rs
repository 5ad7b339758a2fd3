//! Ledger access for the shared-validator network contracts.
//!
//! This crate is the single choke point through which every state-mutating ledger call passes. It
//! owns the contract bindings, the transaction submission & confirmation engine, the cached fee
//! parameters and the token allowance maintainer. Everything above it (the orchestrator, the RPC
//! facade) only sees the [`ValidatorContract`](traits::ValidatorContract) seam.

pub mod allowance;
pub mod bindings;
pub mod client;
pub mod errors;
pub mod ledger;
pub mod submitter;
pub mod traits;

pub use allowance::{
    spawn_outcome_logger, AllowanceMaintainer, TokenOps, TopUpOutcome, MAINTENANCE_REQUEST_ID,
};
pub use client::{spawn_fee_refresh, ContractAddresses, NetworkClient};
pub use errors::{ContractError, LedgerError};
pub use ledger::{AlloyLedger, Ledger, NonceView, ReceiptInfo};
pub use submitter::{CallKind, GasPads, PollPolicy, SubmitOutcome, TxPlan, TxSubmitter};
pub use traits::{RegisterCall, RemoveCall, ValidatorContract, ValidatorStatus};
