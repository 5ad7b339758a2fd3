//! Seams between the orchestrator and the ledger-facing client.

use alloy::primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use dvt_registrar_primitives::{ClusterState, FeeParameters, OperatorIdx};

use crate::{errors::ContractError, submitter::SubmitOutcome};

/// Ownership and liveness of a validator public key on the network contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatorStatus {
    /// The account that registered the validator.
    pub owner: Address,

    /// Whether the validator is currently active.
    pub active: bool,
}

/// A fully resolved registration call.
#[derive(Debug, Clone)]
pub struct RegisterCall {
    /// The validator public key being registered.
    pub public_key: Bytes,

    /// The ids of the operators that will run the validator.
    pub operator_ids: Vec<OperatorIdx>,

    /// The encrypted key-share blob, one share per operator.
    pub share_data: Bytes,

    /// The funding amount to deposit with the registration, in token base units.
    pub amount: U256,

    /// The cluster state the contract must reconcile against.
    pub cluster: ClusterState,
}

/// A fully resolved removal call.
#[derive(Debug, Clone)]
pub struct RemoveCall {
    /// The validator public key being removed.
    pub public_key: Bytes,

    /// The ids of the operators the validator is registered against.
    pub operator_ids: Vec<OperatorIdx>,

    /// The cluster state the contract must reconcile against.
    pub cluster: ClusterState,
}

/// The contract operations the orchestrator needs.
///
/// Implemented by [`NetworkClient`](crate::client::NetworkClient); tests substitute an in-memory
/// fake.
#[async_trait]
pub trait ValidatorContract: Send + Sync {
    /// The most recently refreshed fee parameters.
    async fn fee_parameters(&self) -> FeeParameters;

    /// Looks up a validator by public key on the views contract.
    async fn validator_status(&self, public_key: &Bytes) -> Result<ValidatorStatus, ContractError>;

    /// Waits until the signing account has no in-flight transaction.
    async fn wait_idle(&self, request_id: u64) -> Result<(), ContractError>;

    /// Submits a registration transaction.
    async fn register_validator(
        &self,
        call: RegisterCall,
        request_id: u64,
    ) -> Result<SubmitOutcome, ContractError>;

    /// Submits a removal transaction.
    async fn remove_validator(
        &self,
        call: RemoveCall,
        request_id: u64,
    ) -> Result<SubmitOutcome, ContractError>;
}
