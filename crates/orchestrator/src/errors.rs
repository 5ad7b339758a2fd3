//! Error types for the registration pipelines.

use dvt_registrar_contract::ContractError;
use dvt_registrar_registry::RegistryError;
use thiserror::Error;

use crate::keysplit::KeySplitError;

/// Everything that can go wrong while registering or removing a validator.
#[derive(Debug, Error)]
pub enum RegistrarError {
    /// The validator is already registered on the network.
    #[error("validator {0} is already registered")]
    AlreadyRegistered(String),

    /// The validator is not registered by this service's account.
    #[error("validator {0} is not registered by this account")]
    NotRegistered(String),

    /// The public key is not valid hex of the expected length.
    #[error("invalid validator public key: {0}")]
    InvalidPublicKey(String),

    /// The splitter daemon returned share data that is not valid hex.
    #[error("malformed share data: {0}")]
    MalformedShareData(String),

    /// No operators are configured or the operator snapshot is empty.
    #[error("operator set is empty")]
    EmptyOperatorSet,

    /// The operator registry failed.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// The contract layer failed.
    #[error("contract error: {0}")]
    Contract(#[from] ContractError),

    /// The key-splitting daemon failed.
    #[error("key splitting failed: {0}")]
    KeySplit(#[from] KeySplitError),
}
