//! The register/remove pipelines.

use std::sync::Arc;

use alloy::primitives::{Address, Bytes, U256};
use dvt_registrar_contract::{RegisterCall, RemoveCall, SubmitOutcome, ValidatorContract};
use dvt_registrar_registry::OperatorRegistry;
use tracing::info;

use crate::{
    errors::RegistrarError,
    keysplit::KeySplitter,
    resolver::{funding_amount, resolve_cluster},
};

/// Length of a BLS validator public key in bytes.
const VALIDATOR_KEY_LEN: usize = 48;

/// Static configuration of the registration pipelines.
#[derive(Debug, Clone)]
pub struct RegistrarConfig {
    /// The signing account. Cluster lookups and ownership checks run against this address.
    pub owner: Address,

    /// How many blocks of runtime a registration deposit should fund beyond the liquidation
    /// threshold.
    pub operation_period: U256,

    /// Password for the encrypted keystores this service is handed.
    pub keystore_password: String,
}

/// Orchestrates validator registration and removal.
pub struct Registrar {
    contract: Arc<dyn ValidatorContract>,
    registry: Arc<dyn OperatorRegistry>,
    splitter: Arc<dyn KeySplitter>,
    config: RegistrarConfig,
}

impl Registrar {
    /// Wires the pipelines together.
    pub fn new(
        contract: Arc<dyn ValidatorContract>,
        registry: Arc<dyn OperatorRegistry>,
        splitter: Arc<dyn KeySplitter>,
        config: RegistrarConfig,
    ) -> Self {
        Self {
            contract,
            registry,
            splitter,
            config,
        }
    }

    /// Registers the validator held in the given keystore.
    ///
    /// The public key is extracted and checked against the contract before any shares are built,
    /// so a duplicate registration fails without touching key material. The cluster snapshot is
    /// resolved only after the submitter has drained any in-flight transaction; a snapshot taken
    /// earlier could describe pre-transaction state.
    pub async fn register_validator(
        &self,
        keystore: &serde_json::Value,
        request_id: u64,
    ) -> Result<SubmitOutcome, RegistrarError> {
        let raw_key = self
            .splitter
            .extract_public_key(keystore, &self.config.keystore_password)
            .await?;
        let public_key = parse_validator_key(&raw_key)?;
        let display_key = format!("0x{}", hex::encode(&public_key));

        info!(request_id, public_key = %display_key, "registering validator");

        let status = self.contract.validator_status(&public_key).await?;
        if status.active {
            return Err(RegistrarError::AlreadyRegistered(display_key));
        }

        let operators = self.registry.operators();
        if operators.is_empty() {
            return Err(RegistrarError::EmptyOperatorSet);
        }
        let operator_ids: Vec<u32> = operators.iter().map(|op| op.id).collect();

        let bundle = self
            .splitter
            .build_shares(keystore, &self.config.keystore_password, &operators)
            .await?;
        let share_data = decode_hex(&bundle.share_data)
            .map_err(|e| RegistrarError::MalformedShareData(e.to_string()))?;

        let fees = self.contract.fee_parameters().await;
        let amount = funding_amount(&operators, &fees, self.config.operation_period);

        self.contract.wait_idle(request_id).await?;

        let clusters = self.registry.clusters_by_owner(self.config.owner).await?;
        let cluster = resolve_cluster(&clusters, &operator_ids);

        let outcome = self
            .contract
            .register_validator(
                RegisterCall {
                    public_key,
                    operator_ids,
                    share_data,
                    amount,
                    cluster,
                },
                request_id,
            )
            .await?;

        info!(request_id, public_key = %display_key, tx_hash = %outcome.tx_hash, "registration submitted");
        Ok(outcome)
    }

    /// Removes a previously registered validator.
    ///
    /// Only validators registered by this service's own account can be removed.
    pub async fn remove_validator(
        &self,
        raw_key: &str,
        request_id: u64,
    ) -> Result<SubmitOutcome, RegistrarError> {
        let public_key = parse_validator_key(raw_key)?;
        let display_key = format!("0x{}", hex::encode(&public_key));

        info!(request_id, public_key = %display_key, "removing validator");

        let status = self.contract.validator_status(&public_key).await?;
        if !status.active || status.owner != self.config.owner {
            return Err(RegistrarError::NotRegistered(display_key));
        }

        let operators = self.registry.operators();
        if operators.is_empty() {
            return Err(RegistrarError::EmptyOperatorSet);
        }
        let operator_ids: Vec<u32> = operators.iter().map(|op| op.id).collect();

        self.contract.wait_idle(request_id).await?;

        let clusters = self.registry.clusters_by_owner(self.config.owner).await?;
        let cluster = resolve_cluster(&clusters, &operator_ids);

        let outcome = self
            .contract
            .remove_validator(
                RemoveCall {
                    public_key,
                    operator_ids,
                    cluster,
                },
                request_id,
            )
            .await?;

        info!(request_id, public_key = %display_key, tx_hash = %outcome.tx_hash, "removal submitted");
        Ok(outcome)
    }

    /// Whether the given validator public key is actively registered on the network.
    pub async fn is_validator_registered(&self, raw_key: &str) -> Result<bool, RegistrarError> {
        let public_key = parse_validator_key(raw_key)?;
        let status = self.contract.validator_status(&public_key).await?;
        Ok(status.active)
    }
}

/// Parses a validator public key from hex, with or without the `0x` prefix.
fn parse_validator_key(raw: &str) -> Result<Bytes, RegistrarError> {
    let stripped = raw.strip_prefix("0x").unwrap_or(raw);
    let bytes =
        hex::decode(stripped).map_err(|_| RegistrarError::InvalidPublicKey(raw.to_owned()))?;

    if bytes.len() != VALIDATOR_KEY_LEN {
        return Err(RegistrarError::InvalidPublicKey(raw.to_owned()));
    }

    Ok(Bytes::from(bytes))
}

fn decode_hex(raw: &str) -> Result<Bytes, hex::FromHexError> {
    let stripped = raw.strip_prefix("0x").unwrap_or(raw);
    Ok(Bytes::from(hex::decode(stripped)?))
}
