//! Wire types for the operator registry REST API.
//!
//! The registry serves much wider records than this service needs; unknown fields are ignored on
//! deserialization.

use alloy::primitives::U256;
use dvt_registrar_primitives::{ClusterSnapshot, ClusterState, OperatorIdx, OperatorInfo};
use serde::Deserialize;

use crate::errors::RegistryError;

/// An operator record as served by the registry.
#[derive(Debug, Clone, Deserialize)]
pub struct OperatorRecord {
    /// The operator's unique id.
    pub id: OperatorIdx,

    /// The operator's per-block fee, a decimal string in token base units.
    pub fee: String,

    /// The operator's share-encryption public key.
    pub public_key: String,
}

impl TryFrom<OperatorRecord> for OperatorInfo {
    type Error = RegistryError;

    fn try_from(record: OperatorRecord) -> Result<Self, Self::Error> {
        let fee = record.fee.parse::<U256>().map_err(|e| {
            RegistryError::MalformedRecord(format!(
                "operator {} has unparseable fee {:?}: {e}",
                record.id, record.fee
            ))
        })?;

        Ok(OperatorInfo {
            id: record.id,
            fee,
            public_key: record.public_key,
        })
    }
}

/// A cluster record as served by the registry.
#[derive(Debug, Clone, Deserialize)]
pub struct ClusterRecord {
    /// Number of validators registered to the cluster.
    pub validator_count: u32,

    /// The cluster's network fee index snapshot.
    pub network_fee_index: u64,

    /// The cluster's fee index snapshot.
    pub index: u64,

    /// The cluster's balance, a decimal string in token base units.
    pub balance: String,

    /// Whether the cluster is active.
    pub active: bool,

    /// The ids of the operators the cluster is registered against.
    pub operators: Vec<OperatorIdx>,
}

impl TryFrom<ClusterRecord> for ClusterSnapshot {
    type Error = RegistryError;

    fn try_from(record: ClusterRecord) -> Result<Self, Self::Error> {
        let balance = record.balance.parse::<U256>().map_err(|e| {
            RegistryError::MalformedRecord(format!(
                "cluster has unparseable balance {:?}: {e}",
                record.balance
            ))
        })?;

        Ok(ClusterSnapshot {
            state: ClusterState {
                validator_count: record.validator_count,
                network_fee_index: record.network_fee_index,
                index: record.index,
                balance,
                active: record.active,
            },
            operator_ids: record.operators,
        })
    }
}

/// Pagination envelope on list endpoints.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Pagination {
    /// The page this response covers, 1-based.
    pub page: u64,

    /// Total number of pages.
    pub pages: u64,
}

/// Response of the clusters-by-owner endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ClusterOwnerResponse {
    /// Pagination envelope.
    pub pagination: Pagination,

    /// The cluster records on this page.
    pub clusters: Vec<ClusterRecord>,
}
