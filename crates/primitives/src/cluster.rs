//! Cluster bookkeeping records for one (owner, operator-set) pair.

use alloy::primitives::U256;
use serde::{Deserialize, Serialize};

use crate::operator::OperatorIdx;

/// The on-chain bookkeeping tuple the network contract expects with every registration and
/// removal call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterState {
    /// Number of validators currently registered to this cluster.
    pub validator_count: u32,

    /// The network fee index snapshot for this cluster.
    pub network_fee_index: u64,

    /// The cluster's fee index snapshot.
    pub index: u64,

    /// The cluster's remaining balance in token base units.
    pub balance: U256,

    /// Whether the cluster is active (not liquidated).
    pub active: bool,
}

impl ClusterState {
    /// The state to pass when no prior cluster exists for the operator set.
    ///
    /// All counters zeroed with `active` set tells the contract layer "no prior state, initialize
    /// fresh".
    pub fn fresh() -> Self {
        Self {
            active: true,
            ..Default::default()
        }
    }
}

/// A cluster record as served by the operator registry, including the operator-id set the
/// on-chain tuple omits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSnapshot {
    /// The on-chain bookkeeping state of this cluster.
    pub state: ClusterState,

    /// The ids of the operators this cluster is registered against.
    pub operator_ids: Vec<OperatorIdx>,
}

impl ClusterSnapshot {
    /// Whether this cluster covers exactly the given operator set.
    ///
    /// Matching is order-independent: the registry and the caller are free to present the ids in
    /// any order.
    pub fn has_operator_set(&self, operator_ids: &[OperatorIdx]) -> bool {
        if self.operator_ids.len() != operator_ids.len() {
            return false;
        }
        let mut ours = self.operator_ids.clone();
        let mut theirs = operator_ids.to_vec();
        ours.sort_unstable();
        theirs.sort_unstable();
        ours == theirs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(ids: &[OperatorIdx]) -> ClusterSnapshot {
        ClusterSnapshot {
            state: ClusterState {
                validator_count: 3,
                network_fee_index: 7,
                index: 11,
                balance: U256::from(42u64),
                active: true,
            },
            operator_ids: ids.to_vec(),
        }
    }

    #[test]
    fn test_fresh_cluster_is_zeroed_and_active() {
        let fresh = ClusterState::fresh();
        assert_eq!(fresh.validator_count, 0);
        assert_eq!(fresh.network_fee_index, 0);
        assert_eq!(fresh.index, 0);
        assert_eq!(fresh.balance, U256::ZERO);
        assert!(fresh.active);
    }

    #[test]
    fn test_operator_set_matching_ignores_order() {
        let cluster = snapshot(&[1, 2, 3]);
        assert!(cluster.has_operator_set(&[3, 1, 2]));
        assert!(cluster.has_operator_set(&[1, 2, 3]));
    }

    #[test]
    fn test_operator_set_matching_rejects_mismatch() {
        let cluster = snapshot(&[1, 2, 3]);
        assert!(!cluster.has_operator_set(&[1, 2]));
        assert!(!cluster.has_operator_set(&[1, 2, 4]));
        assert!(!cluster.has_operator_set(&[1, 2, 3, 4]));
    }
}
