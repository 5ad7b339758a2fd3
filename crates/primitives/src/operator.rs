//! Operator metadata as served by the operator registry.

use alloy::primitives::U256;
use serde::{Deserialize, Serialize};

/// Index type for operators on the shared-validator network.
pub type OperatorIdx = u32;

/// An immutable snapshot of a single operator's registry record.
///
/// Only the fields that feed the funding formula and the share-splitting call are kept; the
/// registry serves a much wider record (location, clients, performance) that this service has no
/// use for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorInfo {
    /// The operator's unique id on the network.
    pub id: OperatorIdx,

    /// The operator's per-block fee in token base units.
    pub fee: U256,

    /// The operator's share-encryption public key, base64-encoded as served by the registry.
    pub public_key: String,
}

/// Sums the per-block fees over a set of operators.
pub fn total_operator_fee(operators: &[OperatorInfo]) -> U256 {
    operators
        .iter()
        .fold(U256::ZERO, |acc, op| acc.saturating_add(op.fee))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_operator_fee() {
        let ops = [100u64, 200, 300]
            .into_iter()
            .enumerate()
            .map(|(i, fee)| OperatorInfo {
                id: i as OperatorIdx + 1,
                fee: U256::from(fee),
                public_key: format!("key-{i}"),
            })
            .collect::<Vec<_>>();

        assert_eq!(total_operator_fee(&ops), U256::from(600u64));
        assert_eq!(total_operator_fee(&[]), U256::ZERO);
    }
}
