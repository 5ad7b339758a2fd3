//! Funding and cluster resolution.
//!
//! Both helpers are pure so the arithmetic and the matching rules can be tested without any
//! network access.

use alloy::primitives::U256;
use dvt_registrar_primitives::{
    total_operator_fee, ClusterSnapshot, ClusterState, FeeParameters, OperatorIdx, OperatorInfo,
};
use tracing::debug;

/// Computes the deposit that funds a validator for the configured operation period on top of the
/// liquidation threshold.
///
/// Per-block cost is the sum of the operator fees plus the network fee; the deposit covers that
/// cost for the liquidation threshold period plus the operation period.
pub fn funding_amount(
    operators: &[OperatorInfo],
    fees: &FeeParameters,
    operation_period: U256,
) -> U256 {
    let per_block = total_operator_fee(operators) + fees.network_fee;
    per_block * (fees.liquidation_threshold_period + operation_period)
}

/// Picks the on-chain cluster state to submit with for the given operator set.
///
/// The registry's records can list the operators of a cluster in any order, so matching is
/// order-insensitive. Only active clusters count; a liquidated cluster's record must not be
/// reused. When no cluster matches, registration starts a fresh one.
pub fn resolve_cluster(
    snapshots: &[ClusterSnapshot],
    operator_ids: &[OperatorIdx],
) -> ClusterState {
    for snapshot in snapshots {
        if snapshot.state.active && snapshot.has_operator_set(operator_ids) {
            debug!(operators = ?operator_ids, "reusing existing cluster state");
            return snapshot.state.clone();
        }
    }

    debug!(operators = ?operator_ids, "no matching cluster, starting fresh");
    ClusterState::fresh()
}
