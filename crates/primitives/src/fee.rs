//! Network-level fee parameters read from the ledger.

use alloy::primitives::U256;
use serde::{Deserialize, Serialize};

/// Fee parameters published by the network contract.
///
/// Refreshed on a timer; staleness beyond the refresh interval is tolerated (best-effort).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeParameters {
    /// The per-block network fee in token base units.
    pub network_fee: U256,

    /// The number of blocks of funding buffer required before a cluster is liquidatable.
    pub liquidation_threshold_period: U256,
}
