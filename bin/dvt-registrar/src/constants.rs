use std::time::Duration;

pub(crate) const DEFAULT_THREAD_COUNT: u8 = 2;

pub(crate) const DEFAULT_THREAD_STACK_SIZE: usize = 8 * 1024 * 1024;

/// Operator metadata changes rarely; a slow cadence is enough.
pub(crate) const DEFAULT_OPERATOR_REFRESH_INTERVAL: Duration = Duration::from_secs(4 * 60 * 60);

/// Fee refresh doubles as the allowance check cycle.
pub(crate) const DEFAULT_FEE_REFRESH_INTERVAL: Duration = Duration::from_secs(60 * 60);
