//! Standing token-allowance maintenance.
//!
//! Registration transactions must never be blocked on a missing approval, so the service keeps a
//! standing allowance topped up. The check runs on the fee-refresh cycle; the top-up itself runs
//! as a background task whose outcome is logged, never awaited, so a failed approval cannot stall
//! the refresh cycle. The next cycle retries the check.

use std::sync::Arc;

use alloy::primitives::U256;
use async_trait::async_trait;
use tokio::{
    sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
    task::JoinHandle,
};
use tracing::{debug, error, info};

use crate::{
    client::NetworkClient,
    errors::ContractError,
    submitter::SubmitOutcome,
};

/// Request id used for maintenance transactions not tied to any client request.
pub const MAINTENANCE_REQUEST_ID: u64 = 0;

/// Token operations the maintainer needs.
#[async_trait]
pub trait TokenOps: Send + Sync {
    /// The signing account's current allowance towards the network contract.
    async fn allowance(&self) -> Result<U256, ContractError>;

    /// Approves the network contract for the given amount.
    async fn approve(&self, amount: U256, request_id: u64)
        -> Result<SubmitOutcome, ContractError>;
}

#[async_trait]
impl TokenOps for NetworkClient {
    async fn allowance(&self) -> Result<U256, ContractError> {
        NetworkClient::allowance(self).await
    }

    async fn approve(
        &self,
        amount: U256,
        request_id: u64,
    ) -> Result<SubmitOutcome, ContractError> {
        NetworkClient::approve(self, amount, request_id).await
    }
}

/// Outcome of one background top-up attempt, reported on the maintainer's channel.
#[derive(Debug)]
pub struct TopUpOutcome {
    /// The amount that was approved (the full ceiling).
    pub amount: U256,

    /// The submission result.
    pub result: Result<SubmitOutcome, ContractError>,
}

/// Hysteresis check: top up only once the allowance has fallen below half the ceiling.
///
/// Approving to the full ceiling each time keeps the cadence low; approving on every cycle once
/// near the ceiling would waste a transaction per cycle.
fn needs_top_up(current: U256, ceiling: U256) -> bool {
    current < ceiling / U256::from(2)
}

/// Keeps the signing account's token allowance above half the configured ceiling.
#[derive(Debug)]
pub struct AllowanceMaintainer<T> {
    token: Arc<T>,
    ceiling: U256,
    outcomes: UnboundedSender<TopUpOutcome>,
}

impl<T: TokenOps + 'static> AllowanceMaintainer<T> {
    /// Creates a maintainer with the given approval ceiling.
    ///
    /// Returns the receiving end of the outcome channel; hand it to
    /// [`spawn_outcome_logger`] (or drain it in tests).
    pub fn new(token: Arc<T>, ceiling: U256) -> (Self, UnboundedReceiver<TopUpOutcome>) {
        let (outcomes, rx) = unbounded_channel();

        (
            Self {
                token,
                ceiling,
                outcomes,
            },
            rx,
        )
    }

    /// Checks the allowance and, if it has fallen below half the ceiling, spawns a background
    /// top-up to the full ceiling.
    ///
    /// Only the read can fail here; the top-up's own failure goes to the outcome channel.
    pub async fn ensure_allowance(&self) -> Result<(), ContractError> {
        let current = self.token.allowance().await?;

        if !needs_top_up(current, self.ceiling) {
            debug!(%current, ceiling = %self.ceiling, "allowance sufficient");
            return Ok(());
        }

        info!(%current, ceiling = %self.ceiling, "allowance below half of ceiling, topping up");

        let token = self.token.clone();
        let ceiling = self.ceiling;
        let outcomes = self.outcomes.clone();
        tokio::spawn(async move {
            let result = token.approve(ceiling, MAINTENANCE_REQUEST_ID).await;
            // The receiver only disappears on shutdown.
            let _ = outcomes.send(TopUpOutcome {
                amount: ceiling,
                result,
            });
        });

        Ok(())
    }
}

/// Logs top-up outcomes as they arrive; runs until the maintainer is dropped.
pub fn spawn_outcome_logger(mut outcomes: UnboundedReceiver<TopUpOutcome>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(outcome) = outcomes.recv().await {
            match outcome.result {
                Ok(submitted) => {
                    info!(tx_hash = %submitted.tx_hash, amount = %outcome.amount, "allowance top-up broadcast");
                }
                Err(err) => {
                    error!(%err, amount = %outcome.amount, "allowance top-up failed");
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use alloy::primitives::B256;

    use super::*;

    struct FakeToken {
        allowance: U256,
        approvals: Mutex<Vec<U256>>,
    }

    impl FakeToken {
        fn with_allowance(allowance: U256) -> Arc<Self> {
            Arc::new(Self {
                allowance,
                approvals: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl TokenOps for FakeToken {
        async fn allowance(&self) -> Result<U256, ContractError> {
            Ok(self.allowance)
        }

        async fn approve(
            &self,
            amount: U256,
            _request_id: u64,
        ) -> Result<SubmitOutcome, ContractError> {
            self.approvals.lock().unwrap().push(amount);

            Ok(SubmitOutcome {
                tx_hash: B256::repeat_byte(0xab),
                confirmed: false,
            })
        }
    }

    #[test]
    fn test_hysteresis_boundary() {
        let ceiling = U256::from(1_000u64);

        assert!(needs_top_up(U256::ZERO, ceiling));
        assert!(needs_top_up(U256::from(499u64), ceiling));
        // Exactly half is still sufficient: the policy is strictly-below-half.
        assert!(!needs_top_up(U256::from(500u64), ceiling));
        assert!(!needs_top_up(ceiling, ceiling));
    }

    #[tokio::test]
    async fn test_low_allowance_triggers_top_up_to_ceiling() {
        let ceiling = U256::from(1_000u64);
        let token = FakeToken::with_allowance(U256::from(100u64));
        let (maintainer, mut outcomes) = AllowanceMaintainer::new(token.clone(), ceiling);

        maintainer.ensure_allowance().await.unwrap();

        let outcome = outcomes.recv().await.expect("top-up outcome");
        assert_eq!(outcome.amount, ceiling);
        assert!(outcome.result.is_ok());
        assert_eq!(*token.approvals.lock().unwrap(), vec![ceiling]);
    }

    #[tokio::test]
    async fn test_sufficient_allowance_triggers_nothing() {
        let ceiling = U256::from(1_000u64);
        let token = FakeToken::with_allowance(U256::from(600u64));
        let (maintainer, mut outcomes) = AllowanceMaintainer::new(token.clone(), ceiling);

        maintainer.ensure_allowance().await.unwrap();

        assert!(outcomes.try_recv().is_err());
        assert!(token.approvals.lock().unwrap().is_empty());
    }
}
