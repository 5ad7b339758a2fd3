//! The transaction submission & confirmation engine.
//!
//! Every state-mutating ledger call (approve, register, remove) goes through
//! [`TxSubmitter::submit`]. The engine serializes submissions per signing account: a mutex guards
//! the whole drain-then-reconcile-then-build sequence, so no two transactions are ever built
//! concurrently for the same account and no transaction is built while a prior one is still in an
//! unknown state.

use std::{sync::Arc, time::Duration};

use alloy::{
    eips::eip2718::Encodable2718,
    network::{EthereumWallet, TransactionBuilder},
    primitives::{Address, Bytes, B256},
    rpc::types::{TransactionInput, TransactionRequest},
};
use serde::{Deserialize, Serialize};
use tokio::{sync::Mutex, time::sleep};
use tracing::{debug, info, warn};

use crate::{
    errors::ContractError,
    ledger::{Ledger, NonceView},
};

/// Polling cadence and ceilings for the engine's confirmation loops.
///
/// Tests inject near-zero intervals and small ceilings; production values come from
/// configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollPolicy {
    /// How long to sleep between receipt/nonce polls and before the broadcast-failure recheck.
    pub poll_interval: Duration,

    /// How many receipt polls to attempt before declaring a pending transaction stuck.
    pub mined_attempts: u32,

    /// How many nonce polls to attempt before declaring the account desynced.
    pub nonce_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(6),
            mined_attempts: 60,
            nonce_attempts: 120,
        }
    }
}

/// The kind of mutating call a transaction plan carries.
///
/// Gas estimation on write paths is unreliable near storage-growth boundaries, so each call kind
/// carries its own safety pad on top of the node's estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    /// Token approval for the network contract.
    Approve,
    /// Validator registration.
    Register,
    /// Validator removal.
    Remove,
}

/// Gas padding added on top of the node's estimate, per call kind.
///
/// The individual values are configuration constants with no documented derivation; registration
/// grows cluster storage and needs the largest pad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasPads {
    /// Pad for approval transactions.
    pub approve: u64,

    /// Pad for registration transactions.
    pub register: u64,

    /// Pad for removal transactions.
    pub remove: u64,
}

impl Default for GasPads {
    fn default() -> Self {
        Self {
            approve: 0,
            register: 300_000,
            remove: 100_000,
        }
    }
}

impl GasPads {
    /// The pad for the given call kind.
    pub const fn for_kind(&self, kind: CallKind) -> u64 {
        match kind {
            CallKind::Approve => self.approve,
            CallKind::Register => self.register,
            CallKind::Remove => self.remove,
        }
    }
}

/// A fully resolved mutating call, ready to be turned into a signed transaction.
#[derive(Debug, Clone)]
pub struct TxPlan {
    /// What kind of call this is; selects the gas pad.
    pub kind: CallKind,

    /// The contract to call.
    pub to: Address,

    /// ABI-encoded call data.
    pub calldata: Bytes,
}

/// The result of a successful submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitOutcome {
    /// Hash of the broadcast transaction.
    pub tx_hash: B256,

    /// Whether a successful receipt was already observed.
    ///
    /// Normally `false`: confirmation is lazy and happens just before the *next* mutating call.
    /// Set when the broadcast-failure recovery path found the transaction already mined.
    pub confirmed: bool,
}

/// Serializes, signs, broadcasts and lazily confirms transactions for a single signing account.
#[derive(Debug)]
pub struct TxSubmitter {
    ledger: Arc<dyn Ledger>,
    wallet: EthereumWallet,
    sender: Address,
    chain_id: u64,
    policy: PollPolicy,
    gas_pads: GasPads,

    /// The serialization token: at most one unconfirmed transaction per signing account.
    pending: Mutex<Option<B256>>,
}

impl TxSubmitter {
    /// Creates a new submitter for the given signing account.
    pub fn new(
        ledger: Arc<dyn Ledger>,
        wallet: EthereumWallet,
        sender: Address,
        chain_id: u64,
        policy: PollPolicy,
        gas_pads: GasPads,
    ) -> Self {
        Self {
            ledger,
            wallet,
            sender,
            chain_id,
            policy,
            gas_pads,
            pending: Mutex::new(None),
        }
    }

    /// The signing account this submitter is bound to.
    pub const fn sender(&self) -> Address {
        self.sender
    }

    /// The hash currently occupying the pending slot, if any.
    pub async fn pending_transaction(&self) -> Option<B256> {
        *self.pending.lock().await
    }

    /// Waits until the signing account has no in-flight transaction.
    ///
    /// Drains the recorded pending transaction and reconciles the pending/latest nonce views.
    /// Callers use this before reading state that must reflect every prior write (e.g. the
    /// cluster snapshot consulted when building a registration).
    pub async fn wait_idle(&self, request_id: u64) -> Result<(), ContractError> {
        let mut slot = self.pending.lock().await;
        self.drain_pending(&mut slot, request_id).await?;
        self.reconcile_nonce(request_id).await?;

        debug!(request_id, sender = %self.sender, "no pending transactions for signing account");
        Ok(())
    }

    /// Signs, broadcasts and records a transaction for the given plan.
    ///
    /// Executes the full protocol: drain the prior pending transaction, reconcile nonces, build
    /// and estimate, sign locally, broadcast, reconcile broadcast failures against node state,
    /// and finally record the new hash as the account's pending transaction. Confirmation is
    /// lazy: the *next* mutating call drains the recorded hash.
    pub async fn submit(&self, plan: TxPlan, request_id: u64) -> Result<SubmitOutcome, ContractError> {
        let mut slot = self.pending.lock().await;

        // Steps 1-2: turn "unknown in-flight state" into "known idle state" before building.
        self.drain_pending(&mut slot, request_id).await?;
        self.reconcile_nonce(request_id).await?;

        // Step 3: build and estimate.
        let mut tx = TransactionRequest::default()
            .with_from(self.sender)
            .with_to(plan.to)
            .with_chain_id(self.chain_id)
            .input(TransactionInput::new(plan.calldata));

        let estimate = self.ledger.estimate_gas(&tx).await?;
        let gas_limit = estimate + self.gas_pads.for_kind(plan.kind);
        let gas_price = self.ledger.gas_price().await?;
        let nonce = self
            .ledger
            .transaction_count(self.sender, NonceView::Latest)
            .await?;

        tx = tx
            .with_gas_limit(gas_limit)
            .with_gas_price(gas_price)
            .with_nonce(nonce);

        // Step 4: sign locally; the unsigned payload never leaves the process.
        let envelope = tx
            .build(&self.wallet)
            .await
            .map_err(|e| ContractError::Signing(e.to_string()))?;
        let tx_hash = *envelope.tx_hash();
        let raw = envelope.encoded_2718();

        debug!(request_id, %tx_hash, gas_limit, nonce, kind = ?plan.kind, "broadcasting transaction");

        let confirmed = match self.ledger.broadcast(&raw).await {
            Ok(()) => false,
            // Step 5: broadcast errors do not imply failure. The node may have applied the
            // transaction before erroring, or a previous identical broadcast may have landed.
            Err(err) => {
                warn!(request_id, %tx_hash, %err, "broadcast failed, rechecking by hash");
                sleep(self.policy.poll_interval).await;

                match self.ledger.receipt(tx_hash).await {
                    Ok(Some(receipt)) if receipt.success => {
                        info!(request_id, %tx_hash, "transaction landed despite broadcast error");
                        true
                    }
                    _ => {
                        return Err(ContractError::Broadcast {
                            tx_hash,
                            source: err,
                        })
                    }
                }
            }
        };

        // Step 6: record and return; confirmation is the next caller's problem.
        *slot = Some(tx_hash);
        info!(request_id, %tx_hash, kind = ?plan.kind, "transaction broadcast");

        Ok(SubmitOutcome { tx_hash, confirmed })
    }

    /// Step 1: polls the recorded pending transaction until it confirms.
    ///
    /// Exceeding the ceiling clears the slot (so future calls are not permanently blocked on the
    /// same hash) and fails fatally; the abandoned transaction must be investigated out-of-band.
    async fn drain_pending(
        &self,
        slot: &mut Option<B256>,
        request_id: u64,
    ) -> Result<(), ContractError> {
        let Some(tx_hash) = *slot else {
            return Ok(());
        };

        for _ in 0..self.policy.mined_attempts {
            sleep(self.policy.poll_interval).await;

            match self.ledger.receipt(tx_hash).await {
                Ok(Some(receipt)) if receipt.success => {
                    info!(request_id, %tx_hash, block = ?receipt.block_number, "previous transaction was mined");
                    *slot = None;
                    return Ok(());
                }
                Ok(_) => {
                    warn!(request_id, %tx_hash, "holding off new transaction, previous one still pending");
                }
                Err(err) => {
                    warn!(request_id, %tx_hash, %err, "unable to check previous transaction");
                }
            }
        }

        *slot = None;
        Err(ContractError::StuckTransaction(tx_hash))
    }

    /// Step 2: waits for the pending and latest nonce views to converge.
    ///
    /// A divergence means a transaction is in flight that this process does not know about, e.g.
    /// after a restart between broadcast and recording.
    async fn reconcile_nonce(&self, request_id: u64) -> Result<(), ContractError> {
        for _ in 0..self.policy.nonce_attempts {
            let pending = self
                .ledger
                .transaction_count(self.sender, NonceView::Pending)
                .await;
            let latest = self
                .ledger
                .transaction_count(self.sender, NonceView::Latest)
                .await;

            match (pending, latest) {
                (Ok(pending), Ok(latest)) => {
                    debug!(request_id, pending, latest, "checked signing account nonces");
                    if pending == latest {
                        return Ok(());
                    }
                }
                (Err(err), _) | (_, Err(err)) => {
                    warn!(request_id, sender = %self.sender, %err, "cannot read nonce for signing account");
                }
            }

            sleep(self.policy.poll_interval).await;
        }

        Err(ContractError::NonceDesync(self.sender))
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::VecDeque,
        sync::{
            atomic::{AtomicU64, Ordering},
            Mutex as StdMutex,
        },
    };

    use alloy::{
        primitives::{address, U256},
        signers::local::PrivateKeySigner,
        transports::TransportErrorKind,
    };
    use async_trait::async_trait;

    use super::*;
    use crate::{
        errors::LedgerError,
        ledger::{NonceView, ReceiptInfo},
    };

    const CHAIN_ID: u64 = 31_337;

    /// A ledger whose responses are scripted per call site.
    #[derive(Debug, Default)]
    struct FakeLedger {
        /// Replies served to `receipt`, in order; the last entry repeats.
        receipts: StdMutex<VecDeque<Option<ReceiptInfo>>>,

        /// (pending, latest) pairs served to `transaction_count`; the last pair repeats.
        nonces: StdMutex<VecDeque<(u64, u64)>>,

        /// Replies served to `broadcast`, in order; `Ok` once exhausted.
        broadcast_errors: StdMutex<VecDeque<&'static str>>,

        receipt_queries: StdMutex<Vec<B256>>,
        broadcast_count: AtomicU64,
    }

    impl FakeLedger {
        fn with_nonce(pending: u64, latest: u64) -> Self {
            let fake = Self::default();
            fake.nonces.lock().unwrap().push_back((pending, latest));
            fake
        }

        fn queue_receipt(&self, receipt: Option<ReceiptInfo>) {
            self.receipts.lock().unwrap().push_back(receipt);
        }

        fn queue_broadcast_error(&self, msg: &'static str) {
            self.broadcast_errors.lock().unwrap().push_back(msg);
        }

        fn receipt_queries(&self) -> Vec<B256> {
            self.receipt_queries.lock().unwrap().clone()
        }

        fn broadcasts(&self) -> u64 {
            self.broadcast_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Ledger for FakeLedger {
        async fn receipt(&self, tx_hash: B256) -> Result<Option<ReceiptInfo>, LedgerError> {
            self.receipt_queries.lock().unwrap().push(tx_hash);

            let mut receipts = self.receipts.lock().unwrap();
            let reply = if receipts.len() > 1 {
                receipts.pop_front().unwrap()
            } else {
                receipts.front().copied().flatten()
            };

            Ok(reply)
        }

        async fn transaction_count(
            &self,
            _address: Address,
            view: NonceView,
        ) -> Result<u64, LedgerError> {
            let mut nonces = self.nonces.lock().unwrap();
            let pair = if nonces.len() > 1 {
                nonces.pop_front().unwrap()
            } else {
                *nonces.front().expect("nonce script must not be empty")
            };

            Ok(match view {
                NonceView::Pending => pair.0,
                NonceView::Latest => pair.1,
            })
        }

        async fn estimate_gas(&self, _tx: &TransactionRequest) -> Result<u64, LedgerError> {
            Ok(50_000)
        }

        async fn gas_price(&self) -> Result<u128, LedgerError> {
            Ok(1_000_000_000)
        }

        async fn broadcast(&self, _raw_tx: &[u8]) -> Result<(), LedgerError> {
            self.broadcast_count.fetch_add(1, Ordering::SeqCst);

            match self.broadcast_errors.lock().unwrap().pop_front() {
                Some(msg) => Err(LedgerError::Transport(TransportErrorKind::custom_str(msg))),
                None => Ok(()),
            }
        }

        async fn call(&self, _tx: &TransactionRequest) -> Result<Bytes, LedgerError> {
            Ok(Bytes::new())
        }
    }

    fn test_policy(mined_attempts: u32, nonce_attempts: u32) -> PollPolicy {
        PollPolicy {
            poll_interval: Duration::ZERO,
            mined_attempts,
            nonce_attempts,
        }
    }

    fn submitter(ledger: Arc<FakeLedger>, policy: PollPolicy) -> TxSubmitter {
        let signer = PrivateKeySigner::random();
        let sender = signer.address();
        TxSubmitter::new(
            ledger,
            EthereumWallet::new(signer),
            sender,
            CHAIN_ID,
            policy,
            GasPads::default(),
        )
    }

    fn plan(kind: CallKind) -> TxPlan {
        TxPlan {
            kind,
            to: address!("00000000000000000000000000000000000000aa"),
            calldata: Bytes::from(U256::from(1u64).to_be_bytes::<32>().to_vec()),
        }
    }

    fn mined() -> Option<ReceiptInfo> {
        Some(ReceiptInfo {
            success: true,
            block_number: Some(100),
        })
    }

    #[tokio::test]
    async fn test_submit_records_pending_transaction() {
        let ledger = Arc::new(FakeLedger::with_nonce(5, 5));
        let submitter = submitter(ledger.clone(), test_policy(3, 3));

        let outcome = submitter.submit(plan(CallKind::Register), 1).await.unwrap();

        assert!(!outcome.confirmed);
        assert_eq!(submitter.pending_transaction().await, Some(outcome.tx_hash));
        assert_eq!(ledger.broadcasts(), 1);
    }

    #[tokio::test]
    async fn test_submit_drains_prior_transaction_first() {
        let ledger = Arc::new(FakeLedger::with_nonce(5, 5));
        let submitter = submitter(ledger.clone(), test_policy(3, 3));

        let first = submitter.submit(plan(CallKind::Register), 1).await.unwrap();

        // The second submission must confirm the first one before broadcasting.
        ledger.queue_receipt(mined());
        let second = submitter.submit(plan(CallKind::Remove), 2).await.unwrap();

        assert_ne!(first.tx_hash, second.tx_hash);
        assert_eq!(ledger.receipt_queries()[0], first.tx_hash);
        assert_eq!(submitter.pending_transaction().await, Some(second.tx_hash));
        assert_eq!(ledger.broadcasts(), 2);
    }

    #[tokio::test]
    async fn test_stuck_transaction_fails_fatally_and_clears_slot() {
        let ledger = Arc::new(FakeLedger::with_nonce(5, 5));
        let submitter = submitter(ledger.clone(), test_policy(3, 3));

        let first = submitter.submit(plan(CallKind::Register), 1).await.unwrap();

        // Receipt never shows up: the drain must give up after the ceiling.
        let err = submitter
            .submit(plan(CallKind::Remove), 2)
            .await
            .unwrap_err();
        assert!(matches!(err, ContractError::StuckTransaction(h) if h == first.tx_hash));

        // The slot is cleared so the next call does not re-drain the same stuck hash.
        assert_eq!(submitter.pending_transaction().await, None);
        let queries_after_failure = ledger.receipt_queries().len();

        let third = submitter.submit(plan(CallKind::Remove), 3).await.unwrap();
        assert_eq!(ledger.receipt_queries().len(), queries_after_failure);
        assert_eq!(submitter.pending_transaction().await, Some(third.tx_hash));
    }

    #[tokio::test]
    async fn test_nonce_desync_fails_fatally() {
        let ledger = Arc::new(FakeLedger::with_nonce(6, 5));
        let submitter = submitter(ledger.clone(), test_policy(3, 4));

        let err = submitter
            .submit(plan(CallKind::Register), 1)
            .await
            .unwrap_err();

        assert!(matches!(err, ContractError::NonceDesync(a) if a == submitter.sender()));
        assert_eq!(ledger.broadcasts(), 0);
    }

    #[tokio::test]
    async fn test_broadcast_error_recovered_by_receipt_lookup() {
        let ledger = Arc::new(FakeLedger::with_nonce(5, 5));
        ledger.queue_broadcast_error("connection reset");
        ledger.queue_receipt(mined());

        let submitter = submitter(ledger.clone(), test_policy(3, 3));
        let outcome = submitter.submit(plan(CallKind::Register), 1).await.unwrap();

        assert!(outcome.confirmed);
        assert_eq!(submitter.pending_transaction().await, Some(outcome.tx_hash));
        // The recheck must have looked up the hash computed before broadcast.
        assert_eq!(ledger.receipt_queries(), vec![outcome.tx_hash]);
    }

    #[tokio::test]
    async fn test_broadcast_error_without_receipt_propagates() {
        let ledger = Arc::new(FakeLedger::with_nonce(5, 5));
        ledger.queue_broadcast_error("nonce too low");

        let submitter = submitter(ledger.clone(), test_policy(3, 3));
        let err = submitter
            .submit(plan(CallKind::Register), 1)
            .await
            .unwrap_err();

        assert!(matches!(err, ContractError::Broadcast { .. }));
        // Nothing is recorded: the transaction never made it anywhere.
        assert_eq!(submitter.pending_transaction().await, None);
    }

    #[tokio::test]
    async fn test_wait_idle_drains_and_reconciles() {
        let ledger = Arc::new(FakeLedger::with_nonce(5, 5));
        let submitter = submitter(ledger.clone(), test_policy(3, 3));

        let outcome = submitter.submit(plan(CallKind::Register), 1).await.unwrap();

        ledger.queue_receipt(mined());
        submitter.wait_idle(2).await.unwrap();

        assert_eq!(submitter.pending_transaction().await, None);
        assert_eq!(ledger.receipt_queries()[0], outcome.tx_hash);
    }
}
