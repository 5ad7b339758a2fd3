//! The ledger RPC seam.
//!
//! The submission engine and the contract client talk to the node through the [`Ledger`] trait so
//! that the drain/reconcile/broadcast protocol can be exercised against a scripted fake in tests.

use alloy::{
    primitives::{Address, Bytes, B256},
    providers::{Provider, RootProvider},
    rpc::types::TransactionRequest,
};
use async_trait::async_trait;

use crate::errors::LedgerError;

/// Which view of an account's transaction count to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonceView {
    /// Includes transactions sitting in the node's mempool.
    Pending,
    /// Only transactions included in the latest block.
    Latest,
}

/// The subset of a transaction receipt the engine cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiptInfo {
    /// Whether the transaction executed successfully.
    pub success: bool,

    /// The block the transaction was included in, if known.
    pub block_number: Option<u64>,
}

/// Read and write operations against the ledger RPC node.
#[async_trait]
pub trait Ledger: std::fmt::Debug + Send + Sync {
    /// Looks up the receipt for a transaction hash, if the transaction has been mined.
    async fn receipt(&self, tx_hash: B256) -> Result<Option<ReceiptInfo>, LedgerError>;

    /// Reads an account's transaction count in the given view.
    async fn transaction_count(
        &self,
        address: Address,
        view: NonceView,
    ) -> Result<u64, LedgerError>;

    /// Estimates the gas required to execute the given transaction.
    async fn estimate_gas(&self, tx: &TransactionRequest) -> Result<u64, LedgerError>;

    /// Reads the node's current gas price.
    async fn gas_price(&self) -> Result<u128, LedgerError>;

    /// Submits a raw signed transaction to the node.
    async fn broadcast(&self, raw_tx: &[u8]) -> Result<(), LedgerError>;

    /// Executes a read-only contract call.
    async fn call(&self, tx: &TransactionRequest) -> Result<Bytes, LedgerError>;
}

/// Production [`Ledger`] backed by an alloy HTTP provider.
#[derive(Debug, Clone)]
pub struct AlloyLedger {
    provider: RootProvider,
}

impl AlloyLedger {
    /// Wraps the given provider.
    pub const fn new(provider: RootProvider) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Ledger for AlloyLedger {
    async fn receipt(&self, tx_hash: B256) -> Result<Option<ReceiptInfo>, LedgerError> {
        let receipt = self.provider.get_transaction_receipt(tx_hash).await?;

        Ok(receipt.map(|r| ReceiptInfo {
            success: r.status(),
            block_number: r.block_number,
        }))
    }

    async fn transaction_count(
        &self,
        address: Address,
        view: NonceView,
    ) -> Result<u64, LedgerError> {
        let count = self.provider.get_transaction_count(address);

        let count = match view {
            NonceView::Pending => count.pending().await?,
            NonceView::Latest => count.latest().await?,
        };

        Ok(count)
    }

    async fn estimate_gas(&self, tx: &TransactionRequest) -> Result<u64, LedgerError> {
        Ok(self.provider.estimate_gas(tx.clone()).await?)
    }

    async fn gas_price(&self) -> Result<u128, LedgerError> {
        Ok(self.provider.get_gas_price().await?)
    }

    async fn broadcast(&self, raw_tx: &[u8]) -> Result<(), LedgerError> {
        // The submitter tracks inclusion through its own receipt polling; the pending-transaction
        // watcher the provider hands back is not used.
        let _pending = self.provider.send_raw_transaction(raw_tx).await?;

        Ok(())
    }

    async fn call(&self, tx: &TransactionRequest) -> Result<Bytes, LedgerError> {
        Ok(self.provider.call(tx.clone()).await?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_alloy_ledger_builds_as_trait_object() {
        let provider = RootProvider::new_http("http://localhost:1".parse().unwrap());
        let ledger: Arc<dyn Ledger> = Arc::new(AlloyLedger::new(provider));

        assert!(format!("{ledger:?}").contains("AlloyLedger"));
    }
}
