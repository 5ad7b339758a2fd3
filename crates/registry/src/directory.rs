//! Cached view of the configured operator set.
//!
//! Operator fees and share-encryption keys change rarely, so they are fetched on a slow schedule
//! and served from memory. A failed refresh keeps the previous snapshot in place.

use std::{
    sync::{Arc, RwLock},
    time::Duration,
};

use alloy::primitives::Address;
use async_trait::async_trait;
use dvt_registrar_primitives::{ClusterSnapshot, OperatorIdx, OperatorInfo};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    client::RestClient,
    errors::RegistryError,
    types::{ClusterRecord, OperatorRecord},
};

/// Read access to operator metadata and owner cluster listings.
#[async_trait]
pub trait OperatorRegistry: Send + Sync {
    /// The current snapshot of the configured operators.
    fn operators(&self) -> Vec<OperatorInfo>;

    /// Every cluster the given account owns.
    async fn clusters_by_owner(
        &self,
        owner: Address,
    ) -> Result<Vec<ClusterSnapshot>, RegistryError>;
}

/// The fetch surface the directory needs from the registry.
///
/// Split out from [`RestClient`] so the directory's refresh semantics can be exercised against a
/// scripted fake.
#[async_trait]
pub trait OperatorFetch: Send + Sync {
    /// Fetches a single operator record by id.
    async fn operator(&self, id: OperatorIdx) -> Result<OperatorRecord, RegistryError>;

    /// Fetches every cluster owned by the given account.
    async fn clusters_by_owner(&self, owner: Address)
        -> Result<Vec<ClusterRecord>, RegistryError>;
}

#[async_trait]
impl OperatorFetch for RestClient {
    async fn operator(&self, id: OperatorIdx) -> Result<OperatorRecord, RegistryError> {
        RestClient::operator(self, id).await
    }

    async fn clusters_by_owner(
        &self,
        owner: Address,
    ) -> Result<Vec<ClusterRecord>, RegistryError> {
        RestClient::clusters_by_owner(self, owner).await
    }
}

/// In-memory operator snapshot over the registry REST API.
#[derive(Debug)]
pub struct OperatorDirectory<C = RestClient> {
    client: C,
    operator_ids: Vec<OperatorIdx>,
    operators: RwLock<Vec<OperatorInfo>>,
}

impl<C: OperatorFetch> OperatorDirectory<C> {
    /// Creates a directory for the configured operator ids. The snapshot is empty until the
    /// first [`refresh`](Self::refresh).
    pub fn new(client: C, operator_ids: Vec<OperatorIdx>) -> Self {
        Self {
            client,
            operator_ids,
            operators: RwLock::new(Vec::new()),
        }
    }

    /// Re-fetches every configured operator and swaps in the new snapshot.
    ///
    /// All-or-nothing: if any fetch fails the previous snapshot stays in place.
    pub async fn refresh(&self) -> Result<(), RegistryError> {
        let mut fresh = Vec::with_capacity(self.operator_ids.len());
        for &id in &self.operator_ids {
            let record = self.client.operator(id).await?;
            fresh.push(OperatorInfo::try_from(record)?);
        }

        info!(operators = ?self.operator_ids, "operator snapshot refreshed");
        *self.operators.write().expect("operators lock poisoned") = fresh;

        Ok(())
    }
}

#[async_trait]
impl<C: OperatorFetch> OperatorRegistry for OperatorDirectory<C> {
    fn operators(&self) -> Vec<OperatorInfo> {
        self.operators.read().expect("operators lock poisoned").clone()
    }

    async fn clusters_by_owner(
        &self,
        owner: Address,
    ) -> Result<Vec<ClusterSnapshot>, RegistryError> {
        self.client
            .clusters_by_owner(owner)
            .await?
            .into_iter()
            .map(ClusterSnapshot::try_from)
            .collect()
    }
}

/// Spawns the periodic operator refresh.
///
/// The bootstrap sequence does the initial refresh before the service starts serving, so the
/// first tick here is consumed without work. Refresh failures are logged and the stale snapshot
/// keeps serving.
pub fn spawn_operator_refresh<C: OperatorFetch + 'static>(
    directory: Arc<OperatorDirectory<C>>,
    period: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("operator refresh task shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(err) = directory.refresh().await {
                        warn!(%err, "operator refresh failed, keeping previous snapshot");
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;

    /// Serves well-formed operator records until told to fail.
    #[derive(Debug, Default)]
    struct FakeFetch {
        unavailable: AtomicBool,
    }

    #[async_trait]
    impl OperatorFetch for FakeFetch {
        async fn operator(&self, id: OperatorIdx) -> Result<OperatorRecord, RegistryError> {
            if self.unavailable.load(Ordering::SeqCst) {
                return Err(RegistryError::Status {
                    status: 503,
                    body: "unavailable".to_owned(),
                });
            }

            Ok(OperatorRecord {
                id,
                fee: "100".to_owned(),
                public_key: format!("key-{id}"),
            })
        }

        async fn clusters_by_owner(
            &self,
            _owner: Address,
        ) -> Result<Vec<ClusterRecord>, RegistryError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_refresh_installs_operator_snapshot() {
        let directory = OperatorDirectory::new(FakeFetch::default(), vec![1, 2, 3]);
        assert!(directory.operators().is_empty());

        directory.refresh().await.unwrap();

        let ids: Vec<_> = directory.operators().iter().map(|op| op.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_snapshot() {
        let fetch = FakeFetch::default();
        let directory = OperatorDirectory::new(fetch, vec![1, 2]);
        directory.refresh().await.unwrap();

        directory.client.unavailable.store(true, Ordering::SeqCst);
        let err = directory.refresh().await.unwrap_err();

        assert!(matches!(err, RegistryError::Status { status: 503, .. }));
        assert_eq!(directory.operators().len(), 2, "stale snapshot must keep serving");
    }
}
