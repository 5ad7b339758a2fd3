//! Thin REST client over the operator registry.

use alloy::primitives::Address;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::{
    errors::RegistryError,
    types::{ClusterOwnerResponse, ClusterRecord, OperatorRecord},
};

/// Page size used when draining cluster listings.
const CLUSTERS_PER_PAGE: u64 = 100;

/// REST client bound to one registry deployment and one network.
#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    network: String,
}

impl RestClient {
    /// Creates a client for the given registry base URL and network name (e.g. `mainnet`).
    pub fn new(base_url: &str, network: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: normalize_base_url(base_url),
            network: network.to_owned(),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, RegistryError> {
        let url = format!("{}v4/{}/{}", self.base_url, self.network, endpoint);
        debug!(%url, "registry request");

        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RegistryError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        Ok(response.json().await?)
    }

    /// Probes the registry's health endpoint.
    pub async fn health(&self) -> Result<(), RegistryError> {
        self.get_json::<serde_json::Value>("health").await.map(|_| ())
    }

    /// Fetches a single operator record by id.
    pub async fn operator(&self, id: u32) -> Result<OperatorRecord, RegistryError> {
        self.get_json(&format!("operators/{id}")).await
    }

    /// Fetches one page of the owner's cluster listing.
    async fn clusters_page(
        &self,
        owner: Address,
        page: u64,
    ) -> Result<ClusterOwnerResponse, RegistryError> {
        self.get_json(&format!(
            "clusters/owner/{owner}?page={page}&perPage={CLUSTERS_PER_PAGE}"
        ))
        .await
    }

    /// Fetches every cluster owned by the given account, draining all pages.
    pub async fn clusters_by_owner(
        &self,
        owner: Address,
    ) -> Result<Vec<ClusterRecord>, RegistryError> {
        drain_pages(|page| self.clusters_page(owner, page)).await
    }
}

/// Prepends `https://` when no scheme is given and guarantees a trailing slash.
fn normalize_base_url(url: &str) -> String {
    let mut normalized = if url.starts_with("http://") || url.starts_with("https://") {
        url.to_owned()
    } else {
        format!("https://{url}")
    };

    if !normalized.ends_with('/') {
        normalized.push('/');
    }

    normalized
}

/// Drains a paginated listing by fetching pages until the envelope reports the last one.
///
/// An empty listing reports zero pages; the first fetch still happens so transport errors
/// surface.
async fn drain_pages<F, Fut>(mut fetch_page: F) -> Result<Vec<ClusterRecord>, RegistryError>
where
    F: FnMut(u64) -> Fut,
    Fut: std::future::Future<Output = Result<ClusterOwnerResponse, RegistryError>>,
{
    let mut records = Vec::new();
    let mut page = 1;

    loop {
        let response = fetch_page(page).await?;
        records.extend(response.clusters);

        if response.pagination.page >= response.pagination.pages {
            break;
        }
        page += 1;
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};

    use super::*;
    use crate::types::Pagination;

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(normalize_base_url("api.example.io"), "https://api.example.io/");
        assert_eq!(normalize_base_url("api.example.io/"), "https://api.example.io/");
        assert_eq!(
            normalize_base_url("http://localhost:3000"),
            "http://localhost:3000/"
        );
        assert_eq!(
            normalize_base_url("https://api.example.io/"),
            "https://api.example.io/"
        );
    }

    fn page_of(page: u64, pages: u64, count: usize) -> ClusterOwnerResponse {
        let record = ClusterRecord {
            validator_count: 1,
            network_fee_index: 0,
            index: 0,
            balance: "0".to_owned(),
            active: true,
            operators: vec![1, 2, 3, 4],
        };

        ClusterOwnerResponse {
            pagination: Pagination { page, pages },
            clusters: vec![record; count],
        }
    }

    #[tokio::test]
    async fn test_drain_pages_collects_every_page() {
        let calls = AtomicU64::new(0);

        let records = drain_pages(|page| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Ok(page_of(page, 3, 2)) }
        })
        .await
        .unwrap();

        assert_eq!(records.len(), 6);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_drain_pages_handles_empty_listing() {
        let records = drain_pages(|page| async move { Ok(page_of(page, 0, 0)) })
            .await
            .unwrap();

        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_drain_pages_propagates_mid_drain_errors() {
        let result = drain_pages(|page| async move {
            if page == 1 {
                Ok(page_of(1, 2, 2))
            } else {
                Err(RegistryError::Status {
                    status: 503,
                    body: "unavailable".to_owned(),
                })
            }
        })
        .await;

        assert!(matches!(result, Err(RegistryError::Status { status: 503, .. })));
    }
}
