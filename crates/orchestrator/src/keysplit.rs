//! Key splitting over the local splitter daemon.
//!
//! BLS key material never enters this process: the encrypted keystore is handed to a co-located
//! daemon that decrypts it, splits the key into operator shares, and returns only public outputs
//! (the validator public key and the encrypted share payload).

use async_trait::async_trait;
use dvt_registrar_primitives::OperatorInfo;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Everything that can go wrong while talking to the splitter daemon.
#[derive(Debug, Error)]
pub enum KeySplitError {
    /// The HTTP transport failed.
    #[error("splitter request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The daemon rejected the request, typically a wrong keystore password.
    #[error("splitter rejected the request with status {status}: {body}")]
    Rejected {
        /// The HTTP status code.
        status: u16,
        /// The response body, for diagnostics.
        body: String,
    },
}

/// Public outputs of one share-splitting run.
#[derive(Debug, Clone, Deserialize)]
pub struct ShareBundle {
    /// The validator's BLS public key, 0x-prefixed hex.
    pub public_key: String,

    /// The encrypted share payload to submit on-chain, 0x-prefixed hex.
    pub share_data: String,
}

/// Splits a validator key into operator shares.
#[async_trait]
pub trait KeySplitter: Send + Sync {
    /// Decrypts the keystore and returns the validator's public key without splitting.
    async fn extract_public_key(
        &self,
        keystore: &serde_json::Value,
        password: &str,
    ) -> Result<String, KeySplitError>;

    /// Decrypts the keystore and builds encrypted shares for the given operators.
    async fn build_shares(
        &self,
        keystore: &serde_json::Value,
        password: &str,
        operators: &[OperatorInfo],
    ) -> Result<ShareBundle, KeySplitError>;
}

#[derive(Serialize)]
struct KeystoreRequest<'a> {
    keystore: &'a serde_json::Value,
    password: &'a str,
}

#[derive(Serialize)]
struct SharesRequest<'a> {
    keystore: &'a serde_json::Value,
    password: &'a str,
    operators: Vec<OperatorRef<'a>>,
}

#[derive(Serialize)]
struct OperatorRef<'a> {
    id: u32,
    public_key: &'a str,
}

#[derive(Deserialize)]
struct PublicKeyResponse {
    public_key: String,
}

/// [`KeySplitter`] over the splitter daemon's HTTP API.
#[derive(Debug, Clone)]
pub struct RemoteKeySplitter {
    http: reqwest::Client,
    base_url: String,
}

impl RemoteKeySplitter {
    /// Creates a splitter client for the daemon at the given base URL.
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    async fn post_json<B: Serialize, T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T, KeySplitError> {
        let url = format!("{}/{endpoint}", self.base_url);
        debug!(%url, "splitter request");

        let response = self.http.post(&url).json(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(KeySplitError::Rejected {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl KeySplitter for RemoteKeySplitter {
    async fn extract_public_key(
        &self,
        keystore: &serde_json::Value,
        password: &str,
    ) -> Result<String, KeySplitError> {
        let response: PublicKeyResponse = self
            .post_json("keystore/public-key", &KeystoreRequest { keystore, password })
            .await?;

        Ok(response.public_key)
    }

    async fn build_shares(
        &self,
        keystore: &serde_json::Value,
        password: &str,
        operators: &[OperatorInfo],
    ) -> Result<ShareBundle, KeySplitError> {
        let request = SharesRequest {
            keystore,
            password,
            operators: operators
                .iter()
                .map(|op| OperatorRef {
                    id: op.id,
                    public_key: &op.public_key,
                })
                .collect(),
        };

        self.post_json("keystore/shares", &request).await
    }
}
