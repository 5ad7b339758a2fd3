//! Error types for registry access.

use thiserror::Error;

/// Everything that can go wrong while talking to the operator registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The HTTP transport failed.
    #[error("registry request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The registry answered with a non-success status.
    #[error("registry request failed with status {status}: {body}")]
    Status {
        /// The HTTP status code.
        status: u16,
        /// The response body, for diagnostics.
        body: String,
    },

    /// A record came back in a shape this service cannot use.
    #[error("malformed registry record: {0}")]
    MalformedRecord(String),
}
