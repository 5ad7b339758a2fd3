//! Client for the operator registry REST API.
//!
//! The registry serves operator metadata and cluster records by owner. This crate wraps the REST
//! transport, fully drains paginated responses, and maintains a periodically refreshed operator
//! snapshot that keeps serving stale data when the registry is unreachable.

pub mod client;
pub mod directory;
pub mod errors;
pub mod types;

pub use client::RestClient;
pub use directory::{spawn_operator_refresh, OperatorDirectory, OperatorFetch, OperatorRegistry};
pub use errors::RegistryError;
