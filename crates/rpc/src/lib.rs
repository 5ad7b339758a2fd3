//! Defines the RPC interface of the registrar service.

pub mod traits;
pub mod types;
