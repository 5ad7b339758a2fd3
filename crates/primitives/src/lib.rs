//! This crate contains general types, traits and pure functions that need to be shared across
//! multiple crates.
//!
//! It lies at the bottom of the crate-hierarchy in this workspace i.e., it does not depend on any
//! other crate in this workspace.

pub mod cluster;
pub mod fee;
pub mod operator;

pub use cluster::{ClusterSnapshot, ClusterState};
pub use fee::FeeParameters;
pub use operator::{total_operator_fee, OperatorIdx, OperatorInfo};
