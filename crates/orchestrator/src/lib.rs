//! Registration orchestration.
//!
//! Ties the operator registry, the key-splitting daemon, and the network contract together into
//! the register/remove pipelines. The ordering inside a pipeline is deliberate: all local and
//! read-only work happens before the submitter is asked to drain, and the cluster snapshot is
//! resolved only after the drain so it cannot go stale behind an in-flight transaction.

pub mod errors;
pub mod keysplit;
pub mod registrar;
pub mod resolver;

pub use errors::RegistrarError;
pub use keysplit::{KeySplitter, RemoteKeySplitter, ShareBundle};
pub use registrar::{Registrar, RegistrarConfig};
pub use resolver::{funding_amount, resolve_cluster};
