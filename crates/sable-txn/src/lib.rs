//! # sable-txn
//!
//! Transaction management for SableDB:
//!
//! - [`lock`]: table-level shared/exclusive locks with sole-holder
//!   upgrade and fail-fast acquisition (no waiting, no deadlocks)
//! - [`snapshot`]: the committed/active sets a reader holds for the
//!   duration of a statement
//! - [`manager`]: transaction lifecycle - id and command-id assignment,
//!   state sets, WAL journaling of outcomes, and lock release on
//!   termination

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod lock;
pub mod manager;
pub mod snapshot;

pub use lock::{LockManager, LockMode};
pub use manager::TransactionManager;
pub use snapshot::Snapshot;
