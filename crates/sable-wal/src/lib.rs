//! # sable-wal
//!
//! Write-ahead logging for SableDB.
//!
//! The log is a single line-oriented text file: one entry per line,
//! `<tx_id> <OP> <payload...>`. Entries carry enough payload for
//! idempotent redo - inserts record their tid and full record bytes,
//! update/delete marks record the tid and stamped `xmax`. A transaction
//! is durable once its COMMIT entry has been appended and synced.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod log;
pub mod record;

pub use log::Wal;
pub use record::{WalEntry, WalRecord};
