//! Error handling for SableDB.
//!
//! Provides the unified [`SableError`] type used across all components.
//! Variants follow the semantic error kinds of the engine contract:
//! not-found, already-exists, semantic, lock-conflict, corruption, I/O,
//! and transaction-state errors.

use thiserror::Error;

use crate::types::TxId;

/// The main error type for SableDB operations.
#[derive(Debug, Error)]
pub enum SableError {
    /// Table not present in the catalog.
    #[error("table '{0}' not found")]
    TableNotFound(String),

    /// Column not present in its table.
    #[error("column '{0}' not found")]
    ColumnNotFound(String),

    /// Index not registered.
    #[error("index '{0}' not found")]
    IndexNotFound(String),

    /// Duplicate table creation.
    #[error("table '{0}' already exists")]
    TableExists(String),

    /// Duplicate index creation.
    #[error("index '{0}' already exists")]
    IndexExists(String),

    /// Column/type mismatch, NOT NULL violation, arity mismatch, or an
    /// unknown operator.
    #[error("semantic error: {0}")]
    Semantic(String),

    /// A table lock could not be acquired.
    #[error("transaction {tx} could not lock table '{table}'")]
    LockConflict {
        /// The transaction whose request failed.
        tx: TxId,
        /// The contested table.
        table: String,
    },

    /// A page or record failed to decode.
    #[error("corrupt page: {0}")]
    CorruptPage(String),

    /// A WAL entry failed to parse.
    #[error("corrupt WAL: {0}")]
    CorruptWal(String),

    /// Underlying file I/O failure.
    #[error("I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Operation incompatible with the current transaction state, e.g.
    /// COMMIT without BEGIN.
    #[error("transaction state error: {0}")]
    TxState(String),

    /// Internal invariant violation - this indicates a bug.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SableError {
    /// Creates a semantic error.
    #[must_use]
    pub fn semantic(message: impl Into<String>) -> Self {
        Self::Semantic(message.into())
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Creates a transaction-state error.
    #[must_use]
    pub fn tx_state(message: impl Into<String>) -> Self {
        Self::TxState(message.into())
    }

    /// Returns true if this error is a lock conflict.
    #[must_use]
    pub fn is_lock_conflict(&self) -> bool {
        matches!(self, Self::LockConflict { .. })
    }
}

/// Result type alias for SableDB operations.
pub type SableResult<T> = std::result::Result<T, SableError>;
