//! Statement results.

use sable_common::Value;

/// The result of executing one plan.
///
/// Read plans fill `columns` and `rows`; DDL and DML plans return an
/// empty row set and report `rows_affected`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    /// Output column names, in order.
    pub columns: Vec<String>,
    /// Result rows.
    pub rows: Vec<Vec<Value>>,
    /// Rows inserted, updated, or deleted.
    pub rows_affected: usize,
}

impl ResultSet {
    /// An empty result (successful DDL).
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// A read result.
    #[must_use]
    pub fn with_rows(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns,
            rows,
            rows_affected: 0,
        }
    }

    /// A DML result reporting a row count.
    #[must_use]
    pub fn affected(count: usize) -> Self {
        Self {
            rows_affected: count,
            ..Self::default()
        }
    }

    /// Returns true if the result carries no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
