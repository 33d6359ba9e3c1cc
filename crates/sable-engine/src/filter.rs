//! WHERE-clause evaluation.
//!
//! Conditions form an AND conjunction. Comparisons are defined within a
//! type only - type-mismatched operands never match. `LIKE` is substring
//! containment, with no wildcard syntax.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use sable_common::{SableError, Value};

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `=`
    Eq,
    /// `!=`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
    /// `LIKE` (substring containment)
    Like,
}

impl CompareOp {
    /// Returns the SQL spelling of the operator.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::NotEq => "!=",
            CompareOp::Lt => "<",
            CompareOp::LtEq => "<=",
            CompareOp::Gt => ">",
            CompareOp::GtEq => ">=",
            CompareOp::Like => "LIKE",
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CompareOp {
    type Err = SableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "=" => Ok(CompareOp::Eq),
            "!=" | "<>" => Ok(CompareOp::NotEq),
            "<" => Ok(CompareOp::Lt),
            "<=" => Ok(CompareOp::LtEq),
            ">" => Ok(CompareOp::Gt),
            ">=" => Ok(CompareOp::GtEq),
            "LIKE" => Ok(CompareOp::Like),
            other => Err(SableError::semantic(format!("unknown operator '{other}'"))),
        }
    }
}

/// One predicate of an AND conjunction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhereCondition {
    /// Column the predicate tests.
    pub column: String,
    /// Comparison operator.
    pub op: CompareOp,
    /// Literal to compare against.
    pub value: Value,
}

impl WhereCondition {
    /// Creates a condition.
    #[must_use]
    pub fn new(column: impl Into<String>, op: CompareOp, value: Value) -> Self {
        Self {
            column: column.into(),
            op,
            value,
        }
    }
}

/// Evaluates one comparison.
#[must_use]
pub fn compare(cell: &Value, op: CompareOp, literal: &Value) -> bool {
    if op == CompareOp::Like {
        return match (cell, literal) {
            (Value::Str(haystack), Value::Str(needle)) => haystack.contains(needle.as_str()),
            _ => false,
        };
    }
    let Some(ordering) = cell.compare(literal) else {
        return false;
    };
    match op {
        CompareOp::Eq => ordering == Ordering::Equal,
        CompareOp::NotEq => ordering != Ordering::Equal,
        CompareOp::Lt => ordering == Ordering::Less,
        CompareOp::LtEq => ordering != Ordering::Greater,
        CompareOp::Gt => ordering == Ordering::Greater,
        CompareOp::GtEq => ordering != Ordering::Less,
        CompareOp::Like => false,
    }
}

/// Evaluates the conjunction of `conditions` against one row.
///
/// `columns` gives the row's column names in order; a condition naming an
/// unknown column does not match.
#[must_use]
pub fn matches_row(columns: &[String], row: &[Value], conditions: &[WhereCondition]) -> bool {
    conditions.iter().all(|condition| {
        let Some(idx) = columns.iter().position(|c| *c == condition.column) else {
            return false;
        };
        let Some(cell) = row.get(idx) else {
            return false;
        };
        compare(cell, condition.op, &condition.value)
    })
}
