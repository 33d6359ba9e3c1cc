//! Logical plan trees.
//!
//! Plans arrive from an external planner; the engine only interprets
//! them. Each operator variant carries exactly the fields it needs.

use std::fmt;

use sable_common::{Column, Value};

use crate::filter::WhereCondition;

/// A logical plan node.
#[derive(Debug, Clone, PartialEq)]
pub enum Plan {
    /// Full scan of a table.
    SeqScan {
        /// Table to scan.
        table: String,
    },
    /// AND-conjunction filter over a child plan.
    Filter {
        /// Child plan producing candidate rows.
        input: Box<Plan>,
        /// Conditions, all of which must match.
        conditions: Vec<WhereCondition>,
    },
    /// Column projection over a child plan. `["*"]` passes the child's
    /// columns through unchanged.
    Projection {
        /// Child plan.
        input: Box<Plan>,
        /// Output column names, in order.
        columns: Vec<String>,
    },
    /// Row insertion; one entry per row.
    Insert {
        /// Target table.
        table: String,
        /// Rows to insert, each in schema order.
        rows: Vec<Vec<Value>>,
    },
    /// In-place update producing new record versions.
    Update {
        /// Target table.
        table: String,
        /// `column -> value` assignments.
        set_clause: Vec<(String, Value)>,
        /// Row selection.
        conditions: Vec<WhereCondition>,
    },
    /// Logical deletion.
    Delete {
        /// Target table.
        table: String,
        /// Row selection.
        conditions: Vec<WhereCondition>,
    },
    /// Table creation.
    CreateTable {
        /// New table name.
        table: String,
        /// Column definitions.
        columns: Vec<Column>,
    },
    /// Index creation over one column.
    CreateIndex {
        /// Index name; defaults to `<table>_<column>_idx` when absent.
        index: Option<String>,
        /// Indexed table.
        table: String,
        /// Indexed column.
        column: String,
    },
    /// Table removal.
    DropTable {
        /// Table to drop.
        table: String,
    },
    /// Index removal.
    DropIndex {
        /// Index to drop.
        index: String,
    },
}

impl Plan {
    /// Returns an indented, human-readable rendering of the plan tree.
    #[must_use]
    pub fn display(&self) -> String {
        let mut out = String::new();
        self.format_node(0, &mut out);
        out
    }

    fn format_node(&self, indent: usize, out: &mut String) {
        let prefix = "  ".repeat(indent);
        match self {
            Plan::SeqScan { table } => out.push_str(&format!("{prefix}SeqScan: {table}\n")),
            Plan::Filter { input, conditions } => {
                let conds: Vec<String> = conditions
                    .iter()
                    .map(|c| format!("{} {} {}", c.column, c.op, c.value))
                    .collect();
                out.push_str(&format!("{prefix}Filter: {}\n", conds.join(" AND ")));
                input.format_node(indent + 1, out);
            }
            Plan::Projection { input, columns } => {
                out.push_str(&format!("{prefix}Projection: {}\n", columns.join(", ")));
                input.format_node(indent + 1, out);
            }
            Plan::Insert { table, rows } => {
                out.push_str(&format!("{prefix}Insert: {table} ({} rows)\n", rows.len()));
            }
            Plan::Update { table, .. } => out.push_str(&format!("{prefix}Update: {table}\n")),
            Plan::Delete { table, .. } => out.push_str(&format!("{prefix}Delete: {table}\n")),
            Plan::CreateTable { table, columns } => {
                out.push_str(&format!(
                    "{prefix}CreateTable: {table} ({} columns)\n",
                    columns.len()
                ));
            }
            Plan::CreateIndex { table, column, .. } => {
                out.push_str(&format!("{prefix}CreateIndex: {table}.{column}\n"));
            }
            Plan::DropTable { table } => out.push_str(&format!("{prefix}DropTable: {table}\n")),
            Plan::DropIndex { index } => out.push_str(&format!("{prefix}DropIndex: {index}\n")),
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display().trim_end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::CompareOp;

    #[test]
    fn test_display_tree() {
        let plan = Plan::Projection {
            input: Box::new(Plan::Filter {
                input: Box::new(Plan::SeqScan {
                    table: "users".into(),
                }),
                conditions: vec![WhereCondition::new("id", CompareOp::Eq, Value::Int(1))],
            }),
            columns: vec!["name".into()],
        };
        let rendered = plan.display();
        assert!(rendered.contains("Projection: name"));
        assert!(rendered.contains("Filter: id = 1"));
        assert!(rendered.contains("SeqScan: users"));
    }
}
