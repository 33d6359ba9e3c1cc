//! The logical-plan interpreter.
//!
//! Walks a [`Plan`] tree, acquiring table locks through the transaction
//! manager - shared for scans, exclusive for every mutation and DDL -
//! and drives the storage engine. Lock failures surface as
//! `LockConflict`; the engine facade converts any error into rollback of
//! the enclosing transaction.

use sable_common::{CommandId, SableError, SableResult, TxId, Value};
use sable_txn::{LockMode, Snapshot, TransactionManager};

use crate::catalog;
use crate::filter::{self, CompareOp, WhereCondition};
use crate::heap::StorageEngine;
use crate::plan::Plan;
use crate::result::ResultSet;

/// Interprets plan trees against the storage engine.
pub struct Executor<'a> {
    storage: &'a StorageEngine,
    txns: &'a TransactionManager,
}

impl<'a> Executor<'a> {
    /// Creates an executor over the given storage and transaction
    /// manager.
    #[must_use]
    pub fn new(storage: &'a StorageEngine, txns: &'a TransactionManager) -> Self {
        Self { storage, txns }
    }

    /// Evaluates `plan` as one command of `tx_id`.
    pub fn execute(
        &self,
        plan: &Plan,
        tx_id: TxId,
        cid: CommandId,
        snapshot: &Snapshot,
    ) -> SableResult<ResultSet> {
        match plan {
            Plan::SeqScan { table } => {
                self.txns.lock_table(tx_id, table, LockMode::Shared)?;
                self.scan(table, tx_id, cid, snapshot)
            }
            Plan::Filter { input, conditions } => {
                self.execute_filter(input, conditions, tx_id, cid, snapshot)
            }
            Plan::Projection { input, columns } => {
                let child = self.execute(input, tx_id, cid, snapshot)?;
                project(child, columns)
            }
            Plan::Insert { table, rows } => {
                let held_before = self.txns.lock_manager().holds(tx_id, table).is_some();
                self.txns.lock_table(tx_id, table, LockMode::Exclusive)?;
                for row in rows {
                    self.storage.insert_record(table, row.clone(), tx_id, cid)?;
                }
                // A pure insert cannot conflict with anyone's snapshot,
                // so a lock taken just for this statement is released at
                // statement end rather than held to commit. Readers in
                // other transactions stay unblocked while the inserting
                // transaction remains open.
                if !held_before {
                    self.txns.unlock_table(tx_id, table);
                }
                Ok(ResultSet::affected(rows.len()))
            }
            Plan::Update {
                table,
                set_clause,
                conditions,
            } => {
                self.txns.lock_table(tx_id, table, LockMode::Exclusive)?;
                let count = self.storage.update_records(
                    table, conditions, set_clause, tx_id, cid, snapshot, self.txns,
                )?;
                Ok(ResultSet::affected(count))
            }
            Plan::Delete { table, conditions } => {
                self.txns.lock_table(tx_id, table, LockMode::Exclusive)?;
                let count = self
                    .storage
                    .delete_records(table, conditions, tx_id, cid, snapshot, self.txns)?;
                Ok(ResultSet::affected(count))
            }
            Plan::CreateTable { table, columns } => {
                self.lock_exclusive(tx_id, &[table, catalog::SYS_TABLES, catalog::SYS_COLUMNS])?;
                self.storage.create_table(table, columns, tx_id, cid)?;
                Ok(ResultSet::empty())
            }
            Plan::CreateIndex {
                index,
                table,
                column,
            } => {
                self.lock_exclusive(tx_id, &[table, catalog::SYS_INDEXES])?;
                self.storage.create_index(
                    index.as_deref(),
                    table,
                    column,
                    tx_id,
                    cid,
                    snapshot,
                    self.txns,
                )?;
                Ok(ResultSet::empty())
            }
            Plan::DropTable { table } => {
                self.lock_exclusive(
                    tx_id,
                    &[
                        table,
                        catalog::SYS_TABLES,
                        catalog::SYS_COLUMNS,
                        catalog::SYS_INDEXES,
                    ],
                )?;
                self.storage
                    .drop_table(table, tx_id, cid, snapshot, self.txns)?;
                Ok(ResultSet::empty())
            }
            Plan::DropIndex { index } => {
                let table = self
                    .storage
                    .index_table(index)
                    .ok_or_else(|| SableError::IndexNotFound(index.clone()))?;
                self.lock_exclusive(tx_id, &[&table, catalog::SYS_INDEXES])?;
                self.storage
                    .drop_index(index, tx_id, cid, snapshot, self.txns)?;
                Ok(ResultSet::empty())
            }
        }
    }

    fn lock_exclusive(&self, tx_id: TxId, tables: &[&str]) -> SableResult<()> {
        for table in tables {
            self.txns.lock_table(tx_id, table, LockMode::Exclusive)?;
        }
        Ok(())
    }

    fn scan(
        &self,
        table: &str,
        tx_id: TxId,
        cid: CommandId,
        snapshot: &Snapshot,
    ) -> SableResult<ResultSet> {
        let schema = self.storage.catalog().get(table)?;
        let rows = self
            .storage
            .scan_table(table, tx_id, cid, snapshot, self.txns)?
            .into_iter()
            .map(|record| record.values)
            .collect();
        Ok(ResultSet::with_rows(schema.column_names(), rows))
    }

    /// A filter directly over a scan probes an index when some equality
    /// condition targets an indexed column; all conditions are then
    /// re-applied to the candidates.
    fn execute_filter(
        &self,
        input: &Plan,
        conditions: &[WhereCondition],
        tx_id: TxId,
        cid: CommandId,
        snapshot: &Snapshot,
    ) -> SableResult<ResultSet> {
        if let Plan::SeqScan { table } = input {
            self.txns.lock_table(tx_id, table, LockMode::Shared)?;

            let probe = conditions.iter().find(|c| {
                c.op == CompareOp::Eq && self.storage.index_on(table, &c.column).is_some()
            });
            if let Some(condition) = probe {
                let schema = self.storage.catalog().get(table)?;
                let columns = schema.column_names();
                let rows: Vec<Vec<Value>> = self
                    .storage
                    .index_scan(
                        table,
                        &condition.column,
                        &condition.value,
                        tx_id,
                        cid,
                        snapshot,
                        self.txns,
                    )?
                    .into_iter()
                    .map(|record| record.values)
                    .filter(|row| filter::matches_row(&columns, row, conditions))
                    .collect();
                return Ok(ResultSet::with_rows(columns, rows));
            }

            let child = self.scan(table, tx_id, cid, snapshot)?;
            return Ok(apply_conditions(child, conditions));
        }

        let child = self.execute(input, tx_id, cid, snapshot)?;
        Ok(apply_conditions(child, conditions))
    }
}

fn apply_conditions(mut child: ResultSet, conditions: &[WhereCondition]) -> ResultSet {
    let columns = child.columns.clone();
    child
        .rows
        .retain(|row| filter::matches_row(&columns, row, conditions));
    child
}

/// Applies a projection list to a child result. `["*"]` passes the child
/// through unchanged; unknown columns are semantic errors.
fn project(child: ResultSet, columns: &[String]) -> SableResult<ResultSet> {
    if columns.len() == 1 && columns[0] == "*" {
        return Ok(child);
    }
    let mut indices = Vec::with_capacity(columns.len());
    for name in columns {
        let idx = child
            .columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| {
                SableError::semantic(format!("unknown column '{name}' in projection"))
            })?;
        indices.push(idx);
    }
    let rows = child
        .rows
        .into_iter()
        .map(|row| {
            indices
                .iter()
                .map(|&i| row.get(i).cloned().unwrap_or(Value::Null))
                .collect()
        })
        .collect();
    Ok(ResultSet::with_rows(columns.to_vec(), rows))
}
