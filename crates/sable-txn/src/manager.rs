//! Transaction lifecycle management.
//!
//! The manager owns the monotone transaction-id counter, per-transaction
//! command ids, the active/committed/aborted sets, and the list of table
//! locks each transaction holds. Commit and rollback journal their
//! outcome to the WAL; the COMMIT entry is synced *before* any lock the
//! transaction held is released, so a scan that subsequently acquires a
//! lock on the same table observes the commit.
//!
//! ```text
//! ┌───────┐ start_transaction() ┌────────┐
//! │ Start │────────────────────▶│ Active │
//! └───────┘                     └────────┘
//!                                    │
//!                          ┌─────────┴─────────┐
//!                      commit()            rollback()
//!                          │                    │
//!                          ▼                    ▼
//!                   ┌───────────┐        ┌──────────┐
//!                   │ Committed │        │ Aborted  │
//!                   └───────────┘        └──────────┘
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;

use sable_common::{CommandId, SableError, SableResult, TxId};
use sable_wal::{record::WalEntry, Wal};

use crate::lock::{LockManager, LockMode};
use crate::snapshot::Snapshot;

struct TxState {
    next_tx_id: TxId,
    horizon: TxId,
    active: HashSet<TxId>,
    // Committed tx -> approximate commit sequence (the next_tx_id value
    // at commit time).
    committed: HashMap<TxId, u32>,
    aborted: HashSet<TxId>,
    cids: HashMap<TxId, CommandId>,
    held_locks: HashMap<TxId, Vec<String>>,
}

/// Coordinates transaction lifecycle, snapshots, and lock bookkeeping.
pub struct TransactionManager {
    wal: Arc<Wal>,
    locks: Arc<LockManager>,
    state: Mutex<TxState>,
}

impl TransactionManager {
    /// Creates a manager whose id assignment resumes from `horizon`.
    ///
    /// The horizon is the recovery boundary: every id below it belongs to
    /// a previous engine incarnation and is treated as committed (see
    /// [`Snapshot`]).
    #[must_use]
    pub fn new(wal: Arc<Wal>, locks: Arc<LockManager>, horizon: TxId) -> Self {
        let horizon = horizon.max(TxId::FIRST);
        Self {
            wal,
            locks,
            state: Mutex::new(TxState {
                next_tx_id: horizon,
                horizon,
                active: HashSet::new(),
                committed: HashMap::new(),
                aborted: HashSet::new(),
                cids: HashMap::new(),
                held_locks: HashMap::new(),
            }),
        }
    }

    /// Returns the recovery horizon.
    #[must_use]
    pub fn horizon(&self) -> TxId {
        self.state.lock().horizon
    }

    /// Returns the id the next transaction will receive.
    #[must_use]
    pub fn next_tx_id(&self) -> TxId {
        self.state.lock().next_tx_id
    }

    /// Starts a new transaction and returns its id.
    pub fn start_transaction(&self) -> TxId {
        let mut state = self.state.lock();
        let tx_id = state.next_tx_id;
        state.next_tx_id = tx_id.next();
        state.active.insert(tx_id);
        state.cids.insert(tx_id, CommandId::FIRST);
        tx_id
    }

    /// Returns the next command id of `tx_id`, post-incrementing.
    pub fn next_cid(&self, tx_id: TxId) -> SableResult<CommandId> {
        let mut state = self.state.lock();
        let cid = state
            .cids
            .get_mut(&tx_id)
            .ok_or_else(|| SableError::tx_state(format!("transaction {tx_id} is not active")))?;
        let current = *cid;
        *cid = current.next();
        Ok(current)
    }

    /// Takes a snapshot: the transactions committed at this moment, plus
    /// the active set for identification.
    #[must_use]
    pub fn snapshot(&self, _tx_id: TxId) -> Snapshot {
        let state = self.state.lock();
        Snapshot {
            horizon: state.horizon,
            committed: state.committed.keys().copied().collect(),
            active: state.active.iter().copied().collect(),
        }
    }

    /// Commits `tx_id`.
    ///
    /// The COMMIT WAL entry is appended and synced first; only then are
    /// the transaction's locks released and the state sets updated. A WAL
    /// failure leaves the transaction active and is surfaced to the
    /// caller, which must roll it back.
    pub fn commit(&self, tx_id: TxId) -> SableResult<()> {
        {
            let state = self.state.lock();
            if !state.active.contains(&tx_id) {
                return Err(SableError::tx_state(format!(
                    "cannot commit {tx_id}: transaction is not active"
                )));
            }
        }

        self.wal.append_sync(tx_id, WalEntry::Commit)?;

        let tables = {
            let mut state = self.state.lock();
            state.active.remove(&tx_id);
            state.cids.remove(&tx_id);
            let seq = state.next_tx_id.as_u32();
            state.committed.insert(tx_id, seq);
            state.held_locks.remove(&tx_id).unwrap_or_default()
        };
        for table in tables {
            self.locks.unlock_table(tx_id, &table);
        }
        Ok(())
    }

    /// Rolls back `tx_id`.
    ///
    /// Data pages are left as-is; visibility of the transaction's records
    /// is governed by the aborted set.
    pub fn rollback(&self, tx_id: TxId) -> SableResult<()> {
        {
            let state = self.state.lock();
            if !state.active.contains(&tx_id) {
                return Err(SableError::tx_state(format!(
                    "cannot roll back {tx_id}: transaction is not active"
                )));
            }
        }

        self.wal.append_sync(tx_id, WalEntry::Rollback)?;

        let tables = {
            let mut state = self.state.lock();
            state.active.remove(&tx_id);
            state.cids.remove(&tx_id);
            state.aborted.insert(tx_id);
            state.held_locks.remove(&tx_id).unwrap_or_default()
        };
        for table in tables {
            self.locks.unlock_table(tx_id, &table);
        }
        Ok(())
    }

    /// Returns true if `tx_id` committed, either this incarnation or - by
    /// the horizon rule - a previous one.
    #[must_use]
    pub fn is_committed(&self, tx_id: TxId) -> bool {
        if !tx_id.is_valid() {
            return false;
        }
        let state = self.state.lock();
        tx_id < state.horizon || state.committed.contains_key(&tx_id)
    }

    /// Returns true if `tx_id` rolled back this incarnation.
    #[must_use]
    pub fn is_aborted(&self, tx_id: TxId) -> bool {
        self.state.lock().aborted.contains(&tx_id)
    }

    /// Returns true if `tx_id` is currently active.
    #[must_use]
    pub fn is_active(&self, tx_id: TxId) -> bool {
        self.state.lock().active.contains(&tx_id)
    }

    /// Returns the oldest active transaction, if any. Vacuum uses this as
    /// a conservative bound for "older than any live snapshot".
    #[must_use]
    pub fn oldest_active(&self) -> Option<TxId> {
        self.state.lock().active.iter().min().copied()
    }

    /// Returns the number of active transactions.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.state.lock().active.len()
    }

    /// Acquires a table lock on behalf of `tx_id`, recording it for
    /// release at commit/rollback.
    pub fn lock_table(&self, tx_id: TxId, table: &str, mode: LockMode) -> SableResult<()> {
        if !self.locks.lock_table(tx_id, table, mode) {
            return Err(SableError::LockConflict {
                tx: tx_id,
                table: table.to_string(),
            });
        }
        let mut state = self.state.lock();
        let held = state.held_locks.entry(tx_id).or_default();
        if !held.iter().any(|t| t == table) {
            held.push(table.to_string());
        }
        Ok(())
    }

    /// Releases one table lock before transaction end and drops it from
    /// the transaction's held list.
    ///
    /// Append-only statements use this to let their exclusive lock go at
    /// statement end: under snapshot isolation a pure insert cannot
    /// conflict with any reader or writer once it is placed.
    pub fn unlock_table(&self, tx_id: TxId, table: &str) {
        self.locks.unlock_table(tx_id, table);
        let mut state = self.state.lock();
        if let Some(held) = state.held_locks.get_mut(&tx_id) {
            held.retain(|t| t != table);
        }
    }

    /// Returns the lock manager shared with the executor.
    #[must_use]
    pub fn lock_manager(&self) -> &Arc<LockManager> {
        &self.locks
    }
}
