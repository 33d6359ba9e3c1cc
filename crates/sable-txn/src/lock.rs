//! Table-level lock manager.
//!
//! Two modes, no waiting: a request that cannot be granted immediately
//! fails, and the caller surfaces a lock-conflict error. The contract is
//! advisory - storage does not verify that callers hold the locks they
//! should.
//!
//! # Compatibility
//!
//! ```text
//!      │ S │ X │
//! ─────┼───┼───┤
//!   S  │ ✓ │ ✗ │
//!   X  │ ✗ │ ✗ │
//! ```
//!
//! A sole holder of an S lock may upgrade it to X.

use std::collections::{HashMap, HashSet};
use std::fmt;

use parking_lot::Mutex;

use sable_common::TxId;

/// Lock mode for a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockMode {
    /// Shared (read) lock; any number of holders.
    Shared,
    /// Exclusive (write) lock; exactly one holder.
    Exclusive,
}

impl fmt::Display for LockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockMode::Shared => write!(f, "S"),
            LockMode::Exclusive => write!(f, "X"),
        }
    }
}

/// The holders of one table's lock.
#[derive(Debug)]
struct LockEntry {
    mode: LockMode,
    holders: HashSet<TxId>,
}

/// Table-level lock manager.
///
/// Invariant: an exclusive entry has exactly one holder; a shared entry
/// has at least one.
#[derive(Debug, Default)]
pub struct LockManager {
    locks: Mutex<HashMap<String, LockEntry>>,
}

impl LockManager {
    /// Creates an empty lock manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempts to lock `table` for `tx` in `mode`.
    ///
    /// Returns true when the lock is held on return: fresh grant, a
    /// request the transaction already satisfies, an additional shared
    /// holder, or a sole-holder S→X upgrade. Any other combination fails
    /// immediately.
    pub fn lock_table(&self, tx: TxId, table: &str, mode: LockMode) -> bool {
        let mut locks = self.locks.lock();

        let Some(entry) = locks.get_mut(table) else {
            locks.insert(
                table.to_string(),
                LockEntry {
                    mode,
                    holders: HashSet::from([tx]),
                },
            );
            return true;
        };

        match entry.mode {
            LockMode::Exclusive => entry.holders.contains(&tx),
            LockMode::Shared => match mode {
                LockMode::Shared => {
                    entry.holders.insert(tx);
                    true
                }
                LockMode::Exclusive => {
                    if entry.holders.len() == 1 && entry.holders.contains(&tx) {
                        entry.mode = LockMode::Exclusive;
                        true
                    } else {
                        false
                    }
                }
            },
        }
    }

    /// Releases `tx`'s hold on `table`, removing the entry when it has no
    /// holders left.
    pub fn unlock_table(&self, tx: TxId, table: &str) {
        let mut locks = self.locks.lock();
        if let Some(entry) = locks.get_mut(table) {
            entry.holders.remove(&tx);
            if entry.holders.is_empty() {
                locks.remove(table);
            }
        }
    }

    /// Returns the mode currently held on `table`, if any.
    #[must_use]
    pub fn mode_of(&self, table: &str) -> Option<LockMode> {
        self.locks.lock().get(table).map(|entry| entry.mode)
    }

    /// Returns the mode `tx` holds on `table`, if it is a holder.
    #[must_use]
    pub fn holds(&self, tx: TxId, table: &str) -> Option<LockMode> {
        self.locks
            .lock()
            .get(table)
            .filter(|entry| entry.holders.contains(&tx))
            .map(|entry| entry.mode)
    }

    /// Returns the number of locked tables.
    #[must_use]
    pub fn lock_count(&self) -> usize {
        self.locks.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_grant_and_release() {
        let lm = LockManager::new();
        let tx = TxId::new(1);
        assert!(lm.lock_table(tx, "users", LockMode::Shared));
        assert_eq!(lm.mode_of("users"), Some(LockMode::Shared));
        lm.unlock_table(tx, "users");
        assert_eq!(lm.mode_of("users"), None);
        assert_eq!(lm.lock_count(), 0);
    }

    #[test]
    fn test_shared_locks_stack() {
        let lm = LockManager::new();
        assert!(lm.lock_table(TxId::new(1), "users", LockMode::Shared));
        assert!(lm.lock_table(TxId::new(2), "users", LockMode::Shared));
        // Idempotent re-acquisition.
        assert!(lm.lock_table(TxId::new(1), "users", LockMode::Shared));

        lm.unlock_table(TxId::new(1), "users");
        assert_eq!(lm.mode_of("users"), Some(LockMode::Shared));
        lm.unlock_table(TxId::new(2), "users");
        assert_eq!(lm.mode_of("users"), None);
    }

    #[test]
    fn test_exclusive_blocks_everyone_else() {
        let lm = LockManager::new();
        assert!(lm.lock_table(TxId::new(1), "users", LockMode::Exclusive));
        assert!(!lm.lock_table(TxId::new(2), "users", LockMode::Shared));
        assert!(!lm.lock_table(TxId::new(2), "users", LockMode::Exclusive));
        // The holder itself is unaffected.
        assert!(lm.lock_table(TxId::new(1), "users", LockMode::Shared));
        assert!(lm.lock_table(TxId::new(1), "users", LockMode::Exclusive));
    }

    #[test]
    fn test_sole_holder_upgrade() {
        let lm = LockManager::new();
        assert!(lm.lock_table(TxId::new(1), "users", LockMode::Shared));
        assert!(lm.lock_table(TxId::new(1), "users", LockMode::Exclusive));
        assert_eq!(lm.mode_of("users"), Some(LockMode::Exclusive));
    }

    #[test]
    fn test_upgrade_fails_with_other_holders() {
        let lm = LockManager::new();
        assert!(lm.lock_table(TxId::new(1), "users", LockMode::Shared));
        assert!(lm.lock_table(TxId::new(2), "users", LockMode::Shared));
        assert!(!lm.lock_table(TxId::new(1), "users", LockMode::Exclusive));
        assert_eq!(lm.mode_of("users"), Some(LockMode::Shared));
    }

    #[test]
    fn test_shared_blocked_by_exclusive_then_granted() {
        let lm = LockManager::new();
        assert!(lm.lock_table(TxId::new(1), "users", LockMode::Exclusive));
        assert!(!lm.lock_table(TxId::new(2), "users", LockMode::Shared));
        lm.unlock_table(TxId::new(1), "users");
        assert!(lm.lock_table(TxId::new(2), "users", LockMode::Shared));
    }

    #[test]
    fn test_tables_are_independent() {
        let lm = LockManager::new();
        assert!(lm.lock_table(TxId::new(1), "a", LockMode::Exclusive));
        assert!(lm.lock_table(TxId::new(2), "b", LockMode::Exclusive));
        assert_eq!(lm.lock_count(), 2);
    }
}
