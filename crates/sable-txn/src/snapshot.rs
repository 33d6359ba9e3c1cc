//! Reader snapshots.

use std::collections::HashSet;

use sable_common::TxId;

/// The set of transactions a reader considers committed, fixed for the
/// duration of a statement (auto-commit) or a whole transaction
/// (explicit BEGIN).
///
/// `horizon` is the recovery boundary: every transaction id below it
/// predates this engine incarnation and is treated as committed, because
/// startup recovery has already undone all uncommitted work below it.
/// `active` lists transactions that were running when the snapshot was
/// taken; their inclusion marks them "invisible because active".
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Recovery boundary; ids below it count as committed.
    pub horizon: TxId,
    /// Transactions committed when the snapshot was taken.
    pub committed: HashSet<TxId>,
    /// Transactions active when the snapshot was taken.
    pub active: HashSet<TxId>,
}

impl Snapshot {
    /// Returns true if the snapshot considers `tx` committed.
    #[must_use]
    pub fn sees(&self, tx: TxId) -> bool {
        tx.is_valid() && (tx < self.horizon || self.committed.contains(&tx))
    }

    /// Returns true if `tx` was active when the snapshot was taken.
    #[must_use]
    pub fn is_active(&self, tx: TxId) -> bool {
        self.active.contains(&tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sees_by_membership_and_horizon() {
        let snapshot = Snapshot {
            horizon: TxId::new(10),
            committed: HashSet::from([TxId::new(12)]),
            active: HashSet::from([TxId::new(11)]),
        };
        // Below the horizon: committed in a previous incarnation.
        assert!(snapshot.sees(TxId::new(3)));
        // Explicitly committed this incarnation.
        assert!(snapshot.sees(TxId::new(12)));
        // Active, not committed.
        assert!(!snapshot.sees(TxId::new(11)));
        assert!(snapshot.is_active(TxId::new(11)));
        // The sentinel is never seen.
        assert!(!snapshot.sees(TxId::INVALID));
    }
}
