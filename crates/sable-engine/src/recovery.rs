//! Startup WAL replay.
//!
//! Entries are grouped by transaction. A transaction with a COMMIT entry
//! is redone - its page effects may already be on disk, and every redo
//! step is idempotent. Every other transaction is treated as aborted and
//! undone: its inserts are neutralized by stamping `xmax := xmin`, and
//! the `xmax` marks it left on other records are cleared. The log is then
//! truncated and the transaction-id horizon persisted to the control
//! file, so ids from this point on sort after everything recovery has
//! settled.

use std::collections::HashSet;

use sable_common::{SableResult, TxId};
use sable_storage::DiskManager;
use sable_wal::{record::WalEntry, Wal, WalRecord};

use crate::codec;

/// Outcome of a recovery pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Entries redone for committed transactions.
    pub redone: usize,
    /// Entries undone for uncommitted transactions.
    pub undone: usize,
    /// The transaction-id horizon after recovery.
    pub horizon: TxId,
}

/// Replays the WAL against the heap files, truncates it, and persists
/// the new transaction-id horizon.
pub fn recover(disk: &DiskManager, wal: &Wal) -> SableResult<RecoveryReport> {
    let records = wal.replay()?;
    let report = apply(disk, &records)?;

    wal.truncate()?;
    disk.write_control(report.horizon.as_u32())?;
    Ok(report)
}

/// Applies redo/undo for `records` without touching the log or control
/// file. Idempotent: applying the same records again reproduces the same
/// on-disk state.
pub fn apply(disk: &DiskManager, records: &[WalRecord]) -> SableResult<RecoveryReport> {
    let committed: HashSet<TxId> = records
        .iter()
        .filter(|r| r.entry == WalEntry::Commit)
        .map(|r| r.tx_id)
        .collect();
    let max_tx = records.iter().map(|r| r.tx_id).max();

    let mut redone = 0;
    for record in records {
        if committed.contains(&record.tx_id) {
            redo(disk, record)?;
            redone += 1;
        }
    }

    let mut undone = 0;
    for record in records.iter().rev() {
        if !committed.contains(&record.tx_id) {
            undo(disk, record)?;
            undone += 1;
        }
    }

    let control = disk.read_control()?.map(TxId::new).unwrap_or(TxId::FIRST);
    let wal_floor = max_tx.map_or(TxId::FIRST, TxId::next);
    let horizon = control.max(wal_floor).max(TxId::FIRST);

    Ok(RecoveryReport {
        redone,
        undone,
        horizon,
    })
}

/// Re-applies one committed entry. Every arm tolerates effects that are
/// already present.
fn redo(disk: &DiskManager, record: &WalRecord) -> SableResult<()> {
    match &record.entry {
        WalEntry::CreateTable { table } => {
            if !disk.table_file_exists(table) {
                disk.create_table_file(table)?;
            }
        }
        WalEntry::DropTable { table } => {
            disk.remove_table_file(table)?;
        }
        WalEntry::Insert {
            table,
            page_id,
            slot,
            record: bytes,
        } => {
            if !disk.table_file_exists(table) {
                disk.create_table_file(table)?;
            }
            while disk.page_count(table)? <= page_id.as_u32() {
                disk.allocate_page(table)?;
            }
            let mut page = disk.read_page(table, *page_id)?;
            if *slot >= page.item_count() {
                if page.push_record(bytes).is_none() {
                    tracing::warn!(
                        table = %table,
                        page = page_id.as_u32(),
                        slot = *slot,
                        "redo insert does not fit; skipping"
                    );
                    return Ok(());
                }
                disk.write_page(table, *page_id, &page)?;
            }
        }
        WalEntry::Update {
            table,
            page_id,
            slot,
            xmax,
        }
        | WalEntry::Delete {
            table,
            page_id,
            slot,
            xmax,
        } => {
            stamp_at(disk, table, *page_id, *slot, *xmax)?;
        }
        // Index structures are rebuilt from the catalog at startup.
        WalEntry::CreateIndex { .. }
        | WalEntry::DropIndex { .. }
        | WalEntry::Commit
        | WalEntry::Rollback => {}
    }
    Ok(())
}

/// Reverses one entry of an uncommitted transaction.
fn undo(disk: &DiskManager, record: &WalRecord) -> SableResult<()> {
    match &record.entry {
        // Neutralize the insert: stamping xmax = xmin marks the record
        // deleted by a transaction the horizon treats as committed.
        WalEntry::Insert {
            table,
            page_id,
            slot,
            ..
        } => {
            stamp_at(disk, table, *page_id, *slot, record.tx_id)?;
        }
        // Clear the xmax mark, but only if this transaction set it.
        WalEntry::Update {
            table,
            page_id,
            slot,
            xmax,
        }
        | WalEntry::Delete {
            table,
            page_id,
            slot,
            xmax,
        } => {
            clear_stamp(disk, table, *page_id, *slot, *xmax)?;
        }
        WalEntry::CreateTable { table } => {
            disk.remove_table_file(table)?;
        }
        // A dropped file cannot be restored; schema-change rollback is
        // out of scope.
        WalEntry::DropTable { .. }
        | WalEntry::CreateIndex { .. }
        | WalEntry::DropIndex { .. }
        | WalEntry::Commit
        | WalEntry::Rollback => {}
    }
    Ok(())
}

/// Stamps `xmax` at a tid if the page and slot still exist.
fn stamp_at(
    disk: &DiskManager,
    table: &str,
    page_id: sable_common::PageId,
    slot: u16,
    xmax: TxId,
) -> SableResult<()> {
    if !disk.table_file_exists(table) || disk.page_count(table)? <= page_id.as_u32() {
        return Ok(());
    }
    let mut page = disk.read_page(table, page_id)?;
    if let Some(bytes) = page.record_bytes_mut(slot) {
        codec::stamp_xmax(bytes, xmax)?;
        disk.write_page(table, page_id, &page)?;
    }
    Ok(())
}

/// Resets `xmax` to the sentinel at a tid, provided it still carries
/// `expected` (the undoing transaction's own mark).
fn clear_stamp(
    disk: &DiskManager,
    table: &str,
    page_id: sable_common::PageId,
    slot: u16,
    expected: TxId,
) -> SableResult<()> {
    if !disk.table_file_exists(table) || disk.page_count(table)? <= page_id.as_u32() {
        return Ok(());
    }
    let mut page = disk.read_page(table, page_id)?;
    if let Some(bytes) = page.record_bytes_mut(slot) {
        let current = codec::Record::decode(bytes, 0)?.xmax;
        if current == expected {
            codec::stamp_xmax(bytes, TxId::INVALID)?;
            disk.write_page(table, page_id, &page)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Record;
    use sable_common::{CommandId, PageId, Value};
    use tempfile::TempDir;

    fn setup() -> (TempDir, DiskManager, Wal) {
        let dir = TempDir::new().unwrap();
        let disk = DiskManager::new(dir.path().join("data")).unwrap();
        let wal = Wal::open(dir.path().join("data/wal.log")).unwrap();
        (dir, disk, wal)
    }

    fn insert_entry(table: &str, page: u32, slot: u16, tx: u32) -> WalRecord {
        let record = Record::new(
            TxId::new(tx),
            CommandId::new(0),
            vec![Value::Int(slot as i32)],
        );
        WalRecord::new(
            TxId::new(tx),
            WalEntry::Insert {
                table: table.into(),
                page_id: PageId::new(page),
                slot,
                record: record.encode(),
            },
        )
    }

    #[test]
    fn test_redo_recreates_lost_inserts() {
        let (_dir, disk, wal) = setup();
        wal.append(
            TxId::new(1),
            WalEntry::CreateTable { table: "t".into() },
        )
        .unwrap();
        let insert = insert_entry("t", 0, 0, 1);
        wal.append(TxId::new(1), insert.entry.clone()).unwrap();
        wal.append_sync(TxId::new(1), WalEntry::Commit).unwrap();

        // Nothing was ever flushed: no heap file exists.
        let report = recover(&disk, &wal).unwrap();
        assert_eq!(report.redone, 3);
        assert_eq!(report.horizon, TxId::new(2));

        let page = disk.read_page("t", PageId::new(0)).unwrap();
        let rec = Record::decode(page.record_bytes(0).unwrap(), 1).unwrap();
        assert_eq!(rec.xmin, TxId::new(1));
        assert_eq!(rec.values, vec![Value::Int(0)]);

        // The log was truncated and the horizon persisted.
        assert!(wal.replay().unwrap().is_empty());
        assert_eq!(disk.read_control().unwrap(), Some(2));
    }

    #[test]
    fn test_undo_neutralizes_uncommitted_inserts() {
        let (_dir, disk, wal) = setup();
        disk.create_table_file("t").unwrap();
        disk.allocate_page("t").unwrap();

        // Simulate a flushed insert from a transaction that never
        // committed.
        let record = Record::new(TxId::new(5), CommandId::new(0), vec![Value::Int(7)]);
        let mut page = disk.read_page("t", PageId::new(0)).unwrap();
        page.push_record(&record.encode()).unwrap();
        disk.write_page("t", PageId::new(0), &page).unwrap();
        wal.append(
            TxId::new(5),
            WalEntry::Insert {
                table: "t".into(),
                page_id: PageId::new(0),
                slot: 0,
                record: record.encode(),
            },
        )
        .unwrap();

        let report = recover(&disk, &wal).unwrap();
        assert_eq!(report.undone, 1);
        assert_eq!(report.horizon, TxId::new(6));

        // The record is now stamped deleted-by-its-creator.
        let page = disk.read_page("t", PageId::new(0)).unwrap();
        let rec = Record::decode(page.record_bytes(0).unwrap(), 1).unwrap();
        assert_eq!(rec.xmax, TxId::new(5));
    }

    #[test]
    fn test_undo_clears_uncommitted_delete_marks() {
        let (_dir, disk, wal) = setup();
        disk.create_table_file("t").unwrap();
        disk.allocate_page("t").unwrap();

        // A committed record, then an uncommitted delete mark on it.
        let mut record = Record::new(TxId::new(1), CommandId::new(0), vec![Value::Int(1)]);
        record.xmax = TxId::new(6);
        let mut page = disk.read_page("t", PageId::new(0)).unwrap();
        page.push_record(&record.encode()).unwrap();
        disk.write_page("t", PageId::new(0), &page).unwrap();

        wal.append(
            TxId::new(6),
            WalEntry::Delete {
                table: "t".into(),
                page_id: PageId::new(0),
                slot: 0,
                xmax: TxId::new(6),
            },
        )
        .unwrap();

        recover(&disk, &wal).unwrap();

        let page = disk.read_page("t", PageId::new(0)).unwrap();
        let rec = Record::decode(page.record_bytes(0).unwrap(), 1).unwrap();
        assert_eq!(rec.xmax, TxId::INVALID);
    }

    #[test]
    fn test_apply_is_idempotent() {
        let (_dir, disk, wal) = setup();
        wal.append(
            TxId::new(1),
            WalEntry::CreateTable { table: "t".into() },
        )
        .unwrap();
        wal.append(TxId::new(1), insert_entry("t", 0, 0, 1).entry)
            .unwrap();
        wal.append(TxId::new(1), insert_entry("t", 0, 1, 1).entry)
            .unwrap();
        wal.append_sync(TxId::new(1), WalEntry::Commit).unwrap();

        let records = wal.replay().unwrap();
        apply(&disk, &records).unwrap();
        let first = std::fs::read(disk.table_path("t")).unwrap();
        apply(&disk, &records).unwrap();
        let second = std::fs::read(disk.table_path("t")).unwrap();
        assert_eq!(first, second);

        let page = disk.read_page("t", PageId::new(0)).unwrap();
        assert_eq!(page.item_count(), 2);
    }

    #[test]
    fn test_undo_create_table_removes_file() {
        let (_dir, disk, wal) = setup();
        disk.create_table_file("orphan").unwrap();
        wal.append(
            TxId::new(3),
            WalEntry::CreateTable {
                table: "orphan".into(),
            },
        )
        .unwrap();

        recover(&disk, &wal).unwrap();
        assert!(!disk.table_file_exists("orphan"));
    }

    #[test]
    fn test_horizon_from_control_when_log_empty() {
        let (_dir, disk, wal) = setup();
        disk.write_control(42).unwrap();
        let report = recover(&disk, &wal).unwrap();
        assert_eq!(report.horizon, TxId::new(42));
    }
}
