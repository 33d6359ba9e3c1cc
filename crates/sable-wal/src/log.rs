//! The append-only log file.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use sable_common::{SableResult, TxId};

use crate::record::{WalEntry, WalRecord};

/// The write-ahead log.
///
/// Appends run under a single writer mutex. [`Wal::sync`] makes everything
/// appended so far durable; the transaction manager syncs before a COMMIT
/// is acknowledged.
pub struct Wal {
    path: PathBuf,
    writer: Mutex<File>,
}

impl Wal {
    /// Opens the log at `path`, creating it if missing.
    pub fn open(path: impl Into<PathBuf>) -> SableResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let writer = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        Ok(Self {
            path,
            writer: Mutex::new(writer),
        })
    }

    /// Returns the log file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one entry.
    pub fn append(&self, tx_id: TxId, entry: WalEntry) -> SableResult<()> {
        let record = WalRecord::new(tx_id, entry);
        let mut writer = self.writer.lock();
        writeln!(writer, "{}", record.encode_line())?;
        Ok(())
    }

    /// Appends one entry and syncs the log before returning.
    ///
    /// Used for COMMIT entries, which must be durable before any lock the
    /// transaction held is released.
    pub fn append_sync(&self, tx_id: TxId, entry: WalEntry) -> SableResult<()> {
        let record = WalRecord::new(tx_id, entry);
        let mut writer = self.writer.lock();
        writeln!(writer, "{}", record.encode_line())?;
        writer.sync_all()?;
        Ok(())
    }

    /// Flushes buffered appends to stable storage.
    pub fn sync(&self) -> SableResult<()> {
        self.writer.lock().sync_all()?;
        Ok(())
    }

    /// Reads every entry from the start of the log, in append order.
    pub fn replay(&self) -> SableResult<Vec<WalRecord>> {
        let reader = BufReader::new(File::open(&self.path)?);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            records.push(WalRecord::parse_line(&line)?);
        }
        Ok(records)
    }

    /// Discards the log contents after recovery has applied them.
    pub fn truncate(&self) -> SableResult<()> {
        let mut writer = self.writer.lock();
        writer.set_len(0)?;
        writer.seek(SeekFrom::Start(0))?;
        writer.sync_all()?;
        Ok(())
    }
}
