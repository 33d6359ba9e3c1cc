//! Page-granular file I/O.
//!
//! Each table lives in its own heap file `<data_dir>/<table>.tbl`, a
//! concatenation of fixed-size pages. The disk manager also owns the
//! `control` file, which persists the transaction-id high-water mark so
//! recovery can place its horizon after the WAL has been truncated.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use sable_common::constants::{CONTROL_FILE, PAGE_SIZE, TABLE_FILE_EXT};
use sable_common::{PageId, SableError, SableResult};

use crate::page::HeapPage;

/// Magic prefix of the control file.
const CONTROL_MAGIC: u32 = 0x5342_4C43; // "SBLC"

/// Page-granular I/O over one heap file per table.
pub struct DiskManager {
    data_dir: PathBuf,
    // Serializes file extension so concurrent allocations cannot hand out
    // the same page id.
    alloc_lock: Mutex<()>,
}

impl DiskManager {
    /// Creates a disk manager rooted at `data_dir`, creating the
    /// directory if missing.
    pub fn new(data_dir: impl Into<PathBuf>) -> SableResult<Self> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir)?;
        Ok(Self {
            data_dir,
            alloc_lock: Mutex::new(()),
        })
    }

    /// Returns the data directory.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Returns the heap file path for `table`.
    #[must_use]
    pub fn table_path(&self, table: &str) -> PathBuf {
        self.data_dir.join(format!("{table}.{TABLE_FILE_EXT}"))
    }

    /// Returns true if the heap file for `table` exists.
    #[must_use]
    pub fn table_file_exists(&self, table: &str) -> bool {
        self.table_path(table).exists()
    }

    /// Creates an empty heap file for `table`.
    pub fn create_table_file(&self, table: &str) -> SableResult<()> {
        File::create(self.table_path(table))?;
        Ok(())
    }

    /// Removes the heap file for `table`.
    pub fn remove_table_file(&self, table: &str) -> SableResult<()> {
        let path = self.table_path(table);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    /// Lists the tables discovered from `*.tbl` files in the data
    /// directory.
    pub fn list_tables(&self) -> SableResult<Vec<String>> {
        let mut tables = Vec::new();
        for entry in fs::read_dir(&self.data_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some(TABLE_FILE_EXT) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    tables.push(stem.to_string());
                }
            }
        }
        tables.sort();
        Ok(tables)
    }

    /// Returns the number of pages in the heap file for `table`.
    pub fn page_count(&self, table: &str) -> SableResult<u32> {
        let len = fs::metadata(self.table_path(table))?.len();
        Ok(len.div_ceil(PAGE_SIZE as u64) as u32)
    }

    /// Reads one page from `table`.
    pub fn read_page(&self, table: &str, page_id: PageId) -> SableResult<HeapPage> {
        let mut file = File::open(self.table_path(table))?;
        file.seek(SeekFrom::Start(page_id.file_offset()))?;
        let mut buf = vec![0u8; PAGE_SIZE];
        file.read_exact(&mut buf)?;
        HeapPage::from_bytes(&buf)
            .map_err(|e| SableError::CorruptPage(format!("{table} page {page_id}: {e}")))
    }

    /// Writes one page of `table` at its offset.
    pub fn write_page(&self, table: &str, page_id: PageId, page: &HeapPage) -> SableResult<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .open(self.table_path(table))?;
        file.seek(SeekFrom::Start(page_id.file_offset()))?;
        file.write_all(page.as_bytes())?;
        Ok(())
    }

    /// Appends a fresh, initialized page to `table` and returns its id.
    pub fn allocate_page(&self, table: &str) -> SableResult<PageId> {
        let _guard = self.alloc_lock.lock();
        let page_id = PageId::new(self.page_count(table)?);
        let page = HeapPage::new();
        let mut file = OpenOptions::new()
            .write(true)
            .open(self.table_path(table))?;
        file.seek(SeekFrom::Start(page_id.file_offset()))?;
        file.write_all(page.as_bytes())?;
        Ok(page_id)
    }

    // =========================================================================
    // Control file
    // =========================================================================

    /// Reads the persisted transaction-id high-water mark, if present.
    pub fn read_control(&self) -> SableResult<Option<u32>> {
        let path = self.data_dir.join(CONTROL_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let mut buf = [0u8; 8];
        File::open(path)?.read_exact(&mut buf)?;
        let magic = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
        if magic != CONTROL_MAGIC {
            return Err(SableError::Internal("control file corrupt".into()));
        }
        Ok(Some(u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]])))
    }

    /// Persists the transaction-id high-water mark.
    pub fn write_control(&self, next_tx_id: u32) -> SableResult<()> {
        let mut buf = [0u8; 8];
        buf[0..4].copy_from_slice(&CONTROL_MAGIC.to_le_bytes());
        buf[4..8].copy_from_slice(&next_tx_id.to_le_bytes());
        let path = self.data_dir.join(CONTROL_FILE);
        let mut file = File::create(path)?;
        file.write_all(&buf)?;
        file.sync_all()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn manager() -> (TempDir, DiskManager) {
        let dir = TempDir::new().unwrap();
        let disk = DiskManager::new(dir.path().join("data")).unwrap();
        (dir, disk)
    }

    #[test]
    fn test_create_allocate_read_write() {
        let (_dir, disk) = manager();
        disk.create_table_file("users").unwrap();
        assert_eq!(disk.page_count("users").unwrap(), 0);

        let p0 = disk.allocate_page("users").unwrap();
        assert_eq!(p0, PageId::new(0));
        assert_eq!(disk.page_count("users").unwrap(), 1);

        let mut page = disk.read_page("users", p0).unwrap();
        page.push_record(b"row").unwrap();
        disk.write_page("users", p0, &page).unwrap();

        let reread = disk.read_page("users", p0).unwrap();
        assert_eq!(reread.record_bytes(0).unwrap(), b"row");
    }

    #[test]
    fn test_list_tables() {
        let (_dir, disk) = manager();
        disk.create_table_file("b_table").unwrap();
        disk.create_table_file("a_table").unwrap();
        assert_eq!(disk.list_tables().unwrap(), vec!["a_table", "b_table"]);
    }

    #[test]
    fn test_remove_table_file() {
        let (_dir, disk) = manager();
        disk.create_table_file("gone").unwrap();
        assert!(disk.table_file_exists("gone"));
        disk.remove_table_file("gone").unwrap();
        assert!(!disk.table_file_exists("gone"));
        // Removing again is a no-op.
        disk.remove_table_file("gone").unwrap();
    }

    #[test]
    fn test_control_round_trip() {
        let (_dir, disk) = manager();
        assert_eq!(disk.read_control().unwrap(), None);
        disk.write_control(17).unwrap();
        assert_eq!(disk.read_control().unwrap(), Some(17));
        disk.write_control(42).unwrap();
        assert_eq!(disk.read_control().unwrap(), Some(42));
    }
}
