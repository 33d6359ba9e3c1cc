//! Heap file operations.
//!
//! `StorageEngine` owns the heap files, the catalog, the per-table
//! free-space maps, and the secondary indexes. All page access goes
//! through the buffer cache; every mutation appends a WAL entry.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;

use sable_common::constants::{ITEM_POINTER_SIZE, PAGE_HEADER_SIZE, PAGE_SIZE};
use sable_common::{
    CommandId, PageId, SableError, SableResult, Schema, SlotId, Tid, TxId, Value,
};
use sable_index::BPlusTree;
use sable_storage::{BufferCache, DiskManager};
use sable_txn::{Snapshot, TransactionManager};
use sable_wal::{record::WalEntry, Wal};

use crate::catalog::{self, Catalog};
use crate::codec::{self, Record};
use crate::filter::{self, WhereCondition};
use crate::visibility::is_visible;

/// Largest record body a page can hold.
pub const MAX_RECORD_SIZE: usize = PAGE_SIZE - PAGE_HEADER_SIZE - ITEM_POINTER_SIZE;

/// One registered secondary index.
pub struct IndexMeta {
    /// Indexed table.
    pub table: String,
    /// Indexed column.
    pub column: String,
    /// The B+tree, keyed by the string encoding of the column value.
    pub tree: BPlusTree,
}

/// The storage engine: heap files, catalog, free-space maps, indexes.
pub struct StorageEngine {
    disk: Arc<DiskManager>,
    cache: Arc<BufferCache>,
    wal: Arc<Wal>,
    catalog: Catalog,
    btree_degree: usize,
    // Per-table page -> free bytes, consulted in page order on insert.
    free_space: Mutex<HashMap<String, BTreeMap<PageId, u16>>>,
    page_counts: Mutex<HashMap<String, u32>>,
    indexes: Mutex<HashMap<String, IndexMeta>>,
}

impl StorageEngine {
    /// Creates a storage engine over the given disk, cache, and WAL.
    #[must_use]
    pub fn new(
        disk: Arc<DiskManager>,
        cache: Arc<BufferCache>,
        wal: Arc<Wal>,
        btree_degree: usize,
    ) -> Self {
        Self {
            disk,
            cache,
            wal,
            catalog: Catalog::new(),
            btree_degree,
            free_space: Mutex::new(HashMap::new()),
            page_counts: Mutex::new(HashMap::new()),
            indexes: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the schema registry.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Returns the buffer cache (statistics, explicit flush).
    #[must_use]
    pub fn cache(&self) -> &Arc<BufferCache> {
        &self.cache
    }

    /// Writes every dirty page back to disk.
    pub fn flush(&self) -> SableResult<()> {
        self.cache.flush_all()
    }

    /// Registers an existing heap file: its page count and a free-space
    /// map built from its pages. Called at startup for discovered tables.
    pub fn register_table_file(&self, table: &str) -> SableResult<()> {
        let count = self.disk.page_count(table)?;
        self.page_counts.lock().insert(table.to_string(), count);

        let mut map = BTreeMap::new();
        for pid in 0..count {
            let page_id = PageId::new(pid);
            let guard = self.cache.get_page(table, page_id)?;
            let free = guard.page().free_space();
            map.insert(page_id, free);
        }
        self.free_space.lock().insert(table.to_string(), map);
        Ok(())
    }

    /// Returns the number of pages in `table`.
    pub fn page_count(&self, table: &str) -> SableResult<u32> {
        if let Some(count) = self.page_counts.lock().get(table) {
            return Ok(*count);
        }
        let count = self.disk.page_count(table)?;
        self.page_counts.lock().insert(table.to_string(), count);
        Ok(count)
    }

    // =========================================================================
    // DDL
    // =========================================================================

    /// Creates a table: heap file, initial page, catalog registration,
    /// and - for non-system tables - rows in `sys_tables`/`sys_columns`.
    pub fn create_table(
        &self,
        table: &str,
        columns: &[sable_common::Column],
        tx_id: TxId,
        cid: CommandId,
    ) -> SableResult<()> {
        if self.catalog.exists(table) {
            return Err(SableError::TableExists(table.to_string()));
        }
        if columns.is_empty() {
            return Err(SableError::semantic(format!(
                "table '{table}' needs at least one column"
            )));
        }
        for (i, column) in columns.iter().enumerate() {
            if columns[..i].iter().any(|c| c.name == column.name) {
                return Err(SableError::semantic(format!(
                    "duplicate column '{}' in table '{table}'",
                    column.name
                )));
            }
        }

        self.wal.append(
            tx_id,
            WalEntry::CreateTable {
                table: table.to_string(),
            },
        )?;

        self.disk.create_table_file(table)?;
        self.page_counts.lock().insert(table.to_string(), 0);
        self.free_space
            .lock()
            .insert(table.to_string(), BTreeMap::new());
        self.add_new_page(table)?;

        let schema = Schema::new(columns.to_vec());
        self.catalog.register(table, schema);

        if !catalog::is_system_table(table) {
            self.insert_record(catalog::SYS_TABLES, catalog::table_row(table), tx_id, cid)?;
            for column in columns {
                self.insert_record(
                    catalog::SYS_COLUMNS,
                    catalog::column_row(table, column),
                    tx_id,
                    cid,
                )?;
            }
        }
        Ok(())
    }

    /// Drops a table: its file, catalog rows, and indexes.
    pub fn drop_table(
        &self,
        table: &str,
        tx_id: TxId,
        cid: CommandId,
        snapshot: &Snapshot,
        txns: &TransactionManager,
    ) -> SableResult<()> {
        if !self.catalog.exists(table) {
            return Err(SableError::TableNotFound(table.to_string()));
        }
        if catalog::is_system_table(table) {
            return Err(SableError::semantic(format!(
                "cannot drop system table '{table}'"
            )));
        }

        // Unregister every index on the table and its catalog rows.
        let doomed: Vec<String> = {
            let indexes = self.indexes.lock();
            indexes
                .iter()
                .filter(|(_, meta)| meta.table == table)
                .map(|(name, _)| name.clone())
                .collect()
        };
        for name in &doomed {
            self.indexes.lock().remove(name);
        }

        let by_table = vec![WhereCondition::new(
            "table_name",
            crate::filter::CompareOp::Eq,
            Value::Str(table.to_string()),
        )];
        self.delete_records(catalog::SYS_TABLES, &by_table, tx_id, cid, snapshot, txns)?;
        self.delete_records(catalog::SYS_COLUMNS, &by_table, tx_id, cid, snapshot, txns)?;
        self.delete_records(catalog::SYS_INDEXES, &by_table, tx_id, cid, snapshot, txns)?;

        self.wal.append(
            tx_id,
            WalEntry::DropTable {
                table: table.to_string(),
            },
        )?;

        self.cache.discard_table(table);
        self.disk.remove_table_file(table)?;
        self.page_counts.lock().remove(table);
        self.free_space.lock().remove(table);
        self.catalog.remove(table);
        Ok(())
    }

    /// Creates an index over `table.column`, populating it from every
    /// visible record, and registers it in `sys_indexes`.
    ///
    /// Returns the resolved index name (`<table>_<column>_idx` when the
    /// planner supplied none).
    pub fn create_index(
        &self,
        index_name: Option<&str>,
        table: &str,
        column: &str,
        tx_id: TxId,
        cid: CommandId,
        snapshot: &Snapshot,
        txns: &TransactionManager,
    ) -> SableResult<String> {
        let schema = self.catalog.get(table)?;
        let col_idx = schema
            .index_of(column)
            .ok_or_else(|| SableError::ColumnNotFound(column.to_string()))?;

        let name = match index_name {
            Some(name) => name.to_string(),
            None => format!("{table}_{column}_idx"),
        };
        if self.indexes.lock().contains_key(&name) {
            return Err(SableError::IndexExists(name));
        }

        let mut tree = BPlusTree::new(self.btree_degree);
        for (tid, record) in self.scan_with_tids(table, tx_id, cid, snapshot, txns)? {
            if let Some(key) = record.values.get(col_idx).and_then(Value::index_key) {
                tree.insert(&key, tid);
            }
        }
        self.indexes.lock().insert(
            name.clone(),
            IndexMeta {
                table: table.to_string(),
                column: column.to_string(),
                tree,
            },
        );

        self.insert_record(
            catalog::SYS_INDEXES,
            catalog::index_row(&name, table, column),
            tx_id,
            cid,
        )?;
        self.wal.append(
            tx_id,
            WalEntry::CreateIndex {
                index: name.clone(),
                table: table.to_string(),
                column: column.to_string(),
            },
        )?;
        Ok(name)
    }

    /// Registers an index without touching the catalog or WAL. Used at
    /// startup to rebuild trees recorded in `sys_indexes`.
    pub fn rebuild_index(&self, name: &str, table: &str, column: &str) -> SableResult<()> {
        let schema = self.catalog.get(table)?;
        let col_idx = schema
            .index_of(column)
            .ok_or_else(|| SableError::ColumnNotFound(column.to_string()))?;
        let tree = self.build_tree_raw(table, col_idx, schema.len())?;
        self.indexes.lock().insert(
            name.to_string(),
            IndexMeta {
                table: table.to_string(),
                column: column.to_string(),
                tree,
            },
        );
        Ok(())
    }

    /// Drops an index and its `sys_indexes` row.
    pub fn drop_index(
        &self,
        name: &str,
        tx_id: TxId,
        cid: CommandId,
        snapshot: &Snapshot,
        txns: &TransactionManager,
    ) -> SableResult<()> {
        if self.indexes.lock().remove(name).is_none() {
            return Err(SableError::IndexNotFound(name.to_string()));
        }
        let by_name = vec![WhereCondition::new(
            "index_name",
            crate::filter::CompareOp::Eq,
            Value::Str(name.to_string()),
        )];
        self.delete_records(catalog::SYS_INDEXES, &by_name, tx_id, cid, snapshot, txns)?;
        self.wal.append(
            tx_id,
            WalEntry::DropIndex {
                index: name.to_string(),
            },
        )?;
        Ok(())
    }

    /// Returns the name of the index on `(table, column)`, if one exists.
    #[must_use]
    pub fn index_on(&self, table: &str, column: &str) -> Option<String> {
        self.indexes
            .lock()
            .iter()
            .find(|(_, meta)| meta.table == table && meta.column == column)
            .map(|(name, _)| name.clone())
    }

    /// Returns the table an index is defined on.
    #[must_use]
    pub fn index_table(&self, index_name: &str) -> Option<String> {
        self.indexes
            .lock()
            .get(index_name)
            .map(|meta| meta.table.clone())
    }

    // =========================================================================
    // DML
    // =========================================================================

    /// Inserts one row, returning the tid it was placed at.
    ///
    /// Stamps the MVCC header (`xmin = tx_id`, `xmax = 0`, `cid`), packs
    /// the record into the first page with room (or a fresh one), appends
    /// the WAL entry, and maintains every index on the table.
    pub fn insert_record(
        &self,
        table: &str,
        values: Vec<Value>,
        tx_id: TxId,
        cid: CommandId,
    ) -> SableResult<Tid> {
        let schema = self.catalog.get(table)?;
        validate_row(table, &schema, &values)?;

        let record = Record::new(tx_id, cid, values);
        let bytes = record.encode();
        if bytes.len() > MAX_RECORD_SIZE {
            return Err(SableError::semantic(format!(
                "record of {} bytes exceeds page capacity",
                bytes.len()
            )));
        }

        let (page_id, slot) = self.place_record(table, &bytes)?;
        let tid = Tid::new(table, page_id, slot);

        self.wal.append(
            tx_id,
            WalEntry::Insert {
                table: table.to_string(),
                page_id,
                slot,
                record: bytes,
            },
        )?;

        let mut indexes = self.indexes.lock();
        for meta in indexes.values_mut().filter(|m| m.table == table) {
            let Some(col_idx) = schema.index_of(&meta.column) else {
                continue;
            };
            if let Some(key) = record.values.get(col_idx).and_then(Value::index_key) {
                meta.tree.insert(&key, tid.clone());
            }
        }
        Ok(tid)
    }

    /// Scans `table`, returning the records visible to the reader.
    pub fn scan_table(
        &self,
        table: &str,
        tx_id: TxId,
        cid: CommandId,
        snapshot: &Snapshot,
        txns: &TransactionManager,
    ) -> SableResult<Vec<Record>> {
        Ok(self
            .scan_with_tids(table, tx_id, cid, snapshot, txns)?
            .into_iter()
            .map(|(_, record)| record)
            .collect())
    }

    /// Scans `table`, returning visible records with their physical tids.
    pub fn scan_with_tids(
        &self,
        table: &str,
        tx_id: TxId,
        cid: CommandId,
        snapshot: &Snapshot,
        txns: &TransactionManager,
    ) -> SableResult<Vec<(Tid, Record)>> {
        let schema = self.catalog.get(table)?;
        let page_count = self.page_count(table)?;

        let mut result = Vec::new();
        for pid in 0..page_count {
            let page_id = PageId::new(pid);
            let guard = self.cache.get_page(table, page_id)?;
            let page = guard.page();
            for (slot, bytes) in page.records() {
                let record = Record::decode(bytes, schema.len())?;
                if is_visible(&record, tx_id, cid, snapshot, txns) {
                    result.push((Tid::new(table, page_id, slot), record));
                }
            }
        }
        Ok(result)
    }

    /// Logically deletes every visible record matching `conditions` by
    /// stamping its `xmax` in place. Old versions stay readable to older
    /// snapshots. Returns the number of records marked.
    pub fn delete_records(
        &self,
        table: &str,
        conditions: &[WhereCondition],
        tx_id: TxId,
        cid: CommandId,
        snapshot: &Snapshot,
        txns: &TransactionManager,
    ) -> SableResult<usize> {
        let marked = self.mark_matching(table, conditions, tx_id, cid, snapshot, txns)?;
        for (tid, _) in &marked {
            self.wal.append(
                tx_id,
                WalEntry::Delete {
                    table: table.to_string(),
                    page_id: tid.page_id,
                    slot: tid.slot,
                    xmax: tx_id,
                },
            )?;
        }
        Ok(marked.len())
    }

    /// Updates every visible record matching `conditions`.
    ///
    /// Two passes: first collect the matches and stamp their `xmax`,
    /// then insert one new version per match with `set_clause` applied.
    /// The collection completes before any insert, so the update never
    /// revisits its own new versions.
    pub fn update_records(
        &self,
        table: &str,
        conditions: &[WhereCondition],
        set_clause: &[(String, Value)],
        tx_id: TxId,
        cid: CommandId,
        snapshot: &Snapshot,
        txns: &TransactionManager,
    ) -> SableResult<usize> {
        let schema = self.catalog.get(table)?;
        for (column, value) in set_clause {
            let Some(def) = schema.column(column) else {
                return Err(SableError::ColumnNotFound(column.clone()));
            };
            if !value.matches(def.data_type) {
                return Err(SableError::semantic(format!(
                    "cannot assign {value} to column '{column}' of type {}",
                    def.data_type
                )));
            }
            if def.not_null && value.is_null() {
                return Err(SableError::semantic(format!(
                    "column '{column}' is NOT NULL"
                )));
            }
        }

        let marked = self.mark_matching(table, conditions, tx_id, cid, snapshot, txns)?;
        for (tid, _) in &marked {
            self.wal.append(
                tx_id,
                WalEntry::Update {
                    table: table.to_string(),
                    page_id: tid.page_id,
                    slot: tid.slot,
                    xmax: tx_id,
                },
            )?;
        }

        for (_, old) in &marked {
            let mut values = old.values.clone();
            for (column, value) in set_clause {
                if let Some(idx) = schema.index_of(column) {
                    values[idx] = value.clone();
                }
            }
            self.insert_record(table, values, tx_id, cid)?;
        }
        Ok(marked.len())
    }

    /// Probes the index on `(table, column)` and returns the visible
    /// records carrying `value`.
    pub fn index_scan(
        &self,
        table: &str,
        column: &str,
        value: &Value,
        tx_id: TxId,
        cid: CommandId,
        snapshot: &Snapshot,
        txns: &TransactionManager,
    ) -> SableResult<Vec<Record>> {
        let schema = self.catalog.get(table)?;
        let name = self
            .index_on(table, column)
            .ok_or_else(|| SableError::IndexNotFound(format!("{table}.{column}")))?;
        let Some(key) = value.index_key() else {
            return Ok(Vec::new());
        };

        let tids = {
            let indexes = self.indexes.lock();
            match indexes.get(&name) {
                Some(meta) => meta.tree.search(&key),
                None => Vec::new(),
            }
        };

        let mut result = Vec::new();
        for tid in tids {
            let Some(record) = self.fetch_record(&tid, schema.len())? else {
                continue;
            };
            if is_visible(&record, tx_id, cid, snapshot, txns) {
                result.push(record);
            }
        }
        Ok(result)
    }

    /// Reads the record at `tid`, if the slot still exists.
    pub fn fetch_record(&self, tid: &Tid, column_count: usize) -> SableResult<Option<Record>> {
        if tid.page_id.as_u32() >= self.page_count(&tid.table)? {
            return Ok(None);
        }
        let guard = self.cache.get_page(&tid.table, tid.page_id)?;
        let page = guard.page();
        match page.record_bytes(tid.slot) {
            Some(bytes) => Ok(Some(Record::decode(bytes, column_count)?)),
            None => Ok(None),
        }
    }

    // =========================================================================
    // Vacuum
    // =========================================================================

    /// Reclaims item pointers whose records are dead to every possible
    /// reader: deleted by a transaction that committed before the oldest
    /// active one, or created by an aborted transaction. Pages are
    /// compacted in place, the free-space map refreshed, and the table's
    /// indexes rebuilt (tids may change).
    ///
    /// Compaction renumbers slots, so logged tids must never be replayed
    /// against compacted pages. Before rewriting anything, vacuum
    /// checkpoints: it flushes the pre-vacuum state, persists the
    /// transaction-id horizon, and truncates the WAL. The caller must
    /// ensure no other transaction is active (the engine facade takes
    /// the table's exclusive lock and checks quiescence).
    ///
    /// Returns the number of record versions reclaimed.
    pub fn vacuum_table(&self, table: &str, txns: &TransactionManager) -> SableResult<usize> {
        let schema = self.catalog.get(table)?;
        let page_count = self.page_count(table)?;
        let oldest_active = txns.oldest_active();

        // First pass: decide, per page, which records survive.
        let mut compactions: Vec<(PageId, Vec<Vec<u8>>, usize)> = Vec::new();
        for pid in 0..page_count {
            let page_id = PageId::new(pid);
            let guard = self.cache.get_page(table, page_id)?;
            let page = guard.page();

            let mut survivors: Vec<Vec<u8>> = Vec::new();
            let mut dead = 0;
            for (_, bytes) in page.records() {
                let record = Record::decode(bytes, schema.len())?;
                let deleted_for_all = record.xmax.is_valid()
                    && txns.is_committed(record.xmax)
                    && oldest_active.map_or(true, |oldest| record.xmax < oldest);
                if deleted_for_all || txns.is_aborted(record.xmin) {
                    dead += 1;
                } else {
                    survivors.push(bytes.to_vec());
                }
            }
            if dead > 0 {
                compactions.push((page_id, survivors, dead));
            }
        }
        if compactions.is_empty() {
            return Ok(0);
        }

        // Checkpoint: pre-vacuum state durable, then drop the log.
        self.cache.flush_all()?;
        self.disk.write_control(txns.next_tx_id().as_u32())?;
        self.wal.truncate()?;

        let mut reclaimed = 0;
        for (page_id, survivors, dead) in compactions {
            let guard = self.cache.get_page(table, page_id)?;
            let mut page = guard.page();
            page.reset();
            for bytes in &survivors {
                if page.push_record(bytes).is_none() {
                    return Err(SableError::internal(
                        "page rebuild overflow during vacuum",
                    ));
                }
            }
            reclaimed += dead;
            self.set_free_space(table, page_id, page.free_space());
        }

        // Slots were renumbered; refresh every index on the table.
        let rebuilds: Vec<(String, String)> = {
            let indexes = self.indexes.lock();
            indexes
                .iter()
                .filter(|(_, meta)| meta.table == table)
                .map(|(name, meta)| (name.clone(), meta.column.clone()))
                .collect()
        };
        for (name, column) in rebuilds {
            self.rebuild_index(&name, table, &column)?;
        }
        self.cache.flush_all()?;
        Ok(reclaimed)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// First pass shared by delete and update: stamp `xmax` on every
    /// visible record matching `conditions`, returning the old versions.
    fn mark_matching(
        &self,
        table: &str,
        conditions: &[WhereCondition],
        tx_id: TxId,
        cid: CommandId,
        snapshot: &Snapshot,
        txns: &TransactionManager,
    ) -> SableResult<Vec<(Tid, Record)>> {
        let schema = self.catalog.get(table)?;
        let columns = schema.column_names();
        let page_count = self.page_count(table)?;

        let mut marked = Vec::new();
        for pid in 0..page_count {
            let page_id = PageId::new(pid);
            let guard = self.cache.get_page(table, page_id)?;
            let mut page = guard.page();

            let mut stamped: Vec<SlotId> = Vec::new();
            for (slot, bytes) in page.records() {
                let record = Record::decode(bytes, schema.len())?;
                if is_visible(&record, tx_id, cid, snapshot, txns)
                    && filter::matches_row(&columns, &record.values, conditions)
                {
                    stamped.push(slot);
                    marked.push((Tid::new(table, page_id, slot), record));
                }
            }
            for slot in stamped {
                let bytes = page.record_bytes_mut(slot).ok_or_else(|| {
                    SableError::internal("slot vanished while stamping xmax")
                })?;
                codec::stamp_xmax(bytes, tx_id)?;
                page.mark_dirty();
            }
        }
        Ok(marked)
    }

    /// Appends a fresh page to `table` and registers its free space.
    fn add_new_page(&self, table: &str) -> SableResult<PageId> {
        let page_id = self.disk.allocate_page(table)?;
        self.page_counts
            .lock()
            .insert(table.to_string(), page_id.as_u32() + 1);
        self.set_free_space(table, page_id, (PAGE_SIZE - PAGE_HEADER_SIZE) as u16);
        Ok(page_id)
    }

    fn set_free_space(&self, table: &str, page_id: PageId, free: u16) {
        self.free_space
            .lock()
            .entry(table.to_string())
            .or_default()
            .insert(page_id, free);
    }

    /// Picks the first page whose free-space entry fits `needed` bytes,
    /// in page order; allocates a new page when none qualifies.
    fn find_candidate_page(&self, table: &str, needed: usize) -> SableResult<PageId> {
        {
            let free_space = self.free_space.lock();
            if let Some(map) = free_space.get(table) {
                for (page_id, free) in map {
                    if *free as usize >= needed {
                        return Ok(*page_id);
                    }
                }
            }
        }
        self.add_new_page(table)
    }

    /// Packs `bytes` into a page of `table`, correcting stale free-space
    /// entries along the way.
    fn place_record(&self, table: &str, bytes: &[u8]) -> SableResult<(PageId, SlotId)> {
        let needed = bytes.len() + ITEM_POINTER_SIZE;
        loop {
            let page_id = self.find_candidate_page(table, needed)?;
            let guard = self.cache.get_page(table, page_id)?;
            let mut page = guard.page();

            if let Some(slot) = page.push_record(bytes) {
                let free = page.free_space();
                drop(page);
                self.set_free_space(table, page_id, free);
                return Ok((page_id, slot));
            }

            // The map entry was stale (pointer region full, or free space
            // consumed); record reality and retry.
            let actual = if page.can_fit(0) { page.free_space() } else { 0 };
            drop(page);
            self.set_free_space(table, page_id, actual);
        }
    }

    /// Builds a tree over every surviving record, visibility ignored.
    /// Scans at startup and after vacuum re-check visibility per row, so
    /// indexing invisible versions is harmless.
    fn build_tree_raw(
        &self,
        table: &str,
        col_idx: usize,
        column_count: usize,
    ) -> SableResult<BPlusTree> {
        let page_count = self.page_count(table)?;
        let mut tree = BPlusTree::new(self.btree_degree);
        for pid in 0..page_count {
            let page_id = PageId::new(pid);
            let guard = self.cache.get_page(table, page_id)?;
            let page = guard.page();
            for (slot, bytes) in page.records() {
                let record = Record::decode(bytes, column_count)?;
                if let Some(key) = record.values.get(col_idx).and_then(Value::index_key) {
                    tree.insert(&key, Tid::new(table, page_id, slot));
                }
            }
        }
        Ok(tree)
    }
}

/// Checks arity, types, and NOT NULL for an incoming row.
fn validate_row(table: &str, schema: &Schema, values: &[Value]) -> SableResult<()> {
    if values.len() != schema.len() {
        return Err(SableError::semantic(format!(
            "table '{table}' has {} columns but {} values were supplied",
            schema.len(),
            values.len()
        )));
    }
    for (value, column) in values.iter().zip(schema.columns()) {
        if !value.matches(column.data_type) {
            return Err(SableError::semantic(format!(
                "cannot store {value} in column '{}' of type {}",
                column.name, column.data_type
            )));
        }
        if column.not_null && value.is_null() {
            return Err(SableError::semantic(format!(
                "column '{}' is NOT NULL",
                column.name
            )));
        }
    }
    Ok(())
}
