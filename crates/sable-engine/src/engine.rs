//! The engine facade.
//!
//! [`Engine`] owns every component and is the single entry point for
//! callers: it runs the startup sequence (open WAL → replay → bootstrap
//! if needed → load catalog → rebuild indexes), executes plans on behalf
//! of sessions, converts statement errors into rollback, and flushes on
//! shutdown. There is no hidden global state; everything hangs off the
//! `Engine` value.

use std::sync::Arc;

use sable_common::{EngineConfig, SableError, SableResult, Schema, TxId, Value};
use sable_storage::{BufferCache, DiskManager};
use sable_txn::{LockManager, LockMode, Snapshot, TransactionManager};
use sable_wal::Wal;

use crate::catalog::{self, SYS_COLUMNS, SYS_INDEXES, SYS_TABLES};
use crate::executor::Executor;
use crate::heap::StorageEngine;
use crate::plan::Plan;
use crate::recovery;
use crate::result::ResultSet;

/// One client's transaction context.
///
/// A session is either in auto-commit mode (no open transaction; every
/// statement runs in its own transaction with a fresh snapshot) or
/// inside an explicit transaction begun with [`Engine::begin`], whose
/// snapshot is fixed at BEGIN.
#[derive(Debug, Default)]
pub struct Session {
    tx: Option<(TxId, Snapshot)>,
}

impl Session {
    /// Creates a session in auto-commit mode.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if an explicit transaction is open.
    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.tx.is_some()
    }

    /// Returns the open transaction's id, if any.
    #[must_use]
    pub fn tx_id(&self) -> Option<TxId> {
        self.tx.as_ref().map(|(tx, _)| *tx)
    }
}

/// The assembled database core.
pub struct Engine {
    config: EngineConfig,
    disk: Arc<DiskManager>,
    wal: Arc<Wal>,
    txns: TransactionManager,
    storage: StorageEngine,
}

impl Engine {
    /// Opens (or initializes) the database under `config.data_dir`.
    ///
    /// Startup sequence: open the WAL, replay and truncate it, bootstrap
    /// the catalog when the system tables are missing, load schemas from
    /// the catalog through the ordinary scan path, and rebuild every
    /// index registered in `sys_indexes`.
    pub fn open(config: EngineConfig) -> SableResult<Self> {
        config.validate()?;
        let disk = Arc::new(DiskManager::new(&config.data_dir)?);
        let wal = Arc::new(Wal::open(config.wal_path())?);

        let report = recovery::recover(&disk, &wal)?;
        tracing::info!(
            redone = report.redone,
            undone = report.undone,
            horizon = report.horizon.as_u32(),
            "WAL recovery complete"
        );

        let locks = Arc::new(LockManager::new());
        let txns = TransactionManager::new(Arc::clone(&wal), locks, report.horizon);
        let cache = Arc::new(BufferCache::new(Arc::clone(&disk), config.cache_capacity));
        let storage = StorageEngine::new(
            Arc::clone(&disk),
            cache,
            Arc::clone(&wal),
            config.btree_degree,
        );

        let engine = Self {
            config,
            disk,
            wal,
            txns,
            storage,
        };
        engine.start_up()?;
        Ok(engine)
    }

    fn start_up(&self) -> SableResult<()> {
        for table in self.disk.list_tables()? {
            self.storage.register_table_file(&table)?;
        }

        if !self.disk.table_file_exists(SYS_TABLES) || !self.disk.table_file_exists(SYS_COLUMNS)
        {
            self.bootstrap()?;
        } else if !self.disk.table_file_exists(SYS_INDEXES) {
            // Data directory from before the index registry existed.
            let catalog = self.storage.catalog();
            catalog.register(SYS_TABLES, catalog::sys_tables_schema());
            catalog.register(SYS_COLUMNS, catalog::sys_columns_schema());
            let tx = self.txns.start_transaction();
            let cid = self.txns.next_cid(tx)?;
            let schema = catalog::sys_indexes_schema();
            self.storage
                .create_table(SYS_INDEXES, schema.columns(), tx, cid)?;
            self.storage
                .insert_record(SYS_TABLES, catalog::table_row(SYS_INDEXES), tx, cid)?;
            for column in schema.columns() {
                self.storage.insert_record(
                    SYS_COLUMNS,
                    catalog::column_row(SYS_INDEXES, column),
                    tx,
                    cid,
                )?;
            }
            self.txns.commit(tx)?;
        }

        self.load_catalog()
    }

    /// Creates the system tables and self-inserts their schemas, inside
    /// an ordinary committed transaction.
    fn bootstrap(&self) -> SableResult<()> {
        tracing::info!("bootstrapping system catalog");
        let tx = self.txns.start_transaction();
        let cid = self.txns.next_cid(tx)?;

        let system: [(&str, Schema); 3] = [
            (SYS_TABLES, catalog::sys_tables_schema()),
            (SYS_COLUMNS, catalog::sys_columns_schema()),
            (SYS_INDEXES, catalog::sys_indexes_schema()),
        ];

        for (name, schema) in &system {
            self.storage.create_table(name, schema.columns(), tx, cid)?;
        }
        for (name, schema) in &system {
            self.storage
                .insert_record(SYS_TABLES, catalog::table_row(name), tx, cid)?;
            for column in schema.columns() {
                self.storage.insert_record(
                    SYS_COLUMNS,
                    catalog::column_row(name, column),
                    tx,
                    cid,
                )?;
            }
        }
        self.txns.commit(tx)
    }

    /// Rebuilds in-memory schemas and index trees from the catalog
    /// tables.
    fn load_catalog(&self) -> SableResult<()> {
        let catalog = self.storage.catalog();
        catalog.register(SYS_TABLES, catalog::sys_tables_schema());
        catalog.register(SYS_COLUMNS, catalog::sys_columns_schema());
        catalog.register(SYS_INDEXES, catalog::sys_indexes_schema());

        let tx = self.txns.start_transaction();
        let cid = self.txns.next_cid(tx)?;
        let snapshot = self.txns.snapshot(tx);

        let tables = self
            .storage
            .scan_table(SYS_TABLES, tx, cid, &snapshot, &self.txns)?;
        let columns = self
            .storage
            .scan_table(SYS_COLUMNS, tx, cid, &snapshot, &self.txns)?;
        for record in &tables {
            let Some(Value::Str(name)) = record.values.first() else {
                return Err(SableError::CorruptPage("malformed sys_tables row".into()));
            };
            if catalog::is_system_table(name) {
                continue;
            }
            let mut cols = Vec::new();
            for col_record in &columns {
                let (table, column) = catalog::parse_column_row(&col_record.values)?;
                if table == *name {
                    cols.push(column);
                }
            }
            catalog.register(name.clone(), Schema::new(cols));
        }

        let indexes = self
            .storage
            .scan_table(SYS_INDEXES, tx, cid, &snapshot, &self.txns)?;
        for record in &indexes {
            let (index, table, column) = catalog::parse_index_row(&record.values)?;
            self.storage.rebuild_index(&index, &table, &column)?;
        }
        self.txns.commit(tx)?;

        tracing::info!(
            tables = catalog.table_names().len(),
            indexes = indexes.len(),
            "catalog loaded"
        );
        Ok(())
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    /// Begins an explicit transaction; its snapshot is fixed now.
    pub fn begin(&self, session: &mut Session) -> SableResult<()> {
        if session.tx.is_some() {
            return Err(SableError::tx_state("transaction already in progress"));
        }
        let tx = self.txns.start_transaction();
        let snapshot = self.txns.snapshot(tx);
        session.tx = Some((tx, snapshot));
        Ok(())
    }

    /// Commits the session's open transaction.
    pub fn commit(&self, session: &mut Session) -> SableResult<()> {
        let Some((tx, _)) = session.tx.take() else {
            return Err(SableError::tx_state("COMMIT without BEGIN"));
        };
        self.txns.commit(tx).map_err(|err| {
            // A commit that failed to reach the WAL must not leave the
            // transaction half-open.
            let _ = self.txns.rollback(tx);
            err
        })
    }

    /// Rolls back the session's open transaction.
    pub fn rollback(&self, session: &mut Session) -> SableResult<()> {
        let Some((tx, _)) = session.tx.take() else {
            return Err(SableError::tx_state("ROLLBACK without BEGIN"));
        };
        self.txns.rollback(tx)
    }

    /// Executes one plan on behalf of `session`.
    ///
    /// Inside an explicit transaction the statement gets the next command
    /// id under the transaction's snapshot, and any error rolls the whole
    /// transaction back. In auto-commit mode the statement runs in its
    /// own transaction with a fresh snapshot.
    pub fn execute(&self, session: &mut Session, plan: &Plan) -> SableResult<ResultSet> {
        let executor = Executor::new(&self.storage, &self.txns);

        if let Some((tx, snapshot)) = session.tx.clone() {
            let cid = self.txns.next_cid(tx)?;
            match executor.execute(plan, tx, cid, &snapshot) {
                Ok(result) => Ok(result),
                Err(err) => {
                    session.tx = None;
                    let _ = self.txns.rollback(tx);
                    Err(err)
                }
            }
        } else {
            let tx = self.txns.start_transaction();
            let snapshot = self.txns.snapshot(tx);
            let cid = self.txns.next_cid(tx)?;
            match executor.execute(plan, tx, cid, &snapshot) {
                Ok(result) => match self.txns.commit(tx) {
                    Ok(()) => Ok(result),
                    Err(err) => {
                        let _ = self.txns.rollback(tx);
                        Err(err)
                    }
                },
                Err(err) => {
                    let _ = self.txns.rollback(tx);
                    Err(err)
                }
            }
        }
    }

    /// Vacuums `table` under an exclusive lock in its own transaction.
    ///
    /// Vacuum checkpoints the WAL, so it refuses to run while any other
    /// transaction is active.
    pub fn vacuum(&self, table: &str) -> SableResult<usize> {
        let tx = self.txns.start_transaction();
        if let Err(err) = self.txns.lock_table(tx, table, LockMode::Exclusive) {
            let _ = self.txns.rollback(tx);
            return Err(err);
        }
        if self.txns.active_count() > 1 {
            let _ = self.txns.rollback(tx);
            return Err(SableError::tx_state(
                "vacuum requires no concurrent transactions",
            ));
        }
        match self.storage.vacuum_table(table, &self.txns) {
            Ok(reclaimed) => {
                self.txns.commit(tx)?;
                tracing::info!(table, reclaimed, "vacuum complete");
                Ok(reclaimed)
            }
            Err(err) => {
                let _ = self.txns.rollback(tx);
                Err(err)
            }
        }
    }

    /// Flushes the cache, persists the transaction-id high-water mark,
    /// and syncs the WAL.
    pub fn close(&self) -> SableResult<()> {
        self.storage.flush()?;
        self.disk
            .write_control(self.txns.next_tx_id().as_u32())?;
        self.wal.sync()?;
        tracing::info!("engine closed");
        Ok(())
    }

    /// Returns the engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the storage engine.
    #[must_use]
    pub fn storage(&self) -> &StorageEngine {
        &self.storage
    }

    /// Returns the transaction manager.
    #[must_use]
    pub fn transactions(&self) -> &TransactionManager {
        &self.txns
    }
}
