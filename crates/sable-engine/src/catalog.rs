//! The system catalog.
//!
//! Schemas are persisted as ordinary rows in three system tables and
//! recovered through the regular scan path at startup:
//!
//! - `sys_tables(table_name)`
//! - `sys_columns(table_name, column_name, column_type, not_null)`
//! - `sys_indexes(index_name, table_name, column_name)`
//!
//! Bootstrapping writes the catalog's own schema into these tables, so a
//! fresh data directory becomes self-describing.

use std::collections::HashMap;

use parking_lot::RwLock;

use sable_common::{Column, DataType, SableError, SableResult, Schema, Value};

/// Name of the table registry.
pub const SYS_TABLES: &str = "sys_tables";
/// Name of the column registry.
pub const SYS_COLUMNS: &str = "sys_columns";
/// Name of the index registry.
pub const SYS_INDEXES: &str = "sys_indexes";

/// Returns true for the catalog's own tables.
#[must_use]
pub fn is_system_table(name: &str) -> bool {
    name == SYS_TABLES || name == SYS_COLUMNS || name == SYS_INDEXES
}

/// Schema of `sys_tables`.
#[must_use]
pub fn sys_tables_schema() -> Schema {
    Schema::new(vec![Column::not_null("table_name", DataType::Str)])
}

/// Schema of `sys_columns`.
#[must_use]
pub fn sys_columns_schema() -> Schema {
    Schema::new(vec![
        Column::not_null("table_name", DataType::Str),
        Column::not_null("column_name", DataType::Str),
        Column::not_null("column_type", DataType::Int),
        Column::not_null("not_null", DataType::Int),
    ])
}

/// Schema of `sys_indexes`.
#[must_use]
pub fn sys_indexes_schema() -> Schema {
    Schema::new(vec![
        Column::not_null("index_name", DataType::Str),
        Column::not_null("table_name", DataType::Str),
        Column::not_null("column_name", DataType::Str),
    ])
}

/// Builds the `sys_tables` row for `table`.
#[must_use]
pub fn table_row(table: &str) -> Vec<Value> {
    vec![Value::Str(table.to_string())]
}

/// Builds the `sys_columns` row for one column of `table`.
#[must_use]
pub fn column_row(table: &str, column: &Column) -> Vec<Value> {
    vec![
        Value::Str(table.to_string()),
        Value::Str(column.name.clone()),
        Value::Int(column.data_type.as_i32()),
        Value::Int(i32::from(column.not_null)),
    ]
}

/// Parses a `sys_columns` row back into a column definition, returning
/// the owning table name alongside it.
pub fn parse_column_row(values: &[Value]) -> SableResult<(String, Column)> {
    match values {
        [Value::Str(table), Value::Str(name), Value::Int(ty), Value::Int(not_null)] => Ok((
            table.clone(),
            Column {
                name: name.clone(),
                data_type: DataType::from_i32(*ty)?,
                not_null: *not_null != 0,
            },
        )),
        _ => Err(SableError::CorruptPage(
            "malformed sys_columns row".into(),
        )),
    }
}

/// Builds the `sys_indexes` row for an index.
#[must_use]
pub fn index_row(index: &str, table: &str, column: &str) -> Vec<Value> {
    vec![
        Value::Str(index.to_string()),
        Value::Str(table.to_string()),
        Value::Str(column.to_string()),
    ]
}

/// Parses a `sys_indexes` row into `(index, table, column)`.
pub fn parse_index_row(values: &[Value]) -> SableResult<(String, String, String)> {
    match values {
        [Value::Str(index), Value::Str(table), Value::Str(column)] => {
            Ok((index.clone(), table.clone(), column.clone()))
        }
        _ => Err(SableError::CorruptPage(
            "malformed sys_indexes row".into(),
        )),
    }
}

/// The in-memory schema registry, rebuilt from the system tables at
/// startup.
#[derive(Debug, Default)]
pub struct Catalog {
    schemas: RwLock<HashMap<String, Schema>>,
}

impl Catalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a table schema.
    pub fn register(&self, table: impl Into<String>, schema: Schema) {
        self.schemas.write().insert(table.into(), schema);
    }

    /// Removes a table.
    pub fn remove(&self, table: &str) {
        self.schemas.write().remove(table);
    }

    /// Returns true if `table` is registered.
    #[must_use]
    pub fn exists(&self, table: &str) -> bool {
        self.schemas.read().contains_key(table)
    }

    /// Returns the schema of `table`.
    pub fn get(&self, table: &str) -> SableResult<Schema> {
        self.schemas
            .read()
            .get(table)
            .cloned()
            .ok_or_else(|| SableError::TableNotFound(table.to_string()))
    }

    /// Lists registered tables in sorted order.
    #[must_use]
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.schemas.read().keys().cloned().collect();
        names.sort();
        names
    }
}
