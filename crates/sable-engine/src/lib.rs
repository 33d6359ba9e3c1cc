//! # sable-engine
//!
//! The SableDB storage engine and plan executor.
//!
//! This crate ties the lower layers together into a working database
//! core:
//!
//! - [`codec`]: the heap record format (`xmin`/`xmax`/`cid` header plus
//!   tagged column values)
//! - [`catalog`]: the system tables (`sys_tables`, `sys_columns`,
//!   `sys_indexes`) and the in-memory schema registry recovered from them
//! - [`heap`]: heap file operations - insert, MVCC scan, delete, update,
//!   index maintenance, vacuum - over the buffer cache
//! - [`visibility`]: the MVCC visibility predicate
//! - [`filter`]: AND-conjunction WHERE evaluation
//! - [`plan`] / [`executor`] / [`result`]: the logical plan tree produced
//!   by an external planner and its interpreter
//! - [`recovery`]: WAL replay (redo committed, undo the rest)
//! - [`engine`]: the [`Engine`] facade owning startup, sessions, and
//!   shutdown
//!
//! ## Example
//!
//! ```no_run
//! use sable_common::{Column, DataType, EngineConfig, Value};
//! use sable_engine::{Engine, Plan, Session};
//!
//! # fn main() -> sable_common::SableResult<()> {
//! let engine = Engine::open(EngineConfig::new("data"))?;
//! let mut session = Session::new();
//!
//! engine.execute(&mut session, &Plan::CreateTable {
//!     table: "users".into(),
//!     columns: vec![
//!         Column::not_null("id", DataType::Int),
//!         Column::nullable("name", DataType::Str),
//!     ],
//! })?;
//! engine.execute(&mut session, &Plan::Insert {
//!     table: "users".into(),
//!     rows: vec![vec![Value::Int(1), Value::Str("ada".into())]],
//! })?;
//! let result = engine.execute(&mut session, &Plan::SeqScan { table: "users".into() })?;
//! assert_eq!(result.rows.len(), 1);
//! engine.close()?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod catalog;
pub mod codec;
pub mod engine;
pub mod executor;
pub mod filter;
pub mod heap;
pub mod plan;
pub mod recovery;
pub mod result;
pub mod visibility;

pub use engine::{Engine, Session};
pub use filter::{CompareOp, WhereCondition};
pub use plan::Plan;
pub use result::ResultSet;
