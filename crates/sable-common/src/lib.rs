//! # sable-common
//!
//! Common types, errors, and configuration for SableDB.
//!
//! This crate provides the foundational vocabulary shared by every SableDB
//! component:
//!
//! - **Types**: core identifiers (`PageId`, `TxId`, `CommandId`, `Tid`),
//!   runtime values (`Value`, `DataType`) and their byte codec, and table
//!   schemas (`Column`, `Schema`)
//! - **Errors**: the unified [`SableError`] type and [`SableResult`] alias
//! - **Config**: the [`EngineConfig`] structure
//! - **Constants**: page geometry and system-wide defaults
//!
//! ## Example
//!
//! ```rust
//! use sable_common::types::{DataType, PageId, Tid, TxId, Value};
//! use sable_common::SableResult;
//!
//! fn example() -> SableResult<()> {
//!     let tid = Tid::new("users", PageId::new(0), 3);
//!     let value = Value::Str("hello".into());
//!     assert_eq!(value.data_type(), Some(DataType::Str));
//!     assert!(TxId::new(1).is_valid());
//!     assert_eq!(tid.slot, 3);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod constants;
pub mod error;
pub mod types;

// Re-export commonly used items at the crate root
pub use config::EngineConfig;
pub use constants::*;
pub use error::{SableError, SableResult};
pub use types::{Column, CommandId, DataType, PageId, Schema, SlotId, Tid, TxId, Value};
