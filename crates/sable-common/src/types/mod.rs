//! Core types shared across SableDB components.

mod ids;
mod schema;
mod value;

pub use ids::{CommandId, PageId, SlotId, Tid, TxId};
pub use schema::{Column, Schema};
pub use value::{DataType, Value};
