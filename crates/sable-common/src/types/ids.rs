//! Core identifier types for SableDB.
//!
//! These types provide type-safe wrappers around numeric identifiers,
//! preventing accidental misuse of different ID kinds.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Page identifier - the index of a page within a table's heap file.
///
/// Pages are numbered from 0 and never physically freed, so a `PageId`
/// remains valid for the lifetime of its table.
///
/// # Example
///
/// ```rust
/// use sable_common::types::PageId;
///
/// let page = PageId::new(42);
/// assert_eq!(page.as_u32(), 42);
/// assert_eq!(page.next(), PageId::new(43));
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct PageId(u32);

impl PageId {
    /// First page of a heap file.
    pub const FIRST: Self = Self(0);

    /// Creates a new `PageId` from a raw u32 value.
    #[inline]
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw u32 value.
    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Returns the next page id.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the byte offset of this page within its heap file.
    #[inline]
    #[must_use]
    pub const fn file_offset(self) -> u64 {
        self.0 as u64 * crate::constants::PAGE_SIZE as u64
    }
}

impl fmt::Debug for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PageId({})", self.0)
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for PageId {
    #[inline]
    fn from(id: u32) -> Self {
        Self::new(id)
    }
}

/// Slot identifier - an index into a page's item-pointer region.
pub type SlotId = u16;

/// Transaction identifier.
///
/// Transaction ids are monotonically increasing and never reused. The
/// value `0` is reserved as the "none" sentinel: a record whose `xmax`
/// is `TxId::INVALID` has not been deleted.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct TxId(u32);

impl TxId {
    /// Invalid transaction id, used as the none/invisible sentinel.
    pub const INVALID: Self = Self(0);

    /// First assignable transaction id.
    pub const FIRST: Self = Self(1);

    /// Creates a new `TxId` from a raw u32 value.
    #[inline]
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw u32 value.
    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Returns the next transaction id.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Checks that this is not the reserved sentinel.
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != Self::INVALID.0
    }
}

impl fmt::Debug for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            write!(f, "TxId(INVALID)")
        } else {
            write!(f, "TxId({})", self.0)
        }
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for TxId {
    #[inline]
    fn from(id: u32) -> Self {
        Self::new(id)
    }
}

/// Command identifier - a per-transaction counter starting at 0.
///
/// Each statement executed inside a transaction receives the next command
/// id; MVCC visibility uses it to order a transaction's own writes.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct CommandId(u32);

impl CommandId {
    /// The first command of a transaction.
    pub const FIRST: Self = Self(0);

    /// Creates a new `CommandId` from a raw u32 value.
    #[inline]
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw u32 value.
    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Returns the next command id.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Debug for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CommandId({})", self.0)
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tuple identifier - the physical locator of a record.
///
/// A `Tid` names the item-pointer slot holding a record:
/// `(table, page_id, slot)`. Tids are stable while the slot survives;
/// vacuum may renumber slots when it compacts a page.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Tid {
    /// Name of the table whose heap file holds the record.
    pub table: String,
    /// Page within the heap file.
    pub page_id: PageId,
    /// Item-pointer slot on the page.
    pub slot: SlotId,
}

impl Tid {
    /// Creates a new tuple identifier.
    #[must_use]
    pub fn new(table: impl Into<String>, page_id: PageId, slot: SlotId) -> Self {
        Self {
            table: table.into(),
            page_id,
            slot,
        }
    }
}

impl fmt::Debug for Tid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tid({}:{}:{})", self.table, self.page_id, self.slot)
    }
}

impl fmt::Display for Tid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.table, self.page_id, self.slot)
    }
}
