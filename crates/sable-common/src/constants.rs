//! System-wide constants for SableDB.

// =============================================================================
// Page geometry
// =============================================================================

/// Size of every heap page in bytes.
pub const PAGE_SIZE: usize = 4096;

/// Size of the page header in bytes.
///
/// The header contains: pd_lower (2), pd_upper (2), item_count (2),
/// special_size (2) = 8 bytes.
pub const PAGE_HEADER_SIZE: usize = 8;

/// Size of an item pointer in the slot region.
///
/// Each item pointer contains: offset (2), length (2) = 4 bytes.
pub const ITEM_POINTER_SIZE: usize = 4;

/// Maximum number of item pointers a single page may carry.
pub const MAX_ITEM_POINTERS: usize = 128;

// =============================================================================
// Defaults
// =============================================================================

/// Default number of pages the buffer cache may hold at once.
pub const DEFAULT_CACHE_CAPACITY: usize = 64;

/// Default B+tree fan-out: the maximum number of keys per node before a
/// split, and one less than the maximum number of children.
pub const DEFAULT_BTREE_DEGREE: usize = 4;

// =============================================================================
// On-disk names
// =============================================================================

/// Directory holding table files, the WAL, and the control file.
pub const DATA_DIR: &str = "data";

/// File extension for heap table files.
pub const TABLE_FILE_EXT: &str = "tbl";

/// Name of the write-ahead log file inside the data directory.
pub const WAL_FILE: &str = "wal.log";

/// Name of the control file persisting the transaction id high-water mark.
pub const CONTROL_FILE: &str = "control";
