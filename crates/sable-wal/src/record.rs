//! WAL record types and the text line codec.
//!
//! Line formats:
//!
//! ```text
//! <tx> INSERT <table> <page> <slot> <hex record bytes>
//! <tx> UPDATE <table> <page> <slot> <xmax>
//! <tx> DELETE <table> <page> <slot> <xmax>
//! <tx> CREATE_TABLE <table>
//! <tx> CREATE_INDEX <index> <table> <column>
//! <tx> DROP_TABLE <table>
//! <tx> DROP_INDEX <index>
//! <tx> COMMIT
//! <tx> ROLLBACK
//! ```

use std::fmt;

use sable_common::{PageId, SableError, SableResult, SlotId, TxId};

/// One parsed WAL entry with its transaction id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalRecord {
    /// The transaction that produced the entry.
    pub tx_id: TxId,
    /// The logged operation.
    pub entry: WalEntry,
}

/// The operation payload of a WAL entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalEntry {
    /// A record was placed at a tid; carries the full record bytes so
    /// redo can re-place it.
    Insert {
        /// Table name.
        table: String,
        /// Page the record was placed on.
        page_id: PageId,
        /// Slot the record occupies.
        slot: SlotId,
        /// The encoded record body.
        record: Vec<u8>,
    },
    /// An update stamped `xmax` on the superseded version at a tid.
    Update {
        /// Table name.
        table: String,
        /// Page of the superseded version.
        page_id: PageId,
        /// Slot of the superseded version.
        slot: SlotId,
        /// The stamping transaction.
        xmax: TxId,
    },
    /// A delete stamped `xmax` at a tid.
    Delete {
        /// Table name.
        table: String,
        /// Page of the deleted record.
        page_id: PageId,
        /// Slot of the deleted record.
        slot: SlotId,
        /// The stamping transaction.
        xmax: TxId,
    },
    /// A table was created.
    CreateTable {
        /// Table name.
        table: String,
    },
    /// An index was registered.
    CreateIndex {
        /// Index name.
        index: String,
        /// Indexed table.
        table: String,
        /// Indexed column.
        column: String,
    },
    /// A table was dropped.
    DropTable {
        /// Table name.
        table: String,
    },
    /// An index was dropped.
    DropIndex {
        /// Index name.
        index: String,
    },
    /// The transaction committed.
    Commit,
    /// The transaction rolled back.
    Rollback,
}

impl WalEntry {
    /// Returns the operation name as written on the log line.
    #[must_use]
    pub fn op(&self) -> &'static str {
        match self {
            WalEntry::Insert { .. } => "INSERT",
            WalEntry::Update { .. } => "UPDATE",
            WalEntry::Delete { .. } => "DELETE",
            WalEntry::CreateTable { .. } => "CREATE_TABLE",
            WalEntry::CreateIndex { .. } => "CREATE_INDEX",
            WalEntry::DropTable { .. } => "DROP_TABLE",
            WalEntry::DropIndex { .. } => "DROP_INDEX",
            WalEntry::Commit => "COMMIT",
            WalEntry::Rollback => "ROLLBACK",
        }
    }
}

impl WalRecord {
    /// Creates a record.
    #[must_use]
    pub fn new(tx_id: TxId, entry: WalEntry) -> Self {
        Self { tx_id, entry }
    }

    /// Formats the record as one log line (no trailing newline).
    #[must_use]
    pub fn encode_line(&self) -> String {
        let tx = self.tx_id;
        match &self.entry {
            WalEntry::Insert {
                table,
                page_id,
                slot,
                record,
            } => format!(
                "{tx} INSERT {table} {page_id} {slot} {}",
                hex::encode(record)
            ),
            WalEntry::Update {
                table,
                page_id,
                slot,
                xmax,
            } => format!("{tx} UPDATE {table} {page_id} {slot} {xmax}"),
            WalEntry::Delete {
                table,
                page_id,
                slot,
                xmax,
            } => format!("{tx} DELETE {table} {page_id} {slot} {xmax}"),
            WalEntry::CreateTable { table } => format!("{tx} CREATE_TABLE {table}"),
            WalEntry::CreateIndex {
                index,
                table,
                column,
            } => format!("{tx} CREATE_INDEX {index} {table} {column}"),
            WalEntry::DropTable { table } => format!("{tx} DROP_TABLE {table}"),
            WalEntry::DropIndex { index } => format!("{tx} DROP_INDEX {index}"),
            WalEntry::Commit => format!("{tx} COMMIT"),
            WalEntry::Rollback => format!("{tx} ROLLBACK"),
        }
    }

    /// Parses one log line.
    pub fn parse_line(line: &str) -> SableResult<Self> {
        let mut parts = line.split_whitespace();
        let tx_id = parse_u32(parts.next(), line, "tx id").map(TxId::new)?;
        let op = parts
            .next()
            .ok_or_else(|| corrupt(line, "missing operation"))?;

        let entry = match op {
            "INSERT" => {
                let table = required(parts.next(), line, "table")?;
                let page_id = parse_u32(parts.next(), line, "page id").map(PageId::new)?;
                let slot = parse_u16(parts.next(), line, "slot")?;
                let body = required(parts.next(), line, "record bytes")?;
                let record = hex::decode(body)
                    .map_err(|e| corrupt(line, &format!("bad record hex: {e}")))?;
                WalEntry::Insert {
                    table,
                    page_id,
                    slot,
                    record,
                }
            }
            "UPDATE" | "DELETE" => {
                let table = required(parts.next(), line, "table")?;
                let page_id = parse_u32(parts.next(), line, "page id").map(PageId::new)?;
                let slot = parse_u16(parts.next(), line, "slot")?;
                let xmax = parse_u32(parts.next(), line, "xmax").map(TxId::new)?;
                if op == "UPDATE" {
                    WalEntry::Update {
                        table,
                        page_id,
                        slot,
                        xmax,
                    }
                } else {
                    WalEntry::Delete {
                        table,
                        page_id,
                        slot,
                        xmax,
                    }
                }
            }
            "CREATE_TABLE" => WalEntry::CreateTable {
                table: required(parts.next(), line, "table")?,
            },
            "CREATE_INDEX" => WalEntry::CreateIndex {
                index: required(parts.next(), line, "index")?,
                table: required(parts.next(), line, "table")?,
                column: required(parts.next(), line, "column")?,
            },
            "DROP_TABLE" => WalEntry::DropTable {
                table: required(parts.next(), line, "table")?,
            },
            "DROP_INDEX" => WalEntry::DropIndex {
                index: required(parts.next(), line, "index")?,
            },
            "COMMIT" => WalEntry::Commit,
            "ROLLBACK" => WalEntry::Rollback,
            other => return Err(corrupt(line, &format!("unknown operation '{other}'"))),
        };

        Ok(Self { tx_id, entry })
    }
}

impl fmt::Display for WalRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode_line())
    }
}

fn corrupt(line: &str, reason: &str) -> SableError {
    SableError::CorruptWal(format!("{reason} in line '{line}'"))
}

fn required(part: Option<&str>, line: &str, what: &str) -> SableResult<String> {
    part.map(str::to_string)
        .ok_or_else(|| corrupt(line, &format!("missing {what}")))
}

fn parse_u32(part: Option<&str>, line: &str, what: &str) -> SableResult<u32> {
    part.ok_or_else(|| corrupt(line, &format!("missing {what}")))?
        .parse()
        .map_err(|_| corrupt(line, &format!("bad {what}")))
}

fn parse_u16(part: Option<&str>, line: &str, what: &str) -> SableResult<u16> {
    part.ok_or_else(|| corrupt(line, &format!("missing {what}")))?
        .parse()
        .map_err(|_| corrupt(line, &format!("bad {what}")))
}
