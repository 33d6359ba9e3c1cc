//! Heap record codec.
//!
//! # Record Layout
//!
//! ```text
//! Offset  Size  Field
//! ------  ----  -----
//!   0       2   total record length (u16 LE, includes this prefix)
//!   2       4   xmin (u32 LE) - creating transaction
//!   6       4   xmax (u32 LE) - deleting transaction, 0 if live
//!  10       4   cid  (u32 LE) - command id within the creating tx
//!  14       …   tagged column values (see the value codec)
//! ```
//!
//! The length prefix lets a record survive schema skew: decoding reads at
//! most `schema.len()` values and never past the recorded length.

use bytes::{Buf, BufMut, BytesMut};

use sable_common::{CommandId, SableError, SableResult, TxId, Value};

/// Byte offset of `xmax` within an encoded record.
pub const XMAX_OFFSET: usize = 6;

/// Size of the record header (length prefix + xmin + xmax + cid).
pub const RECORD_HEADER_SIZE: usize = 14;

/// One heap tuple: MVCC header plus column values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Creating transaction.
    pub xmin: TxId,
    /// Deleting transaction; `TxId::INVALID` while the record is live.
    pub xmax: TxId,
    /// Command id within the creating transaction.
    pub cid: CommandId,
    /// Column values in schema order.
    pub values: Vec<Value>,
}

impl Record {
    /// Creates a freshly inserted record stamped for `(xmin, cid)`.
    #[must_use]
    pub fn new(xmin: TxId, cid: CommandId, values: Vec<Value>) -> Self {
        Self {
            xmin,
            xmax: TxId::INVALID,
            cid,
            values,
        }
    }

    /// Serializes the record, prefixed with its total length.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::new();
        buf.put_u16_le(0); // patched below
        buf.put_u32_le(self.xmin.as_u32());
        buf.put_u32_le(self.xmax.as_u32());
        buf.put_u32_le(self.cid.as_u32());
        for value in &self.values {
            value.encode(&mut buf);
        }
        let len = buf.len() as u16;
        buf[0..2].copy_from_slice(&len.to_le_bytes());
        buf.to_vec()
    }

    /// Decodes a record from its slot bytes, reading at most
    /// `column_count` values.
    ///
    /// Fails with [`SableError::CorruptPage`] when the length header
    /// exceeds the slot length or a value is malformed.
    pub fn decode(bytes: &[u8], column_count: usize) -> SableResult<Self> {
        if bytes.len() < RECORD_HEADER_SIZE {
            return Err(SableError::CorruptPage(format!(
                "record of {} bytes is shorter than its header",
                bytes.len()
            )));
        }
        let mut buf = bytes;
        let len = buf.get_u16_le() as usize;
        if len < RECORD_HEADER_SIZE || len > bytes.len() {
            return Err(SableError::CorruptPage(format!(
                "record length header {len} exceeds slot length {}",
                bytes.len()
            )));
        }

        let xmin = TxId::new(buf.get_u32_le());
        let xmax = TxId::new(buf.get_u32_le());
        let cid = CommandId::new(buf.get_u32_le());

        let mut body = &bytes[RECORD_HEADER_SIZE..len];
        let mut values = Vec::with_capacity(column_count);
        for _ in 0..column_count {
            if !body.has_remaining() {
                break;
            }
            values.push(Value::decode(&mut body)?);
        }

        Ok(Self {
            xmin,
            xmax,
            cid,
            values,
        })
    }
}

/// Stamps `xmax` into an encoded record in place.
pub fn stamp_xmax(record_bytes: &mut [u8], xmax: TxId) -> SableResult<()> {
    if record_bytes.len() < RECORD_HEADER_SIZE {
        return Err(SableError::CorruptPage(
            "record too short to stamp xmax".into(),
        ));
    }
    record_bytes[XMAX_OFFSET..XMAX_OFFSET + 4].copy_from_slice(&xmax.as_u32().to_le_bytes());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Record {
        Record::new(
            TxId::new(7),
            CommandId::new(2),
            vec![Value::Int(1), Value::Str("张三".into()), Value::Null],
        )
    }

    #[test]
    fn test_round_trip() {
        let record = sample();
        let bytes = record.encode();
        let decoded = Record::decode(&bytes, 3).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_length_prefix_matches() {
        let bytes = sample().encode();
        let len = u16::from_le_bytes([bytes[0], bytes[1]]) as usize;
        assert_eq!(len, bytes.len());
    }

    #[test]
    fn test_schema_skew_reads_fewer_columns() {
        let bytes = sample().encode();
        // A reader whose schema has only two columns stops early.
        let decoded = Record::decode(&bytes, 2).unwrap();
        assert_eq!(decoded.values.len(), 2);
        // A reader expecting more columns than stored gets what exists.
        let decoded = Record::decode(&bytes, 5).unwrap();
        assert_eq!(decoded.values.len(), 3);
    }

    #[test]
    fn test_bad_length_header() {
        let mut bytes = sample().encode();
        let bogus = (bytes.len() + 10) as u16;
        bytes[0..2].copy_from_slice(&bogus.to_le_bytes());
        assert!(matches!(
            Record::decode(&bytes, 3),
            Err(SableError::CorruptPage(_))
        ));
        assert!(Record::decode(&[0u8; 4], 1).is_err());
    }

    #[test]
    fn test_stamp_xmax() {
        let record = sample();
        let mut bytes = record.encode();
        stamp_xmax(&mut bytes, TxId::new(99)).unwrap();
        let decoded = Record::decode(&bytes, 3).unwrap();
        assert_eq!(decoded.xmax, TxId::new(99));
        assert_eq!(decoded.xmin, record.xmin);
        assert_eq!(decoded.values, record.values);
    }
}
