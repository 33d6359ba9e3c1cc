//! Runtime values and their byte codec.
//!
//! A [`Value`] is one cell of a record. Values are serialized as a tag
//! byte followed by a type-specific payload:
//!
//! ```text
//! tag  payload
//! ---  -------
//!  0   i32, little-endian                  (INT)
//!  1   u32 length, little-endian + UTF-8   (STRING)
//!  2   (empty)                             (NULL)
//! ```

use std::cmp::Ordering;
use std::fmt;

use bytes::{Buf, BufMut, BytesMut};
use serde::{Deserialize, Serialize};

use crate::error::{SableError, SableResult};

/// Column data types.
///
/// The numeric representation is what the catalog stores in
/// `sys_columns.column_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum DataType {
    /// Signed 32-bit integer.
    Int = 0,
    /// UTF-8 string.
    Str = 1,
}

impl DataType {
    /// Returns the catalog representation of this type.
    #[inline]
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self as i32
    }

    /// Creates a data type from its catalog representation.
    pub fn from_i32(value: i32) -> SableResult<Self> {
        match value {
            0 => Ok(Self::Int),
            1 => Ok(Self::Str),
            _ => Err(SableError::Semantic(format!(
                "unknown column type {value}"
            ))),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Int => write!(f, "INT"),
            DataType::Str => write!(f, "STRING"),
        }
    }
}

/// Value tags used by the byte codec.
const TAG_INT: u8 = 0;
const TAG_STRING: u8 = 1;
const TAG_NULL: u8 = 2;

/// A runtime value: one cell of a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    /// NULL.
    Null,
    /// Signed 32-bit integer.
    Int(i32),
    /// UTF-8 string.
    Str(String),
}

impl Value {
    /// Returns true if this value is NULL.
    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the data type of this value, or `None` for NULL.
    #[must_use]
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Value::Null => None,
            Value::Int(_) => Some(DataType::Int),
            Value::Str(_) => Some(DataType::Str),
        }
    }

    /// Returns true if this value may be stored in a column of `ty`.
    ///
    /// NULL is storable in any column type; NOT NULL enforcement is a
    /// separate schema-level check.
    #[must_use]
    pub fn matches(&self, ty: DataType) -> bool {
        match self {
            Value::Null => true,
            Value::Int(_) => ty == DataType::Int,
            Value::Str(_) => ty == DataType::Str,
        }
    }

    /// Compares two values of the same type.
    ///
    /// Returns `None` when either side is NULL or the types differ;
    /// cross-type comparisons never match.
    #[must_use]
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Returns the string encoding used as a B+tree index key, or `None`
    /// for NULL (NULLs are not indexed).
    #[must_use]
    pub fn index_key(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Int(i) => Some(i.to_string()),
            Value::Str(s) => Some(s.clone()),
        }
    }

    /// Serializes this value onto `buf`.
    pub fn encode(&self, buf: &mut BytesMut) {
        match self {
            Value::Null => buf.put_u8(TAG_NULL),
            Value::Int(i) => {
                buf.put_u8(TAG_INT);
                buf.put_i32_le(*i);
            }
            Value::Str(s) => {
                buf.put_u8(TAG_STRING);
                buf.put_u32_le(s.len() as u32);
                buf.put_slice(s.as_bytes());
            }
        }
    }

    /// Deserializes one value from the front of `buf`, consuming it.
    ///
    /// Fails with [`SableError::CorruptPage`] when the tag is unknown, a
    /// string length runs past the buffer, or the payload is truncated.
    pub fn decode(buf: &mut &[u8]) -> SableResult<Value> {
        if !buf.has_remaining() {
            return Err(SableError::CorruptPage(
                "value truncated: missing tag byte".into(),
            ));
        }
        match buf.get_u8() {
            TAG_NULL => Ok(Value::Null),
            TAG_INT => {
                if buf.remaining() < 4 {
                    return Err(SableError::CorruptPage(
                        "value truncated: INT payload".into(),
                    ));
                }
                Ok(Value::Int(buf.get_i32_le()))
            }
            TAG_STRING => {
                if buf.remaining() < 4 {
                    return Err(SableError::CorruptPage(
                        "value truncated: STRING length".into(),
                    ));
                }
                let len = buf.get_u32_le() as usize;
                if buf.remaining() < len {
                    return Err(SableError::CorruptPage(format!(
                        "string length {len} exceeds record body ({} bytes left)",
                        buf.remaining()
                    )));
                }
                let bytes = buf.copy_to_bytes(len);
                let s = String::from_utf8(bytes.to_vec())
                    .map_err(|e| SableError::CorruptPage(format!("invalid UTF-8: {e}")))?;
                Ok(Value::Str(s))
            }
            tag => Err(SableError::CorruptPage(format!("unknown value tag {tag}"))),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Str(s) => write!(f, "{s}"),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(value: &Value) -> Value {
        let mut buf = BytesMut::new();
        value.encode(&mut buf);
        let mut slice = &buf[..];
        let decoded = Value::decode(&mut slice).unwrap();
        assert!(slice.is_empty(), "decode must consume the full encoding");
        decoded
    }

    #[test]
    fn test_round_trip() {
        assert_eq!(round_trip(&Value::Null), Value::Null);
        assert_eq!(round_trip(&Value::Int(-42)), Value::Int(-42));
        assert_eq!(
            round_trip(&Value::Str("张三".into())),
            Value::Str("张三".into())
        );
    }

    #[test]
    fn test_compare_same_type() {
        assert_eq!(
            Value::Int(1).compare(&Value::Int(2)),
            Some(Ordering::Less)
        );
        assert_eq!(
            Value::Str("b".into()).compare(&Value::Str("a".into())),
            Some(Ordering::Greater)
        );
    }

    #[test]
    fn test_compare_cross_type_is_none() {
        assert_eq!(Value::Int(1).compare(&Value::Str("1".into())), None);
        assert_eq!(Value::Null.compare(&Value::Null), None);
        assert_eq!(Value::Null.compare(&Value::Int(0)), None);
    }

    #[test]
    fn test_decode_unknown_tag() {
        let buf = [9u8];
        let mut slice = &buf[..];
        assert!(matches!(
            Value::decode(&mut slice),
            Err(SableError::CorruptPage(_))
        ));
    }

    #[test]
    fn test_decode_string_length_overrun() {
        let mut buf = BytesMut::new();
        buf.put_u8(1);
        buf.put_u32_le(100); // claims 100 bytes, none follow
        let mut slice = &buf[..];
        assert!(matches!(
            Value::decode(&mut slice),
            Err(SableError::CorruptPage(_))
        ));
    }

    #[test]
    fn test_index_key() {
        assert_eq!(Value::Int(7).index_key().as_deref(), Some("7"));
        assert_eq!(Value::Str("k".into()).index_key().as_deref(), Some("k"));
        assert_eq!(Value::Null.index_key(), None);
    }

    #[test]
    fn test_matches() {
        assert!(Value::Int(1).matches(DataType::Int));
        assert!(!Value::Int(1).matches(DataType::Str));
        assert!(Value::Null.matches(DataType::Int));
        assert!(Value::Null.matches(DataType::Str));
    }

    #[test]
    fn test_data_type_catalog_repr() {
        assert_eq!(DataType::from_i32(0).unwrap(), DataType::Int);
        assert_eq!(DataType::from_i32(1).unwrap(), DataType::Str);
        assert!(DataType::from_i32(9).is_err());
        assert_eq!(DataType::Str.as_i32(), 1);
    }
}
