//! Opaque cursor tokens.
//!
//! A cursor is the ordered tuple of sort-key values of a row, serialized
//! with a compact tag-prefixed binary layout and wrapped in URL-safe
//! unpadded base64 so tokens survive headers and query strings unchanged.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use polystore_types::Value;

use crate::error::Error;

const TAG_NULL: u8 = 0;
const TAG_BOOL: u8 = 1;
const TAG_INT32: u8 = 2;
const TAG_INT64: u8 = 3;
const TAG_FLOAT32: u8 = 4;
const TAG_FLOAT64: u8 = 5;
const TAG_STRING: u8 = 6;
const TAG_BYTES: u8 = 7;
const TAG_TIMESTAMP: u8 = 8;
const TAG_UUID: u8 = 9;

/// Encode an ordered value tuple into an opaque token.
pub fn encode(values: &[Value]) -> Result<String, Error> {
    if values.len() > u16::MAX as usize {
        return Err(Error::CursorEncode("too many cursor values".into()));
    }

    let mut buf = Vec::with_capacity(8 + values.len() * 9);
    buf.extend_from_slice(&(values.len() as u16).to_le_bytes());
    for value in values {
        write_value(&mut buf, value)?;
    }

    Ok(URL_SAFE_NO_PAD.encode(buf))
}

/// Decode a token back into its value tuple.
///
/// An empty token decodes to an empty tuple, meaning "no cursor".
pub fn decode(token: &str) -> Result<Vec<Value>, Error> {
    if token.is_empty() {
        return Ok(Vec::new());
    }

    let bytes = URL_SAFE_NO_PAD
        .decode(token)
        .map_err(|e| Error::CursorDecode(e.to_string()))?;

    let mut reader = Reader::new(&bytes);
    let count = reader.read_u16()? as usize;
    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        values.push(read_value(&mut reader)?);
    }

    if !reader.is_empty() {
        return Err(Error::CursorDecode("trailing bytes after values".into()));
    }

    Ok(values)
}

fn write_value(buf: &mut Vec<u8>, value: &Value) -> Result<(), Error> {
    match value {
        Value::Null => buf.push(TAG_NULL),
        Value::Bool(b) => {
            buf.push(TAG_BOOL);
            buf.push(u8::from(*b));
        }
        Value::Int32(n) => {
            buf.push(TAG_INT32);
            buf.extend_from_slice(&n.to_le_bytes());
        }
        Value::Int64(n) => {
            buf.push(TAG_INT64);
            buf.extend_from_slice(&n.to_le_bytes());
        }
        Value::Float32(f) => {
            buf.push(TAG_FLOAT32);
            buf.extend_from_slice(&f.to_le_bytes());
        }
        Value::Float64(f) => {
            buf.push(TAG_FLOAT64);
            buf.extend_from_slice(&f.to_le_bytes());
        }
        Value::String(s) => {
            if s.len() > u32::MAX as usize {
                return Err(Error::CursorEncode("string too long".into()));
            }
            buf.push(TAG_STRING);
            buf.extend_from_slice(&(s.len() as u32).to_le_bytes());
            buf.extend_from_slice(s.as_bytes());
        }
        Value::Bytes(b) => {
            if b.len() > u32::MAX as usize {
                return Err(Error::CursorEncode("bytes too long".into()));
            }
            buf.push(TAG_BYTES);
            buf.extend_from_slice(&(b.len() as u32).to_le_bytes());
            buf.extend_from_slice(b);
        }
        Value::Timestamp(t) => {
            buf.push(TAG_TIMESTAMP);
            buf.extend_from_slice(&t.to_le_bytes());
        }
        Value::Uuid(u) => {
            buf.push(TAG_UUID);
            buf.extend_from_slice(u);
        }
    }
    Ok(())
}

fn read_value(reader: &mut Reader<'_>) -> Result<Value, Error> {
    let tag = reader.read_u8()?;
    let value = match tag {
        TAG_NULL => Value::Null,
        TAG_BOOL => Value::Bool(reader.read_u8()? != 0),
        TAG_INT32 => Value::Int32(i32::from_le_bytes(reader.read_array()?)),
        TAG_INT64 => Value::Int64(i64::from_le_bytes(reader.read_array()?)),
        TAG_FLOAT32 => Value::Float32(f32::from_le_bytes(reader.read_array()?)),
        TAG_FLOAT64 => Value::Float64(f64::from_le_bytes(reader.read_array()?)),
        TAG_STRING => {
            let len = u32::from_le_bytes(reader.read_array()?) as usize;
            let raw = reader.take(len)?;
            let s = std::str::from_utf8(raw)
                .map_err(|_| Error::CursorDecode("invalid UTF-8 in string value".into()))?;
            Value::String(s.to_string())
        }
        TAG_BYTES => {
            let len = u32::from_le_bytes(reader.read_array()?) as usize;
            Value::Bytes(reader.take(len)?.to_vec())
        }
        TAG_TIMESTAMP => Value::Timestamp(i64::from_le_bytes(reader.read_array()?)),
        TAG_UUID => Value::Uuid(reader.read_array()?),
        other => return Err(Error::CursorDecode(format!("unknown value tag {other}"))),
    };
    Ok(value)
}

/// Bounds-checked sequential reader over the token payload.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn is_empty(&self) -> bool {
        self.pos == self.buf.len()
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], Error> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.buf.len())
            .ok_or_else(|| Error::CursorDecode("truncated token".into()))?;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8, Error> {
        Ok(self.take(1)?[0])
    }

    fn read_u16(&mut self) -> Result<u16, Error> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], Error> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_heterogeneous_tuple() {
        let values = vec![
            Value::String("Alice".into()),
            Value::Int64(42),
            Value::Timestamp(1_700_000_000_000_000),
            Value::Uuid([7u8; 16]),
            Value::Null,
            Value::Bool(true),
            Value::Float64(2.75),
            Value::Bytes(vec![0, 1, 255]),
        ];

        let token = encode(&values).unwrap();
        assert_eq!(decode(&token).unwrap(), values);
    }

    #[test]
    fn test_empty_token_means_no_cursor() {
        assert_eq!(decode("").unwrap(), Vec::<Value>::new());
    }

    #[test]
    fn test_empty_tuple_round_trip() {
        let token = encode(&[]).unwrap();
        assert!(!token.is_empty());
        assert_eq!(decode(&token).unwrap(), Vec::<Value>::new());
    }

    #[test]
    fn test_token_is_url_safe() {
        let values = vec![Value::Bytes((0..=255).collect())];
        let token = encode(&values).unwrap();
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_malformed_tokens_fail() {
        assert!(matches!(decode("not!base64!"), Err(Error::CursorDecode(_))));

        // Valid base64 but truncated payload.
        let truncated = URL_SAFE_NO_PAD.encode([2u8, 0, TAG_INT64]);
        assert!(matches!(decode(&truncated), Err(Error::CursorDecode(_))));

        // Trailing garbage after the declared values.
        let mut buf = vec![0u8, 0];
        buf.push(99);
        let trailing = URL_SAFE_NO_PAD.encode(buf);
        assert!(matches!(decode(&trailing), Err(Error::CursorDecode(_))));
    }

    #[test]
    fn test_unknown_tag_fails() {
        let buf = vec![1u8, 0, 200];
        let token = URL_SAFE_NO_PAD.encode(buf);
        assert!(matches!(decode(&token), Err(Error::CursorDecode(_))));
    }
}
