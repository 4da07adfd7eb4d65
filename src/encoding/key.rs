//! # Byte-Comparable Key Encoding
//!
//! This module provides the persistent key encoding used for HKeys and index
//! keys. Encoded keys compare with a single `memcmp` in the same order that
//! `Value::compare_for_sort` and `HKey::compare_to` define, so the storage
//! layer can order rows without decoding them.
//!
//! ## Type Prefix Scheme
//!
//! Each encoded value starts with a type prefix byte that determines sort
//! order between different types:
//!
//! ```text
//! 0x01       NULL
//! 0x02-0x03  Booleans (FALSE < TRUE)
//! 0x10-0x19  Numbers (NEG_INFINITY < negatives < ZERO < positives < POS_INFINITY < NAN)
//! 0x20-0x21  Strings (TEXT < BLOB)
//! 0xFF       MAX_KEY (sentinel for range scans)
//! ```
//!
//! ## Number Encoding Strategy
//!
//! Integers of every width are encoded as i64:
//!
//! - Negative integers: NEG_INT prefix (0x12) + two's complement big-endian
//! - Zero: ZERO prefix (0x14) only
//! - Positive integers: POS_INT prefix (0x16) + big-endian bytes
//!
//! Floats are encoded as f64 with IEEE 754 bit manipulation:
//!
//! - Negative floats: NEG_FLOAT prefix + inverted bits (!bits)
//! - Positive floats: POS_FLOAT prefix + raw bits
//! - Zero (either sign), infinities and NaN get dedicated prefixes
//!
//! ## Text Encoding Strategy
//!
//! Text and blobs escape embedded null bytes and end with a terminator:
//!
//! ```text
//! 0x00 -> 0x00 0xFF  (escape null byte)
//! Terminator: 0x00 0x00
//! ```
//!
//! Embedded nulls cannot end a value early and a string sorts before every
//! string it is a proper prefix of.
//!
//! ## Ordinals
//!
//! Table ordinals in HKeys are written without a type prefix using an
//! order-preserving variable-length integer. The marker byte determines the
//! length, and markers grow with the value, so byte order equals numeric
//! order:
//!
//! | Value Range | Bytes | Format |
//! |-------------|-------|--------|
//! | 0 - 240 | 1 | `[value]` |
//! | 241 - 2287 | 2 | `[241 + (v-240)>>8, (v-240)&FF]` |
//! | 2288 - 67823 | 3 | `[249, (v-2288)>>8, (v-2288)&FF]` |
//! | 67824 - 16777215 | 4 | `[250, v>>16, v>>8, v]` |
//! | 16777216 - u32::MAX | 5 | `[251, v>>24, v>>16, v>>8, v]` |
//!
//! ## Decoding
//!
//! `KeyReader` walks an encoded key. `read_value` takes the expected
//! underlying type and decodes directly into it; when the stored prefix
//! belongs to another category it falls back to `read_any`, which decodes
//! whatever is stored, and leaves conversion to the caller's type.

use crate::types::{UnderlyingType, Value};
use eyre::{bail, ensure, Result};

pub mod type_prefix {
    pub const NULL: u8 = 0x01;
    pub const FALSE: u8 = 0x02;
    pub const TRUE: u8 = 0x03;

    pub const NEG_INFINITY: u8 = 0x10;
    pub const NEG_INT: u8 = 0x12;
    pub const NEG_FLOAT: u8 = 0x13;
    pub const ZERO: u8 = 0x14;
    pub const POS_FLOAT: u8 = 0x15;
    pub const POS_INT: u8 = 0x16;
    pub const POS_INFINITY: u8 = 0x18;
    pub const NAN: u8 = 0x19;

    pub const TEXT: u8 = 0x20;
    pub const BLOB: u8 = 0x21;

    pub const MAX_KEY: u8 = 0xFF;
}

const ESCAPE: u8 = 0x00;
const ESCAPED_NULL: u8 = 0xFF;
const TERMINATOR: u8 = 0x00;

pub fn encode_null(buf: &mut Vec<u8>) {
    buf.push(type_prefix::NULL);
}

pub fn encode_bool(value: bool, buf: &mut Vec<u8>) {
    buf.push(if value {
        type_prefix::TRUE
    } else {
        type_prefix::FALSE
    });
}

pub fn encode_int(value: i64, buf: &mut Vec<u8>) {
    match value {
        0 => buf.push(type_prefix::ZERO),
        v if v < 0 => {
            buf.push(type_prefix::NEG_INT);
            buf.extend_from_slice(&(v as u64).to_be_bytes());
        }
        v => {
            buf.push(type_prefix::POS_INT);
            buf.extend_from_slice(&(v as u64).to_be_bytes());
        }
    }
}

pub fn encode_float(value: f64, buf: &mut Vec<u8>) {
    if value.is_nan() {
        buf.push(type_prefix::NAN);
    } else if value == f64::INFINITY {
        buf.push(type_prefix::POS_INFINITY);
    } else if value == f64::NEG_INFINITY {
        buf.push(type_prefix::NEG_INFINITY);
    } else if value == 0.0 {
        buf.push(type_prefix::ZERO);
    } else if value < 0.0 {
        buf.push(type_prefix::NEG_FLOAT);
        buf.extend_from_slice(&(!value.to_bits()).to_be_bytes());
    } else {
        buf.push(type_prefix::POS_FLOAT);
        buf.extend_from_slice(&value.to_bits().to_be_bytes());
    }
}

fn encode_escaped(prefix: u8, bytes: &[u8], buf: &mut Vec<u8>) {
    buf.push(prefix);
    for &b in bytes {
        if b == ESCAPE {
            buf.push(ESCAPE);
            buf.push(ESCAPED_NULL);
        } else {
            buf.push(b);
        }
    }
    buf.push(ESCAPE);
    buf.push(TERMINATOR);
}

pub fn encode_text(value: &str, buf: &mut Vec<u8>) {
    encode_escaped(type_prefix::TEXT, value.as_bytes(), buf);
}

pub fn encode_blob(value: &[u8], buf: &mut Vec<u8>) {
    encode_escaped(type_prefix::BLOB, value, buf);
}

/// Encodes any value in its collation-ready form.
pub fn encode_value(value: &Value, buf: &mut Vec<u8>) {
    match value {
        Value::Null => encode_null(buf),
        Value::Bool(b) => encode_bool(*b, buf),
        Value::Int8(_) | Value::Int16(_) | Value::Int32(_) | Value::Int64(_) => {
            encode_int(value.as_i64().unwrap_or_default(), buf)
        }
        Value::Float(f) => encode_float(*f as f64, buf),
        Value::Double(f) => encode_float(*f, buf),
        Value::Bytes(b) => encode_blob(b, buf),
        Value::String(s) => encode_text(s, buf),
    }
}

pub fn ordinal_len(value: u32) -> usize {
    if value <= 240 {
        1
    } else if value <= 2287 {
        2
    } else if value <= 67823 {
        3
    } else if value <= 0xFF_FFFF {
        4
    } else {
        5
    }
}

/// Appends a table ordinal as an order-preserving varint.
pub fn encode_ordinal(value: u32, buf: &mut Vec<u8>) {
    if value <= 240 {
        buf.push(value as u8);
    } else if value <= 2287 {
        let v = value - 240;
        buf.push(((v >> 8) + 241) as u8);
        buf.push((v & 0xFF) as u8);
    } else if value <= 67823 {
        let v = value - 2288;
        buf.push(249);
        buf.push((v >> 8) as u8);
        buf.push((v & 0xFF) as u8);
    } else if value <= 0xFF_FFFF {
        buf.push(250);
        buf.extend_from_slice(&value.to_be_bytes()[1..]);
    } else {
        buf.push(251);
        buf.extend_from_slice(&value.to_be_bytes());
    }
}

/// Sequential decoder over an encoded key.
#[derive(Debug, Clone)]
pub struct KeyReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> KeyReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn is_exhausted(&self) -> bool {
        self.pos >= self.buf.len()
    }

    pub fn remaining(&self) -> &'a [u8] {
        &self.buf[self.pos.min(self.buf.len())..]
    }

    pub fn peek_prefix(&self) -> Option<u8> {
        self.buf.get(self.pos).copied()
    }

    fn take(&mut self, n: usize, what: &str) -> Result<&'a [u8]> {
        ensure!(
            self.pos + n <= self.buf.len(),
            "truncated {} at offset {}",
            what,
            self.pos
        );
        let bytes = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    fn take_u64(&mut self, what: &str) -> Result<u64> {
        let bytes = self.take(8, what)?;
        let mut arr = [0u8; 8];
        arr.copy_from_slice(bytes);
        Ok(u64::from_be_bytes(arr))
    }

    pub fn read_ordinal(&mut self) -> Result<u32> {
        let first = self.take(1, "ordinal")?[0];
        match first {
            0..=240 => Ok(first as u32),
            241..=248 => {
                let next = self.take(1, "2-byte ordinal")?[0];
                Ok(240 + ((first as u32 - 241) << 8) + next as u32)
            }
            249 => {
                let b = self.take(2, "3-byte ordinal")?;
                Ok(2288 + ((b[0] as u32) << 8) + b[1] as u32)
            }
            250 => {
                let b = self.take(3, "4-byte ordinal")?;
                Ok(((b[0] as u32) << 16) + ((b[1] as u32) << 8) + b[2] as u32)
            }
            251 => {
                let b = self.take(4, "5-byte ordinal")?;
                Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
            }
            other => bail!("invalid ordinal marker: {}", other),
        }
    }

    fn read_escaped(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        loop {
            let b = self.take(1, "escaped bytes")?[0];
            if b != ESCAPE {
                out.push(b);
                continue;
            }
            match self.take(1, "escape sequence")?[0] {
                TERMINATOR => return Ok(out),
                ESCAPED_NULL => out.push(0),
                other => bail!("invalid escape byte 0x{:02x} at offset {}", other, self.pos - 1),
            }
        }
    }

    fn read_int_body(&mut self, prefix: u8) -> Result<i64> {
        match prefix {
            type_prefix::ZERO => Ok(0),
            type_prefix::NEG_INT | type_prefix::POS_INT => Ok(self.take_u64("integer")? as i64),
            other => bail!("prefix 0x{:02x} is not an integer", other),
        }
    }

    fn read_float_body(&mut self, prefix: u8) -> Result<f64> {
        match prefix {
            type_prefix::ZERO => Ok(0.0),
            type_prefix::NAN => Ok(f64::NAN),
            type_prefix::POS_INFINITY => Ok(f64::INFINITY),
            type_prefix::NEG_INFINITY => Ok(f64::NEG_INFINITY),
            type_prefix::NEG_FLOAT => Ok(f64::from_bits(!self.take_u64("float")?)),
            type_prefix::POS_FLOAT => Ok(f64::from_bits(self.take_u64("float")?)),
            other => bail!("prefix 0x{:02x} is not a float", other),
        }
    }

    /// Decodes whatever value is stored next.
    pub fn read_any(&mut self) -> Result<Value> {
        let prefix = self.take(1, "value prefix")?[0];
        match prefix {
            type_prefix::NULL => Ok(Value::Null),
            type_prefix::FALSE => Ok(Value::Bool(false)),
            type_prefix::TRUE => Ok(Value::Bool(true)),
            type_prefix::ZERO | type_prefix::NEG_INT | type_prefix::POS_INT => {
                Ok(Value::Int64(self.read_int_body(prefix)?))
            }
            type_prefix::NAN
            | type_prefix::POS_INFINITY
            | type_prefix::NEG_INFINITY
            | type_prefix::NEG_FLOAT
            | type_prefix::POS_FLOAT => Ok(Value::Double(self.read_float_body(prefix)?)),
            type_prefix::TEXT => {
                let bytes = self.read_escaped()?;
                let s = String::from_utf8(bytes)
                    .map_err(|e| eyre::eyre!("invalid utf-8 in key text: {}", e))?;
                Ok(Value::String(s))
            }
            type_prefix::BLOB => Ok(Value::Bytes(self.read_escaped()?)),
            other => bail!("unknown key type prefix 0x{:02x}", other),
        }
    }

    /// Decodes the next value as `expected`. Integers come back as `Int64`
    /// and floats as `Double`; narrowing is the column type's job.
    ///
    /// Returns `Ok(None)` when the stored prefix belongs to another category,
    /// without consuming anything, so the caller can take the generic path.
    pub fn read_value(&mut self, expected: UnderlyingType) -> Result<Option<Value>> {
        let Some(prefix) = self.peek_prefix() else {
            bail!("truncated value at offset {}", self.pos);
        };
        if prefix == type_prefix::NULL {
            self.pos += 1;
            return Ok(Some(Value::Null));
        }
        let matches = match expected {
            UnderlyingType::Bool => matches!(prefix, type_prefix::FALSE | type_prefix::TRUE),
            UnderlyingType::Int8
            | UnderlyingType::Int16
            | UnderlyingType::Int32
            | UnderlyingType::Int64 => matches!(
                prefix,
                type_prefix::ZERO | type_prefix::NEG_INT | type_prefix::POS_INT
            ),
            UnderlyingType::Float | UnderlyingType::Double => matches!(
                prefix,
                type_prefix::ZERO
                    | type_prefix::NAN
                    | type_prefix::POS_INFINITY
                    | type_prefix::NEG_INFINITY
                    | type_prefix::NEG_FLOAT
                    | type_prefix::POS_FLOAT
            ),
            UnderlyingType::String => prefix == type_prefix::TEXT,
            UnderlyingType::Bytes => prefix == type_prefix::BLOB,
        };
        if !matches {
            return Ok(None);
        }
        if expected.is_float() {
            self.pos += 1;
            return Ok(Some(Value::Double(self.read_float_body(prefix)?)));
        }
        self.read_any().map(Some)
    }

    /// Skips one encoded value.
    pub fn skip_value(&mut self) -> Result<()> {
        self.read_any().map(|_| ())
    }
}

/// Decodes a full key of values (no ordinals), mostly useful for debugging.
pub fn decode_key(buf: &[u8]) -> Result<Vec<Value>> {
    let mut reader = KeyReader::new(buf);
    let mut values = Vec::new();
    while !reader.is_exhausted() {
        values.push(reader.read_any()?);
    }
    Ok(values)
}
