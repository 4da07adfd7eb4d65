//! # Runtime Value Representation
//!
//! This module provides `Value`, the materialized content of a single column.
//! A value is either SQL NULL or a scalar of one of the underlying primitive
//! kinds. The column's `TInstance` (not the value) carries the SQL type, so a
//! `Value::Int32` may be an `INT` or a `DATE` depending on its column.
//!
//! ## Value Variants
//!
//! | Variant | Rust Type | Underlying |
//! |---------|-----------|------------|
//! | Null | - | any |
//! | Bool | bool | Bool |
//! | Int8 | i8 | Int8 |
//! | Int16 | i16 | Int16 |
//! | Int32 | i32 | Int32 |
//! | Int64 | i64 | Int64 |
//! | Float | f32 | Float |
//! | Double | f64 | Double |
//! | Bytes | `Vec<u8>` | Bytes |
//! | String | String | String |
//!
//! ## Comparison Semantics
//!
//! `compare_for_sort` is a total order used by rows and keys:
//!
//! - NULL sorts before every non-NULL value and equals NULL
//! - Integers of different widths compare numerically
//! - Integer vs float compares as f64
//! - NaN sorts after every other number and equals NaN; -0.0 equals 0.0
//! - Across categories: bool < numbers < strings < bytes
//!
//! For values of the same underlying kind (and NULL) this matches the byte
//! order produced by `encoding::key`. Mixed integer and float values do not:
//! the encoding orders every float before every integer of the same sign.

use super::UnderlyingType;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A NULL usable wherever a `&Value` must outlive a missing row.
pub static NULL_VALUE: Value = Value::Null;

/// Materialized column value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float(f32),
    Double(f64),
    Bytes(Vec<u8>),
    String(String),
}

impl Value {
    /// Returns true if this value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Primitive kind of this value, or None for NULL.
    pub fn underlying(&self) -> Option<UnderlyingType> {
        match self {
            Value::Null => None,
            Value::Bool(_) => Some(UnderlyingType::Bool),
            Value::Int8(_) => Some(UnderlyingType::Int8),
            Value::Int16(_) => Some(UnderlyingType::Int16),
            Value::Int32(_) => Some(UnderlyingType::Int32),
            Value::Int64(_) => Some(UnderlyingType::Int64),
            Value::Float(_) => Some(UnderlyingType::Float),
            Value::Double(_) => Some(UnderlyingType::Double),
            Value::Bytes(_) => Some(UnderlyingType::Bytes),
            Value::String(_) => Some(UnderlyingType::String),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Widens any integer variant to i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int8(v) => Some(*v as i64),
            Value::Int16(v) => Some(*v as i64),
            Value::Int32(v) => Some(*v as i64),
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    /// Widens any numeric variant to f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v as f64),
            Value::Double(v) => Some(*v),
            other => other.as_i64().map(|i| i as f64),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    fn category_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Int8(_)
            | Value::Int16(_)
            | Value::Int32(_)
            | Value::Int64(_)
            | Value::Float(_)
            | Value::Double(_) => 2,
            Value::String(_) => 3,
            Value::Bytes(_) => 4,
        }
    }

    /// Total order over values; see the module documentation.
    pub fn compare_for_sort(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Bytes(a), Value::Bytes(b)) => a.cmp(b),
            (Value::String(a), Value::String(b)) => a.as_bytes().cmp(b.as_bytes()),
            (a, b) if a.category_rank() == 2 && b.category_rank() == 2 => {
                match (a.as_i64(), b.as_i64()) {
                    (Some(x), Some(y)) => x.cmp(&y),
                    _ => compare_f64(
                        a.as_f64().unwrap_or(f64::NAN),
                        b.as_f64().unwrap_or(f64::NAN),
                    ),
                }
            }
            (a, b) => a.category_rank().cmp(&b.category_rank()),
        }
    }

    /// Compares two values with SQL NULL semantics.
    /// Returns None if either value is NULL (SQL UNKNOWN).
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        if self.is_null() || other.is_null() {
            return None;
        }
        Some(self.compare_for_sort(other))
    }

    /// Hashes this value consistently with `compare_for_sort` equality for
    /// values of the same underlying kind.
    pub fn hash_to<H: Hasher>(&self, hasher: &mut H) {
        self.category_rank().hash(hasher);
        match self {
            Value::Null => {}
            Value::Bool(b) => b.hash(hasher),
            Value::Int8(_) | Value::Int16(_) | Value::Int32(_) | Value::Int64(_) => {
                self.as_i64().hash(hasher)
            }
            Value::Float(f) => normalized_bits(*f as f64).hash(hasher),
            Value::Double(f) => normalized_bits(*f).hash(hasher),
            Value::Bytes(b) => b.hash(hasher),
            Value::String(s) => s.hash(hasher),
        }
    }
}

fn normalized_bits(f: f64) -> u64 {
    if f.is_nan() {
        f64::NAN.to_bits()
    } else if f == 0.0 {
        0
    } else {
        f.to_bits()
    }
}

fn compare_f64(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Value::Int8(v) => write!(f, "{}", v),
            Value::Int16(v) => write!(f, "{}", v),
            Value::Int32(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::Bytes(b) => {
                write!(f, "X'")?;
                for byte in b {
                    write!(f, "{:02X}", byte)?;
                }
                write!(f, "'")
            }
            Value::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

value_from! {
    bool => Bool,
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    f32 => Float,
    f64 => Double,
    Vec<u8> => Bytes,
    String => String,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(v.to_vec())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}
