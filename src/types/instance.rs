//! # Type Instances
//!
//! A `TInstance` is the runtime type of one column: its `DataType` plus the
//! type parameters (length) and nullability. It is the only capability the row
//! and key layers need from the type system:
//!
//! - `underlying()`: primitive kind used for storage and key encoding
//! - `compare()`: ordering of two values of this type
//! - `cast()`: conversion of an arbitrary value into this type
//! - `read_collating()`: normalization of a value decoded from a key
//! - `format_literal()`: SQL literal rendering
//!
//! ## Ordering
//!
//! `TInstance` derives a total order (data type, then length, then
//! nullability). Group shapes use it to detect incompatible key column
//! declarations deterministically.
//!
//! ## Key Normalization
//!
//! Keys store every integer as 64 bits and every float as a double, and pad
//! nothing. `read_collating` narrows decoded values back to the declared
//! width (rejecting out-of-range data) and strips trailing blanks from
//! `CHAR(n)` values, so a decoded key column compares equal to the value that
//! was encoded.

use super::{DataType, UnderlyingType, Value};
use crate::config::DEFAULT_STRING_LENGTH;
use eyre::{bail, ensure, Result};
use std::cmp::Ordering;
use std::fmt;

const MICROS_PER_SECOND: i64 = 1_000_000;
const SECONDS_PER_DAY: i64 = 86_400;

/// Runtime type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TInstance {
    data_type: DataType,
    length: Option<u32>,
    nullable: bool,
}

impl TInstance {
    /// Creates a nullable instance of `data_type`. Length-bearing types get
    /// `DEFAULT_STRING_LENGTH` until `with_length` overrides it.
    pub fn new(data_type: DataType) -> Self {
        let length = data_type.has_length().then_some(DEFAULT_STRING_LENGTH);
        Self {
            data_type,
            length,
            nullable: true,
        }
    }

    pub fn bool() -> Self {
        Self::new(DataType::Bool)
    }

    pub fn int4() -> Self {
        Self::new(DataType::Int4)
    }

    pub fn int8() -> Self {
        Self::new(DataType::Int8)
    }

    pub fn float8() -> Self {
        Self::new(DataType::Float8)
    }

    pub fn text() -> Self {
        Self::new(DataType::Text)
    }

    pub fn varchar(length: u32) -> Self {
        Self::new(DataType::Varchar).with_length(length)
    }

    pub fn char(length: u32) -> Self {
        Self::new(DataType::Char).with_length(length)
    }

    pub fn blob() -> Self {
        Self::new(DataType::Blob)
    }

    pub fn with_length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn length(&self) -> Option<u32> {
        self.length
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn underlying(&self) -> UnderlyingType {
        self.data_type.underlying()
    }

    /// Returns true if `value` can be stored in a column of this type without
    /// conversion. NULL is always accepted; nullability is enforced by DML.
    pub fn accepts(&self, value: &Value) -> bool {
        value
            .underlying()
            .map_or(true, |kind| kind == self.underlying())
    }

    /// Orders two values of this type, NULL first.
    pub fn compare(&self, a: &Value, b: &Value) -> Ordering {
        if self.data_type == DataType::Char {
            if let (Some(x), Some(y)) = (a.as_str(), b.as_str()) {
                return x.trim_end_matches(' ').cmp(y.trim_end_matches(' '));
            }
        }
        a.compare_for_sort(b)
    }

    /// Converts `value` into this type's representation.
    pub fn cast(&self, value: Value) -> Result<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        let target = self.underlying();
        let converted = match target {
            UnderlyingType::Bool => Value::Bool(match &value {
                Value::Bool(b) => *b,
                Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "true" | "t" | "yes" | "on" | "1" => true,
                    "false" | "f" | "no" | "off" | "0" => false,
                    other => bail!("cannot cast '{}' to {}", other, self),
                },
                other => match other.as_i64() {
                    Some(i) => i != 0,
                    None => bail!("cannot cast {:?} to {}", other, self),
                },
            }),
            UnderlyingType::Int8
            | UnderlyingType::Int16
            | UnderlyingType::Int32
            | UnderlyingType::Int64 => {
                let wide = match &value {
                    Value::Bool(b) => *b as i64,
                    Value::Float(_) | Value::Double(_) => {
                        let f = value.as_f64().unwrap_or(f64::NAN);
                        ensure!(f.is_finite(), "cannot cast {} to {}", f, self);
                        let rounded = f.round();
                        ensure!(
                            rounded >= i64::MIN as f64 && rounded <= i64::MAX as f64,
                            "value {} out of range for {}",
                            f,
                            self
                        );
                        rounded as i64
                    }
                    Value::String(s) => s
                        .trim()
                        .parse::<i64>()
                        .map_err(|e| eyre::eyre!("cannot cast '{}' to {}: {}", s, self, e))?,
                    other => match other.as_i64() {
                        Some(i) => i,
                        None => bail!("cannot cast {:?} to {}", other, self),
                    },
                };
                self.narrow_integer(wide)?
            }
            UnderlyingType::Float | UnderlyingType::Double => {
                let f = match &value {
                    Value::String(s) => s
                        .trim()
                        .parse::<f64>()
                        .map_err(|e| eyre::eyre!("cannot cast '{}' to {}: {}", s, self, e))?,
                    Value::Bool(b) => *b as i64 as f64,
                    other => match other.as_f64() {
                        Some(f) => f,
                        None => bail!("cannot cast {:?} to {}", other, self),
                    },
                };
                if target == UnderlyingType::Float {
                    Value::Float(f as f32)
                } else {
                    Value::Double(f)
                }
            }
            UnderlyingType::String => {
                let s = match value {
                    Value::String(s) => s,
                    Value::Bytes(b) => String::from_utf8(b)
                        .map_err(|e| eyre::eyre!("cannot cast blob to {}: {}", self, e))?,
                    other => self.render_plain(&other),
                };
                if let Some(limit) = self.length {
                    ensure!(
                        s.chars().count() <= limit as usize,
                        "value too long for {}: {} characters",
                        self,
                        s.chars().count()
                    );
                }
                Value::String(s)
            }
            UnderlyingType::Bytes => match value {
                Value::Bytes(b) => Value::Bytes(b),
                Value::String(s) => Value::Bytes(s.into_bytes()),
                other => bail!("cannot cast {:?} to {}", other, self),
            },
        };
        Ok(converted)
    }

    fn narrow_integer(&self, wide: i64) -> Result<Value> {
        let out_of_range = || eyre::eyre!("value {} out of range for {}", wide, self);
        Ok(match self.underlying() {
            UnderlyingType::Int8 => Value::Int8(i8::try_from(wide).map_err(|_| out_of_range())?),
            UnderlyingType::Int16 => {
                Value::Int16(i16::try_from(wide).map_err(|_| out_of_range())?)
            }
            UnderlyingType::Int32 => {
                Value::Int32(i32::try_from(wide).map_err(|_| out_of_range())?)
            }
            _ => Value::Int64(wide),
        })
    }

    /// Normalizes a value decoded from a persistent key.
    pub fn read_collating(&self, value: Value) -> Result<Value> {
        let value = if self.accepts(&value) {
            value
        } else {
            self.cast(value)?
        };
        match (self.data_type, value) {
            (DataType::Char, Value::String(s)) => {
                let trimmed_len = s.trim_end_matches(' ').len();
                let mut s = s;
                s.truncate(trimmed_len);
                Ok(Value::String(s))
            }
            (_, value) => Ok(value),
        }
    }

    /// Renders `value` as a SQL literal of this type.
    pub fn format_literal(&self, value: &Value) -> String {
        if value.is_null() {
            return "NULL".to_string();
        }
        match (self.data_type, value.as_i64()) {
            (DataType::Date, Some(days)) => format!("DATE '{}'", format_date(days)),
            (DataType::Time, Some(micros)) => format!("TIME '{}'", format_time(micros)),
            (DataType::Timestamp, Some(micros)) => {
                let days = micros.div_euclid(SECONDS_PER_DAY * MICROS_PER_SECOND);
                let rem = micros.rem_euclid(SECONDS_PER_DAY * MICROS_PER_SECOND);
                format!("TIMESTAMP '{} {}'", format_date(days), format_time(rem))
            }
            _ => value.to_string(),
        }
    }

    fn render_plain(&self, value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for TInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.data_type.sql_name())?;
        if let (true, Some(len)) = (self.data_type.has_length(), self.length) {
            write!(f, "({})", len)?;
        }
        if !self.nullable {
            write!(f, " NOT NULL")?;
        }
        Ok(())
    }
}

/// Converts days since 1970-01-01 to `YYYY-MM-DD` (proleptic Gregorian).
fn format_date(days: i64) -> String {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + i64::from(month <= 2);
    format!("{:04}-{:02}-{:02}", year, month, day)
}

fn format_time(micros: i64) -> String {
    let total_secs = micros.div_euclid(MICROS_PER_SECOND);
    let frac = micros.rem_euclid(MICROS_PER_SECOND);
    let (h, m, s) = (total_secs / 3600, (total_secs / 60) % 60, total_secs % 60);
    if frac == 0 {
        format!("{:02}:{:02}:{:02}", h, m, s)
    } else {
        format!("{:02}:{:02}:{:02}.{:06}", h, m, s, frac)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn varchar_defaults_to_configured_length() {
        assert_eq!(TInstance::new(DataType::Varchar).length(), Some(DEFAULT_STRING_LENGTH));
        assert_eq!(TInstance::int4().length(), None);
        assert_eq!(TInstance::varchar(32).to_string(), "VARCHAR(32)");
        assert_eq!(TInstance::int8().not_null().to_string(), "BIGINT NOT NULL");
    }

    #[test]
    fn cast_narrows_integers_with_range_check() {
        let int2 = TInstance::new(DataType::Int2);
        assert_eq!(int2.cast(Value::Int64(300)).unwrap(), Value::Int16(300));
        let err = int2.cast(Value::Int64(70_000)).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn cast_parses_and_renders_text() {
        assert_eq!(TInstance::int4().cast(Value::from(" 42 ")).unwrap(), Value::Int32(42));
        assert_eq!(TInstance::text().cast(Value::Int32(7)).unwrap(), Value::from("7"));
        assert!(TInstance::varchar(2).cast(Value::from("abc")).is_err());
    }

    #[test]
    fn read_collating_narrows_key_representation() {
        assert_eq!(TInstance::int4().read_collating(Value::Int64(10)).unwrap(), Value::Int32(10));
        assert_eq!(
            TInstance::new(DataType::Float4).read_collating(Value::Double(1.5)).unwrap(),
            Value::Float(1.5)
        );
        assert_eq!(
            TInstance::char(6).read_collating(Value::from("ab  ")).unwrap(),
            Value::from("ab")
        );
    }

    #[test]
    fn accepts_null_and_matching_kind_only() {
        let t = TInstance::int4();
        assert!(t.accepts(&Value::Null));
        assert!(t.accepts(&Value::Int32(1)));
        assert!(!t.accepts(&Value::Int64(1)));
    }

    #[test]
    fn char_compare_ignores_trailing_blanks() {
        let t = TInstance::char(4);
        assert_eq!(t.compare(&Value::from("ab "), &Value::from("ab")), Ordering::Equal);
    }

    #[test]
    fn format_literal_renders_temporal_types() {
        let date = TInstance::new(DataType::Date);
        assert_eq!(date.format_literal(&Value::Int32(0)), "DATE '1970-01-01'");
        assert_eq!(date.format_literal(&Value::Int32(19_723)), "DATE '2024-01-01'");
        let ts = TInstance::new(DataType::Timestamp);
        assert_eq!(
            ts.format_literal(&Value::Int64(86_400_000_000 + 3_661_000_000)),
            "TIMESTAMP '1970-01-02 01:01:01'"
        );
        assert_eq!(TInstance::text().format_literal(&Value::Null), "NULL");
    }
}
