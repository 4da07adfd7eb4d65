//! # Column Data Types
//!
//! This module provides `DataType`, the SQL-level type class of a column, and
//! `UnderlyingType`, the primitive representation every value of that class is
//! stored as. Row and key code only ever dispatches on the underlying type;
//! the data type decides widths, rendering and key normalization.
//!
//! ## Type Categories
//!
//! | Category | Types | Underlying |
//! |----------|-------|------------|
//! | **Boolean** | Bool | Bool |
//! | **Integer** | Int1, Int2, Int4, Int8 | Int8, Int16, Int32, Int64 |
//! | **Float** | Float4, Float8 | Float, Double |
//! | **Date/Time** | Date, Time, Timestamp | Int32, Int64, Int64 |
//! | **Text** | Char, Varchar, Text | String |
//! | **Binary** | Blob | Bytes |
//!
//! ## Discriminant Values
//!
//! Discriminants are grouped by category:
//! - 0-6: Fixed-width numerics
//! - 10-12: Date/time
//! - 20-23: Variable-length text/binary
//!
//! The `#[repr(u8)]` keeps the discriminant to a single byte so that type
//! identity can be embedded in catalog encodings.

/// SQL type class of a column.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DataType {
    Bool = 0,
    Int1 = 1,
    Int2 = 2,
    Int4 = 3,
    Int8 = 4,
    Float4 = 5,
    Float8 = 6,

    Date = 10,
    Time = 11,
    Timestamp = 12,

    Char = 20,
    Varchar = 21,
    Text = 22,
    Blob = 23,
}

/// Primitive representation of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UnderlyingType {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Float,
    Double,
    Bytes,
    String,
}

impl DataType {
    /// Returns the primitive representation used for values of this type.
    pub fn underlying(&self) -> UnderlyingType {
        match self {
            DataType::Bool => UnderlyingType::Bool,
            DataType::Int1 => UnderlyingType::Int8,
            DataType::Int2 => UnderlyingType::Int16,
            DataType::Int4 | DataType::Date => UnderlyingType::Int32,
            DataType::Int8 | DataType::Time | DataType::Timestamp => UnderlyingType::Int64,
            DataType::Float4 => UnderlyingType::Float,
            DataType::Float8 => UnderlyingType::Double,
            DataType::Char | DataType::Varchar | DataType::Text => UnderlyingType::String,
            DataType::Blob => UnderlyingType::Bytes,
        }
    }

    /// Returns the fixed byte size for this type, or None for variable-length types.
    pub fn fixed_size(&self) -> Option<usize> {
        match self {
            DataType::Bool | DataType::Int1 => Some(1),
            DataType::Int2 => Some(2),
            DataType::Int4 | DataType::Float4 | DataType::Date => Some(4),
            DataType::Int8 | DataType::Float8 | DataType::Time | DataType::Timestamp => Some(8),
            DataType::Char | DataType::Varchar | DataType::Text | DataType::Blob => None,
        }
    }

    /// Returns true if this type requires a length parameter.
    pub fn has_length(&self) -> bool {
        matches!(self, DataType::Char | DataType::Varchar)
    }

    /// Returns true if this is an integer or floating point type.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            DataType::Int1
                | DataType::Int2
                | DataType::Int4
                | DataType::Int8
                | DataType::Float4
                | DataType::Float8
        )
    }

    /// Returns true if this is a text-like type.
    pub fn is_text(&self) -> bool {
        matches!(self, DataType::Char | DataType::Varchar | DataType::Text)
    }

    /// SQL name used when rendering type descriptions.
    pub fn sql_name(&self) -> &'static str {
        match self {
            DataType::Bool => "BOOLEAN",
            DataType::Int1 => "TINYINT",
            DataType::Int2 => "SMALLINT",
            DataType::Int4 => "INT",
            DataType::Int8 => "BIGINT",
            DataType::Float4 => "FLOAT",
            DataType::Float8 => "DOUBLE",
            DataType::Date => "DATE",
            DataType::Time => "TIME",
            DataType::Timestamp => "TIMESTAMP",
            DataType::Char => "CHAR",
            DataType::Varchar => "VARCHAR",
            DataType::Text => "TEXT",
            DataType::Blob => "BLOB",
        }
    }
}

impl UnderlyingType {
    /// Returns true for the integer kinds.
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            UnderlyingType::Int8
                | UnderlyingType::Int16
                | UnderlyingType::Int32
                | UnderlyingType::Int64
        )
    }

    /// Returns true for the floating point kinds.
    pub fn is_float(&self) -> bool {
        matches!(self, UnderlyingType::Float | UnderlyingType::Double)
    }
}

impl TryFrom<u8> for DataType {
    type Error = eyre::Report;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(DataType::Bool),
            1 => Ok(DataType::Int1),
            2 => Ok(DataType::Int2),
            3 => Ok(DataType::Int4),
            4 => Ok(DataType::Int8),
            5 => Ok(DataType::Float4),
            6 => Ok(DataType::Float8),
            10 => Ok(DataType::Date),
            11 => Ok(DataType::Time),
            12 => Ok(DataType::Timestamp),
            20 => Ok(DataType::Char),
            21 => Ok(DataType::Varchar),
            22 => Ok(DataType::Text),
            23 => Ok(DataType::Blob),
            _ => eyre::bail!("invalid DataType discriminant: {}", value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_time_types_map_to_integer_representations() {
        assert_eq!(DataType::Date.underlying(), UnderlyingType::Int32);
        assert_eq!(DataType::Time.underlying(), UnderlyingType::Int64);
        assert_eq!(DataType::Timestamp.underlying(), UnderlyingType::Int64);
    }

    #[test]
    fn text_types_share_string_representation() {
        for dt in [DataType::Char, DataType::Varchar, DataType::Text] {
            assert_eq!(dt.underlying(), UnderlyingType::String);
            assert!(dt.is_text());
            assert_eq!(dt.fixed_size(), None);
        }
    }

    #[test]
    fn discriminant_round_trips_through_try_from() {
        for dt in [
            DataType::Bool,
            DataType::Int1,
            DataType::Int8,
            DataType::Float8,
            DataType::Timestamp,
            DataType::Varchar,
            DataType::Blob,
        ] {
            assert_eq!(DataType::try_from(dt as u8).unwrap(), dt);
        }
        assert!(DataType::try_from(99).is_err());
    }
}
