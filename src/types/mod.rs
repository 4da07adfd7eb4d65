//! # Type System Boundary
//!
//! This module provides the small slice of a SQL type system that rows and
//! keys depend on. Everything else (overload resolution, implicit casting
//! rules, function registries) lives outside this crate; `TInstance` is the
//! opaque capability that stands in for it.
//!
//! ## Module Structure
//!
//! - `data_type`: `DataType` type classes and their `UnderlyingType`
//! - `instance`: `TInstance`, a column's concrete runtime type
//! - `value`: `Value`, a materialized scalar or NULL
//! - `holder`: `ValueHolder`, a staging slot that may be unset
//!
//! ## Key Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | `DataType` | SQL type class |
//! | `UnderlyingType` | Primitive storage kind |
//! | `TInstance` | Column type: compare, cast, normalize, render |
//! | `Value` | Owned runtime value |
//! | `ValueHolder` | Value, NULL or unset |
//!
//! ## Usage
//!
//! ```ignore
//! use hkrow::types::{TInstance, Value};
//!
//! let ty = TInstance::varchar(32);
//! let v = ty.cast(Value::Int32(42))?;
//! assert_eq!(v, Value::from("42"));
//! ```

mod data_type;
mod holder;
mod instance;
mod value;

pub use data_type::{DataType, UnderlyingType};
pub use holder::ValueHolder;
pub use instance::TInstance;
pub use value::{Value, NULL_VALUE};
