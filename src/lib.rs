//! # hkrow - Hierarchical Rows and HKeys
//!
//! hkrow is the row model of a group-clustered relational store. Tables that
//! form a parent/child hierarchy (customer → order → item) are stored
//! together as a *group*, interleaved so that each row directly follows its
//! parent. The ordering key is the hierarchical key, the HKey.
//!
//! ## Quick Start
//!
//! ```ignore
//! use hkrow::schema::{ColumnDef, Schema};
//! use hkrow::store::MemoryStore;
//! use hkrow::types::{TInstance, Value};
//!
//! let schema = Schema::new();
//! let mut b = schema.group_builder("coi");
//! let customer = b.root("customer", vec![ColumnDef::new("cid", TInstance::int8())], &[0])?;
//! b.child(
//!     "order",
//!     customer,
//!     vec![
//!         ColumnDef::new("oid", TInstance::int8()),
//!         ColumnDef::new("cid", TInstance::int8()),
//!     ],
//!     &[0],
//!     &[(1, 0)],
//! )?;
//! let group = b.build()?;
//!
//! let mut store = MemoryStore::new(&schema, group.clone())?;
//! store.insert(group.root(), vec![Value::Int64(1)])?;
//! let hkey = store.insert(group.table("order").unwrap(), vec![Value::Int64(10), Value::Int64(1)])?;
//! assert_eq!(hkey.to_string(), "{1,1,2,10}");
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │  Operators (flatten) over RowCursor  │
//! ├─────────────────────────────────────┤
//! │  Rows: value-holder, compound,       │
//! │  overlay, projected, index, bindable │
//! ├───────────────────┬─────────────────┤
//! │  HKey             │  Expressions     │
//! ├───────────────────┴─────────────────┤
//! │  Schema: groups, tables, row types   │
//! ├─────────────────────────────────────┤
//! │  Types (TInstance, Value) + Encoding │
//! ├─────────────────────────────────────┤
//! │  Group store (BTreeMap by HKey)      │
//! └─────────────────────────────────────┘
//! ```
//!
//! Rows and keys are single-threaded values (`Rc` handles); schema objects
//! and expressions are immutable and shared through `Arc`.
//!
//! ## Module Overview
//!
//! - [`config`]: Shape limits and inline buffer sizes
//! - [`types`]: Column types and values
//! - [`encoding`]: Byte-comparable key encoding
//! - [`schema`]: Groups, tables, HKey shapes, index definitions, row types
//! - [`hkey`]: Hierarchical keys
//! - [`expr`]: Expressions evaluated by projected and bindable rows
//! - [`row`]: The `Row` trait and its variants
//! - [`operator`]: Row cursors and the flatten operator
//! - [`store`]: In-memory group store and scanning cursor

pub mod config;
pub mod encoding;
pub mod expr;
pub mod hkey;
pub mod operator;
pub mod row;
pub mod schema;
pub mod store;
pub mod types;

#[cfg(test)]
mod fixtures;

pub use hkey::HKey;
pub use operator::RowCursor;
pub use row::{Row, RowRef};
pub use schema::{RowType, Schema};
pub use types::{TInstance, Value};
