//! # Group Store
//!
//! An in-memory store for the rows of one group, kept in HKey order. It is
//! the boundary between the row model and physical storage: rows go in as
//! values, are persisted as encoded key/value pairs, and come back out
//! through a cursor as pooled `MutableRow`s.
//!
//! ## Record Layout
//!
//! ```text
//! key:   HKey persistent form     [ord][cols...][ord][cols...]...
//! value: [ordinal varint][field 0][field 1]...[field n-1]
//! ```
//!
//! Both halves use the byte-comparable encoding from `encoding::key`, so the
//! key order of the map is the HKey order and a subtree is a key prefix.
//!
//! ## Row Reuse
//!
//! `GroupCursor` keeps one `MutableRow` per table and refills it in place
//! when the consumer has dropped its handle. If the consumer still holds
//! the row (typically after `acquire`), the cursor gives up the pooled row
//! and allocates a new one, so held rows never change underneath their
//! holders.

mod cursor;
mod memory;

pub use cursor::GroupCursor;
pub use memory::MemoryStore;
