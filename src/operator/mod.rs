//! # Row Operators
//!
//! Operators pull rows from a `RowCursor` and produce rows through the same
//! trait, so they stack:
//!
//! ```text
//! GroupCursor ──> FlattenOperator(customer, order) ──> FlattenOperator(.., item)
//! ```
//!
//! Every cursor follows `open → next* → close`. `next` returns `Ok(None)`
//! once the input is exhausted. Rows from a store cursor may be pooled; an
//! operator that holds on to a row past the next `next` call must
//! `acquire` it (see `row`).

mod flatten;

pub use flatten::{FlattenOperator, FlattenOptions, JoinType};

use crate::row::RowRef;
use eyre::Result;
use std::collections::VecDeque;

pub trait RowCursor {
    fn open(&mut self) -> Result<()>;
    fn next(&mut self) -> Result<Option<RowRef>>;
    fn close(&mut self) -> Result<()>;
}

impl<C: RowCursor + ?Sized> RowCursor for Box<C> {
    fn open(&mut self) -> Result<()> {
        (**self).open()
    }

    fn next(&mut self) -> Result<Option<RowRef>> {
        (**self).next()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

/// A cursor over rows that are already in memory.
#[derive(Debug, Default)]
pub struct RowsCursor {
    rows: Vec<RowRef>,
    pending: VecDeque<RowRef>,
}

impl RowsCursor {
    pub fn new(rows: Vec<RowRef>) -> Self {
        Self {
            rows,
            pending: VecDeque::new(),
        }
    }
}

impl RowCursor for RowsCursor {
    fn open(&mut self) -> Result<()> {
        self.pending = self.rows.iter().cloned().collect();
        Ok(())
    }

    fn next(&mut self) -> Result<Option<RowRef>> {
        Ok(self.pending.pop_front())
    }

    fn close(&mut self) -> Result<()> {
        self.pending.clear();
        Ok(())
    }
}

/// Drains `cursor` into a vector, opening and closing it.
pub fn collect_rows<C: RowCursor + ?Sized>(cursor: &mut C) -> Result<Vec<RowRef>> {
    cursor.open()?;
    let mut rows = Vec::new();
    while let Some(row) = cursor.next()? {
        rows.push(row.acquire());
    }
    cursor.close()?;
    Ok(rows)
}
