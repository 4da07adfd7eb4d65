use super::{Row, RowRef};
use crate::hkey::HKey;
use crate::schema::{RowType, Table};
use crate::types::Value;
use eyre::Result;
use std::sync::Arc;

/// Forwards everything to another row. Nested-loop operators wrap the outer
/// row this way to record the loop depth it was bound at.
#[derive(Debug, Clone)]
pub struct DelegateRow {
    inner: RowRef,
    depth: usize,
}

impl DelegateRow {
    pub fn new(inner: RowRef, depth: usize) -> Self {
        Self { inner, depth }
    }

    pub fn inner(&self) -> &RowRef {
        &self.inner
    }

    /// Loop nesting depth the row was bound at.
    pub fn depth(&self) -> usize {
        self.depth
    }
}

impl Row for DelegateRow {
    fn row_type(&self) -> &Arc<RowType> {
        self.inner.row_type()
    }

    fn value(&self, index: usize) -> Result<&Value> {
        self.inner.value(index)
    }

    fn hkey(&self) -> Option<&HKey> {
        self.inner.hkey()
    }

    fn sub_row(&self, row_type: &RowType) -> Option<RowRef> {
        self.inner.sub_row(row_type)
    }

    fn contains_real_row_of(&self, table: &Table) -> bool {
        self.inner.contains_real_row_of(table)
    }

    fn is_bindings_sensitive(&self) -> bool {
        self.inner.is_bindings_sensitive()
    }

    fn wrapped(&self) -> Option<&RowRef> {
        Some(&self.inner)
    }
}
