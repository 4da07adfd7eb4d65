//! # Index Definitions
//!
//! An index row holds the declared key columns of a table followed by
//! whichever HKey columns the declared columns do not already cover. That
//! makes every index entry unique and lets an index row rebuild the HKey of
//! the row it was built from.
//!
//! ```text
//! order(oid, cid, total)  HKey [C, cid, O, oid]
//! INDEX order_total(total)
//!
//! index row: [total, cid, oid]
//!             ^row   ^hkey ^hkey
//! ```
//!
//! ## Spatial Indexes
//!
//! A spatial index collapses a run of declared columns (the coordinates)
//! into a single BIGINT z-value computed by a spatial column handler. Spatial
//! columns never stand in for HKey columns, so the HKey columns are always
//! appended after them.

use super::table::Table;
use crate::types::TInstance;
use eyre::{ensure, Result};
use std::ops::Range;
use std::sync::Arc;

/// Where an index field's value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexSource {
    /// A column of the indexed row.
    Row(usize),
    /// Several row columns reduced to one z-value.
    Spatial(usize),
    /// A column of the indexed row's HKey, by flattened key position.
    HKey(usize),
}

#[derive(Debug, Clone)]
pub struct IndexDef {
    name: String,
    table: Arc<Table>,
    declared: Vec<usize>,
    spatial: Option<Range<usize>>,
    fields: Vec<IndexSource>,
    field_types: Vec<TInstance>,
    hkey_fields: Vec<usize>,
}

impl IndexDef {
    pub fn new(name: impl Into<String>, table: Arc<Table>, columns: &[usize]) -> Result<Self> {
        Self::build(name.into(), table, columns, None)
    }

    /// Declares an index whose columns `first..first + dimensions` (positions
    /// within `columns`) are coordinates reduced to one z-value.
    pub fn spatial(
        name: impl Into<String>,
        table: Arc<Table>,
        columns: &[usize],
        first: usize,
        dimensions: usize,
    ) -> Result<Self> {
        ensure!(dimensions > 0, "spatial index needs at least one dimension");
        ensure!(
            first + dimensions <= columns.len(),
            "spatial columns {}..{} exceed the {} declared columns",
            first,
            first + dimensions,
            columns.len()
        );
        Self::build(name.into(), table, columns, Some(first..first + dimensions))
    }

    fn build(
        name: String,
        table: Arc<Table>,
        columns: &[usize],
        spatial: Option<Range<usize>>,
    ) -> Result<Self> {
        ensure!(!columns.is_empty(), "index '{}' has no columns", name);
        for &c in columns {
            ensure!(
                c < table.columns().len(),
                "index '{}' column {} out of range for table '{}'",
                name,
                c,
                table.name()
            );
        }

        let mut fields = Vec::new();
        let mut field_types = Vec::new();
        let mut i = 0;
        while i < columns.len() {
            match &spatial {
                Some(range) if range.start == i => {
                    fields.push(IndexSource::Spatial(columns[i]));
                    field_types.push(TInstance::int8());
                    i = range.end;
                }
                _ => {
                    fields.push(IndexSource::Row(columns[i]));
                    field_types.push(*table.columns()[columns[i]].ty());
                    i += 1;
                }
            }
        }

        let shape = Arc::clone(table.hkey_shape());
        let mut hkey_fields = Vec::with_capacity(shape.column_count());
        for (position, column) in shape.columns().enumerate() {
            let covered = column
                .row_position()
                .and_then(|p| fields.iter().position(|f| *f == IndexSource::Row(p)));
            match covered {
                Some(field) => hkey_fields.push(field),
                None => {
                    hkey_fields.push(fields.len());
                    fields.push(IndexSource::HKey(position));
                    field_types.push(*column.ty());
                }
            }
        }

        Ok(Self {
            name,
            table,
            declared: columns.to_vec(),
            spatial,
            fields,
            field_types,
            hkey_fields,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> &Arc<Table> {
        &self.table
    }

    pub fn is_spatial(&self) -> bool {
        self.spatial.is_some()
    }

    /// Range of declared column positions reduced to the z-value.
    pub fn spatial_columns(&self) -> Option<&Range<usize>> {
        self.spatial.as_ref()
    }

    /// Number of declared fields after spatial reduction.
    pub fn declared_field_count(&self) -> usize {
        match &self.spatial {
            Some(range) => self.declared.len() - range.len() + 1,
            None => self.declared.len(),
        }
    }

    /// Composition of the full index row.
    pub fn fields(&self) -> &[IndexSource] {
        &self.fields
    }

    pub fn field_types(&self) -> &[TInstance] {
        &self.field_types
    }

    /// For each flattened HKey position, the index field holding its value.
    pub fn hkey_fields(&self) -> &[usize] {
        &self.hkey_fields
    }
}
