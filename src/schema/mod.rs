//! # Group Schema and Row Type Factory
//!
//! This module describes the static shape of the data: groups of tables
//! clustered by HKey, the HKey shape of every table, index definitions, and
//! the row types flowing between operators.
//!
//! ## Architecture
//!
//! ```text
//! Schema (row type factory, id allocation)
//! ├── Group "coi"
//! │   ├── Table customer  ── RowType(Table)
//! │   ├── Table order     ── RowType(Table)
//! │   └── Table item      ── RowType(Table)
//! ├── RowType(Flattened customer, order)   cached per (parent, child)
//! ├── RowType(Product ...)
//! └── RowType(Values | Projected | HKey | Index)
//! ```
//!
//! ## Identity
//!
//! Tables, groups and row types get ids from per-schema counters. Row types
//! compare by id, so two structurally identical projections are still
//! different types; flatten types are cached so that flattening the same pair
//! twice yields the same type.
//!
//! ## Concurrency
//!
//! `Schema` is shared between query threads. Id allocation is atomic and the
//! type caches sit behind `parking_lot` mutexes; the returned row types are
//! immutable.
//!
//! ## Usage Example
//!
//! ```ignore
//! let schema = Schema::new();
//! let mut builder = schema.group_builder("coi");
//! let customer = builder.root("customer", customer_columns, &[0])?;
//! let order = builder.child("order", customer, order_columns, &[0], &[(1, 0)])?;
//! let group = builder.build()?;
//!
//! let c = schema.table_type(group.table("customer").unwrap())?;
//! let o = schema.table_type(group.table("order").unwrap())?;
//! let co = schema.new_flatten_type(&c, &o)?;
//! assert_eq!(co.nfields(), c.nfields() + o.nfields());
//! ```

pub mod index;
pub mod row_type;
pub mod shape;
pub mod table;

pub use index::{IndexDef, IndexSource};
pub use row_type::{RowType, RowTypeKind};
pub use shape::{HKeyColumn, HKeySegment, HKeyShape};
pub use table::{ColumnDef, Group, GroupBuilder, JoinColumn, Table};

pub type GroupId = u32;
pub type TableId = u32;
pub type RowTypeId = u32;

use crate::types::TInstance;
use eyre::{ensure, eyre, Result};
use hashbrown::HashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct Schema {
    next_group_id: AtomicU32,
    next_table_id: AtomicU32,
    next_row_type_id: AtomicU32,
    table_types: Mutex<HashMap<TableId, Arc<RowType>>>,
    flatten_types: Mutex<HashMap<(RowTypeId, RowTypeId), Arc<RowType>>>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn group_builder(&self, name: impl Into<String>) -> GroupBuilder<'_> {
        let id = self.next_group_id.fetch_add(1, Ordering::Relaxed);
        GroupBuilder::new(self, id, name.into())
    }

    pub(crate) fn next_table_id(&self) -> TableId {
        self.next_table_id.fetch_add(1, Ordering::Relaxed)
    }

    fn next_row_type_id(&self) -> RowTypeId {
        self.next_row_type_id.fetch_add(1, Ordering::Relaxed)
    }

    fn make(
        &self,
        kind: RowTypeKind,
        fields: Vec<TInstance>,
        hkey: Option<Arc<HKeyShape>>,
    ) -> Arc<RowType> {
        Arc::new(RowType::new(self.next_row_type_id(), kind, fields, hkey))
    }

    pub(crate) fn register_group(&self, group: &Group) {
        let mut types = self.table_types.lock();
        for table in group.tables() {
            let row_type = self.make(
                RowTypeKind::Table(Arc::clone(table)),
                table.column_types(),
                Some(Arc::clone(table.hkey_shape())),
            );
            types.insert(table.id(), row_type);
        }
    }

    /// The row type of `table`'s rows.
    pub fn table_type(&self, table: &Table) -> Result<Arc<RowType>> {
        self.table_types
            .lock()
            .get(&table.id())
            .cloned()
            .ok_or_else(|| eyre!("table '{}' does not belong to this schema", table.name()))
    }

    /// Row type of `parent` rows flattened with `child` rows. The leaf table
    /// of `parent` must be a proper ancestor of `child`'s leaf table.
    pub fn new_flatten_type(
        &self,
        parent: &Arc<RowType>,
        child: &Arc<RowType>,
    ) -> Result<Arc<RowType>> {
        let key = (parent.id(), child.id());
        if let Some(existing) = self.flatten_types.lock().get(&key) {
            return Ok(Arc::clone(existing));
        }

        let parent_table = parent
            .leaf_table()
            .ok_or_else(|| eyre!("cannot flatten {}: it carries no table rows", parent))?;
        let child_table = child
            .leaf_table()
            .ok_or_else(|| eyre!("cannot flatten {}: it carries no table rows", child))?;
        ensure!(
            parent_table.depth() < child_table.depth()
                && parent_table
                    .hkey_shape()
                    .is_ancestor_shape_of(child_table.hkey_shape()),
            "cannot flatten {} with {}: '{}' is not an ancestor of '{}'",
            parent,
            child,
            parent_table.name(),
            child_table.name()
        );

        let mut fields = parent.fields().to_vec();
        fields.extend_from_slice(child.fields());
        let hkey = child.hkey_shape().cloned();
        let flattened = self.make(
            RowTypeKind::Flattened {
                parent: Arc::clone(parent),
                child: Arc::clone(child),
            },
            fields,
            hkey,
        );

        let mut cache = self.flatten_types.lock();
        Ok(Arc::clone(cache.entry(key).or_insert(flattened)))
    }

    /// Row type of `left` rows combined with `right` rows sharing the common
    /// `branch` row; the branch fields lead `right` and appear once.
    pub fn new_product_type(
        &self,
        left: &Arc<RowType>,
        right: &Arc<RowType>,
        branch: &Arc<RowType>,
    ) -> Result<Arc<RowType>> {
        let branch_table = branch
            .table()
            .ok_or_else(|| eyre!("product branch {} is not a table type", branch))?;
        for side in [left, right] {
            let leaf = side
                .leaf_table()
                .ok_or_else(|| eyre!("cannot form product of {}: it carries no table rows", side))?;
            ensure!(
                branch_table
                    .hkey_shape()
                    .is_ancestor_shape_of(leaf.hkey_shape()),
                "product branch '{}' is not an ancestor of '{}'",
                branch_table.name(),
                leaf.name()
            );
        }
        let branch_fields = branch.nfields();
        ensure!(
            right.nfields() >= branch_fields && right.fields()[..branch_fields] == *branch.fields(),
            "right side {} of product does not start with branch {}",
            right,
            branch
        );

        let mut fields = left.fields().to_vec();
        fields.extend_from_slice(&right.fields()[branch_fields..]);
        Ok(self.make(
            RowTypeKind::Product {
                left: Arc::clone(left),
                right: Arc::clone(right),
                branch: Arc::clone(branch),
            },
            fields,
            None,
        ))
    }

    pub fn new_values_type(&self, fields: Vec<TInstance>) -> Arc<RowType> {
        self.make(RowTypeKind::Values, fields, None)
    }

    pub fn new_projected_type(&self, fields: Vec<TInstance>) -> Arc<RowType> {
        self.make(RowTypeKind::Projected, fields, None)
    }

    /// Row type whose fields are the column values of keys shaped `shape`.
    pub fn new_hkey_type(&self, shape: &Arc<HKeyShape>) -> Arc<RowType> {
        let fields = shape.columns().map(|c| *c.ty()).collect();
        self.make(RowTypeKind::HKey, fields, Some(Arc::clone(shape)))
    }

    pub fn new_index_type(&self, index: &Arc<IndexDef>) -> Arc<RowType> {
        let hkey = Arc::clone(index.table().hkey_shape());
        self.make(
            RowTypeKind::Index(Arc::clone(index)),
            index.field_types().to_vec(),
            Some(hkey),
        )
    }
}
