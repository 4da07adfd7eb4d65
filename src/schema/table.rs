//! # Tables and Groups
//!
//! A group is a tree of tables clustered into one key space. The root table
//! is keyed by its primary key; every other table names a parent and the join
//! columns that reference the parent's primary key.
//!
//! ## Ordinals
//!
//! Each table receives an ordinal, unique within the group, assigned in
//! declaration order starting at `FIRST_TABLE_ORDINAL`. Ordinals are written
//! into HKeys between segments, so sibling subtrees sort by declaration order:
//!
//! ```text
//! customer   ord 1   depth 0
//! ├── order  ord 2   depth 1
//! │   └── item ord 3 depth 2
//! └── address ord 4  depth 1
//! ```
//!
//! ## Building a Group
//!
//! ```ignore
//! let mut builder = schema.group_builder("coi");
//! let customer = builder.root("customer", vec![
//!     ColumnDef::new("cid", TInstance::int8().not_null()),
//!     ColumnDef::new("name", TInstance::varchar(32)),
//! ], &[0])?;
//! let order = builder.child("order", customer, vec![
//!     ColumnDef::new("oid", TInstance::int8().not_null()),
//!     ColumnDef::new("cid", TInstance::int8()),
//!     ColumnDef::new("total", TInstance::float8()),
//! ], &[0], &[(1, 0)])?;
//! let group = builder.build()?;
//! ```
//!
//! ## Validation
//!
//! - Column names are unique per table, table names unique per group
//! - Primary keys are non-empty and reference existing columns
//! - Join columns cover exactly the parent's primary key, with matching
//!   underlying types
//! - Depth stays below `MAX_GROUP_DEPTH`

use super::shape::{HKeyColumn, HKeySegment, HKeyShape};
use super::{GroupId, Schema, TableId};
use crate::config::{FIRST_TABLE_ORDINAL, MAX_GROUP_DEPTH};
use crate::types::TInstance;
use eyre::{ensure, eyre, Result};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    name: String,
    ty: TInstance,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, ty: TInstance) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &TInstance {
        &self.ty
    }
}

/// A child column holding the value of one of the parent's key columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinColumn {
    pub child: usize,
    pub parent: usize,
}

#[derive(Debug, Clone)]
pub struct Table {
    id: TableId,
    group: GroupId,
    name: String,
    ordinal: u32,
    depth: usize,
    parent: Option<TableId>,
    columns: Vec<ColumnDef>,
    primary_key: Vec<usize>,
    parent_join: Vec<JoinColumn>,
    hkey: Arc<HKeyShape>,
}

impl Table {
    pub fn id(&self) -> TableId {
        self.id
    }

    pub fn group(&self) -> GroupId {
        self.group
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ordinal(&self) -> u32 {
        self.ordinal
    }

    /// Zero for the group root.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn parent(&self) -> Option<TableId> {
        self.parent
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn column_types(&self) -> Vec<TInstance> {
        self.columns.iter().map(|c| *c.ty()).collect()
    }

    pub fn column_position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn primary_key(&self) -> &[usize] {
        &self.primary_key
    }

    pub fn parent_join(&self) -> &[JoinColumn] {
        &self.parent_join
    }

    pub fn hkey_shape(&self) -> &Arc<HKeyShape> {
        &self.hkey
    }
}

impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Table {}

#[derive(Debug)]
pub struct Group {
    id: GroupId,
    name: String,
    tables: Vec<Arc<Table>>,
}

impl Group {
    pub fn id(&self) -> GroupId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tables in ordinal order; the first one is the root.
    pub fn tables(&self) -> &[Arc<Table>] {
        &self.tables
    }

    pub fn root(&self) -> &Arc<Table> {
        &self.tables[0]
    }

    pub fn table(&self, name: &str) -> Option<&Arc<Table>> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn table_by_id(&self, id: TableId) -> Option<&Arc<Table>> {
        self.tables.iter().find(|t| t.id == id)
    }

    pub fn table_by_ordinal(&self, ordinal: u32) -> Option<&Arc<Table>> {
        let index = ordinal.checked_sub(FIRST_TABLE_ORDINAL)? as usize;
        self.tables.get(index)
    }

    pub fn children(&self, id: TableId) -> impl Iterator<Item = &Arc<Table>> {
        self.tables.iter().filter(move |t| t.parent == Some(id))
    }

    /// True if `ancestor` lies on the path from the root to `descendant`,
    /// including `descendant` itself.
    pub fn is_ancestor(&self, ancestor: TableId, descendant: TableId) -> bool {
        let mut current = self.table_by_id(descendant);
        while let Some(table) = current {
            if table.id == ancestor {
                return true;
            }
            current = table.parent.and_then(|p| self.table_by_id(p));
        }
        false
    }
}

/// Declares the tables of one group. Obtained from `Schema::group_builder`.
pub struct GroupBuilder<'s> {
    schema: &'s Schema,
    id: GroupId,
    name: String,
    tables: Vec<Table>,
}

impl<'s> GroupBuilder<'s> {
    pub(super) fn new(schema: &'s Schema, id: GroupId, name: String) -> Self {
        Self {
            schema,
            id,
            name,
            tables: Vec::new(),
        }
    }

    pub fn root(
        &mut self,
        name: impl Into<String>,
        columns: Vec<ColumnDef>,
        primary_key: &[usize],
    ) -> Result<TableId> {
        let name = name.into();
        ensure!(
            self.tables.is_empty(),
            "group '{}' already has root table '{}'",
            self.name,
            self.tables[0].name
        );
        self.validate_table(&name, &columns, primary_key)?;

        let id = self.schema.next_table_id();
        let ordinal = FIRST_TABLE_ORDINAL;
        let key_columns = primary_key
            .iter()
            .map(|&c| HKeyColumn::new(*columns[c].ty(), Some(c)))
            .collect();
        let shape = HKeyShape::new(
            self.id,
            id,
            vec![HKeySegment::new(id, ordinal, key_columns)],
        );

        self.tables.push(Table {
            id,
            group: self.id,
            name,
            ordinal,
            depth: 0,
            parent: None,
            columns,
            primary_key: primary_key.to_vec(),
            parent_join: Vec::new(),
            hkey: Arc::new(shape),
        });
        Ok(id)
    }

    /// Adds a child of `parent`. Each `(child_column, parent_column)` pair in
    /// `join` maps one of the new table's columns to a parent key column.
    pub fn child(
        &mut self,
        name: impl Into<String>,
        parent: TableId,
        columns: Vec<ColumnDef>,
        primary_key: &[usize],
        join: &[(usize, usize)],
    ) -> Result<TableId> {
        let name = name.into();
        self.validate_table(&name, &columns, primary_key)?;

        let parent_table = self
            .tables
            .iter()
            .find(|t| t.id == parent)
            .ok_or_else(|| eyre!("parent table {} is not part of group '{}'", parent, self.name))?;

        let depth = parent_table.depth + 1;
        ensure!(
            depth < MAX_GROUP_DEPTH,
            "table '{}' would be at depth {}, maximum is {}",
            name,
            depth,
            MAX_GROUP_DEPTH - 1
        );

        ensure!(
            join.len() == parent_table.primary_key.len(),
            "table '{}' joins {} columns but parent '{}' has {} primary key columns",
            name,
            join.len(),
            parent_table.name,
            parent_table.primary_key.len()
        );
        let mut parent_join = Vec::with_capacity(join.len());
        for &(child_col, parent_col) in join {
            ensure!(
                child_col < columns.len(),
                "join column {} out of range for table '{}'",
                child_col,
                name
            );
            ensure!(
                parent_table.primary_key.contains(&parent_col),
                "join column {} of '{}' references non-key column {} of '{}'",
                child_col,
                name,
                parent_col,
                parent_table.name
            );
            ensure!(
                !parent_join.iter().any(|j: &JoinColumn| j.parent == parent_col),
                "parent column {} of '{}' joined twice",
                parent_col,
                parent_table.name
            );
            let child_ty = columns[child_col].ty();
            let parent_ty = parent_table.columns[parent_col].ty();
            ensure!(
                child_ty.underlying() == parent_ty.underlying(),
                "join column '{}' ({}) does not match parent column '{}' ({})",
                columns[child_col].name,
                child_ty,
                parent_table.columns[parent_col].name,
                parent_ty
            );
            parent_join.push(JoinColumn {
                child: child_col,
                parent: parent_col,
            });
        }

        let id = self.schema.next_table_id();
        let ordinal = FIRST_TABLE_ORDINAL + self.tables.len() as u32;

        let mut segments: Vec<HKeySegment> = parent_table
            .hkey
            .segments()
            .iter()
            .map(|segment| {
                let remapped = segment
                    .columns()
                    .iter()
                    .map(|column| {
                        let position = column.row_position().and_then(|p| {
                            parent_join.iter().find(|j| j.parent == p).map(|j| j.child)
                        });
                        HKeyColumn::new(*column.ty(), position)
                    })
                    .collect();
                HKeySegment::new(segment.table(), segment.ordinal(), remapped)
            })
            .collect();
        let own_columns = primary_key
            .iter()
            .filter(|&&c| !parent_join.iter().any(|j| j.child == c))
            .map(|&c| HKeyColumn::new(*columns[c].ty(), Some(c)))
            .collect();
        segments.push(HKeySegment::new(id, ordinal, own_columns));

        self.tables.push(Table {
            id,
            group: self.id,
            name,
            ordinal,
            depth,
            parent: Some(parent),
            columns,
            primary_key: primary_key.to_vec(),
            parent_join,
            hkey: Arc::new(HKeyShape::new(self.id, id, segments)),
        });
        Ok(id)
    }

    /// Finishes the group and registers a row type for each table.
    pub fn build(self) -> Result<Arc<Group>> {
        ensure!(!self.tables.is_empty(), "group '{}' has no tables", self.name);
        let group = Arc::new(Group {
            id: self.id,
            name: self.name,
            tables: self.tables.into_iter().map(Arc::new).collect(),
        });
        self.schema.register_group(&group);
        Ok(group)
    }

    fn validate_table(
        &self,
        name: &str,
        columns: &[ColumnDef],
        primary_key: &[usize],
    ) -> Result<()> {
        ensure!(
            !self.tables.iter().any(|t| t.name == name),
            "table '{}' already exists in group '{}'",
            name,
            self.name
        );
        ensure!(!columns.is_empty(), "table '{}' has no columns", name);
        for (i, column) in columns.iter().enumerate() {
            ensure!(
                !columns[..i].iter().any(|c| c.name == column.name),
                "duplicate column '{}' in table '{}'",
                column.name,
                name
            );
        }
        ensure!(
            !primary_key.is_empty(),
            "table '{}' needs a primary key",
            name
        );
        for (i, &c) in primary_key.iter().enumerate() {
            ensure!(
                c < columns.len(),
                "primary key column {} out of range for table '{}'",
                c,
                name
            );
            ensure!(
                !primary_key[..i].contains(&c),
                "primary key column {} repeated in table '{}'",
                c,
                name
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(name: &str) -> ColumnDef {
        ColumnDef::new(name, TInstance::int8())
    }

    fn coi(schema: &Schema) -> Arc<Group> {
        let mut b = schema.group_builder("coi");
        let c = b
            .root(
                "customer",
                vec![int("cid"), ColumnDef::new("name", TInstance::varchar(32))],
                &[0],
            )
            .unwrap();
        let o = b
            .child("order", c, vec![int("oid"), int("cid")], &[0], &[(1, 0)])
            .unwrap();
        b.child("item", o, vec![int("iid"), int("oid")], &[0], &[(1, 0)])
            .unwrap();
        b.child("address", c, vec![int("aid"), int("cid")], &[0], &[(1, 0)])
            .unwrap();
        b.build().unwrap()
    }

    #[test]
    fn test_ordinals_follow_declaration_order() {
        let schema = Schema::new();
        let group = coi(&schema);
        let names: Vec<_> = group
            .tables()
            .iter()
            .map(|t| (t.name(), t.ordinal(), t.depth()))
            .collect();
        assert_eq!(
            names,
            vec![("customer", 1, 0), ("order", 2, 1), ("item", 3, 2), ("address", 4, 1)]
        );
        assert_eq!(group.table_by_ordinal(3).unwrap().name(), "item");
        assert!(group.table_by_ordinal(0).is_none());
    }

    #[test]
    fn test_hkey_shape_maps_ancestor_columns_through_joins() {
        let schema = Schema::new();
        let group = coi(&schema);
        let order = group.table("order").unwrap();
        let shape = order.hkey_shape();
        assert_eq!(shape.depth(), 2);
        assert_eq!(shape.segment(0).columns()[0].row_position(), Some(1));
        assert_eq!(shape.segment(1).columns()[0].row_position(), Some(0));

        let item = group.table("item").unwrap();
        let shape = item.hkey_shape();
        assert_eq!(shape.depth(), 3);
        assert_eq!(shape.segment(0).columns()[0].row_position(), None);
        assert_eq!(shape.segment(1).columns()[0].row_position(), Some(1));
        assert_eq!(shape.segment(2).ordinal(), 3);
    }

    #[test]
    fn test_ancestry_queries() {
        let schema = Schema::new();
        let group = coi(&schema);
        let id = |n: &str| group.table(n).unwrap().id();
        assert!(group.is_ancestor(id("customer"), id("item")));
        assert!(group.is_ancestor(id("item"), id("item")));
        assert!(!group.is_ancestor(id("address"), id("item")));
        let children: Vec<_> = group.children(id("customer")).map(|t| t.name()).collect();
        assert_eq!(children, vec!["order", "address"]);
    }

    #[test]
    fn test_join_must_cover_parent_key() {
        let schema = Schema::new();
        let mut b = schema.group_builder("g");
        let p = b.root("p", vec![int("a"), int("b")], &[0, 1]).unwrap();
        let err = b
            .child("c", p, vec![int("x"), int("a")], &[0], &[(1, 0)])
            .unwrap_err();
        assert!(err.to_string().contains("primary key columns"));

        let err = b
            .child(
                "c",
                p,
                vec![int("x"), ColumnDef::new("a", TInstance::text())],
                &[0],
                &[(1, 0), (0, 1)],
            )
            .unwrap_err();
        assert!(err.to_string().contains("does not match"));
    }

    #[test]
    fn test_duplicate_names_and_second_root_rejected() {
        let schema = Schema::new();
        let mut b = schema.group_builder("g");
        assert!(b.root("t", vec![int("a"), int("a")], &[0]).is_err());
        let t = b.root("t", vec![int("a")], &[0]).unwrap();
        assert!(b.root("u", vec![int("a")], &[0]).is_err());
        assert!(b.child("t", t, vec![int("a")], &[0], &[(0, 0)]).is_err());
        assert!(b.child("u", t, vec![int("a")], &[], &[(0, 0)]).is_err());
    }

    #[test]
    fn test_depth_is_bounded() {
        let schema = Schema::new();
        let mut b = schema.group_builder("deep");
        let mut parent = b.root("t0", vec![int("k")], &[0]).unwrap();
        for depth in 1..MAX_GROUP_DEPTH {
            parent = b
                .child(format!("t{}", depth), parent, vec![int("k"), int("p")], &[0], &[(1, 0)])
                .unwrap();
        }
        let err = b
            .child("too_deep", parent, vec![int("k"), int("p")], &[0], &[(1, 0)])
            .unwrap_err();
        assert!(err.to_string().contains("maximum"));
    }
}
