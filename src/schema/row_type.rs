//! # Row Types
//!
//! A `RowType` describes the shape of every row an operator produces: the
//! field types, where the fields come from, and (when the row is keyed) the
//! HKey shape of its rows. Row types are created by the `Schema` factory and
//! shared as `Arc<RowType>`; identity is the factory-assigned id.
//!
//! ## Kinds
//!
//! | Kind | Fields | HKey |
//! |------|--------|------|
//! | Table | table columns | table's shape |
//! | Flattened | parent fields ++ child fields | child's shape |
//! | Product | left fields ++ right fields past the branch | none |
//! | Values | given types | none |
//! | Projected | expression result types | none |
//! | HKey | key column types | the shape |
//! | Index | index row composition | indexed table's shape |

use super::index::IndexDef;
use super::shape::HKeyShape;
use super::table::Table;
use super::RowTypeId;
use crate::types::TInstance;
use std::fmt;
use std::sync::Arc;

#[derive(Debug)]
pub enum RowTypeKind {
    Table(Arc<Table>),
    Flattened {
        parent: Arc<RowType>,
        child: Arc<RowType>,
    },
    Product {
        left: Arc<RowType>,
        right: Arc<RowType>,
        branch: Arc<RowType>,
    },
    Values,
    Projected,
    HKey,
    Index(Arc<IndexDef>),
}

#[derive(Debug)]
pub struct RowType {
    id: RowTypeId,
    kind: RowTypeKind,
    fields: Vec<TInstance>,
    hkey: Option<Arc<HKeyShape>>,
}

impl RowType {
    pub(super) fn new(
        id: RowTypeId,
        kind: RowTypeKind,
        fields: Vec<TInstance>,
        hkey: Option<Arc<HKeyShape>>,
    ) -> Self {
        Self {
            id,
            kind,
            fields,
            hkey,
        }
    }

    pub fn id(&self) -> RowTypeId {
        self.id
    }

    pub fn kind(&self) -> &RowTypeKind {
        &self.kind
    }

    pub fn nfields(&self) -> usize {
        self.fields.len()
    }

    pub fn fields(&self) -> &[TInstance] {
        &self.fields
    }

    pub fn field_type(&self, index: usize) -> Option<&TInstance> {
        self.fields.get(index)
    }

    pub fn hkey_shape(&self) -> Option<&Arc<HKeyShape>> {
        self.hkey.as_ref()
    }

    /// The table for a table row type.
    pub fn table(&self) -> Option<&Arc<Table>> {
        match &self.kind {
            RowTypeKind::Table(table) => Some(table),
            _ => None,
        }
    }

    /// The deepest table whose rows this type carries.
    pub fn leaf_table(&self) -> Option<&Arc<Table>> {
        match &self.kind {
            RowTypeKind::Table(table) => Some(table),
            RowTypeKind::Flattened { child, .. } => child.leaf_table(),
            RowTypeKind::Product { right, .. } => right.leaf_table(),
            RowTypeKind::Index(index) => Some(index.table()),
            _ => None,
        }
    }

    /// For compound types, the number of fields routed to the first component.
    pub fn first_fields(&self) -> Option<usize> {
        match &self.kind {
            RowTypeKind::Flattened { parent, .. } => Some(parent.nfields()),
            RowTypeKind::Product { left, .. } => Some(left.nfields()),
            _ => None,
        }
    }

    /// True if this type's rows hold a row of `table`, directly or through
    /// a component.
    pub fn contains_table(&self, table: &Table) -> bool {
        match &self.kind {
            RowTypeKind::Table(t) => t.id() == table.id(),
            RowTypeKind::Flattened { parent, child } => {
                parent.contains_table(table) || child.contains_table(table)
            }
            RowTypeKind::Product { left, right, .. } => {
                left.contains_table(table) || right.contains_table(table)
            }
            _ => false,
        }
    }

    /// True if this type's leaf table is the parent of `other`'s leaf table.
    pub fn parent_of(&self, other: &RowType) -> bool {
        match (self.leaf_table(), other.leaf_table()) {
            (Some(parent), Some(child)) => {
                parent.group() == child.group() && child.parent() == Some(parent.id())
            }
            _ => false,
        }
    }
}

impl PartialEq for RowType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for RowType {}

impl fmt::Display for RowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            RowTypeKind::Table(table) => write!(f, "{}", table.name()),
            RowTypeKind::Flattened { parent, child } => write!(f, "flatten({}, {})", parent, child),
            RowTypeKind::Product { left, right, .. } => write!(f, "product({}, {})", left, right),
            RowTypeKind::Values => write!(f, "values_{}", self.id),
            RowTypeKind::Projected => write!(f, "project_{}", self.id),
            RowTypeKind::HKey => write!(f, "hkey_{}", self.id),
            RowTypeKind::Index(index) => write!(f, "index({})", index.name()),
        }
    }
}
