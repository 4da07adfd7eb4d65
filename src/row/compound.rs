//! Compound rows: two component rows presented as one.
//!
//! Field `i` below the first component's width routes to the first row;
//! higher fields route to the second row at an adjusted offset:
//!
//! ```text
//! flattened  [p0 p1 | c0 c1 c2]          second offset = parent width
//! product    [l0 l1 l2 | r2 r3]          second offset = left width - branch width
//!             branch = l0 l1 = r0 r1
//! ```

use super::{check_field, Row, RowRef};
use crate::hkey::HKey;
use crate::schema::{RowType, RowTypeKind, Table};
use crate::types::{Value, NULL_VALUE};
use eyre::{bail, ensure, Result};
use std::sync::Arc;

fn check_component(kind: &str, expected: &RowType, row: Option<&RowRef>) -> Result<()> {
    if let Some(row) = row {
        ensure!(
            row.row_type().id() == expected.id(),
            "{} row of type {} does not match {}",
            kind,
            row.row_type(),
            expected
        );
    }
    Ok(())
}

fn sub_row_of(rows: [Option<&RowRef>; 2], row_type: &RowType) -> Option<RowRef> {
    rows.into_iter()
        .flatten()
        .find_map(|row| row.sub_row(row_type))
}

/// A parent row joined with a child row. Either side may be missing (outer
/// joins); a missing side reads as NULLs.
#[derive(Debug, Clone)]
pub struct FlattenedRow {
    row_type: Arc<RowType>,
    parent: Option<RowRef>,
    child: Option<RowRef>,
    hkey: HKey,
    first_fields: usize,
}

impl FlattenedRow {
    pub fn new(
        row_type: Arc<RowType>,
        parent: Option<RowRef>,
        child: Option<RowRef>,
        hkey: HKey,
    ) -> Result<Self> {
        let RowTypeKind::Flattened {
            parent: parent_type,
            child: child_type,
        } = row_type.kind()
        else {
            bail!("{} is not a flattened row type", row_type);
        };
        ensure!(
            parent.is_some() || child.is_some(),
            "flattened row needs a parent or a child"
        );
        check_component("parent", parent_type, parent.as_ref())?;
        check_component("child", child_type, child.as_ref())?;
        let first_fields = parent_type.nfields();
        Ok(Self {
            row_type,
            parent,
            child,
            hkey,
            first_fields,
        })
    }

    pub fn parent(&self) -> Option<&RowRef> {
        self.parent.as_ref()
    }

    pub fn child(&self) -> Option<&RowRef> {
        self.child.as_ref()
    }
}

impl Row for FlattenedRow {
    fn row_type(&self) -> &Arc<RowType> {
        &self.row_type
    }

    fn value(&self, index: usize) -> Result<&Value> {
        check_field(self, index)?;
        let (row, field) = if index < self.first_fields {
            (&self.parent, index)
        } else {
            (&self.child, index - self.first_fields)
        };
        match row {
            Some(row) => row.value(field),
            None => Ok(&NULL_VALUE),
        }
    }

    fn hkey(&self) -> Option<&HKey> {
        Some(&self.hkey)
    }

    fn sub_row(&self, row_type: &RowType) -> Option<RowRef> {
        sub_row_of([self.parent.as_ref(), self.child.as_ref()], row_type)
    }

    fn contains_real_row_of(&self, table: &Table) -> bool {
        [&self.parent, &self.child]
            .into_iter()
            .flatten()
            .any(|row| row.contains_real_row_of(table))
    }
}

/// Two rows sharing a common branch row, with the branch fields kept once.
#[derive(Debug, Clone)]
pub struct ProductRow {
    row_type: Arc<RowType>,
    left: RowRef,
    right: RowRef,
    first_fields: usize,
    right_offset: usize,
}

impl ProductRow {
    pub fn new(row_type: Arc<RowType>, left: RowRef, right: RowRef) -> Result<Self> {
        let RowTypeKind::Product {
            left: left_type,
            right: right_type,
            branch,
        } = row_type.kind()
        else {
            bail!("{} is not a product row type", row_type);
        };
        check_component("left", left_type, Some(&left))?;
        check_component("right", right_type, Some(&right))?;
        let first_fields = left_type.nfields();
        let right_offset = first_fields - branch.nfields();
        Ok(Self {
            row_type,
            left,
            right,
            first_fields,
            right_offset,
        })
    }

    pub fn left(&self) -> &RowRef {
        &self.left
    }

    pub fn right(&self) -> &RowRef {
        &self.right
    }
}

impl Row for ProductRow {
    fn row_type(&self) -> &Arc<RowType> {
        &self.row_type
    }

    fn value(&self, index: usize) -> Result<&Value> {
        check_field(self, index)?;
        if index < self.first_fields {
            self.left.value(index)
        } else {
            self.right.value(index - self.right_offset)
        }
    }

    fn hkey(&self) -> Option<&HKey> {
        None
    }

    fn sub_row(&self, row_type: &RowType) -> Option<RowRef> {
        sub_row_of([Some(&self.left), Some(&self.right)], row_type)
    }

    fn contains_real_row_of(&self, table: &Table) -> bool {
        self.left.contains_real_row_of(table) || self.right.contains_real_row_of(table)
    }
}
