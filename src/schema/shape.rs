//! # HKey Shapes
//!
//! An `HKeyShape` describes the hierarchical key of one table: one segment per
//! table on the path from the group root down to the table, each segment
//! holding the table's ordinal and the types of the key columns that the
//! segment contributes.
//!
//! ```text
//! customer(cid)            [C.ord, cid]
//! order(oid, cid)          [C.ord, cid, O.ord, oid]
//! item(iid, oid)           [C.ord, cid, O.ord, oid, I.ord, iid]
//! ```
//!
//! Every column also records where its value can be found in the table's own
//! row. Ancestor columns are reachable through join columns (`order.cid` holds
//! `customer.cid`); when a table does not carry an ancestor column at all
//! (`item` has no `cid`), the position is `None` and the value has to come
//! from the parent row's HKey.
//!
//! The shape of an ancestor table is always a prefix of its descendants'
//! shapes (same ordinals, same column types), which is what makes HKey
//! comparison and prefix tests meaningful across tables of one group.

use super::{GroupId, TableId};
use crate::config::HKEY_INLINE_SEGMENTS;
use crate::types::TInstance;
use smallvec::SmallVec;

#[derive(Debug, Clone, PartialEq)]
pub struct HKeyColumn {
    ty: TInstance,
    row_position: Option<usize>,
}

impl HKeyColumn {
    pub fn new(ty: TInstance, row_position: Option<usize>) -> Self {
        Self { ty, row_position }
    }

    pub fn ty(&self) -> &TInstance {
        &self.ty
    }

    /// Position of this column in the owning table's row, if it has one.
    pub fn row_position(&self) -> Option<usize> {
        self.row_position
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HKeySegment {
    table: TableId,
    ordinal: u32,
    columns: Vec<HKeyColumn>,
}

impl HKeySegment {
    pub fn new(table: TableId, ordinal: u32, columns: Vec<HKeyColumn>) -> Self {
        Self {
            table,
            ordinal,
            columns,
        }
    }

    pub fn table(&self) -> TableId {
        self.table
    }

    pub fn ordinal(&self) -> u32 {
        self.ordinal
    }

    pub fn columns(&self) -> &[HKeyColumn] {
        &self.columns
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HKeyShape {
    group: GroupId,
    table: TableId,
    segments: SmallVec<[HKeySegment; HKEY_INLINE_SEGMENTS]>,
    offsets: SmallVec<[usize; HKEY_INLINE_SEGMENTS + 1]>,
}

impl HKeyShape {
    pub fn new(group: GroupId, table: TableId, segments: Vec<HKeySegment>) -> Self {
        let mut offsets = SmallVec::with_capacity(segments.len() + 1);
        let mut total = 0;
        offsets.push(0);
        for segment in &segments {
            total += segment.columns.len();
            offsets.push(total);
        }
        Self {
            group,
            table,
            segments: segments.into_iter().collect(),
            offsets,
        }
    }

    pub fn group(&self) -> GroupId {
        self.group
    }

    /// The table whose rows this shape keys.
    pub fn table(&self) -> TableId {
        self.table
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    pub fn segments(&self) -> &[HKeySegment] {
        &self.segments
    }

    pub fn segment(&self, index: usize) -> &HKeySegment {
        &self.segments[index]
    }

    /// Total number of key columns across all segments.
    pub fn column_count(&self) -> usize {
        self.offsets[self.segments.len()]
    }

    /// Index of the first column of `segment` in the flattened column list.
    /// `value_offset(depth())` is the total column count.
    pub fn value_offset(&self, segment: usize) -> usize {
        self.offsets[segment]
    }

    /// Returns the segment index holding `ordinal`.
    pub fn segment_of_ordinal(&self, ordinal: u32) -> Option<usize> {
        self.segments.iter().position(|s| s.ordinal == ordinal)
    }

    /// Returns the segment index holding `table`.
    pub fn segment_of_table(&self, table: TableId) -> Option<usize> {
        self.segments.iter().position(|s| s.table == table)
    }

    /// Iterates all key columns in key order.
    pub fn columns(&self) -> impl Iterator<Item = &HKeyColumn> {
        self.segments.iter().flat_map(|s| s.columns.iter())
    }

    /// True if `self` keys an ancestor-or-self of `other`'s table.
    pub fn is_ancestor_shape_of(&self, other: &HKeyShape) -> bool {
        self.group == other.group
            && self.depth() <= other.depth()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|(a, b)| a.table == b.table)
    }
}
