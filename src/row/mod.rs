//! # Rows
//!
//! A row is a fixed-length typed tuple with one `RowType` and, for rows that
//! live in a group, an `HKey`. Every operator consumes and produces rows
//! through the `Row` trait; how a row stores (or computes) its fields is up
//! to the variant.
//!
//! ## Variants
//!
//! | Variant | Storage | HKey |
//! |---------|---------|------|
//! | `ImmutableRow` | owned values | optional, owned |
//! | `MutableRow` | value holders, refilled by cursors | owned |
//! | `DelegateRow` | forwards to another row | inner row's |
//! | `FlattenedRow` | parent row ++ child row | explicit |
//! | `ProductRow` | left row ++ right row past the branch | none |
//! | `OverlayingRow` | underlying row with sparse overrides | underlying row's |
//! | `ProjectedRow` | lazily evaluated expressions | none |
//! | `HKeyRow` | an HKey's column values | the key |
//! | `KeyIndexRow` | encoded index key | rebuilt from fields |
//!
//! `BindableRow` is not a row but a template that produces one per binding.
//!
//! ## Sharing and Reuse
//!
//! Rows are handed around as `RowRef`, a reference-counted handle. Cursors
//! keep a pool of `MutableRow`s and refill them in place on every step, which
//! is only possible while nobody else holds the row:
//!
//! ```text
//! cursor.next()  ──> handle (pool + consumer)        is_shared() == false
//! row.acquire()  ──> second consumer handle           is_shared() == true
//! next step      ──> pool sees extra owner, allocates a fresh row instead
//! release()      ──> back to one consumer handle      is_shared() == false
//! ```
//!
//! For rows that are not pooled, `acquire` and `release` only clone and
//! drop the handle and `is_shared` is always false. Releasing a pooled row
//! that was never acquired is a programming error and panics.
//!
//! ## Comparison
//!
//! `compare_to(other, left_start, right_start, count)` compares `count`
//! fields pairwise and returns `0` or `±(i + 1)` for the first differing
//! field `i` of the range, ordering values by the left field's type.

mod bindable;
mod compound;
mod delegate;
mod hkey_row;
mod index_row;
mod overlay;
mod projected;
mod value_row;

pub use bindable::BindableRow;
pub use compound::{FlattenedRow, ProductRow};
pub use delegate::DelegateRow;
pub use hkey_row::HKeyRow;
pub use index_row::{IndexRow, KeyIndexRow, SpatialColumnHandler, ZOrderPoint};
pub use overlay::OverlayingRow;
pub use projected::ProjectedRow;
pub use value_row::{ImmutableRow, MutableRow, RowState};

use crate::hkey::HKey;
use crate::schema::{RowType, Table};
use crate::types::Value;
use eyre::{ensure, eyre, Result};
use std::cmp::Ordering;
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;
use std::sync::Arc;

pub trait Row: fmt::Debug {
    fn row_type(&self) -> &Arc<RowType>;

    fn value(&self, index: usize) -> Result<&Value>;

    fn hkey(&self) -> Option<&HKey>;

    fn nfields(&self) -> usize {
        self.row_type().nfields()
    }

    /// The component of a compound row whose type is `row_type`.
    fn sub_row(&self, _row_type: &RowType) -> Option<RowRef> {
        None
    }

    /// True if this row holds an actual (non-missing) row of `table`.
    fn contains_real_row_of(&self, table: &Table) -> bool {
        self.row_type()
            .table()
            .map_or(false, |t| t.id() == table.id())
    }

    fn ancestor_hkey(&self, table: &Table) -> Result<HKey> {
        let hkey = self
            .hkey()
            .ok_or_else(|| eyre!("{} rows have no hkey", self.row_type()))?;
        hkey.ancestor(table)
    }

    /// True if this row's HKey is a prefix of `other`'s.
    fn ancestor_of(&self, other: &dyn Row) -> bool {
        match (self.hkey(), other.hkey()) {
            (Some(mine), Some(theirs)) => mine.prefix_of(theirs),
            _ => false,
        }
    }

    fn compare_to(
        &self,
        other: &dyn Row,
        left_start: usize,
        right_start: usize,
        count: usize,
    ) -> Result<i32> {
        compare_fields(self, other, left_start, right_start, count)
    }

    fn is_bindings_sensitive(&self) -> bool {
        false
    }

    /// True while a cursor's pool owns this row besides its handles.
    fn pooled(&self) -> bool {
        false
    }

    /// The row this one reads through unchanged, for rows that only wrap
    /// another. Sharing follows the wrapped row.
    fn wrapped(&self) -> Option<&RowRef> {
        None
    }
}

pub(crate) fn compare_fields<L: Row + ?Sized>(
    left: &L,
    right: &dyn Row,
    left_start: usize,
    right_start: usize,
    count: usize,
) -> Result<i32> {
    ensure!(
        left_start + count <= left.nfields(),
        "compare range {}..{} exceeds {} fields of {}",
        left_start,
        left_start + count,
        left.nfields(),
        left.row_type()
    );
    ensure!(
        right_start + count <= right.nfields(),
        "compare range {}..{} exceeds {} fields of {}",
        right_start,
        right_start + count,
        right.nfields(),
        right.row_type()
    );
    let types = left.row_type().fields();
    for i in 0..count {
        let ordering = types[left_start + i].compare(
            left.value(left_start + i)?,
            right.value(right_start + i)?,
        );
        match ordering {
            Ordering::Less => return Ok(-(i as i32 + 1)),
            Ordering::Greater => return Ok(i as i32 + 1),
            Ordering::Equal => {}
        }
    }
    Ok(0)
}

pub(crate) fn check_field<R: Row + ?Sized>(row: &R, index: usize) -> Result<()> {
    ensure!(
        index < row.nfields(),
        "field {} out of range for {} ({} fields)",
        index,
        row.row_type(),
        row.nfields()
    );
    Ok(())
}

/// Shared handle to a row.
#[derive(Clone)]
pub struct RowRef(Rc<dyn Row>);

impl RowRef {
    pub fn new<R: Row + 'static>(row: R) -> Self {
        Self(Rc::new(row))
    }

    /// Takes an additional reference that survives the producing cursor's
    /// next step.
    pub fn acquire(&self) -> RowRef {
        self.clone()
    }

    /// Gives back a reference taken with `acquire`.
    ///
    /// # Panics
    ///
    /// Panics if the row is pooled and this is the only handle outside the
    /// pool, i.e. the row was never acquired.
    pub fn release(self) {
        if self.pool_backed() {
            assert!(
                self.is_shared(),
                "release of unacquired pooled {} row",
                self.0.row_type()
            );
        }
    }

    /// True if a pooled row has been acquired and not yet released. A
    /// wrapper is shared when it was acquired itself or its wrapped row is.
    pub fn is_shared(&self) -> bool {
        if self.0.pooled() {
            return Rc::strong_count(&self.0) > 2;
        }
        match self.0.wrapped() {
            Some(inner) => Rc::strong_count(&self.0) > 1 || inner.is_shared(),
            None => false,
        }
    }

    fn pool_backed(&self) -> bool {
        self.0.pooled() || self.0.wrapped().map_or(false, RowRef::pool_backed)
    }

    /// This row if its type is `row_type`, otherwise the matching component.
    pub fn sub_row(&self, row_type: &RowType) -> Option<RowRef> {
        if self.0.row_type().id() == row_type.id() {
            Some(self.clone())
        } else {
            self.0.sub_row(row_type)
        }
    }

    pub fn ptr_eq(a: &RowRef, b: &RowRef) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }
}

impl<R: Row + 'static> From<Rc<R>> for RowRef {
    fn from(row: Rc<R>) -> Self {
        Self(row)
    }
}

impl Deref for RowRef {
    type Target = dyn Row;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

impl fmt::Debug for RowRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for RowRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.0.row_type())?;
        for i in 0..self.0.nfields() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match self.0.value(i) {
                Ok(value) => write!(f, "{}", value)?,
                Err(_) => write!(f, "?")?,
            }
        }
        write!(f, ")")
    }
}
