//! Value-holder rows: the materialized row variants.
//!
//! `ImmutableRow` is an explicit copy, built once and never changed.
//! `MutableRow` is the backing store of a cursor. It is cleared and refilled
//! on every scan step, so consumers that keep it across steps must acquire
//! it; the `&mut` required for mutation makes refilling a shared row
//! impossible.

use super::{check_field, Row};
use crate::config::ROW_INLINE_FIELDS;
use crate::hkey::HKey;
use crate::schema::RowType;
use crate::types::{Value, ValueHolder};
use eyre::{ensure, eyre, Result};
use smallvec::SmallVec;
use std::cell::Cell;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ImmutableRow {
    row_type: Arc<RowType>,
    values: SmallVec<[Value; ROW_INLINE_FIELDS]>,
    hkey: Option<HKey>,
}

impl ImmutableRow {
    /// Creates a row from values that already match the field types.
    pub fn new(row_type: Arc<RowType>, values: impl IntoIterator<Item = Value>) -> Result<Self> {
        let values: SmallVec<[Value; ROW_INLINE_FIELDS]> = values.into_iter().collect();
        ensure!(
            values.len() == row_type.nfields(),
            "{} expects {} values, got {}",
            row_type,
            row_type.nfields(),
            values.len()
        );
        for (i, (value, ty)) in values.iter().zip(row_type.fields()).enumerate() {
            ensure!(
                ty.accepts(value),
                "field {} of {}: {:?} is not a {}",
                i,
                row_type,
                value,
                ty
            );
        }
        Ok(Self {
            row_type,
            values,
            hkey: None,
        })
    }

    /// Creates a row, casting each value to its field type.
    pub fn converting(
        row_type: Arc<RowType>,
        values: impl IntoIterator<Item = Value>,
    ) -> Result<Self> {
        let values: Vec<Value> = values.into_iter().collect();
        ensure!(
            values.len() == row_type.nfields(),
            "{} expects {} values, got {}",
            row_type,
            row_type.nfields(),
            values.len()
        );
        let cast = values
            .into_iter()
            .zip(row_type.fields())
            .map(|(value, ty)| ty.cast(value))
            .collect::<Result<Vec<_>>>()?;
        Self::new(row_type, cast)
    }

    /// Copies the fields and key of any row.
    pub fn copy_of(row: &dyn Row) -> Result<Self> {
        let values = (0..row.nfields())
            .map(|i| row.value(i).cloned())
            .collect::<Result<SmallVec<_>>>()?;
        Ok(Self {
            row_type: Arc::clone(row.row_type()),
            values,
            hkey: row.hkey().cloned(),
        })
    }

    pub fn with_hkey(mut self, hkey: HKey) -> Self {
        self.hkey = Some(hkey);
        self
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

impl Row for ImmutableRow {
    fn row_type(&self) -> &Arc<RowType> {
        &self.row_type
    }

    fn value(&self, index: usize) -> Result<&Value> {
        check_field(self, index)?;
        Ok(&self.values[index])
    }

    fn hkey(&self) -> Option<&HKey> {
        self.hkey.as_ref()
    }
}

/// Lifecycle of a cursor-backed row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowState {
    Unpopulated,
    Populated,
    Cleared,
}

#[derive(Debug)]
pub struct MutableRow {
    row_type: Arc<RowType>,
    holders: SmallVec<[ValueHolder; ROW_INLINE_FIELDS]>,
    hkey: Option<HKey>,
    state: RowState,
    pooled: Cell<bool>,
}

impl MutableRow {
    pub fn new(row_type: Arc<RowType>) -> Self {
        let holders = row_type.fields().iter().map(|ty| ValueHolder::new(*ty)).collect();
        let hkey = row_type.hkey_shape().map(|shape| HKey::new(Arc::clone(shape)));
        Self {
            row_type,
            holders,
            hkey,
            state: RowState::Unpopulated,
            pooled: Cell::new(false),
        }
    }

    pub fn state(&self) -> RowState {
        self.state
    }

    pub fn set(&mut self, index: usize, value: Value) -> Result<()> {
        check_field(self, index)?;
        self.holders[index].put(value)?;
        self.state = RowState::Populated;
        Ok(())
    }

    /// Unsets every field; reads fail until the row is refilled.
    pub fn clear(&mut self) {
        for holder in &mut self.holders {
            holder.unset();
        }
        self.state = RowState::Cleared;
    }

    pub fn hkey_mut(&mut self) -> Result<&mut HKey> {
        let row_type = &self.row_type;
        self.hkey
            .as_mut()
            .ok_or_else(|| eyre!("{} rows have no hkey", row_type))
    }

    pub fn snapshot(&self) -> Result<ImmutableRow> {
        ImmutableRow::copy_of(self)
    }

    pub(crate) fn set_pooled(&self, pooled: bool) {
        self.pooled.set(pooled);
    }
}

impl Row for MutableRow {
    fn row_type(&self) -> &Arc<RowType> {
        &self.row_type
    }

    fn value(&self, index: usize) -> Result<&Value> {
        check_field(self, index)?;
        self.holders[index].get()
    }

    fn hkey(&self) -> Option<&HKey> {
        self.hkey.as_ref()
    }

    fn pooled(&self) -> bool {
        self.pooled.get()
    }
}
