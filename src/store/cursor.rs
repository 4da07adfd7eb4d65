use super::MemoryStore;
use crate::operator::RowCursor;
use crate::row::{MutableRow, RowRef, RowState};
use crate::schema::RowType;
use eyre::{bail, eyre, Result, WrapErr};
use hashbrown::HashMap;
use std::collections::btree_map;
use std::rc::Rc;
use std::sync::Arc;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CursorState {
    Idle,
    Active,
    Exhausted,
    Closed,
}

/// Scans a `MemoryStore` in HKey order, optionally limited to one subtree.
pub struct GroupCursor<'s> {
    store: &'s MemoryStore,
    prefix: Option<Vec<u8>>,
    range: Option<btree_map::Range<'s, Vec<u8>, Vec<u8>>>,
    pool: HashMap<u32, Rc<MutableRow>>,
    state: CursorState,
}

fn pooled_row(row_type: &Arc<RowType>) -> Rc<MutableRow> {
    let row = MutableRow::new(Arc::clone(row_type));
    row.set_pooled(true);
    Rc::new(row)
}

impl<'s> GroupCursor<'s> {
    pub(super) fn new(store: &'s MemoryStore, prefix: Option<Vec<u8>>) -> Self {
        Self {
            store,
            prefix,
            range: None,
            pool: HashMap::new(),
            state: CursorState::Idle,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state == CursorState::Closed
    }

    fn release_pool(&mut self) {
        for (_, row) in self.pool.drain() {
            row.set_pooled(false);
        }
    }

    /// Returns the pooled row for `ordinal`, ready to refill. A row that a
    /// consumer still holds is left to the consumer and replaced.
    fn reusable_row(&mut self, ordinal: u32, row_type: &Arc<RowType>) -> &mut Rc<MutableRow> {
        let slot = self
            .pool
            .entry(ordinal)
            .or_insert_with(|| pooled_row(row_type));
        if Rc::get_mut(slot).is_none() {
            trace!(
                row_type = %row_type,
                holders = Rc::strong_count(slot) - 1,
                "pooled row still held, allocating a new one"
            );
            slot.set_pooled(false);
            *slot = pooled_row(row_type);
        }
        slot
    }
}

impl RowCursor for GroupCursor<'_> {
    fn open(&mut self) -> Result<()> {
        if self.state == CursorState::Closed {
            bail!("cannot reopen a closed group cursor");
        }
        let rows = &self.store.rows;
        self.range = Some(match &self.prefix {
            Some(prefix) => rows.range(prefix.clone()..),
            None => rows.range::<Vec<u8>, _>(..),
        });
        self.state = CursorState::Active;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<RowRef>> {
        match self.state {
            CursorState::Active => {}
            CursorState::Exhausted => return Ok(None),
            CursorState::Idle => bail!("group cursor read before open"),
            CursorState::Closed => bail!("group cursor read after close"),
        }
        let entry = self.range.as_mut().and_then(Iterator::next);
        let Some((key, record)) = entry else {
            self.state = CursorState::Exhausted;
            return Ok(None);
        };
        if let Some(prefix) = &self.prefix {
            if !key.starts_with(prefix) {
                self.state = CursorState::Exhausted;
                return Ok(None);
            }
        }

        let store = self.store;
        let (row_type, values) = store
            .decode_record(record)
            .wrap_err("decoding group scan row")?;
        let ordinal = row_type
            .table()
            .map(|t| t.ordinal())
            .ok_or_else(|| eyre!("{} is not a table row type", row_type))?;

        let slot = self.reusable_row(ordinal, row_type);
        let row = Rc::get_mut(slot).ok_or_else(|| eyre!("new pooled row is already shared"))?;
        if row.state() == RowState::Populated {
            row.clear();
        }
        for (i, value) in values.into_iter().enumerate() {
            row.set(i, value)?;
        }
        row.hkey_mut()?
            .copy_from_key(key)
            .wrap_err_with(|| format!("decoding hkey of {} row", row_type))?;
        Ok(Some(RowRef::from(Rc::clone(slot))))
    }

    /// Ends the scan. Rows handed out stay valid but are no longer reused.
    fn close(&mut self) -> Result<()> {
        self.range = None;
        self.release_pool();
        self.state = CursorState::Closed;
        Ok(())
    }
}

impl Drop for GroupCursor<'_> {
    fn drop(&mut self) {
        self.release_pool();
    }
}
