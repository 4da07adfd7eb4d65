use super::GroupCursor;
use crate::encoding::{encode_ordinal, encode_value, KeyReader};
use crate::hkey::HKey;
use crate::row::{ImmutableRow, Row, RowRef};
use crate::schema::{Group, RowType, Schema, Table, TableId};
use crate::types::Value;
use eyre::{bail, ensure, eyre, Result, WrapErr};
use hashbrown::HashMap;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

pub struct MemoryStore {
    group: Arc<Group>,
    row_types: HashMap<u32, Arc<RowType>>,
    pub(super) rows: BTreeMap<Vec<u8>, Vec<u8>>,
    primary: HashMap<(TableId, Vec<u8>), Vec<u8>>,
}

impl MemoryStore {
    pub fn new(schema: &Schema, group: Arc<Group>) -> Result<Self> {
        let mut row_types = HashMap::with_capacity(group.tables().len());
        for table in group.tables() {
            row_types.insert(table.ordinal(), schema.table_type(table)?);
        }
        Ok(Self {
            group,
            row_types,
            rows: BTreeMap::new(),
            primary: HashMap::new(),
        })
    }

    pub fn group(&self) -> &Arc<Group> {
        &self.group
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Stores a row of `table` and returns its HKey.
    ///
    /// Ancestor key columns are taken from the parent row, found by the
    /// child's join columns. A row whose parent is not stored is kept as an
    /// orphan with NULL for the ancestor columns it cannot supply itself.
    pub fn insert(&mut self, table: &Table, values: Vec<Value>) -> Result<HKey> {
        self.check_table(table)?;
        ensure!(
            values.len() == table.columns().len(),
            "table '{}' has {} columns, got {} values",
            table.name(),
            table.columns().len(),
            values.len()
        );
        let values = values
            .into_iter()
            .zip(table.columns())
            .map(|(value, column)| {
                column
                    .ty()
                    .cast(value)
                    .wrap_err_with(|| format!("column '{}' of '{}'", column.name(), table.name()))
            })
            .collect::<Result<Vec<_>>>()?;

        let pk = encode_fields(table.primary_key().iter().map(|&c| &values[c]));
        ensure!(
            !self.primary.contains_key(&(table.id(), pk.clone())),
            "duplicate primary key in '{}'",
            table.name()
        );

        let parent = self.parent_hkey(table, &values)?;
        if table.parent().is_some() && parent.is_none() {
            debug!(table = table.name(), "inserting row without a stored parent");
        }
        let hkey = HKey::for_row(Arc::clone(table.hkey_shape()), &values, parent.as_ref())?;
        let key = hkey.encode();
        ensure!(
            !self.rows.contains_key(&key),
            "hkey {} of '{}' is already stored",
            hkey,
            table.name()
        );

        let mut record = Vec::new();
        encode_ordinal(table.ordinal(), &mut record);
        for value in &values {
            encode_value(value, &mut record);
        }
        self.rows.insert(key.clone(), record);
        self.primary.insert((table.id(), pk), key);
        Ok(hkey)
    }

    /// The row of `table` with primary key `pk`.
    pub fn get(&self, table: &Table, pk: &[Value]) -> Result<Option<RowRef>> {
        self.check_table(table)?;
        let Some(key) = self.primary_key_entry(table, pk)? else {
            return Ok(None);
        };
        self.row_at_key(key)
    }

    /// Removes the row of `table` with primary key `pk`. Descendant rows are
    /// left in place.
    pub fn delete(&mut self, table: &Table, pk: &[Value]) -> Result<bool> {
        self.check_table(table)?;
        let pk = self.encode_primary_key(table, pk)?;
        match self.primary.remove(&(table.id(), pk)) {
            Some(key) => Ok(self.rows.remove(&key).is_some()),
            None => Ok(false),
        }
    }

    pub fn row_at(&self, hkey: &HKey) -> Result<Option<RowRef>> {
        ensure!(
            hkey.group() == self.group.id(),
            "hkey {} belongs to another group",
            hkey
        );
        self.row_at_key(&hkey.encode())
    }

    /// The stored row of `table` on `row`'s ancestor path.
    pub fn lookup_ancestor(&self, row: &dyn Row, table: &Table) -> Result<Option<RowRef>> {
        let hkey = row.ancestor_hkey(table)?;
        self.row_at(&hkey)
    }

    pub fn scan(&self) -> GroupCursor<'_> {
        GroupCursor::new(self, None)
    }

    /// Scans the row at `hkey` and all of its descendants.
    pub fn scan_subtree(&self, hkey: &HKey) -> GroupCursor<'_> {
        GroupCursor::new(self, Some(hkey.encode()))
    }

    /// Decodes a stored record into its row type and field values.
    pub(super) fn decode_record(&self, record: &[u8]) -> Result<(&Arc<RowType>, Vec<Value>)> {
        let mut reader = KeyReader::new(record);
        let ordinal = reader.read_ordinal()?;
        let row_type = self
            .row_types
            .get(&ordinal)
            .ok_or_else(|| eyre!("record has unknown table ordinal {}", ordinal))?;
        let mut values = Vec::with_capacity(row_type.nfields());
        for (i, ty) in row_type.fields().iter().enumerate() {
            let value = match reader.read_value(ty.underlying())? {
                Some(value) => value,
                None => {
                    let stored = reader.read_any()?;
                    debug!(
                        row_type = %row_type,
                        field = i,
                        expected = %ty,
                        stored = %stored,
                        "record field type mismatch, using generic decode"
                    );
                    stored
                }
            };
            values.push(ty.read_collating(value)?);
        }
        ensure!(
            reader.is_exhausted(),
            "record of {} has {} trailing bytes",
            row_type,
            reader.remaining().len()
        );
        Ok((row_type, values))
    }

    fn row_at_key(&self, key: &[u8]) -> Result<Option<RowRef>> {
        let Some(record) = self.rows.get(key) else {
            return Ok(None);
        };
        let (row_type, values) = self
            .decode_record(record)
            .wrap_err("decoding stored row")?;
        let shape = row_type
            .hkey_shape()
            .ok_or_else(|| eyre!("{} rows have no hkey", row_type))?;
        let mut hkey = HKey::new(Arc::clone(shape));
        hkey.copy_from_key(key)?;
        let row = ImmutableRow::new(Arc::clone(row_type), values)?.with_hkey(hkey);
        Ok(Some(RowRef::new(row)))
    }

    fn check_table(&self, table: &Table) -> Result<()> {
        ensure!(
            table.group() == self.group.id(),
            "table '{}' is not part of group '{}'",
            table.name(),
            self.group.name()
        );
        Ok(())
    }

    fn encode_primary_key(&self, table: &Table, pk: &[Value]) -> Result<Vec<u8>> {
        let columns = table.primary_key();
        ensure!(
            pk.len() == columns.len(),
            "primary key of '{}' has {} columns, got {} values",
            table.name(),
            columns.len(),
            pk.len()
        );
        let cast = columns
            .iter()
            .zip(pk)
            .map(|(&c, value)| table.columns()[c].ty().cast(value.clone()))
            .collect::<Result<Vec<_>>>()?;
        Ok(encode_fields(cast.iter()))
    }

    fn primary_key_entry(&self, table: &Table, pk: &[Value]) -> Result<Option<&Vec<u8>>> {
        let pk = self.encode_primary_key(table, pk)?;
        Ok(self.primary.get(&(table.id(), pk)))
    }

    /// The HKey of the stored parent of a `table` row with `values`.
    fn parent_hkey(&self, table: &Table, values: &[Value]) -> Result<Option<HKey>> {
        let Some(parent_id) = table.parent() else {
            return Ok(None);
        };
        let parent = self
            .group
            .table_by_id(parent_id)
            .ok_or_else(|| {
                eyre!("parent {} of '{}' is not in the group", parent_id, table.name())
            })?;

        let mut parent_pk = Vec::with_capacity(parent.primary_key().len());
        for &column in parent.primary_key() {
            let Some(join) = table.parent_join().iter().find(|j| j.parent == column) else {
                bail!(
                    "'{}' does not join parent key column {} of '{}'",
                    table.name(),
                    column,
                    parent.name()
                );
            };
            let value = &values[join.child];
            if value.is_null() {
                return Ok(None);
            }
            parent_pk.push(value.clone());
        }

        let Some(key) = self.primary_key_entry(parent, &parent_pk)? else {
            return Ok(None);
        };
        let mut hkey = HKey::new(Arc::clone(parent.hkey_shape()));
        hkey.copy_from_key(key)?;
        Ok(Some(hkey))
    }
}

fn encode_fields<'v>(values: impl Iterator<Item = &'v Value>) -> Vec<u8> {
    let mut buf = Vec::new();
    for value in values {
        encode_value(value, &mut buf);
    }
    buf
}
