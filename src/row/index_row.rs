//! Index rows.
//!
//! An index row is built field by field into an encoded key whose byte
//! order is the index order. The fields follow the index definition: the
//! declared columns (with spatial coordinates reduced to one z-value), then
//! the HKey columns the declared columns do not cover. Once every field is
//! present the row can rebuild the HKey of the table row it indexes.
//!
//! Lifecycle:
//!
//! ```text
//! new ──> initialize(row, hkey) ──> close(true)     complete entry for insert
//!     └─> append(v) ... append(v) ──> close(false)  partial key (scan bound)
//! ```

use super::{check_field, Row};
use crate::config::ROW_INLINE_FIELDS;
use crate::encoding::{encode_value, KeyReader};
use crate::hkey::HKey;
use crate::schema::{IndexDef, IndexSource, RowType, RowTypeKind};
use crate::types::Value;
use eyre::{bail, ensure, eyre, Result, WrapErr};
use smallvec::SmallVec;
use std::sync::Arc;

/// Reduces a spatial index's coordinate columns to z-values.
pub trait SpatialColumnHandler {
    fn dimensions(&self) -> usize;

    /// The z-values covering the object in `columns` of `row`. A point has
    /// one; a NULL coordinate has none.
    fn z_values(&self, row: &dyn Row, columns: &[usize]) -> Result<SmallVec<[i64; 4]>>;
}

pub trait IndexRow: Row {
    /// Resets the row and writes every field for `row`, whose key is `hkey`.
    /// A spatial index needs `spatial` and writes `z_value` as its spatial
    /// field.
    fn initialize(
        &mut self,
        row: &dyn Row,
        hkey: &HKey,
        spatial: Option<&dyn SpatialColumnHandler>,
        z_value: i64,
    ) -> Result<()>;

    /// Writes the next field.
    fn append(&mut self, value: Value) -> Result<()>;

    /// Finishes the row. Rows closed for insert must have every field.
    fn close(&mut self, for_insert: bool) -> Result<()>;

    fn key_bytes(&self) -> &[u8];
}

/// An index row backed by its encoded key.
#[derive(Debug, Clone)]
pub struct KeyIndexRow {
    row_type: Arc<RowType>,
    index: Arc<IndexDef>,
    key: Vec<u8>,
    offsets: SmallVec<[usize; ROW_INLINE_FIELDS]>,
    values: SmallVec<[Value; ROW_INLINE_FIELDS]>,
    hkey: HKey,
    hkey_valid: bool,
    closed: bool,
}

impl KeyIndexRow {
    pub fn new(row_type: Arc<RowType>) -> Result<Self> {
        let RowTypeKind::Index(index) = row_type.kind() else {
            bail!("{} is not an index row type", row_type);
        };
        let index = Arc::clone(index);
        let hkey = HKey::new(Arc::clone(index.table().hkey_shape()));
        Ok(Self {
            row_type,
            index,
            key: Vec::new(),
            offsets: SmallVec::new(),
            values: SmallVec::new(),
            hkey,
            hkey_valid: false,
            closed: false,
        })
    }

    /// Decodes a (possibly partial) index key.
    pub fn from_key(row_type: Arc<RowType>, key: &[u8]) -> Result<Self> {
        let mut row = Self::new(row_type)?;
        let mut reader = KeyReader::new(key);
        let mut field = 0;
        while !reader.is_exhausted() {
            ensure!(
                field < row.row_type.nfields(),
                "index key has bytes past its {} fields",
                row.row_type.nfields()
            );
            let ty = row.row_type.fields()[field];
            let value = reader
                .read_value(ty.underlying())
                .wrap_err_with(|| format!("decoding field {} of {}", field, row.row_type))?
                .ok_or_else(|| {
                    eyre!(
                        "field {} of {} holds a value of another type",
                        field,
                        row.row_type
                    )
                })?;
            row.append(ty.read_collating(value)?)?;
            field += 1;
        }
        row.close(false)?;
        Ok(row)
    }

    pub fn index(&self) -> &Arc<IndexDef> {
        &self.index
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Compares the first `fields` fields by their encoded bytes, returning
    /// `0` or `±(i + 1)` for the first differing field `i`.
    pub fn compare_keys(&self, other: &KeyIndexRow, fields: usize) -> Result<i32> {
        ensure!(
            fields <= self.values.len() && fields <= other.values.len(),
            "cannot compare {} fields of index rows holding {} and {}",
            fields,
            self.values.len(),
            other.values.len()
        );
        for i in 0..fields {
            match self.field_bytes(i).cmp(other.field_bytes(i)) {
                std::cmp::Ordering::Less => return Ok(-(i as i32 + 1)),
                std::cmp::Ordering::Greater => return Ok(i as i32 + 1),
                std::cmp::Ordering::Equal => {}
            }
        }
        Ok(0)
    }

    fn field_bytes(&self, field: usize) -> &[u8] {
        let start = self.offsets[field];
        let end = self
            .offsets
            .get(field + 1)
            .copied()
            .unwrap_or(self.key.len());
        &self.key[start..end]
    }

    fn reset(&mut self) {
        self.key.clear();
        self.offsets.clear();
        self.values.clear();
        self.hkey_valid = false;
        self.closed = false;
    }

    fn push(&mut self, value: Value) {
        self.offsets.push(self.key.len());
        encode_value(&value, &mut self.key);
        self.values.push(value);
    }
}

impl IndexRow for KeyIndexRow {
    fn initialize(
        &mut self,
        row: &dyn Row,
        hkey: &HKey,
        spatial: Option<&dyn SpatialColumnHandler>,
        z_value: i64,
    ) -> Result<()> {
        let table = self.index.table();
        ensure!(
            hkey.shape().table() == table.id() && hkey.segments() == hkey.shape().depth(),
            "index '{}' needs a full hkey of table '{}'",
            self.index.name(),
            table.name()
        );
        self.reset();
        let index = Arc::clone(&self.index);
        for (field, source) in index.fields().iter().enumerate() {
            let ty = index.field_types()[field];
            let value = match *source {
                IndexSource::Row(column) => ty.cast(row.value(column)?.clone())?,
                IndexSource::HKey(position) => hkey.values()[position].clone(),
                IndexSource::Spatial(_) => {
                    let Some(handler) = spatial else {
                        bail!("spatial index '{}' needs a spatial handler", index.name());
                    };
                    let dimensions = index.spatial_columns().map_or(0, |r| r.len());
                    ensure!(
                        handler.dimensions() == dimensions,
                        "spatial handler has {} dimensions, index '{}' has {}",
                        handler.dimensions(),
                        index.name(),
                        dimensions
                    );
                    Value::Int64(z_value)
                }
            };
            self.push(value);
        }
        Ok(())
    }

    fn append(&mut self, value: Value) -> Result<()> {
        ensure!(!self.closed, "append to closed index row of {}", self.row_type);
        let field = self.values.len();
        ensure!(
            field < self.row_type.nfields(),
            "index row of {} already has all {} fields",
            self.row_type,
            self.row_type.nfields()
        );
        let value = self.row_type.fields()[field].cast(value)?;
        self.push(value);
        Ok(())
    }

    fn close(&mut self, for_insert: bool) -> Result<()> {
        let complete = self.values.len() == self.row_type.nfields();
        ensure!(
            complete || !for_insert,
            "index row for insert into '{}' has {} of {} fields",
            self.index.name(),
            self.values.len(),
            self.row_type.nfields()
        );
        if complete {
            let hkey_fields = self.index.hkey_fields().to_vec();
            self.hkey.use_segments(self.hkey.shape().depth());
            for (position, field) in hkey_fields.into_iter().enumerate() {
                self.hkey.set_value(position, self.values[field].clone())?;
            }
        }
        self.hkey_valid = complete;
        self.closed = true;
        Ok(())
    }

    fn key_bytes(&self) -> &[u8] {
        &self.key
    }
}

impl Row for KeyIndexRow {
    fn row_type(&self) -> &Arc<RowType> {
        &self.row_type
    }

    fn value(&self, index: usize) -> Result<&Value> {
        check_field(self, index)?;
        self.values.get(index).ok_or_else(|| {
            eyre!(
                "field {} of index row {} has not been written",
                index,
                self.row_type
            )
        })
    }

    fn hkey(&self) -> Option<&HKey> {
        self.hkey_valid.then_some(&self.hkey)
    }
}

/// Two-dimensional integer points ordered along a Z curve.
///
/// Coordinates must fit in 32 bits. Sign bits are flipped before the bits
/// are interleaved (x in the odd positions), so z-values of negative
/// coordinates sort below positive ones.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZOrderPoint;

impl ZOrderPoint {
    pub fn z_value(x: i32, y: i32) -> i64 {
        let ux = (x as u32) ^ 0x8000_0000;
        let uy = (y as u32) ^ 0x8000_0000;
        let z = (spread(ux) << 1) | spread(uy);
        (z ^ (1 << 63)) as i64
    }
}

fn spread(v: u32) -> u64 {
    let mut x = v as u64;
    x = (x | (x << 16)) & 0x0000_FFFF_0000_FFFF;
    x = (x | (x << 8)) & 0x00FF_00FF_00FF_00FF;
    x = (x | (x << 4)) & 0x0F0F_0F0F_0F0F_0F0F;
    x = (x | (x << 2)) & 0x3333_3333_3333_3333;
    (x | (x << 1)) & 0x5555_5555_5555_5555
}

fn coordinate(row: &dyn Row, column: usize) -> Result<Option<i32>> {
    let value = row.value(column)?;
    if value.is_null() {
        return Ok(None);
    }
    let v = value
        .as_i64()
        .ok_or_else(|| eyre!("spatial column {} is not an integer: {:?}", column, value))?;
    let v = i32::try_from(v).map_err(|_| eyre!("coordinate {} out of range", v))?;
    Ok(Some(v))
}

impl SpatialColumnHandler for ZOrderPoint {
    fn dimensions(&self) -> usize {
        2
    }

    fn z_values(&self, row: &dyn Row, columns: &[usize]) -> Result<SmallVec<[i64; 4]>> {
        ensure!(
            columns.len() == 2,
            "point needs 2 coordinate columns, got {}",
            columns.len()
        );
        let mut out = SmallVec::new();
        if let (Some(x), Some(y)) = (coordinate(row, columns[0])?, coordinate(row, columns[1])?) {
            out.push(Self::z_value(x, y));
        }
        Ok(out)
    }
}
