use super::{check_field, Row};
use crate::hkey::HKey;
use crate::schema::{RowType, RowTypeKind};
use crate::types::{Value, NULL_VALUE};
use eyre::{ensure, Result};
use std::sync::Arc;

/// A row exposing an HKey's column values as fields. Columns of segments
/// the key does not currently show read as NULL.
#[derive(Debug, Clone)]
pub struct HKeyRow {
    row_type: Arc<RowType>,
    hkey: HKey,
}

impl HKeyRow {
    pub fn new(row_type: Arc<RowType>, hkey: HKey) -> Result<Self> {
        ensure!(
            matches!(row_type.kind(), RowTypeKind::HKey),
            "{} is not an hkey row type",
            row_type
        );
        ensure!(
            row_type
                .hkey_shape()
                .map_or(false, |shape| shape.table() == hkey.shape().table()),
            "hkey of table {} does not fit {}",
            hkey.shape().table(),
            row_type
        );
        Ok(Self { row_type, hkey })
    }

    pub fn hkey_mut(&mut self) -> &mut HKey {
        &mut self.hkey
    }
}

impl Row for HKeyRow {
    fn row_type(&self) -> &Arc<RowType> {
        &self.row_type
    }

    fn value(&self, index: usize) -> Result<&Value> {
        check_field(self, index)?;
        Ok(self.hkey.values().get(index).unwrap_or(&NULL_VALUE))
    }

    fn hkey(&self) -> Option<&HKey> {
        Some(&self.hkey)
    }
}
