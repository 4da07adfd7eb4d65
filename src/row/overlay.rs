use super::{check_field, Row, RowRef};
use crate::config::ROW_INLINE_FIELDS;
use crate::hkey::HKey;
use crate::schema::{RowType, Table};
use crate::types::Value;
use eyre::{ensure, Result};
use smallvec::SmallVec;
use std::sync::Arc;

/// A row with some fields replaced.
///
/// "No override" and "override with NULL" are different states: `overlay`
/// always installs its value, including a NULL, while `overlay_object` with
/// `None` removes the override so the underlying field shows through again.
#[derive(Debug, Clone)]
pub struct OverlayingRow {
    underlying: RowRef,
    overlays: SmallVec<[Option<Value>; ROW_INLINE_FIELDS]>,
}

impl OverlayingRow {
    pub fn new(underlying: RowRef) -> Self {
        let overlays = std::iter::repeat(None).take(underlying.nfields()).collect();
        Self {
            underlying,
            overlays,
        }
    }

    pub fn underlying(&self) -> &RowRef {
        &self.underlying
    }

    /// Overrides field `index` with a value of the field's type.
    pub fn overlay(&mut self, index: usize, value: Value) -> Result<&mut Self> {
        check_field(self, index)?;
        let ty = self.underlying.row_type().fields()[index];
        ensure!(
            ty.accepts(&value),
            "cannot overlay field {} ({}) with {:?}",
            index,
            ty,
            value
        );
        self.overlays[index] = Some(value);
        Ok(self)
    }

    /// Overrides field `index` with any convertible value, or removes the
    /// override when `object` is `None`.
    pub fn overlay_object<V: Into<Value>>(
        &mut self,
        index: usize,
        object: Option<V>,
    ) -> Result<&mut Self> {
        check_field(self, index)?;
        self.overlays[index] = match object {
            Some(object) => {
                let ty = self.underlying.row_type().fields()[index];
                Some(ty.cast(object.into())?)
            }
            None => None,
        };
        Ok(self)
    }

    pub fn is_overlaid(&self, index: usize) -> bool {
        self.overlays.get(index).map_or(false, Option::is_some)
    }
}

impl Row for OverlayingRow {
    fn row_type(&self) -> &Arc<RowType> {
        self.underlying.row_type()
    }

    fn value(&self, index: usize) -> Result<&Value> {
        check_field(self, index)?;
        match &self.overlays[index] {
            Some(value) => Ok(value),
            None => self.underlying.value(index),
        }
    }

    fn hkey(&self) -> Option<&HKey> {
        self.underlying.hkey()
    }

    fn sub_row(&self, row_type: &RowType) -> Option<RowRef> {
        self.underlying.sub_row(row_type)
    }

    fn contains_real_row_of(&self, table: &Table) -> bool {
        self.underlying.contains_real_row_of(table)
    }

    fn is_bindings_sensitive(&self) -> bool {
        self.underlying.is_bindings_sensitive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::Coi;

    #[test]
    fn test_typed_null_differs_from_no_override() {
        let coi = Coi::new();
        let mut row = OverlayingRow::new(coi.customer_row(1, "Ann"));

        row.overlay(1, Value::Null).unwrap();
        assert_eq!(row.value(1).unwrap(), &Value::Null);
        assert!(row.is_overlaid(1));

        row.overlay_object(1, None::<&str>).unwrap();
        assert_eq!(row.value(1).unwrap(), &Value::from("Ann"));
        assert!(!row.is_overlaid(1));
    }

    #[test]
    fn test_object_overlay_casts_to_field_type() {
        let coi = Coi::new();
        let mut row = OverlayingRow::new(coi.order_row(10, 1, 2.5));
        row.overlay_object(2, Some(7i32)).unwrap();
        assert_eq!(row.value(2).unwrap(), &Value::Double(7.0));
        row.overlay_object(0, Some("42")).unwrap();
        assert_eq!(row.value(0).unwrap(), &Value::Int64(42));
        assert!(row.overlay_object(0, Some("forty")).is_err());
    }

    #[test]
    fn test_typed_overlay_requires_matching_kind() {
        let coi = Coi::new();
        let mut row = OverlayingRow::new(coi.customer_row(1, "Ann"));
        assert!(row.overlay(0, Value::from("x")).is_err());
        assert!(row.overlay(5, Value::Null).is_err());
        row.overlay(0, Value::Int64(3))
            .unwrap()
            .overlay(1, Value::from("Cy"))
            .unwrap();
        assert_eq!(row.value(0).unwrap(), &Value::Int64(3));
        assert_eq!(row.hkey().unwrap().to_string(), "{1,1}");
    }
}
