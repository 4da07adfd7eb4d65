//! HKey-ordered flatten.
//!
//! The input is a stream of rows in HKey order that contains rows of a
//! parent type and rows of its child type (and possibly rows of other types,
//! which pass through). Because every child directly follows its parent in
//! HKey order, the operator only needs to remember the most recent parent:
//!
//! ```text
//! input                 output (inner)            output (left)
//! customer 1            .                         .
//!   order 10            flatten(c1, o10)          flatten(c1, o10)
//!   order 11            flatten(c1, o11)          flatten(c1, o11)
//! customer 2            .                         .
//! customer 3            .                         flatten(c2, NULL)
//! <end>                 .                         flatten(c3, NULL)
//! ```
//!
//! A left-join row for a childless parent is emitted as soon as the input
//! proves no child can follow: another parent, a row outside the parent's
//! subtree, a row that sorts after where the first child would be, or the
//! end of input. Its HKey is the parent's key extended with the child's
//! ordinal and NULL key columns, so it sorts exactly where the missing child
//! would have been. With `left_join_shortens_hkey` the row keeps the
//! parent's key instead.

use super::RowCursor;
use crate::config::FLATTEN_MAX_PENDING;
use crate::hkey::HKey;
use crate::row::{FlattenedRow, RowRef};
use crate::schema::{RowType, Schema};
use eyre::{ensure, eyre, Result, WrapErr};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinType {
    #[default]
    Inner,
    Left,
    Right,
    Full,
}

impl JoinType {
    fn keeps_childless_parents(self) -> bool {
        matches!(self, JoinType::Left | JoinType::Full)
    }

    fn keeps_orphans(self) -> bool {
        matches!(self, JoinType::Right | JoinType::Full)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FlattenOptions {
    keep_parent: bool,
    keep_child: bool,
    left_join_shortens_hkey: bool,
}

impl FlattenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also emit the input parent rows.
    pub fn keep_parent(mut self) -> Self {
        self.keep_parent = true;
        self
    }

    /// Also emit the input child rows.
    pub fn keep_child(mut self) -> Self {
        self.keep_child = true;
        self
    }

    /// Give left-join rows the parent's HKey instead of an extended one.
    pub fn left_join_shortens_hkey(mut self) -> Self {
        self.left_join_shortens_hkey = true;
        self
    }
}

pub struct FlattenOperator<C: RowCursor> {
    input: C,
    row_type: Arc<RowType>,
    parent_type: Arc<RowType>,
    child_type: Arc<RowType>,
    join: JoinType,
    options: FlattenOptions,
    child_ordinal: u32,
    parent: Option<RowRef>,
    childless_parent: bool,
    left_join_hkey: HKey,
    pending: VecDeque<RowRef>,
    input_done: bool,
}

impl<C: RowCursor> FlattenOperator<C> {
    pub fn new(
        schema: &Schema,
        input: C,
        parent_type: &Arc<RowType>,
        child_type: &Arc<RowType>,
        join: JoinType,
        options: FlattenOptions,
    ) -> Result<Self> {
        ensure!(
            parent_type.parent_of(child_type),
            "cannot flatten {} with {}: not a parent and child",
            parent_type,
            child_type
        );
        let row_type = schema.new_flatten_type(parent_type, child_type)?;
        let child_shape = child_type
            .hkey_shape()
            .ok_or_else(|| eyre!("{} rows have no hkey", child_type))?;
        let child_ordinal = child_type
            .leaf_table()
            .map(|t| t.ordinal())
            .ok_or_else(|| eyre!("{} carries no table rows", child_type))?;
        Ok(Self {
            input,
            row_type,
            parent_type: Arc::clone(parent_type),
            child_type: Arc::clone(child_type),
            join,
            options,
            child_ordinal,
            parent: None,
            childless_parent: false,
            left_join_hkey: HKey::new(Arc::clone(child_shape)),
            pending: VecDeque::with_capacity(FLATTEN_MAX_PENDING),
            input_done: false,
        })
    }

    /// The flattened row type this operator produces.
    pub fn row_type(&self) -> &Arc<RowType> {
        &self.row_type
    }

    fn read_input(&mut self) -> Result<Option<RowRef>> {
        if self.input_done {
            return Ok(None);
        }
        let row = self
            .input
            .next()
            .wrap_err_with(|| format!("reading input of {}", self.row_type))?;
        if row.is_none() {
            self.input_done = true;
        }
        Ok(row)
    }

    fn ready_for_left_join_row(&self, input: Option<&RowRef>) -> bool {
        let Some(parent) = &self.parent else {
            return false;
        };
        if !self.join.keeps_childless_parents() || !self.childless_parent {
            return false;
        }
        let Some(row) = input else {
            return true;
        };
        if row.row_type().id() == self.parent_type.id() || !parent.ancestor_of(&**row) {
            return true;
        }
        if row.row_type().id() == self.child_type.id() {
            return false;
        }
        match row.hkey() {
            Some(hkey) => self.left_join_hkey.compare_to(hkey) < 0,
            None => true,
        }
    }

    fn set_parent(&mut self, parent: Option<RowRef>) -> Result<()> {
        if let Some(parent) = &parent {
            let hkey = parent
                .hkey()
                .ok_or_else(|| eyre!("parent row {} has no hkey", parent))?;
            hkey.copy_to(&mut self.left_join_hkey)?;
            self.left_join_hkey.extend_with_ordinal(self.child_ordinal)?;
            self.childless_parent = true;
        }
        self.parent = parent;
        Ok(())
    }

    fn generate_left_join_row(&mut self) -> Result<RowRef> {
        let parent = self
            .parent
            .as_ref()
            .ok_or_else(|| eyre!("left join row without a parent"))?;
        let parent_hkey = parent
            .hkey()
            .ok_or_else(|| eyre!("parent row {} has no hkey", parent))?;
        let hkey = if self.options.left_join_shortens_hkey {
            parent_hkey.clone()
        } else {
            let depth = self.parent_type.hkey_shape().map_or(0, |s| s.depth());
            ensure!(
                parent_hkey.segments() == depth,
                "parent hkey {} was shortened by an earlier flatten; left join of {} needs its full key",
                parent_hkey,
                self.row_type
            );
            self.left_join_hkey.clone()
        };
        let row = FlattenedRow::new(
            Arc::clone(&self.row_type),
            Some(parent.acquire()),
            None,
            hkey,
        )?;
        self.childless_parent = false;
        Ok(RowRef::new(row))
    }

    fn generate_row(&self, parent: Option<&RowRef>, child: &RowRef) -> Result<RowRef> {
        let hkey = child
            .hkey()
            .ok_or_else(|| eyre!("child row {} has no hkey", child))?
            .clone();
        let row = FlattenedRow::new(
            Arc::clone(&self.row_type),
            parent.map(RowRef::acquire),
            Some(child.acquire()),
            hkey,
        )?;
        Ok(RowRef::new(row))
    }

    fn step(&mut self, input: Option<RowRef>) -> Result<()> {
        if self.ready_for_left_join_row(input.as_ref()) {
            let row = self.generate_left_join_row()?;
            self.pending.push_back(row);
        }
        let Some(row) = input else {
            return self.set_parent(None);
        };
        let row_type = row.row_type().id();
        if row_type == self.parent_type.id() {
            if self.options.keep_parent {
                self.pending.push_back(row.acquire());
            }
            self.set_parent(Some(row))?;
        } else if row_type == self.child_type.id() {
            if self.options.keep_child {
                self.pending.push_back(row.acquire());
            }
            let parent = self.parent.as_ref().filter(|p| p.ancestor_of(&*row));
            if let Some(parent) = parent {
                let joined = self.generate_row(Some(parent), &row)?;
                self.pending.push_back(joined);
                self.childless_parent = false;
            } else {
                self.set_parent(None)?;
                if self.join.keeps_orphans() {
                    let joined = self.generate_row(None, &row)?;
                    self.pending.push_back(joined);
                }
            }
        } else {
            self.pending.push_back(row);
        }
        debug_assert!(self.pending.len() <= FLATTEN_MAX_PENDING);
        Ok(())
    }
}

impl<C: RowCursor> RowCursor for FlattenOperator<C> {
    fn open(&mut self) -> Result<()> {
        self.parent = None;
        self.childless_parent = false;
        self.pending.clear();
        self.input_done = false;
        self.input.open()
    }

    fn next(&mut self) -> Result<Option<RowRef>> {
        loop {
            if let Some(row) = self.pending.pop_front() {
                trace!(row_type = %self.row_type, row = %row, "flatten output");
                return Ok(Some(row));
            }
            if self.input_done && self.parent.is_none() {
                return Ok(None);
            }
            let input = self.read_input()?;
            self.step(input)?;
        }
    }

    fn close(&mut self) -> Result<()> {
        self.parent = None;
        self.pending.clear();
        self.input.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::Coi;
    use crate::operator::{collect_rows, RowsCursor};
    use crate::row::Row;
    use crate::types::Value;

    fn input(coi: &Coi) -> RowsCursor {
        // customer 1 with orders 10, 11; customer 2 without orders;
        // order 30 whose customer 3 is missing; customer 4 without orders.
        let o10 = coi.order_row(10, 1, 1.0);
        RowsCursor::new(vec![
            coi.customer_row(1, "Ann"),
            o10.clone(),
            coi.item_row(100, &o10, 1),
            coi.order_row(11, 1, 2.0),
            coi.customer_row(2, "Bob"),
            coi.order_row(30, 3, 3.0),
            coi.customer_row(4, "Dee"),
        ])
    }

    fn flatten(coi: &Coi, join: JoinType, options: FlattenOptions) -> Vec<RowRef> {
        let mut op =
            FlattenOperator::new(&coi.schema, input(coi), &coi.customer, &coi.order, join, options)
                .unwrap();
        collect_rows(&mut op).unwrap()
    }

    fn describe(rows: &[RowRef]) -> Vec<String> {
        rows.iter()
            .map(|r| {
                let key = r.hkey().map(|k| k.to_string()).unwrap_or_default();
                format!("{} {}", r.row_type(), key)
            })
            .collect()
    }

    #[test]
    fn test_inner_join_pairs_children_with_parent() {
        let coi = Coi::new();
        let rows = flatten(&coi, JoinType::Inner, FlattenOptions::new());
        assert_eq!(
            describe(&rows),
            vec![
                "flatten(customer, order) {1,1,2,10}",
                "item {1,1,2,10,3,100}",
                "flatten(customer, order) {1,1,2,11}",
            ]
        );
        assert_eq!(rows[0].value(1).unwrap(), &Value::from("Ann"));
        assert_eq!(rows[2].value(2).unwrap(), &Value::Int64(11));
    }

    #[test]
    fn test_full_join_emits_childless_parents_and_orphans() {
        let coi = Coi::new();
        let rows = flatten(&coi, JoinType::Full, FlattenOptions::new());
        assert_eq!(
            describe(&rows),
            vec![
                "flatten(customer, order) {1,1,2,10}",
                "item {1,1,2,10,3,100}",
                "flatten(customer, order) {1,1,2,11}",
                "flatten(customer, order) {1,2,2,NULL}",
                "flatten(customer, order) {1,3,2,30}",
                "flatten(customer, order) {1,4,2,NULL}",
            ]
        );
        let orphan = &rows[4];
        assert_eq!(orphan.value(0).unwrap(), &Value::Null);
        assert!(!orphan.contains_real_row_of(coi.table("customer")));
        assert!(orphan.contains_real_row_of(coi.table("order")));
        let childless = &rows[3];
        assert_eq!(childless.value(1).unwrap(), &Value::from("Bob"));
        assert_eq!(childless.value(2).unwrap(), &Value::Null);
    }

    #[test]
    fn test_left_join_can_keep_parent_key() {
        let coi = Coi::new();
        let rows = flatten(
            &coi,
            JoinType::Left,
            FlattenOptions::new().left_join_shortens_hkey(),
        );
        let last = describe(&rows[rows.len() - 2..]);
        assert_eq!(
            last,
            vec!["flatten(customer, order) {1,2}", "flatten(customer, order) {1,4}"]
        );
    }

    #[test]
    fn test_keep_options_pass_inputs_through() {
        let coi = Coi::new();
        let rows = flatten(
            &coi,
            JoinType::Inner,
            FlattenOptions::new().keep_parent().keep_child(),
        );
        let types: Vec<String> = rows.iter().map(|r| r.row_type().to_string()).collect();
        assert_eq!(
            types,
            vec![
                "customer",
                "order",
                "flatten(customer, order)",
                "item",
                "order",
                "flatten(customer, order)",
                "customer",
                "order",
                "customer",
            ]
        );
    }

    #[test]
    fn test_rejects_non_parent_types() {
        let coi = Coi::new();
        let result = FlattenOperator::new(
            &coi.schema,
            RowsCursor::default(),
            &coi.customer,
            &coi.item,
            JoinType::Inner,
            FlattenOptions::new(),
        );
        assert!(result.is_err());
    }
}
