//! # Hierarchical Keys
//!
//! An `HKey` locates a row inside its group's key space. It is a sequence of
//! segments, one per table on the path from the group root, each holding the
//! table's ordinal followed by that table's key column values:
//!
//! ```text
//! customer 1           {1, 1}
//! order 10 of 1        {1, 1, 2, 10}
//! item 100 of 10       {1, 1, 2, 10, 3, 100}
//! ```
//!
//! Because ancestor segments come first, every row's key is prefixed by the
//! keys of its ancestors, and sorting by HKey places each row directly after
//! its parent. A group scan over HKey order therefore yields whole object
//! subtrees contiguously.
//!
//! ## Positions
//!
//! Comparison walks a flat sequence of positions: for each visible segment,
//! first the ordinal, then the column values. `compare_to` returns `0` or
//! `±(p + 1)` where `p` is the first position at which the keys differ; a key
//! that runs out of positions first sorts low. Ordinals compare numerically
//! and values with `Value::compare_for_sort`, which is the same order the
//! persistent encoding produces.
//!
//! ## Depth
//!
//! A key is always shaped for one table (`HKeyShape`) but may show fewer
//! segments than the shape declares. `use_segments` truncates in place; the
//! hidden values stay put, so widening again restores them until the key is
//! overwritten. Decoding a shallower persistent key leaves the missing
//! trailing columns NULL.
//!
//! ## Persistent Form
//!
//! `copy_to_key` writes each visible segment as an order-preserving ordinal
//! varint followed by the encoded column values (see `encoding::key`);
//! `copy_from_key` reverses it, checking each ordinal against the shape and
//! normalizing every value through its column type.

use crate::config::HKEY_INLINE_VALUES;
use crate::encoding::{encode_ordinal, encode_value, KeyReader};
use crate::schema::{GroupId, HKeyShape, Table, TableId};
use crate::types::Value;
use eyre::{ensure, Result, WrapErr};
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct HKey {
    shape: Arc<HKeyShape>,
    values: SmallVec<[Value; HKEY_INLINE_VALUES]>,
    segments: usize,
}

impl HKey {
    /// Creates a full-depth key with every column NULL.
    pub fn new(shape: Arc<HKeyShape>) -> Self {
        let values = std::iter::repeat(Value::Null)
            .take(shape.column_count())
            .collect();
        let segments = shape.depth();
        Self {
            shape,
            values,
            segments,
        }
    }

    /// Builds the key of a row of `shape`'s table from the row's values.
    /// Ancestor columns the row does not carry are taken from `parent`, or
    /// left NULL when no parent key is available.
    pub fn for_row(shape: Arc<HKeyShape>, row: &[Value], parent: Option<&HKey>) -> Result<Self> {
        let mut key = Self::new(shape);
        let shape = Arc::clone(&key.shape);
        let mut position = 0;
        for (s, segment) in shape.segments().iter().enumerate() {
            for (c, column) in segment.columns().iter().enumerate() {
                let value = match column.row_position() {
                    Some(p) => {
                        ensure!(
                            p < row.len(),
                            "row has {} fields, hkey column needs field {}",
                            row.len(),
                            p
                        );
                        column.ty().read_collating(row[p].clone())?
                    }
                    None => match parent {
                        Some(parent) if s < parent.segments => parent.value(s, c).clone(),
                        _ => Value::Null,
                    },
                };
                key.values[position] = value;
                position += 1;
            }
        }
        Ok(key)
    }

    pub fn shape(&self) -> &Arc<HKeyShape> {
        &self.shape
    }

    pub fn group(&self) -> GroupId {
        self.shape.group()
    }

    /// Number of visible segments.
    pub fn segments(&self) -> usize {
        self.segments
    }

    /// Table of the deepest visible segment.
    pub fn table(&self) -> TableId {
        self.shape.segment(self.segments - 1).table()
    }

    pub fn ordinal(&self, segment: usize) -> u32 {
        self.shape.segment(segment).ordinal()
    }

    /// Column values of all visible segments, in key order.
    pub fn values(&self) -> &[Value] {
        &self.values[..self.shape.value_offset(self.segments)]
    }

    pub fn segment_values(&self, segment: usize) -> &[Value] {
        let start = self.shape.value_offset(segment);
        let end = self.shape.value_offset(segment + 1);
        &self.values[start..end]
    }

    pub fn value(&self, segment: usize, column: usize) -> &Value {
        &self.values[self.shape.value_offset(segment) + column]
    }

    /// Overwrites the value at flattened column position `position`.
    pub fn set_value(&mut self, position: usize, value: Value) -> Result<()> {
        ensure!(
            position < self.values.len(),
            "hkey position {} out of range ({} columns)",
            position,
            self.values.len()
        );
        let ty = self
            .shape
            .columns()
            .nth(position)
            .map(|c| *c.ty())
            .ok_or_else(|| eyre::eyre!("hkey position {} has no column", position))?;
        self.values[position] = ty.read_collating(value)?;
        Ok(())
    }

    /// Truncates (or re-widens) the key to `segments` segments.
    ///
    /// # Panics
    ///
    /// Panics unless `0 < segments <= shape depth`.
    pub fn use_segments(&mut self, segments: usize) {
        assert!(
            segments > 0 && segments <= self.shape.depth(),
            "use_segments({}) outside 1..={}",
            segments,
            self.shape.depth()
        );
        self.segments = segments;
    }

    fn position_count(&self) -> usize {
        self.segments + self.shape.value_offset(self.segments)
    }

    fn position(&self, index: usize) -> KeyPosition<'_> {
        let mut remaining = index;
        for s in 0..self.segments {
            if remaining == 0 {
                return KeyPosition::Ordinal(self.ordinal(s));
            }
            remaining -= 1;
            let values = self.segment_values(s);
            if remaining < values.len() {
                return KeyPosition::Value(&values[remaining]);
            }
            remaining -= values.len();
        }
        unreachable!("key position {} beyond {} positions", index, self.position_count())
    }

    /// Compares two keys of the same group; see the module documentation.
    ///
    /// # Panics
    ///
    /// Panics if the keys belong to different groups.
    pub fn compare_to(&self, other: &HKey) -> i32 {
        assert_eq!(
            self.group(),
            other.group(),
            "cannot compare hkeys of different groups"
        );
        let mine = self.position_count();
        let theirs = other.position_count();
        let common = mine.min(theirs);
        for i in 0..common {
            let ordering = match (self.position(i), other.position(i)) {
                (KeyPosition::Ordinal(a), KeyPosition::Ordinal(b)) => a.cmp(&b),
                (KeyPosition::Value(a), KeyPosition::Value(b)) => a.compare_for_sort(b),
                (KeyPosition::Ordinal(_), KeyPosition::Value(_)) => Ordering::Greater,
                (KeyPosition::Value(_), KeyPosition::Ordinal(_)) => Ordering::Less,
            };
            match ordering {
                Ordering::Less => return -(i as i32 + 1),
                Ordering::Greater => return i as i32 + 1,
                Ordering::Equal => {}
            }
        }
        match mine.cmp(&theirs) {
            Ordering::Less => -(common as i32 + 1),
            Ordering::Greater => common as i32 + 1,
            Ordering::Equal => 0,
        }
    }

    /// True if `self` is `other` or the key of one of `other`'s ancestors.
    pub fn prefix_of(&self, other: &HKey) -> bool {
        if self.group() != other.group() || self.segments > other.segments {
            return false;
        }
        (0..self.position_count()).all(|i| match (self.position(i), other.position(i)) {
            (KeyPosition::Ordinal(a), KeyPosition::Ordinal(b)) => a == b,
            (KeyPosition::Value(a), KeyPosition::Value(b)) => {
                a.compare_for_sort(b) == Ordering::Equal
            }
            _ => false,
        })
    }

    /// Copies this key into `target`, which keeps its own shape. Segments
    /// beyond the shallower of the two depths are NULL in `target`.
    pub fn copy_to(&self, target: &mut HKey) -> Result<()> {
        ensure!(
            self.group() == target.group(),
            "cannot copy hkey of group {} into group {}",
            self.group(),
            target.group()
        );
        let depth = self.segments.min(target.shape.depth());
        for s in 0..depth {
            ensure!(
                self.ordinal(s) == target.ordinal(s),
                "segment {} ordinal {} does not match target ordinal {}",
                s,
                self.ordinal(s),
                target.ordinal(s)
            );
        }
        let copied = self.shape.value_offset(depth);
        target.values[..copied].clone_from_slice(&self.values[..copied]);
        for value in &mut target.values[copied..] {
            *value = Value::Null;
        }
        target.segments = depth;
        Ok(())
    }

    /// The key of `table`'s row on this key's ancestor path.
    pub fn ancestor(&self, table: &Table) -> Result<HKey> {
        let depth = table.depth();
        ensure!(
            table.group() == self.group()
                && depth < self.segments
                && self.shape.segment(depth).table() == table.id(),
            "table '{}' is not an ancestor of hkey {}",
            table.name(),
            self
        );
        let mut ancestor = HKey::new(Arc::clone(table.hkey_shape()));
        self.copy_to(&mut ancestor)?;
        ancestor.use_segments(depth + 1);
        Ok(ancestor)
    }

    /// Makes the segment holding `ordinal` visible with NULL columns. Any
    /// segments skipped on the way are filled with NULL columns too.
    pub fn extend_with_ordinal(&mut self, ordinal: u32) -> Result<()> {
        let segment = self.shape.segment_of_ordinal(ordinal).ok_or_else(|| {
            eyre::eyre!("ordinal {} is not part of hkey shape", ordinal)
        })?;
        ensure!(
            segment >= self.segments,
            "hkey already includes ordinal {} at segment {}",
            ordinal,
            segment
        );
        let start = self.shape.value_offset(self.segments);
        let end = self.shape.value_offset(segment + 1);
        for value in &mut self.values[start..end] {
            *value = Value::Null;
        }
        self.segments = segment + 1;
        Ok(())
    }

    /// Appends the persistent form of the visible segments to `buf`.
    pub fn copy_to_key(&self, buf: &mut Vec<u8>) {
        for s in 0..self.segments {
            encode_ordinal(self.ordinal(s), buf);
            for value in self.segment_values(s) {
                encode_value(value, buf);
            }
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.copy_to_key(&mut buf);
        buf
    }

    /// Replaces this key's contents with the decoded persistent key `key`.
    /// The key may be shallower than the shape; it may not be deeper. On
    /// error the key is left unchanged.
    pub fn copy_from_key(&mut self, key: &[u8]) -> Result<()> {
        let shape = Arc::clone(&self.shape);
        let mut reader = KeyReader::new(key);
        ensure!(!reader.is_exhausted(), "empty hkey");

        let mut decoded: SmallVec<[Value; HKEY_INLINE_VALUES]> =
            SmallVec::with_capacity(shape.column_count());
        let mut depth = 0;
        for (s, segment) in shape.segments().iter().enumerate() {
            if reader.is_exhausted() {
                break;
            }
            let ordinal = reader
                .read_ordinal()
                .wrap_err_with(|| format!("reading ordinal of segment {}", s))?;
            ensure!(
                ordinal == segment.ordinal(),
                "hkey segment {} has ordinal {}, expected {}",
                s,
                ordinal,
                segment.ordinal()
            );
            for column in segment.columns() {
                let value = if reader.is_exhausted() {
                    Value::Null
                } else {
                    match reader.read_value(column.ty().underlying())? {
                        Some(value) => column.ty().read_collating(value)?,
                        None => {
                            let stored = reader.read_any()?;
                            tracing::debug!(
                                segment = s,
                                expected = %column.ty(),
                                stored = %stored,
                                "hkey column type mismatch, using generic decode"
                            );
                            column.ty().read_collating(stored)?
                        }
                    }
                };
                decoded.push(value);
            }
            depth = s + 1;
        }
        ensure!(
            reader.is_exhausted(),
            "hkey has {} undecoded bytes after {} segments",
            reader.remaining().len(),
            depth
        );
        decoded.resize(shape.column_count(), Value::Null);
        self.values = decoded;
        self.segments = depth;
        Ok(())
    }
}

enum KeyPosition<'a> {
    Ordinal(u32),
    Value(&'a Value),
}

impl PartialEq for HKey {
    fn eq(&self, other: &Self) -> bool {
        self.group() == other.group() && self.compare_to(other) == 0
    }
}

impl fmt::Display for HKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for s in 0..self.segments {
            if s > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", self.ordinal(s))?;
            for value in self.segment_values(s) {
                write!(f, ",{}", value)?;
            }
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnDef, Group, Schema};
    use crate::types::TInstance;

    fn coi() -> (Schema, Arc<Group>) {
        let schema = Schema::new();
        let group = coi_in(&schema);
        (schema, group)
    }

    fn coi_in(schema: &Schema) -> Arc<Group> {
        let mut b = schema.group_builder("coi");
        let c = b
            .root(
                "customer",
                vec![
                    ColumnDef::new("cid", TInstance::int8()),
                    ColumnDef::new("name", TInstance::varchar(32)),
                ],
                &[0],
            )
            .unwrap();
        let o = b
            .child(
                "order",
                c,
                vec![
                    ColumnDef::new("oid", TInstance::int8()),
                    ColumnDef::new("cid", TInstance::int8()),
                ],
                &[0],
                &[(1, 0)],
            )
            .unwrap();
        b.child(
            "item",
            o,
            vec![
                ColumnDef::new("iid", TInstance::int8()),
                ColumnDef::new("oid", TInstance::int8()),
            ],
            &[0],
            &[(1, 0)],
        )
        .unwrap();
        b.child(
            "address",
            c,
            vec![
                ColumnDef::new("aid", TInstance::int8()),
                ColumnDef::new("cid", TInstance::int8()),
            ],
            &[0],
            &[(1, 0)],
        )
        .unwrap();
        b.build().unwrap()
    }

    fn key(group: &Group, table: &str, row: &[i64], parent: Option<&HKey>) -> HKey {
        let values: Vec<Value> = row.iter().map(|&v| Value::Int64(v)).collect();
        let shape = Arc::clone(group.table(table).unwrap().hkey_shape());
        HKey::for_row(shape, &values, parent).unwrap()
    }

    fn customer(group: &Group, cid: i64) -> HKey {
        let shape = Arc::clone(group.table("customer").unwrap().hkey_shape());
        HKey::for_row(shape, &[Value::Int64(cid), Value::from("x")], None).unwrap()
    }

    #[test]
    fn test_for_row_takes_missing_ancestor_columns_from_parent() {
        let (_s, g) = coi();
        let order = key(&g, "order", &[10, 1], None);
        assert_eq!(order.to_string(), "{1,1,2,10}");
        let item = key(&g, "item", &[100, 10], Some(&order));
        assert_eq!(item.to_string(), "{1,1,2,10,3,100}");
        let orphan = key(&g, "item", &[100, 10], None);
        assert_eq!(orphan.to_string(), "{1,NULL,2,10,3,100}");
    }

    #[test]
    fn test_prefix_law() {
        let (_s, g) = coi();
        let c = customer(&g, 1);
        let o = key(&g, "order", &[10, 1], None);
        let i = key(&g, "item", &[100, 10], Some(&o));
        let other = key(&g, "order", &[10, 2], None);

        assert!(c.prefix_of(&o));
        assert!(c.prefix_of(&i));
        assert!(o.prefix_of(&i));
        assert!(i.prefix_of(&i));
        assert!(!i.prefix_of(&o));
        assert!(!c.prefix_of(&other));
        for (a, b) in [(&c, &o), (&o, &i), (&c, &i)] {
            assert!(a.compare_to(b) < 0);
        }
    }

    #[test]
    fn test_compare_reports_first_differing_position() {
        let (_s, g) = coi();
        let o1 = key(&g, "order", &[10, 1], None);
        let o2 = key(&g, "order", &[11, 1], None);
        let c1 = customer(&g, 1);
        let c2 = customer(&g, 2);
        let a = key(&g, "address", &[5, 1], None);

        assert_eq!(o1.compare_to(&o1.clone()), 0);
        assert_eq!(o1.compare_to(&o2), -4);
        assert_eq!(o2.compare_to(&o1), 4);
        assert_eq!(c1.compare_to(&c2), -2);
        assert_eq!(c1.compare_to(&o1), -3);
        assert_eq!(o1.compare_to(&c1), 3);
        assert_eq!(o1.compare_to(&a), -3);
    }

    #[test]
    #[should_panic(expected = "different groups")]
    fn test_compare_across_groups_panics() {
        let (schema, g1) = coi();
        let g2 = coi_in(&schema);
        customer(&g1, 1).compare_to(&customer(&g2, 1));
    }

    #[test]
    fn test_truncation_round_trip() {
        let (_s, g) = coi();
        let o = key(&g, "order", &[10, 1], None);
        let mut truncated = o.clone();
        truncated.use_segments(1);
        assert_eq!(truncated.segments(), 1);
        assert_eq!(truncated.compare_to(&customer(&g, 1)), 0);
        assert!(truncated.prefix_of(&o));
        truncated.use_segments(2);
        assert_eq!(truncated, o);
    }

    #[test]
    #[should_panic(expected = "use_segments")]
    fn test_use_segments_rejects_zero() {
        let (_s, g) = coi();
        customer(&g, 1).use_segments(0);
    }

    #[test]
    fn test_ancestor_key() {
        let (_s, g) = coi();
        let o = key(&g, "order", &[10, 1], None);
        let i = key(&g, "item", &[100, 10], Some(&o));
        let customer_table = g.table("customer").unwrap();
        assert_eq!(i.ancestor(customer_table).unwrap(), customer(&g, 1));
        assert_eq!(i.ancestor(g.table("order").unwrap()).unwrap(), o);
        assert!(i.ancestor(g.table("address").unwrap()).is_err());
    }

    #[test]
    fn test_ancestor_beyond_visible_segments_is_rejected() {
        let (_s, g) = coi();
        let mut o = key(&g, "order", &[10, 1], None);
        o.use_segments(1);
        assert!(o.ancestor(g.table("order").unwrap()).is_err());
        assert_eq!(o.ancestor(g.table("customer").unwrap()).unwrap(), customer(&g, 1));
    }

    #[test]
    fn test_copy_to_truncates_to_shallower_depth() {
        let (_s, g) = coi();
        let o = key(&g, "order", &[10, 1], None);
        let mut target = HKey::new(Arc::clone(g.table("item").unwrap().hkey_shape()));
        o.copy_to(&mut target).unwrap();
        assert_eq!(target.segments(), 2);
        assert_eq!(target, o);

        let mut address = HKey::new(Arc::clone(g.table("address").unwrap().hkey_shape()));
        assert!(o.copy_to(&mut address).is_err());
    }

    #[test]
    fn test_extend_with_ordinal_adds_null_segment() {
        let (_s, g) = coi();
        let c = customer(&g, 1);
        let mut left = HKey::new(Arc::clone(g.table("order").unwrap().hkey_shape()));
        c.copy_to(&mut left).unwrap();
        left.extend_with_ordinal(2).unwrap();
        assert_eq!(left.to_string(), "{1,1,2,NULL}");
        assert!(c.prefix_of(&left));
        assert!(left.compare_to(&key(&g, "order", &[10, 1], None)) < 0);
        assert!(left.extend_with_ordinal(1).is_err());
    }

    #[test]
    fn test_persistent_key_round_trip() {
        let (_s, g) = coi();
        let o = key(&g, "order", &[10, 1], None);
        let i = key(&g, "item", &[-100, 10], Some(&o));
        let bytes = i.encode();
        let mut decoded = HKey::new(Arc::clone(i.shape()));
        decoded.copy_from_key(&bytes).unwrap();
        assert_eq!(decoded, i);
        assert!(o.encode() < bytes);
        assert!(bytes.starts_with(&o.encode()));
    }

    #[test]
    fn test_copy_from_shallower_key_leaves_nulls() {
        let (_s, g) = coi();
        let c = customer(&g, 7);
        let mut buf = c.encode();
        encode_ordinal(2, &mut buf);
        let mut decoded = HKey::new(Arc::clone(g.table("order").unwrap().hkey_shape()));
        decoded.copy_from_key(&buf).unwrap();
        assert_eq!(decoded.segments(), 2);
        assert_eq!(decoded.to_string(), "{1,7,2,NULL}");

        let mut decoded = HKey::new(Arc::clone(g.table("item").unwrap().hkey_shape()));
        decoded.copy_from_key(&c.encode()).unwrap();
        assert_eq!(decoded.segments(), 1);
    }

    #[test]
    fn test_copy_from_rejects_wrong_ordinal_and_trailing_bytes() {
        let (_s, g) = coi();
        let a = key(&g, "address", &[5, 1], None);
        let mut order = HKey::new(Arc::clone(g.table("order").unwrap().hkey_shape()));
        let err = order.copy_from_key(&a.encode()).unwrap_err();
        assert!(err.to_string().contains("ordinal"));

        let mut customer_key = HKey::new(Arc::clone(g.table("customer").unwrap().hkey_shape()));
        assert!(customer_key.copy_from_key(&a.encode()).is_err());
        assert!(customer_key.copy_from_key(&[]).is_err());
    }

    #[test]
    fn test_failed_copy_from_leaves_key_unchanged() {
        let (_s, g) = coi();
        let a = key(&g, "address", &[5, 9], None);
        let mut order = key(&g, "order", &[10, 1], None);
        assert!(order.copy_from_key(&a.encode()).is_err());
        assert_eq!(order.to_string(), "{1,1,2,10}");

        let mut trailing = order.encode();
        trailing.push(0);
        assert!(order.copy_from_key(&trailing).is_err());
        assert_eq!(order.segments(), 2);
        assert_eq!(order.to_string(), "{1,1,2,10}");
    }

    #[test]
    fn test_copy_from_falls_back_to_generic_decode() {
        let (_s, g) = coi();
        let mut buf = Vec::new();
        encode_ordinal(1, &mut buf);
        encode_value(&Value::from("42"), &mut buf);
        let mut decoded = HKey::new(Arc::clone(g.table("customer").unwrap().hkey_shape()));
        decoded.copy_from_key(&buf).unwrap();
        assert_eq!(decoded.value(0, 0), &Value::Int64(42));
    }
}
