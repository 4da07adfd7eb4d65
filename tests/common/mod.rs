//! Shared schema for integration tests: customer → order → item, plus
//! customer → address.

#![allow(dead_code)]

use hkrow::row::ImmutableRow;
use hkrow::schema::{ColumnDef, Group, RowType, Schema, Table};
use hkrow::types::{TInstance, Value};
use hkrow::{HKey, RowRef};
use std::sync::Arc;

pub struct Coi {
    pub schema: Schema,
    pub group: Arc<Group>,
    pub customer: Arc<RowType>,
    pub order: Arc<RowType>,
    pub item: Arc<RowType>,
    pub address: Arc<RowType>,
}

pub fn coi() -> Coi {
    let schema = Schema::new();
    let mut b = schema.group_builder("coi");
    let c = b
        .root(
            "customer",
            vec![
                ColumnDef::new("id", TInstance::int8().not_null()),
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
                ColumnDef::new("id", TInstance::int8().not_null()),
                ColumnDef::new("cid", TInstance::int8()),
                ColumnDef::new("total", TInstance::float8()),
            ],
            &[0],
            &[(1, 0)],
        )
        .unwrap();
    b.child(
        "item",
        o,
        vec![
            ColumnDef::new("id", TInstance::int8().not_null()),
            ColumnDef::new("oid", TInstance::int8()),
            ColumnDef::new("qty", TInstance::int4()),
        ],
        &[0],
        &[(1, 0)],
    )
    .unwrap();
    b.child(
        "address",
        c,
        vec![
            ColumnDef::new("id", TInstance::int8().not_null()),
            ColumnDef::new("cid", TInstance::int8()),
            ColumnDef::new("city", TInstance::varchar(32)),
        ],
        &[0],
        &[(1, 0)],
    )
    .unwrap();
    let group = b.build().unwrap();
    let ty = |name: &str| schema.table_type(group.table(name).unwrap()).unwrap();
    let (customer, order, item, address) = (ty("customer"), ty("order"), ty("item"), ty("address"));
    Coi {
        schema,
        group,
        customer,
        order,
        item,
        address,
    }
}

impl Coi {
    pub fn table(&self, name: &str) -> &Arc<Table> {
        self.group.table(name).unwrap()
    }

    /// A standalone row of `row_type` with its HKey built from `values`.
    pub fn row(
        &self,
        row_type: &Arc<RowType>,
        values: Vec<Value>,
        parent: Option<&HKey>,
    ) -> RowRef {
        let shape = Arc::clone(row_type.hkey_shape().unwrap());
        let hkey = HKey::for_row(shape, &values, parent).unwrap();
        RowRef::new(
            ImmutableRow::new(Arc::clone(row_type), values)
                .unwrap()
                .with_hkey(hkey),
        )
    }
}
