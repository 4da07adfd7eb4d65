//! Shared customer/order/item/address group for unit tests.

use crate::hkey::HKey;
use crate::row::{ImmutableRow, RowRef};
use crate::schema::{ColumnDef, Group, RowType, Schema, Table};
use crate::types::{TInstance, Value};
use std::sync::Arc;

pub(crate) struct Coi {
    pub schema: Schema,
    pub group: Arc<Group>,
    pub customer: Arc<RowType>,
    pub order: Arc<RowType>,
    pub item: Arc<RowType>,
    pub address: Arc<RowType>,
}

impl Coi {
    pub fn new() -> Self {
        let schema = Schema::new();
        let mut b = schema.group_builder("coi");
        let c = b
            .root(
                "customer",
                vec![
                    ColumnDef::new("cid", TInstance::int8().not_null()),
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
                    ColumnDef::new("oid", TInstance::int8().not_null()),
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
                ColumnDef::new("iid", TInstance::int8().not_null()),
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
                ColumnDef::new("aid", TInstance::int8().not_null()),
                ColumnDef::new("cid", TInstance::int8()),
                ColumnDef::new("city", TInstance::varchar(32)),
            ],
            &[0],
            &[(1, 0)],
        )
        .unwrap();
        let group = b.build().unwrap();
        let ty = |name: &str| schema.table_type(group.table(name).unwrap()).unwrap();
        let (customer, order) = (ty("customer"), ty("order"));
        let (item, address) = (ty("item"), ty("address"));
        Self {
            schema,
            group,
            customer,
            order,
            item,
            address,
        }
    }

    pub fn table(&self, name: &str) -> &Arc<Table> {
        self.group.table(name).unwrap()
    }

    fn row(&self, row_type: &Arc<RowType>, values: Vec<Value>, parent: Option<&HKey>) -> RowRef {
        let shape = Arc::clone(row_type.hkey_shape().unwrap());
        let hkey = HKey::for_row(shape, &values, parent).unwrap();
        RowRef::new(
            ImmutableRow::new(Arc::clone(row_type), values)
                .unwrap()
                .with_hkey(hkey),
        )
    }

    pub fn customer_row(&self, cid: i64, name: &str) -> RowRef {
        self.row(&self.customer, vec![Value::Int64(cid), Value::from(name)], None)
    }

    pub fn order_row(&self, oid: i64, cid: i64, total: f64) -> RowRef {
        self.row(
            &self.order,
            vec![Value::Int64(oid), Value::Int64(cid), Value::Double(total)],
            None,
        )
    }

    pub fn item_row(&self, iid: i64, order: &RowRef, qty: i32) -> RowRef {
        let oid = order.value(0).unwrap().clone();
        self.row(
            &self.item,
            vec![Value::Int64(iid), oid, Value::Int32(qty)],
            order.hkey(),
        )
    }

    pub fn address_row(&self, aid: i64, cid: i64, city: &str) -> RowRef {
        self.row(
            &self.address,
            vec![Value::Int64(aid), Value::Int64(cid), Value::from(city)],
            None,
        )
    }
}
