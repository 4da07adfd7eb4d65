//! HKey benchmarks for hkrow
//!
//! These benchmarks measure key encoding, decoding and comparison, which
//! dominate group scans and flatten.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use hkrow::encoding::{encode_ordinal, encode_value, KeyReader};
use hkrow::schema::{ColumnDef, Group, Schema};
use hkrow::types::{TInstance, Value};
use hkrow::HKey;
use std::sync::Arc;

fn coi() -> (Schema, Arc<Group>) {
    let schema = Schema::new();
    let mut b = schema.group_builder("coi");
    let c = b
        .root("customer", vec![ColumnDef::new("cid", TInstance::int8())], &[0])
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
            ColumnDef::new("sku", TInstance::varchar(16)),
        ],
        &[0, 2],
        &[(1, 0)],
    )
    .unwrap();
    let group = b.build().unwrap();
    (schema, group)
}

fn item_key(group: &Group, cid: i64, oid: i64, iid: i64) -> HKey {
    let order = group.table("order").unwrap();
    let item = group.table("item").unwrap();
    let parent = HKey::for_row(
        Arc::clone(order.hkey_shape()),
        &[Value::Int64(oid), Value::Int64(cid)],
        None,
    )
    .unwrap();
    HKey::for_row(
        Arc::clone(item.hkey_shape()),
        &[Value::Int64(iid), Value::Int64(oid), Value::from("sku-0001")],
        Some(&parent),
    )
    .unwrap()
}

fn bench_value_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("value_encode");

    let values = vec![
        (Value::Null, "null"),
        (Value::Int64(42), "int"),
        (Value::Int64(-1_000_000), "neg_int"),
        (Value::Double(3.25), "float"),
        (Value::from("hello world"), "text"),
        (Value::Bytes(vec![0, 1, 0, 2]), "blob_with_zeros"),
    ];

    for (value, name) in values {
        group.bench_with_input(BenchmarkId::new("encode", name), &value, |b, value| {
            let mut buf = Vec::with_capacity(32);
            b.iter(|| {
                buf.clear();
                encode_value(black_box(value), &mut buf);
                black_box(buf.len())
            });
        });
    }

    group.finish();
}

fn bench_ordinal(c: &mut Criterion) {
    let mut group = c.benchmark_group("ordinal");

    for ordinal in [1u32, 240, 2287, 67823, 1 << 24] {
        let mut buf = Vec::new();
        encode_ordinal(ordinal, &mut buf);
        group.bench_with_input(BenchmarkId::new("decode", ordinal), &buf, |b, buf| {
            b.iter(|| KeyReader::new(black_box(buf)).read_ordinal().unwrap());
        });
    }

    group.finish();
}

fn bench_hkey(c: &mut Criterion) {
    let (_schema, coi) = coi();
    let mut group = c.benchmark_group("hkey");

    let a = item_key(&coi, 1, 10, 100);
    let b_key = item_key(&coi, 1, 10, 101);
    group.bench_function("compare_last_segment", |b| {
        b.iter(|| black_box(&a).compare_to(black_box(&b_key)))
    });

    let customer = coi.root();
    let ancestor = a.ancestor(customer).unwrap();
    group.bench_function("prefix_of", |b| {
        b.iter(|| black_box(&ancestor).prefix_of(black_box(&a)))
    });

    group.bench_function("encode", |b| {
        let mut buf = Vec::with_capacity(64);
        b.iter(|| {
            buf.clear();
            black_box(&a).copy_to_key(&mut buf);
            black_box(buf.len())
        });
    });

    let encoded = a.encode();
    group.bench_function("decode", |b| {
        let mut target = HKey::new(Arc::clone(a.shape()));
        b.iter(|| target.copy_from_key(black_box(&encoded)).unwrap());
    });

    group.finish();
}

criterion_group!(benches, bench_value_encode, bench_ordinal, bench_hkey);
criterion_main!(benches);
