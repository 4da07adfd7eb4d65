//! Fuzz testing for the key decoder.
//!
//! Feeds arbitrary bytes to `KeyReader` and `HKey::copy_from_key` to make
//! sure malformed keys are reported as errors, never as panics, and that
//! decoding a re-encoded key is stable.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use hkrow::encoding::{decode_key, KeyReader};
use hkrow::schema::{ColumnDef, Schema};
use hkrow::types::{TInstance, UnderlyingType};
use hkrow::HKey;
use std::sync::Arc;

#[derive(Debug, Arbitrary)]
struct KeyInput {
    expected: Vec<FuzzType>,
    data: Vec<u8>,
}

#[derive(Debug, Arbitrary, Clone, Copy)]
enum FuzzType {
    Bool,
    Int,
    Double,
    Text,
    Bytes,
}

impl From<FuzzType> for UnderlyingType {
    fn from(t: FuzzType) -> Self {
        match t {
            FuzzType::Bool => UnderlyingType::Bool,
            FuzzType::Int => UnderlyingType::Int64,
            FuzzType::Double => UnderlyingType::Double,
            FuzzType::Text => UnderlyingType::String,
            FuzzType::Bytes => UnderlyingType::Bytes,
        }
    }
}

fuzz_target!(|input: KeyInput| {
    let _ = decode_key(&input.data);

    let mut reader = KeyReader::new(&input.data);
    for ty in input.expected.iter().take(16) {
        if reader.is_exhausted() {
            break;
        }
        match reader.read_value((*ty).into()) {
            Ok(Some(_)) => {}
            Ok(None) => {
                if reader.skip_value().is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    }

    let schema = Schema::new();
    let mut b = schema.group_builder("g");
    let Ok(root) = b.root("a", vec![ColumnDef::new("id", TInstance::int8())], &[0]) else {
        return;
    };
    let Ok(_) = b.child(
        "b",
        root,
        vec![
            ColumnDef::new("id", TInstance::varchar(8)),
            ColumnDef::new("a_id", TInstance::int8()),
        ],
        &[0],
        &[(1, 0)],
    ) else {
        return;
    };
    let Ok(group) = b.build() else {
        return;
    };
    let Some(table) = group.table("b") else {
        return;
    };
    let mut hkey = HKey::new(Arc::clone(table.hkey_shape()));
    if hkey.copy_from_key(&input.data).is_ok() {
        let reencoded = hkey.encode();
        let mut again = HKey::new(Arc::clone(table.hkey_shape()));
        assert!(again.copy_from_key(&reencoded).is_ok());
        assert_eq!(again.encode(), reencoded);
    }
});
