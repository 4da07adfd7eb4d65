//! # Encoding Module
//!
//! Byte-comparable encodings for persistent keys:
//!
//! - **Value encoding**: type-prefixed, order-preserving encoding of column values
//! - **Ordinal encoding**: order-preserving varint for table ordinals inside HKeys
//! - **Decoding**: `KeyReader` for walking an encoded key value by value

pub mod key;

pub use key::{
    decode_key, encode_ordinal, encode_value, ordinal_len, type_prefix, KeyReader,
};
