//! Little-endian integer serialization, as used in the shuffling and sampling hash preimages.
//!
//! The `int_to_bytesN` functions always return exactly `N` bytes, zero-padding past the
//! significant bytes of the value.

use bytes::{BufMut, BytesMut};

/// Returns `int` as a single byte.
pub fn int_to_bytes1(int: u8) -> Vec<u8> {
    vec![int]
}

/// Returns `int` as four little-endian bytes.
pub fn int_to_bytes4(int: u32) -> Vec<u8> {
    let mut bytes = BytesMut::with_capacity(4);
    bytes.put_u32_le(int);
    bytes.to_vec()
}

/// Returns `int` as eight little-endian bytes.
pub fn int_to_bytes8(int: u64) -> Vec<u8> {
    let mut bytes = BytesMut::with_capacity(8);
    bytes.put_u64_le(int);
    bytes.to_vec()
}
