//! Unsigned LEB128 varints and varint-length-prefixed byte strings.

use crate::errors::{Error, Result};

/// Maximum encoded size of a `u64` varint.
pub const MAX_LEN: usize = 10;

/// Append the varint encoding of `value` to `buf`.
pub fn put(buf: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        buf.push((value as u8) | 0x80);
        value >>= 7;
    }
    buf.push(value as u8);
}

/// Number of bytes [`put`] writes for `value`.
pub fn encoded_len(mut value: u64) -> usize {
    let mut n = 1;
    while value >= 0x80 {
        value >>= 7;
        n += 1;
    }
    n
}

/// Read a varint from the start of `bytes`, returning the value and the number of bytes
/// consumed.
pub fn get(bytes: &[u8]) -> Result<(u64, usize)> {
    let mut value: u64 = 0;
    for (i, b) in bytes.iter().enumerate() {
        if i == MAX_LEN - 1 && *b > 1 {
            return Err(Error::invalid("varint.get", "varint overflows 64 bits"));
        }
        value |= u64::from(b & 0x7f) << (7 * i);
        if b & 0x80 == 0 {
            return Ok((value, i + 1));
        }
        if i + 1 >= MAX_LEN {
            break;
        }
    }
    Err(Error::invalid("varint.get", "truncated varint").with("len", bytes.len()))
}

/// Append `data` prefixed with its varint length.
pub fn put_prefixed(buf: &mut Vec<u8>, data: &[u8]) {
    put(buf, data.len() as u64);
    buf.extend_from_slice(data);
}

/// Split a varint-length-prefixed byte string off the start of `bytes`.
///
/// Returns the byte string and the remaining input.
pub fn get_prefixed(bytes: &[u8]) -> Result<(&[u8], &[u8])> {
    let (len, n) = get(bytes)?;
    let rest = &bytes[n..];
    let len = usize::try_from(len)
        .map_err(|_| Error::invalid("varint.get_prefixed", "length out of range"))?;
    if len > rest.len() {
        return Err(Error::invalid("varint.get_prefixed", "length exceeds input")
            .with("len", len)
            .with("available", rest.len()));
    }
    Ok(rest.split_at(len))
}
