//! Key ranges and the order-preserving row-key layout.
//!
//! Row keys are `t{table_id}_r{handle}` with both integers written as
//! sign-flipped big-endian, so byte order matches numeric order. The handle
//! partitioner depends on that property: adjacent handles map to adjacent
//! keys, which lets runs of handles collapse into one range.

use std::fmt::{self, Write as _};

const TABLE_PREFIX: u8 = b't';
const RECORD_PREFIX_SEP: &[u8; 2] = b"_r";
const SIGN_FLIP_MASK: u64 = 1u64 << 63;
/// `t` + table id + `_r` + handle.
pub const ROW_KEY_LEN: usize = 1 + 8 + 2 + 8;

/// Half-open `[start, end)` byte range. Empty bounds are unbounded.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct KeyRange {
    pub start: Vec<u8>,
    pub end: Vec<u8>,
}

impl KeyRange {
    pub fn new(start: Vec<u8>, end: Vec<u8>) -> Self {
        Self { start, end }
    }

    /// Range covering the whole key space.
    pub fn full() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        key_in_range(key, &self.start, &self.end)
    }
}

impl fmt::Debug for KeyRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", format_key(&self.start), format_key(&self.end))
    }
}

impl fmt::Display for KeyRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Range Start: [{}] Range End: [{}]",
            format_key(&self.start),
            format_key(&self.end)
        )
    }
}

/// Checks whether `key` is within `[start, end)` where empty bounds are open.
pub fn key_in_range(key: &[u8], start: &[u8], end: &[u8]) -> bool {
    let in_start = start.is_empty() || key >= start;
    let in_end = end.is_empty() || key < end;
    in_start && in_end
}

/// Returns `true` when exclusive end bound `left` does not extend past `right`.
///
/// Empty bounds are positive infinity.
pub fn end_within(left: &[u8], right: &[u8]) -> bool {
    match (left.is_empty(), right.is_empty()) {
        (_, true) => true,
        (true, false) => false,
        (false, false) => left <= right,
    }
}

/// Human-readable key: printable ASCII as-is, everything else as `\xNN`.
pub fn format_key(key: &[u8]) -> String {
    let mut out = String::with_capacity(key.len());
    for &b in key {
        if b.is_ascii_graphic() && b != b'\\' {
            out.push(b as char);
        } else {
            let _ = write!(out, "\\x{b:02X}");
        }
    }
    out
}

/// Smallest key strictly greater than `key`.
pub fn next_key(key: &[u8]) -> Vec<u8> {
    let mut next = Vec::with_capacity(key.len() + 1);
    next.extend_from_slice(key);
    next.push(0);
    next
}

fn encode_i64_ordered(value: i64) -> [u8; 8] {
    (value as u64 ^ SIGN_FLIP_MASK).to_be_bytes()
}

fn decode_i64_ordered(bytes: [u8; 8]) -> i64 {
    (u64::from_be_bytes(bytes) ^ SIGN_FLIP_MASK) as i64
}

/// Maps `(table_id, handle)` onto the byte-key space.
///
/// Implementations must be monotonic in `handle` for a fixed table.
pub trait RowKeyEncoder: Send + Sync {
    fn encode_row_key(&self, table_id: i64, handle: i64) -> Vec<u8>;

    /// Exclusive end key for a run of handles that ends at `last`.
    fn row_key_end(&self, table_id: i64, last: i64) -> Vec<u8> {
        match last.checked_add(1) {
            Some(next) => self.encode_row_key(table_id, next),
            None => next_key(&self.encode_row_key(table_id, last)),
        }
    }
}

/// Default record key layout: `t{table_id}_r{handle}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TableRowKeyEncoder;

impl RowKeyEncoder for TableRowKeyEncoder {
    fn encode_row_key(&self, table_id: i64, handle: i64) -> Vec<u8> {
        let mut key = Vec::with_capacity(ROW_KEY_LEN);
        key.push(TABLE_PREFIX);
        key.extend_from_slice(&encode_i64_ordered(table_id));
        key.extend_from_slice(RECORD_PREFIX_SEP);
        key.extend_from_slice(&encode_i64_ordered(handle));
        key
    }
}

/// Recovers `(table_id, handle)` from a key in the default record layout.
pub fn decode_row_key(key: &[u8]) -> Option<(i64, i64)> {
    if key.len() != ROW_KEY_LEN || key[0] != TABLE_PREFIX || &key[9..11] != RECORD_PREFIX_SEP {
        return None;
    }
    let table_id = decode_i64_ordered(key[1..9].try_into().ok()?);
    let handle = decode_i64_ordered(key[11..19].try_into().ok()?);
    Some((table_id, handle))
}
