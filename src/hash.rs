//! Key hashing and bucket addressing.

/// djb2 by Dan Bernstein: start at 5381, then `hash * 33 + byte` for each
/// byte of the key. Wrapping `u64` arithmetic; callers reduce modulo the
/// bucket count.
pub(crate) fn djb2(key: &str) -> u64 {
    let mut hash: u64 = 5381;
    for &byte in key.as_bytes() {
        hash = hash.wrapping_mul(33).wrapping_add(u64::from(byte));
    }
    hash
}

/// Bucket index for `key` in a table with `capacity` buckets.
///
/// `capacity` is non-zero for any constructed table.
pub(crate) fn bucket_index(key: &str, capacity: usize) -> usize {
    (djb2(key) % capacity as u64) as usize
}
