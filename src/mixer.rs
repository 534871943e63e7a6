//! Region mixing primitive.
//!
//! Bob Jenkins' one-at-a-time hash. Fast and well-avalanched, but not
//! cryptographic: it fingerprints structure, it does not resist forgery.

/// Checksum width used by the mixer and the combiner alike.
pub type HashValue = u32;

/// Mix `bytes` into a 32-bit hash. All arithmetic wraps modulo 2^32.
///
/// Empty input, and any input made only of zero bytes, hashes to 0.
pub fn mix(bytes: &[u8]) -> HashValue {
    let mut acc: u32 = 0;
    for &b in bytes {
        acc = acc.wrapping_add(b as u32);
        acc = acc.wrapping_add(acc << 10);
        acc ^= acc >> 6;
    }
    acc = acc.wrapping_add(acc << 3);
    acc ^= acc >> 11;
    acc.wrapping_add(acc << 15)
}
