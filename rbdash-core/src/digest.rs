//! Content hashing for uploaded packages
//!
//! The digest is always computed over the unmodified bytes the user submitted,
//! never over a re-encoded form, so it can be compared bit-for-bit against the
//! digests recorded in the build log.

use sha2::{Digest, Sha256};

/// SHA-256 of a byte slice, lowercase hex (64 characters).
///
/// The build log stores bare hex digests, so no algorithm prefix is added.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Compare two hex digests, ignoring ASCII case.
///
/// Digests differing only in hex case are equal; digests differing in any
/// digit are not. No normalization beyond case folding is applied.
pub fn digests_equal(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}
