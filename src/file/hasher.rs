//! Content fingerprinting.

use sha2::{Digest, Sha256};

/// Length of a digest in hex characters.
pub const DIGEST_HEX_LEN: usize = 64;

/// Compute the SHA-256 digest of `bytes` as lowercase hex.
pub fn digest(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}
