//! Store keys for rate limit state.

use sha2::{Digest, Sha256};
use std::fmt::{self, Write};

use super::{Algorithm, Identity};

const KEY_PREFIX: &str = "ratelimit";

/// Bytes of the SHA-256 principal digest kept in the key.
const DIGEST_BYTES: usize = 16;

/// Store key for one (identity, endpoint, algorithm) combination.
///
/// Format: `ratelimit:{algorithm}:{endpoint}:{digest}`. The principal is
/// hashed so keys stay bounded and free of caller-controlled separators.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RateLimitKey(String);

impl RateLimitKey {
    pub fn new(identity: &Identity, endpoint: &str, algorithm: Algorithm) -> Self {
        let digest = Sha256::digest(identity.principal().to_string().as_bytes());
        let mut hex = String::with_capacity(DIGEST_BYTES * 2);
        for byte in &digest[..DIGEST_BYTES] {
            // Writing to a String cannot fail.
            let _ = write!(hex, "{:02x}", byte);
        }
        Self(format!(
            "{}:{}:{}:{}",
            KEY_PREFIX,
            algorithm.key_tag(),
            endpoint,
            hex
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RateLimitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
