//! Deterministic cache key generation.

use sha2::{Digest, Sha256};

/// Compute the cache key for a request.
///
/// The key covers the method and the full URL (query included), so two
/// requests collide only when they would fetch the same resource.
pub fn compute_cache_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}
