//! Content fingerprinting for incremental sync.
//!
//! A file's checksum is the SHA-256 digest of its content, base64-encoded.
//! Unchanged content between syncs produces an identical checksum and costs
//! no embedding work.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha2::{Digest, Sha256};

/// Compute the checksum for a piece of content.
pub fn checksum(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    STANDARD.encode(hasher.finalize())
}
