//! Content hashing for cache-busting placeholders.
//!
//! Copyright (c) 2025 Posit, PBC

use sha2::{Digest, Sha256};

/// Number of hex characters kept from the digest.
pub const HASH_LENGTH: usize = 8;

/// Hash CSS text into a short, stable, lowercase hex identifier.
///
/// The hash only has to change when the CSS changes; it is never decoded.
///
/// ```
/// use uno_layers::content_hash;
///
/// let a = content_hash(".a{color:red}");
/// assert_eq!(a.len(), 8);
/// assert_eq!(a, content_hash(".a{color:red}"));
/// assert_ne!(a, content_hash(".a{color:blue}"));
/// ```
pub fn content_hash(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    let mut hash = hex::encode(digest);
    hash.truncate(HASH_LENGTH);
    hash
}
