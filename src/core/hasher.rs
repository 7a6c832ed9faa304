//! BLAKE3 hashing for logical ids and template fingerprints.

/// First `len` uppercase hex chars of the hash of `s` (at most 64).
pub fn short_hash(s: &str, len: usize) -> String {
    let hex = blake3::hash(s.as_bytes()).to_hex();
    hex[..len.min(hex.len())].to_ascii_uppercase()
}

/// Compute a composite hash from multiple components.
pub fn composite_hash(components: &[&str]) -> String {
    let mut hasher = blake3::Hasher::new();
    for c in components {
        hasher.update(c.as_bytes());
        hasher.update(b"\0");
    }
    format!("blake3:{}", hasher.finalize().to_hex())
}
