//! URL digests for transport-level cache keys

/// Deterministic string digest used to keep URL cache keys short and uniform
pub trait UrlDigest: Send + Sync {
    /// Returns a fixed-length hex digest of `input`
    fn digest(&self, input: &str) -> String;
}

/// BLAKE3 digest rendered as 64 lowercase hex characters
#[derive(Debug, Clone, Copy, Default)]
pub struct Blake3Digest;

impl UrlDigest for Blake3Digest {
    fn digest(&self, input: &str) -> String {
        blake3::hash(input.as_bytes()).to_hex().to_string()
    }
}
