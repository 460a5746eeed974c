use crate::common::to_hex;
use sha2::{Digest, Sha256};

/// Hash primitive used for signatures, salts and the machine hash of
/// generated ids.
pub trait DigestProvider: Send + Sync {
    /// Digest of `bytes` as lowercase hex.
    fn digest_hex(&self, bytes: &[u8]) -> String;
}

/// SHA-256, the default digest.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Digest;

impl DigestProvider for Sha256Digest {
    fn digest_hex(&self, bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        to_hex(&hasher.finalize())
    }
}
