use crate::store::{DigestProvider, Sha256Digest};
use rand::Rng;

/// Generates 24-character, lowercase hex document identifiers.
///
/// Layout, most significant first:
/// - 8 hex: Unix time in seconds
/// - 6 hex: hash of the machine identity, fixed per generator
/// - 4 hex: random value in `1000..=9999`
/// - 6 hex: random value in `100000..=999999`
///
/// Identifiers sort roughly by creation time. Uniqueness within a
/// collection is enforced by the collection, which draws again on a
/// collision.
pub struct ObjectIdGenerator {
    machine_hash: String,
}

impl Default for ObjectIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectIdGenerator {
    pub fn new() -> Self {
        let digest = Sha256Digest.digest_hex(machine_identity().as_bytes());
        ObjectIdGenerator {
            machine_hash: digest[..6].to_string(),
        }
    }

    pub fn next_id(&self) -> String {
        let seconds = chrono::Utc::now().timestamp().max(0) as u32;
        let mut rng = rand::thread_rng();
        format!(
            "{:08x}{}{:04x}{:06x}",
            seconds,
            self.machine_hash,
            rng.gen_range(1000u32..=9999),
            rng.gen_range(100000u32..=999999)
        )
    }

    /// Checks the shape of an identifier produced by this generator.
    pub fn is_valid(id: &str) -> bool {
        id.len() == 24 && id.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }
}

fn machine_identity() -> String {
    std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("COMPUTERNAME"))
        .ok()
        .or_else(|| {
            std::fs::read_to_string("/etc/hostname")
                .ok()
                .map(|name| name.trim().to_string())
        })
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}
