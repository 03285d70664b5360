/// Entity id generation.
///
/// Ids are collision-resistant by construction (an atomic counter, a
/// nanosecond timestamp and a per-process seed, hashed via SHA-256 for
/// uniform distribution), never validated after the fact. The seed keeps
/// two processes started in the same instant from producing the same
/// sequence.
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

use sha2::{Digest, Sha256};

static ID_COUNTER: AtomicU64 = AtomicU64::new(0);
static PROCESS_SEED: OnceLock<u64> = OnceLock::new();

fn process_seed() -> u64 {
    *PROCESS_SEED.get_or_init(|| {
        let pid = std::process::id() as u64;
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64;
        pid.rotate_left(32) ^ ts
    })
}

/// 12 hex chars of entropy for an entity id suffix.
fn random_suffix() -> String {
    let seq = ID_COUNTER.fetch_add(1, Ordering::Relaxed);
    let ts = std::time::SystemTime::now()
        .duration_since(std::time::SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let mut hasher = Sha256::new();
    hasher.update(process_seed().to_le_bytes());
    hasher.update(seq.to_le_bytes());
    hasher.update(ts.to_le_bytes());
    let hash = hasher.finalize();
    hex::encode(&hash[..6])
}

/// Generate a fresh list id (`list-<12 hex>`).
pub fn new_list_id() -> String {
    format!("list-{}", random_suffix())
}

/// Generate a fresh card id (`card-<12 hex>`).
pub fn new_card_id() -> String {
    format!("card-{}", random_suffix())
}

/// Generate a fresh sub-document id (`doc-<12 hex>`), used when announcing
/// a list's sub-document in the shared registry map.
pub fn new_doc_id() -> String {
    format!("doc-{}", random_suffix())
}
