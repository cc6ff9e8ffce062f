//! Content fingerprint of a run of messages.
//!
//! The fingerprint is the durable cache key, so it must be stable across process
//! restarts and builds: SHA-256 over an explicit byte encoding, never `std::hash`.

use sha2::{Digest, Sha256};

use crate::message::Message;

const USER_TAG: u8 = b'u';
const OTHER_TAG: u8 = b'a';

/// Hashes the ordered `(is_user, text)` pairs of `messages`.
///
/// Speaker names and the system flag are not part of the fingerprint. Each pair is
/// encoded as a role tag, the text byte length (u64 little-endian), then the text, so
/// no two distinct sequences produce the same hash input.
///
/// Returns 64 lowercase hex characters.
pub fn content_hash(messages: &[Message]) -> String {
    let mut hasher = Sha256::new();
    for m in messages {
        hasher.update([if m.is_user { USER_TAG } else { OTHER_TAG }]);
        hasher.update((m.text.len() as u64).to_le_bytes());
        hasher.update(m.text.as_bytes());
    }
    hex::encode(hasher.finalize())
}
