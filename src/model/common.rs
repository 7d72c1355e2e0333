use chrono::{DateTime, SubsecRound, Utc};
use uuid::Uuid;

/// Object-id style identifier: 24 lowercase hex characters.
pub type Id = String;

pub const ID_LEN: usize = 24;

/// Generate a new id. The first 4 bytes are the creation time in seconds
/// since the epoch (big endian), the remaining 8 are random.
pub fn generate_id() -> Id {
    let secs = Utc::now().timestamp() as u32;
    let random = Uuid::new_v4();

    let mut bytes = [0u8; 12];
    bytes[..4].copy_from_slice(&secs.to_be_bytes());
    bytes[4..].copy_from_slice(&random.as_bytes()[..8]);
    hex::encode(bytes)
}

pub fn is_valid_id(id: &str) -> bool {
    id.len() == ID_LEN && id.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Normalize a client supplied id so lookups are case-insensitive.
pub fn parse_id(id: &str) -> Option<Id> {
    let id = id.trim();
    is_valid_id(id).then(|| id.to_ascii_lowercase())
}

/// Current time truncated to millisecond precision, which is what the
/// store round-trips.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}
