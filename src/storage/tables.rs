use chrono::{DateTime, Utc};
use redb::TableDefinition;

/// Sessions: token -> Session (msgpack)
pub const SESSIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("sessions");

/// Secondary index: user_id -> Vec<token> (for revoking a user's sessions)
pub const USER_SESSIONS: TableDefinition<i64, &[u8]> = TableDefinition::new("user_sessions");

/// Expiration index: "{expires_at_ms:016}:{token}" -> token.
/// Keys sort by expiry, so the bulk expired-delete reads a prefix instead of
/// scanning the whole sessions table.
pub const SESSION_EXPIRY: TableDefinition<&str, &str> = TableDefinition::new("session_expiry");

/// Build an expiration index key for a session.
pub fn expiry_key(expires_at: &DateTime<Utc>, token: &str) -> String {
    format!("{:016}:{token}", expires_at.timestamp_millis())
}

/// Parse the millisecond timestamp back out of an expiration index key.
pub fn expiry_key_ms(key: &str) -> Option<i64> {
    key.split(':').next()?.parse().ok()
}
