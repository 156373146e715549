use chrono::{DateTime, Utc};
use thiserror::Error;

use super::models::Session;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),
    #[error("Decode error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
    #[error("Encode error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Database error: {0}")]
    Redb(#[from] redb::Error),
    #[error("Database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),
    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),
    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),
    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),
}

/// Persistence contract for sessions.
///
/// The session cache is lazily backed by a `Store`; implementations must be
/// durable across restarts (the in-memory variant exists for tests and
/// store-less deployments). Reset tokens are deliberately not part of this
/// contract; they live only in memory for their short lifetime.
pub trait Store: Send + Sync {
    /// Insert or replace a session, keyed by token.
    fn put_session(&self, session: &Session) -> Result<(), StoreError>;

    /// Look up a session by token.
    fn get_session(&self, token: &str) -> Result<Option<Session>, StoreError>;

    /// Delete a session by token. Returns whether anything was removed.
    fn delete_session(&self, token: &str) -> Result<bool, StoreError>;

    /// Delete every session owned by `user_id` except `except_token`.
    /// Returns the tokens that were removed.
    fn delete_sessions_for_user(
        &self,
        user_id: i64,
        except_token: Option<&str>,
    ) -> Result<Vec<String>, StoreError>;

    /// Persist renewed timestamps for an existing session.
    ///
    /// A missing token is not an error; the caller treats the session as
    /// already revoked.
    fn touch_session(
        &self,
        token: &str,
        last_activity: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// All sessions with `expires_at > now`, for the bulk load at startup.
    fn load_active_sessions(&self, now: DateTime<Utc>) -> Result<Vec<Session>, StoreError>;

    /// Bulk delete of every session with `expires_at <= now`.
    /// Covers entries that were never loaded into the cache.
    fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize, StoreError>;
}
