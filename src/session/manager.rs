use std::sync::Arc;

use thiserror::Error;

use super::cache::SessionCache;
use super::clock::Clock;
use super::generator::generate_token;
use crate::storage::models::Session;
use crate::storage::{Store, StoreError};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Owns the session lifecycle: creation, validation with sliding renewal,
/// revocation and the startup bulk load.
///
/// The cache is authoritative for listing; the store is authoritative for
/// durability. Cache misses fall back to the store and repopulate.
pub struct SessionManager {
    cache: SessionCache,
    clock: Arc<dyn Clock>,
    store: Arc<dyn Store>,
    timeout: chrono::Duration,
}

impl SessionManager {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, timeout: chrono::Duration) -> Self {
        Self {
            cache: SessionCache::new(),
            clock,
            store,
            timeout,
        }
    }

    /// Bulk-load all non-expired sessions from the store, so a restart does
    /// not silently invalidate active users.
    pub fn load_from_store(&self) -> Result<usize, SessionError> {
        let now = self.clock.now();
        let sessions = self.store.load_active_sessions(now)?;
        let count = sessions.len();
        for session in sessions {
            self.cache.put(session);
        }
        Ok(count)
    }

    /// Create a session for a freshly authenticated user and persist it.
    pub fn create(
        &self,
        user_id: i64,
        email: &str,
        ip_address: &str,
        client_os: &str,
    ) -> Result<Session, SessionError> {
        let now = self.clock.now();
        let session = Session {
            client_os: client_os.to_string(),
            created_at: now,
            email: email.to_string(),
            expires_at: now + self.timeout,
            ip_address: ip_address.to_string(),
            last_activity: now,
            token: generate_token(),
            user_id,
        };

        self.store.put_session(&session)?;
        self.cache.put(session.clone());
        tracing::debug!(user_id, "Created session");
        Ok(session)
    }

    /// Validate a token, renewing the sliding expiry window on success.
    ///
    /// Every successful validation pushes `expires_at` forward, so an
    /// actively-used session never expires while an idle one does. Expired
    /// entries are purged from both cache and store before being reported
    /// absent.
    pub fn validate(&self, token: &str) -> Result<Option<Session>, SessionError> {
        if token.is_empty() {
            return Ok(None);
        }

        let now = self.clock.now();

        let session = match self.cache.get(token) {
            Some(session) => Some(session),
            None => match self.store.get_session(token)? {
                Some(session) if session.is_expired(now) => {
                    self.store.delete_session(token)?;
                    tracing::debug!("Expired session purged from store on lookup");
                    None
                }
                Some(session) => {
                    self.cache.put(session.clone());
                    Some(session)
                }
                None => None,
            },
        };

        let mut session = match session {
            Some(s) => s,
            None => return Ok(None),
        };

        if session.is_expired(now) {
            self.cache.remove(token);
            self.store.delete_session(token)?;
            tracing::debug!("Expired session purged on validation");
            return Ok(None);
        }

        session.last_activity = now;
        session.expires_at = now + self.timeout;
        self.cache.put(session.clone());
        self.store
            .touch_session(token, session.last_activity, session.expires_at)?;

        Ok(Some(session))
    }

    /// Remove a session from cache and store. Idempotent: revoking an absent
    /// token reports `false` rather than an error.
    pub fn revoke(&self, token: &str) -> Result<bool, SessionError> {
        let cached = self.cache.remove(token).is_some();
        let stored = self.store.delete_session(token)?;
        if cached || stored {
            tracing::debug!("Revoked session");
        }
        Ok(cached || stored)
    }

    /// Destroy all of a user's sessions except the one excluded (used on
    /// password change, where the current session stays alive).
    pub fn revoke_all_for_user(
        &self,
        user_id: i64,
        except_token: Option<&str>,
    ) -> Result<usize, SessionError> {
        let removed = self.cache.remove_for_user(user_id, except_token);
        for token in &removed {
            self.store.delete_session(token)?;
        }
        // Covers sessions never loaded into the cache
        let stored = self.store.delete_sessions_for_user(user_id, except_token)?;

        let total = removed.len() + stored.len();
        if total > 0 {
            tracing::info!(user_id, count = total, "Revoked user sessions");
        }
        Ok(total)
    }

    /// All cached sessions owned by a user. The cache is authoritative here
    /// because of the startup bulk load.
    pub fn sessions_for_user(&self, user_id: i64) -> Vec<Session> {
        self.cache.sessions_for_user(user_id)
    }

    /// Look up a session without renewing it (used for ownership checks
    /// before revocation). An expired session is purged from cache and store
    /// before being reported absent, same as in `validate`.
    pub fn peek(&self, token: &str) -> Result<Option<Session>, SessionError> {
        let now = self.clock.now();
        let session = match self.cache.get(token) {
            Some(session) => Some(session),
            None => self.store.get_session(token)?,
        };
        match session {
            Some(session) if session.is_expired(now) => {
                self.cache.remove(token);
                self.store.delete_session(token)?;
                tracing::debug!("Expired session purged on lookup");
                Ok(None)
            }
            other => Ok(other),
        }
    }

    /// The manager's time source, shared with callers that track their own
    /// expiring state (reset tokens).
    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    /// One cleanup cycle: sweep the cache, mirror each removal to the store,
    /// then bulk-delete expired rows the cache never saw.
    pub fn sweep_expired(&self) -> Result<usize, SessionError> {
        let now = self.clock.now();

        let swept = self.cache.sweep_expired(now);
        for token in &swept {
            self.store.delete_session(token)?;
        }

        let stored = self.store.delete_expired_sessions(now)?;
        Ok(swept.len() + stored)
    }

    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }

    #[cfg(test)]
    pub fn cache_contains(&self, token: &str) -> bool {
        self.cache.get(token).is_some()
    }
}
