//! Lock-owning in-memory caches for sessions and reset tokens.
//!
//! Each cache owns its mutex internally and exposes only whole map
//! operations. The lock is never held across a store round-trip or a socket
//! operation; callers get owned copies out.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::storage::models::{ResetToken, Session};

/// In-memory token -> Session map, lazily backed by the persistent store.
#[derive(Default)]
pub struct SessionCache {
    inner: Mutex<HashMap<String, Session>>,
}

impl SessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Session>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, token: &str) -> Option<Session> {
        self.lock().get(token).cloned()
    }

    pub fn put(&self, session: Session) {
        self.lock().insert(session.token.clone(), session);
    }

    pub fn remove(&self, token: &str) -> Option<Session> {
        self.lock().remove(token)
    }

    /// Remove every cached session owned by `user_id` except `except_token`.
    /// Returns the removed tokens so the caller can mirror the deletes to the
    /// store.
    pub fn remove_for_user(&self, user_id: i64, except_token: Option<&str>) -> Vec<String> {
        let mut inner = self.lock();
        let doomed: Vec<String> = inner
            .values()
            .filter(|s| s.user_id == user_id && except_token != Some(s.token.as_str()))
            .map(|s| s.token.clone())
            .collect();
        for token in &doomed {
            inner.remove(token);
        }
        doomed
    }

    /// Remove every session with `expires_at <= now` and return their tokens.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> Vec<String> {
        let mut inner = self.lock();
        let doomed: Vec<String> = inner
            .values()
            .filter(|s| s.is_expired(now))
            .map(|s| s.token.clone())
            .collect();
        for token in &doomed {
            inner.remove(token);
        }
        doomed
    }

    pub fn sessions_for_user(&self, user_id: i64) -> Vec<Session> {
        self.lock()
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// In-memory map of outstanding password reset tokens.
///
/// Reset tokens are short-lived and never persisted. Expiry is enforced on
/// access rather than by the periodic worker.
pub struct ResetTokenCache {
    inner: Mutex<HashMap<String, ResetToken>>,
    window: chrono::Duration,
}

impl ResetTokenCache {
    pub fn new(window: chrono::Duration) -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            window,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, ResetToken>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn insert(&self, token: ResetToken) {
        self.lock().insert(token.token.clone(), token);
    }

    /// Redeem a token: it is removed on the first call regardless of whether
    /// it turns out to be usable. Returns `None` for unknown or expired
    /// tokens.
    pub fn take(&self, token: &str, now: DateTime<Utc>) -> Option<ResetToken> {
        let entry = self.lock().remove(token)?;
        if now - entry.created_at > self.window {
            return None;
        }
        Some(entry)
    }

    /// Opportunistic sweep, run whenever a new token is requested.
    pub fn drop_expired(&self, now: DateTime<Utc>) {
        self.lock()
            .retain(|_, t| now - t.created_at <= self.window);
    }
}
