use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use super::models::Session;
use super::store::{Store, StoreError};

/// In-memory [`Store`] for tests and store-less deployments.
///
/// Not durable: a restart drops every session.
#[derive(Default)]
pub struct MemoryStore {
    sessions: Mutex<HashMap<String, Session>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Session>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Store for MemoryStore {
    fn put_session(&self, session: &Session) -> Result<(), StoreError> {
        self.lock().insert(session.token.clone(), session.clone());
        Ok(())
    }

    fn get_session(&self, token: &str) -> Result<Option<Session>, StoreError> {
        Ok(self.lock().get(token).cloned())
    }

    fn delete_session(&self, token: &str) -> Result<bool, StoreError> {
        Ok(self.lock().remove(token).is_some())
    }

    fn delete_sessions_for_user(
        &self,
        user_id: i64,
        except_token: Option<&str>,
    ) -> Result<Vec<String>, StoreError> {
        let mut sessions = self.lock();
        let doomed: Vec<String> = sessions
            .values()
            .filter(|s| s.user_id == user_id && except_token != Some(s.token.as_str()))
            .map(|s| s.token.clone())
            .collect();
        for token in &doomed {
            sessions.remove(token);
        }
        Ok(doomed)
    }

    fn touch_session(
        &self,
        token: &str,
        last_activity: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        if let Some(session) = self.lock().get_mut(token) {
            session.last_activity = last_activity;
            session.expires_at = expires_at;
        }
        Ok(())
    }

    fn load_active_sessions(&self, now: DateTime<Utc>) -> Result<Vec<Session>, StoreError> {
        Ok(self
            .lock()
            .values()
            .filter(|s| !s.is_expired(now))
            .cloned()
            .collect())
    }

    fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired(now));
        Ok(before - sessions.len())
    }
}
