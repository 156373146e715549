use std::path::Path;

use chrono::{DateTime, Utc};
use redb::{Database, ReadableTable};

use super::models::Session;
use super::store::{Store, StoreError};
use super::tables::*;

/// Embedded `redb` implementation of the [`Store`] contract.
pub struct RedbStore {
    db: Database,
}

impl RedbStore {
    /// Open or create a database at the given path
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self, StoreError> {
        std::fs::create_dir_all(data_dir.as_ref())?;
        let db_path = data_dir.as_ref().join("campus-admin.redb");
        let db = Database::create(db_path)?;

        // Create tables if they don't exist
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(SESSIONS)?;
            let _ = write_txn.open_table(USER_SESSIONS)?;
            let _ = write_txn.open_table(SESSION_EXPIRY)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }
}

impl Store for RedbStore {
    fn put_session(&self, session: &Session) -> Result<(), StoreError> {
        debug_assert!(!session.token.is_empty(), "session token must not be empty");

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(SESSIONS)?;
            let data = rmp_serde::to_vec_named(session)?;
            table.insert(session.token.as_str(), data.as_slice())?;

            // Update user_sessions index
            let mut index_table = write_txn.open_table(USER_SESSIONS)?;
            let mut tokens: Vec<String> = index_table
                .get(session.user_id)?
                .map(|v| rmp_serde::from_slice(v.value()))
                .transpose()?
                .unwrap_or_default();

            if !tokens.contains(&session.token) {
                tokens.push(session.token.clone());
                let index_data = rmp_serde::to_vec_named(&tokens)?;
                index_table.insert(session.user_id, index_data.as_slice())?;
            }

            // Update expiration index
            let mut expiry_table = write_txn.open_table(SESSION_EXPIRY)?;
            let ek = expiry_key(&session.expires_at, &session.token);
            expiry_table.insert(ek.as_str(), session.token.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn get_session(&self, token: &str) -> Result<Option<Session>, StoreError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SESSIONS)?;

        match table.get(token)? {
            Some(data) => {
                let session: Session = rmp_serde::from_slice(data.value())?;
                Ok(Some(session))
            }
            None => Ok(None),
        }
    }

    fn delete_session(&self, token: &str) -> Result<bool, StoreError> {
        let write_txn = self.db.begin_write()?;

        // First, get the session for index cleanup
        let session: Option<Session> = {
            let table = write_txn.open_table(SESSIONS)?;
            let result = table.get(token)?;
            match result {
                Some(data) => Some(rmp_serde::from_slice(data.value())?),
                None => None,
            }
        };

        let deleted = match session {
            Some(session) => {
                {
                    let mut table = write_txn.open_table(SESSIONS)?;
                    table.remove(token)?;
                }

                // Update user_sessions index
                let tokens: Option<Vec<String>> = {
                    let index_table = write_txn.open_table(USER_SESSIONS)?;
                    let result = index_table.get(session.user_id)?;
                    match result {
                        Some(data) => Some(rmp_serde::from_slice(data.value())?),
                        None => None,
                    }
                };

                if let Some(mut t) = tokens {
                    t.retain(|v| v != token);
                    let mut index_table = write_txn.open_table(USER_SESSIONS)?;
                    if t.is_empty() {
                        index_table.remove(session.user_id)?;
                    } else {
                        let new_index_data = rmp_serde::to_vec_named(&t)?;
                        index_table.insert(session.user_id, new_index_data.as_slice())?;
                    }
                }

                // Remove from expiration index
                {
                    let mut expiry_table = write_txn.open_table(SESSION_EXPIRY)?;
                    let ek = expiry_key(&session.expires_at, token);
                    expiry_table.remove(ek.as_str())?;
                }

                true
            }
            None => false,
        };

        write_txn.commit()?;
        Ok(deleted)
    }

    fn delete_sessions_for_user(
        &self,
        user_id: i64,
        except_token: Option<&str>,
    ) -> Result<Vec<String>, StoreError> {
        // Read the index outside the write below; the per-token delete
        // re-checks existence anyway.
        let tokens: Vec<String> = {
            let read_txn = self.db.begin_read()?;
            let index_table = read_txn.open_table(USER_SESSIONS)?;
            match index_table.get(user_id)? {
                Some(data) => rmp_serde::from_slice(data.value())?,
                None => return Ok(Vec::new()),
            }
        };

        let mut removed = Vec::new();
        for token in tokens {
            if except_token == Some(token.as_str()) {
                continue;
            }
            if self.delete_session(&token)? {
                removed.push(token);
            }
        }

        Ok(removed)
    }

    fn touch_session(
        &self,
        token: &str,
        last_activity: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let write_txn = self.db.begin_write()?;
        let existing = {
            let table = write_txn.open_table(SESSIONS)?;
            let result = match table.get(token)? {
                Some(data) => Some(rmp_serde::from_slice::<Session>(data.value())?),
                None => None,
            };
            result
        };
        if let Some(mut session) = existing {
            let old_ek = expiry_key(&session.expires_at, token);
            session.last_activity = last_activity;
            session.expires_at = expires_at;

            let serialized = rmp_serde::to_vec_named(&session)?;
            {
                let mut table = write_txn.open_table(SESSIONS)?;
                table.insert(token, serialized.as_slice())?;
            }

            // Move the expiration index entry to the new timestamp
            {
                let mut expiry_table = write_txn.open_table(SESSION_EXPIRY)?;
                expiry_table.remove(old_ek.as_str())?;
                let new_ek = expiry_key(&expires_at, token);
                expiry_table.insert(new_ek.as_str(), token)?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    fn load_active_sessions(&self, now: DateTime<Utc>) -> Result<Vec<Session>, StoreError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SESSIONS)?;

        let mut sessions = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            let session: Session = rmp_serde::from_slice(value.value())?;
            if !session.is_expired(now) {
                sessions.push(session);
            }
        }

        Ok(sessions)
    }

    fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let now_ms = now.timestamp_millis();

        // Phase 1: read the expiration index to collect expired entries
        let expired: Vec<String> = {
            let read_txn = self.db.begin_read()?;
            let table = read_txn.open_table(SESSION_EXPIRY)?;
            let mut result = Vec::new();
            for entry in table.iter()? {
                let (key, value) = entry?;
                match expiry_key_ms(key.value()) {
                    Some(ms) if ms <= now_ms => {
                        result.push(value.value().to_string());
                    }
                    _ => break,
                }
            }
            result
        };

        // Phase 2: delete each expired session, cleaning up all indexes
        let mut deleted = 0;
        for token in &expired {
            if self.delete_session(token)? {
                deleted += 1;
            }
        }

        Ok(deleted)
    }
}
