//! External collaborator boundary.
//!
//! Credential checks and entity record CRUD are out of scope for this crate;
//! the surrounding application implements [`Directory`] over its relational
//! store (including its own password hashing). [`MemoryDirectory`] exists for
//! tests and standalone runs.

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::{json, Value};
use thiserror::Error;

/// Entities served over the CRUD routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    Events,
    Groups,
    Portfolio,
    Students,
    Teachers,
}

impl Entity {
    /// Match a path segment against the fixed entity set. Case-sensitive.
    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "events" => Some(Entity::Events),
            "groups" => Some(Entity::Groups),
            "portfolio" => Some(Entity::Portfolio),
            "students" => Some(Entity::Students),
            "teachers" => Some(Entity::Teachers),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Entity::Events => "events",
            Entity::Groups => "groups",
            Entity::Portfolio => "portfolio",
            Entity::Students => "students",
            Entity::Teachers => "teachers",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserAccount {
    pub email: String,
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Backend error: {0}")]
    Backend(String),
    #[error("Email already registered")]
    EmailTaken,
    #[error("{0}")]
    Rejected(String),
    #[error("User not found")]
    UnknownUser,
}

/// Account and record operations delegated to the surrounding application.
pub trait Directory: Send + Sync {
    fn register(&self, email: &str, password: &str, name: &str)
        -> Result<UserAccount, DirectoryError>;

    /// `Ok(None)` means bad credentials; `Err` means the backend failed.
    fn authenticate(&self, email: &str, password: &str)
        -> Result<Option<UserAccount>, DirectoryError>;

    fn user_by_email(&self, email: &str) -> Result<Option<UserAccount>, DirectoryError>;

    fn change_password(&self, user_id: i64, new_password: &str) -> Result<(), DirectoryError>;

    // Entity record passthrough. Validation rules live on the other side of
    // this boundary.
    fn list_records(&self, entity: Entity) -> Result<Vec<Value>, DirectoryError>;
    fn get_record(&self, entity: Entity, id: i64) -> Result<Option<Value>, DirectoryError>;
    fn create_record(&self, entity: Entity, fields: Value) -> Result<Value, DirectoryError>;
    fn update_record(
        &self,
        entity: Entity,
        id: i64,
        fields: Value,
    ) -> Result<Option<Value>, DirectoryError>;
    fn delete_record(&self, entity: Entity, id: i64) -> Result<bool, DirectoryError>;
}

#[derive(Default)]
struct MemoryDirectoryState {
    next_record_id: i64,
    next_user_id: i64,
    // email -> (account, password)
    users: HashMap<String, (UserAccount, String)>,
    records: HashMap<(Entity, i64), Value>,
}

/// In-memory [`Directory`] for tests and standalone runs.
///
/// Stores passwords verbatim; real deployments hash on their side of the
/// boundary.
#[derive(Default)]
pub struct MemoryDirectory {
    state: Mutex<MemoryDirectoryState>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryDirectoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Directory for MemoryDirectory {
    fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<UserAccount, DirectoryError> {
        if email.trim().is_empty() || !email.contains('@') {
            return Err(DirectoryError::Rejected("Invalid email".to_string()));
        }
        if password.is_empty() {
            return Err(DirectoryError::Rejected("Password required".to_string()));
        }

        let mut state = self.lock();
        if state.users.contains_key(email) {
            return Err(DirectoryError::EmailTaken);
        }

        state.next_user_id += 1;
        let account = UserAccount {
            email: email.to_string(),
            id: state.next_user_id,
            name: name.to_string(),
        };
        state
            .users
            .insert(email.to_string(), (account.clone(), password.to_string()));
        Ok(account)
    }

    fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<UserAccount>, DirectoryError> {
        let state = self.lock();
        Ok(state
            .users
            .get(email)
            .filter(|(_, stored)| stored.as_str() == password)
            .map(|(account, _)| account.clone()))
    }

    fn user_by_email(&self, email: &str) -> Result<Option<UserAccount>, DirectoryError> {
        let state = self.lock();
        Ok(state.users.get(email).map(|(account, _)| account.clone()))
    }

    fn change_password(&self, user_id: i64, new_password: &str) -> Result<(), DirectoryError> {
        let mut state = self.lock();
        for (_, (account, stored)) in state.users.iter_mut() {
            if account.id == user_id {
                *stored = new_password.to_string();
                return Ok(());
            }
        }
        Err(DirectoryError::UnknownUser)
    }

    fn list_records(&self, entity: Entity) -> Result<Vec<Value>, DirectoryError> {
        let state = self.lock();
        let mut records: Vec<(i64, Value)> = state
            .records
            .iter()
            .filter(|((e, _), _)| *e == entity)
            .map(|((_, id), v)| (*id, v.clone()))
            .collect();
        records.sort_by_key(|(id, _)| *id);
        Ok(records.into_iter().map(|(_, v)| v).collect())
    }

    fn get_record(&self, entity: Entity, id: i64) -> Result<Option<Value>, DirectoryError> {
        Ok(self.lock().records.get(&(entity, id)).cloned())
    }

    fn create_record(&self, entity: Entity, fields: Value) -> Result<Value, DirectoryError> {
        let mut state = self.lock();
        state.next_record_id += 1;
        let id = state.next_record_id;

        let mut record = match fields {
            Value::Object(map) => Value::Object(map),
            _ => return Err(DirectoryError::Rejected("Expected a JSON object".to_string())),
        };
        record["id"] = json!(id);
        state.records.insert((entity, id), record.clone());
        Ok(record)
    }

    fn update_record(
        &self,
        entity: Entity,
        id: i64,
        fields: Value,
    ) -> Result<Option<Value>, DirectoryError> {
        let mut state = self.lock();
        let Some(existing) = state.records.get_mut(&(entity, id)) else {
            return Ok(None);
        };
        let Value::Object(updates) = fields else {
            return Err(DirectoryError::Rejected("Expected a JSON object".to_string()));
        };
        for (key, value) in updates {
            if key != "id" {
                existing[key.as_str()] = value;
            }
        }
        Ok(Some(existing.clone()))
    }

    fn delete_record(&self, entity: Entity, id: i64) -> Result<bool, DirectoryError> {
        Ok(self.lock().records.remove(&(entity, id)).is_some())
    }
}
