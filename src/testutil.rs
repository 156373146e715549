//! Shared helpers for unit tests.

use std::sync::Arc;

use chrono::Utc;

use crate::config::{Config, ServerConfig, SessionConfig};
use crate::directory::MemoryDirectory;
use crate::http::request::InboundRequest;
use crate::security::SecurityLog;
use crate::session::clock::manual::ManualClock;
use crate::session::clock::Clock;
use crate::session::{ResetTokenCache, SessionManager};
use crate::storage::models::Session;
use crate::storage::{MemoryStore, Store};
use crate::AppState;

pub fn test_config() -> Config {
    Config {
        cors_origin: "*".to_string(),
        data_dir: None,
        security_log: String::new(),
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            read_timeout_seconds: 1,
            ..ServerConfig::default()
        },
        sessions: SessionConfig::default(),
    }
}

/// Full application state over in-memory collaborators, plus the clock that
/// drives it.
pub fn test_state() -> (Arc<AppState>, Arc<ManualClock>) {
    let config = test_config();
    let clock = Arc::new(ManualClock::starting_at(Utc::now()));
    let store = Arc::new(MemoryStore::new());

    let sessions = SessionManager::new(
        store as Arc<dyn Store>,
        Arc::clone(&clock) as Arc<dyn Clock>,
        chrono::Duration::hours(config.sessions.timeout_hours),
    );
    let reset_tokens = ResetTokenCache::new(chrono::Duration::minutes(
        config.sessions.reset_token_timeout_minutes,
    ));

    let state = Arc::new(AppState {
        config,
        directory: Arc::new(MemoryDirectory::new()),
        reset_tokens,
        security: SecurityLog::disabled(),
        sessions,
    });
    (state, clock)
}

pub fn make_session(token: &str, user_id: i64) -> Session {
    let now = Utc::now();
    Session {
        client_os: "Linux".to_string(),
        created_at: now,
        email: format!("user{user_id}@example.com"),
        expires_at: now + chrono::Duration::hours(24),
        ip_address: "127.0.0.1".to_string(),
        last_activity: now,
        token: token.to_string(),
        user_id,
    }
}

/// Register a known account (idempotently) and open a session for it.
pub fn login_session(state: &AppState) -> Session {
    let account = match state.directory.user_by_email("a@example.com").unwrap() {
        Some(account) => account,
        None => state
            .directory
            .register("a@example.com", "pw", "Alice")
            .unwrap(),
    };
    state
        .sessions
        .create(account.id, &account.email, "127.0.0.1", "Linux")
        .unwrap()
}

pub fn request_for(method: &str, path: &str, bearer_token: Option<&str>) -> InboundRequest {
    InboundRequest {
        bearer_token: bearer_token.map(str::to_string),
        body: Vec::new(),
        headers: std::collections::HashMap::new(),
        method: method.to_string(),
        path: path.to_string(),
        protocol: "HTTP/1.1".to_string(),
        source_ip: "127.0.0.1".to_string(),
    }
}

pub fn request_with_body(method: &str, path: &str, body: &str) -> InboundRequest {
    let mut request = request_for(method, path, None);
    request.body = body.as_bytes().to_vec();
    request
}
