//! End-to-end tests over a real TCP socket: raw HTTP in, raw HTTP out.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use chrono::Utc;
use tempfile::TempDir;

use campus_admin::config::{Config, ServerConfig, SessionConfig};
use campus_admin::directory::MemoryDirectory;
use campus_admin::http::{spawn_listener, ShutdownFlag};
use campus_admin::security::SecurityLog;
use campus_admin::session::clock::manual::ManualClock;
use campus_admin::session::clock::Clock;
use campus_admin::session::{ResetTokenCache, SessionManager};
use campus_admin::storage::{MemoryStore, Store};
use campus_admin::AppState;

struct TestServer {
    addr: SocketAddr,
    clock: Arc<ManualClock>,
    handle: Option<JoinHandle<()>>,
    shutdown: ShutdownFlag,
    state: Arc<AppState>,
    temp: TempDir,
}

impl TestServer {
    fn start() -> Self {
        let temp = TempDir::new().unwrap();
        let security_log = temp.path().join("security.log");

        let config = Config {
            cors_origin: "*".to_string(),
            data_dir: None,
            security_log: security_log.to_str().unwrap().to_string(),
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                read_timeout_seconds: 1,
                ..ServerConfig::default()
            },
            sessions: SessionConfig::default(),
        };

        let clock = Arc::new(ManualClock::starting_at(Utc::now()));
        let sessions = SessionManager::new(
            Arc::new(MemoryStore::new()) as Arc<dyn Store>,
            Arc::clone(&clock) as Arc<dyn Clock>,
            chrono::Duration::hours(config.sessions.timeout_hours),
        );
        let reset_tokens = ResetTokenCache::new(chrono::Duration::minutes(
            config.sessions.reset_token_timeout_minutes,
        ));

        let state = Arc::new(AppState {
            security: SecurityLog::open(&config.security_log),
            directory: Arc::new(MemoryDirectory::new()),
            reset_tokens,
            sessions,
            config,
        });

        let shutdown = ShutdownFlag::new();
        let (addr, handle) = spawn_listener(Arc::clone(&state), shutdown.clone()).unwrap();

        Self {
            addr,
            clock,
            handle: Some(handle),
            shutdown,
            state,
            temp,
        }
    }

    fn security_log_contents(&self) -> String {
        std::fs::read_to_string(self.temp.path().join("security.log")).unwrap_or_default()
    }

    /// Write one raw request and read everything the server answers with.
    fn send(&self, raw: &str) -> String {
        let mut stream = TcpStream::connect(self.addr).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(10)))
            .unwrap();
        stream.write_all(raw.as_bytes()).unwrap();

        let mut response = String::new();
        let _ = stream.read_to_string(&mut response);
        response
    }

    fn get(&self, path: &str, token: Option<&str>) -> String {
        let auth = match token {
            Some(token) => format!("Authorization: Bearer {token}\r\n"),
            None => String::new(),
        };
        self.send(&format!("GET {path} HTTP/1.1\r\nHost: t\r\n{auth}\r\n"))
    }

    fn post(&self, path: &str, token: Option<&str>, body: &str) -> String {
        let auth = match token {
            Some(token) => format!("Authorization: Bearer {token}\r\n"),
            None => String::new(),
        };
        self.send(&format!(
            "POST {path} HTTP/1.1\r\nHost: t\r\n{auth}Content-Length: {}\r\n\r\n{body}",
            body.len()
        ))
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
        if let Some(handle) = self.handle.take() {
            handle.join().unwrap();
        }
    }
}

fn status_of(response: &str) -> u16 {
    response
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| panic!("no status line in {response:?}"))
}

fn json_body(response: &str) -> serde_json::Value {
    let body = response
        .split("\r\n\r\n")
        .nth(1)
        .unwrap_or_else(|| panic!("no body in {response:?}"));
    serde_json::from_str(body).unwrap()
}

#[test]
fn test_register_login_session_info_roundtrip() {
    let server = TestServer::start();

    let response = server.post(
        "/register",
        None,
        r#"{"email":"a@example.com","password":"pw","name":"Alice"}"#,
    );
    assert_eq!(status_of(&response), 201);

    let response = server.post(
        "/login",
        None,
        r#"{"email":"a@example.com","password":"pw"}"#,
    );
    assert_eq!(status_of(&response), 200);
    let parsed = json_body(&response);
    assert_eq!(parsed["success"], serde_json::json!(true));
    let token = parsed["data"]["token"].as_str().unwrap().to_string();
    assert_eq!(token.len(), 64);

    let response = server.get("/session-info", Some(&token));
    assert_eq!(status_of(&response), 200);
    assert!(response.contains("Content-Type: application/json"));
    assert!(response.contains("Access-Control-Allow-Origin: *"));
    let parsed = json_body(&response);
    assert_eq!(parsed["data"]["email"], serde_json::json!("a@example.com"));
    assert!(parsed["data"]["userId"].is_i64());
}

#[test]
fn test_idle_session_expires() {
    let server = TestServer::start();
    let session = {
        let account = server
            .state
            .directory
            .register("a@example.com", "pw", "Alice")
            .unwrap();
        server
            .state
            .sessions
            .create(account.id, &account.email, "127.0.0.1", "Linux")
            .unwrap()
    };

    let response = server.get("/session-info", Some(&session.token));
    assert_eq!(status_of(&response), 200);

    server.clock.advance(chrono::Duration::hours(25));

    let response = server.get("/session-info", Some(&session.token));
    assert_eq!(status_of(&response), 401);
    let parsed = json_body(&response);
    assert_eq!(parsed["success"], serde_json::json!(false));
}

#[test]
fn test_unknown_method_is_405_with_envelope() {
    let server = TestServer::start();

    let response = server.send("PATCH /students HTTP/1.1\r\nHost: t\r\n\r\n");
    assert_eq!(status_of(&response), 405);
    let parsed = json_body(&response);
    assert_eq!(parsed["success"], serde_json::json!(false));
    assert!(parsed["error"].is_string());
}

#[test]
fn test_traversal_path_is_rejected_and_logged() {
    let server = TestServer::start();

    let response = server.send("GET /../etc/passwd HTTP/1.1\r\nHost: t\r\n\r\n");
    assert_eq!(status_of(&response), 400);

    let log = server.security_log_contents();
    assert!(log.contains("reason=invalid-path"), "log was {log:?}");
    assert!(log.contains("etc/passwd"));
}

#[test]
fn test_partial_body_is_abandoned_without_response() {
    let server = TestServer::start();

    let mut stream = TcpStream::connect(server.addr).unwrap();
    stream
        .set_read_timeout(Some(Duration::from_secs(10)))
        .unwrap();
    // Declares 5 body bytes, sends 3, then goes quiet
    stream
        .write_all(b"POST /login HTTP/1.1\r\nHost: t\r\nContent-Length: 5\r\n\r\nabc")
        .unwrap();

    let mut response = String::new();
    let _ = stream.read_to_string(&mut response);
    assert!(response.is_empty(), "expected no response, got {response:?}");
}

#[test]
fn test_options_preflight_and_unknown_route() {
    let server = TestServer::start();

    let response = server.send("OPTIONS /anything HTTP/1.1\r\nHost: t\r\n\r\n");
    assert_eq!(status_of(&response), 200);
    assert!(response.contains("Access-Control-Allow-Methods: GET, POST, PUT, DELETE, OPTIONS"));
    assert!(response.contains("Access-Control-Allow-Headers: Content-Type, Authorization"));

    let response = server.get("/nowhere", None);
    assert_eq!(status_of(&response), 404);
}

#[test]
fn test_verify_token_accepts_body_fallback() {
    let server = TestServer::start();
    let session = {
        let account = server
            .state
            .directory
            .register("a@example.com", "pw", "Alice")
            .unwrap();
        server
            .state
            .sessions
            .create(account.id, &account.email, "127.0.0.1", "Linux")
            .unwrap()
    };

    let body = format!(r#"{{"token":"{}"}}"#, session.token);
    let response = server.post("/verify-token", None, &body);
    assert_eq!(status_of(&response), 200);
    let parsed = json_body(&response);
    assert_eq!(parsed["data"]["valid"], serde_json::json!(true));

    let response = server.post("/verify-token", None, r#"{"token":"bogus"}"#);
    assert_eq!(status_of(&response), 401);
}
