//! Suspicious-activity logging.
//!
//! Path traversal attempts, control characters in paths and oversized tokens
//! are appended to a dedicated log file with the client IP and a truncated
//! payload, independent of the JSON error returned to the caller.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::sync::Mutex;

const MAX_PAYLOAD_CHARS: usize = 200;

pub struct SecurityLog {
    file: Mutex<Option<File>>,
}

impl SecurityLog {
    /// Open the log file in append mode. A file that cannot be opened
    /// disables the file sink but keeps the tracing output.
    pub fn open(path: &str) -> Self {
        let file = OpenOptions::new().append(true).create(true).open(path);
        let file = match file {
            Ok(f) => Some(f),
            Err(e) => {
                tracing::warn!(error = %e, path, "Security log unavailable, file sink disabled");
                None
            }
        };
        Self {
            file: Mutex::new(file),
        }
    }

    /// A log that only emits tracing events.
    pub fn disabled() -> Self {
        Self {
            file: Mutex::new(None),
        }
    }

    pub fn record(&self, ip: &str, reason: &str, payload: &str) {
        let snippet = sanitize(payload);
        tracing::warn!(ip, reason, payload = %snippet, "Suspicious request");

        let mut guard = self.file.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(file) = guard.as_mut() {
            let line = format!(
                "{} ip={} reason={} payload={:?}\n",
                chrono::Utc::now().to_rfc3339(),
                ip,
                reason,
                snippet
            );
            if let Err(e) = file.write_all(line.as_bytes()) {
                tracing::warn!(error = %e, "Failed to append to security log");
            }
        }
    }
}

/// Truncate and strip control characters so the log stays one line per event.
fn sanitize(payload: &str) -> String {
    payload
        .chars()
        .take(MAX_PAYLOAD_CHARS)
        .map(|c| if c.is_control() { '.' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_record_appends_line() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("security.log");
        let log = SecurityLog::open(path.to_str().unwrap());

        log.record("10.0.0.1", "path-traversal", "GET /../etc/passwd HTTP/1.1");
        log.record("10.0.0.2", "oversized-token", &"a".repeat(999));

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("ip=10.0.0.1"));
        assert!(lines[0].contains("path-traversal"));
        // Payload is truncated
        assert!(lines[1].len() < 400);
    }

    #[test]
    fn test_sanitize_strips_control_chars() {
        assert_eq!(sanitize("a\r\nb"), "a..b");
    }
}
