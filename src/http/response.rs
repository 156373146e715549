//! Outgoing HTTP responses.
//!
//! Every response is a full HTTP/1.1 message: status line, `Content-Type:
//! application/json`, the three CORS headers, `Content-Length`, and a JSON
//! envelope carrying a `"success"` boolean plus `"data"`/`"message"` or
//! `"error"`. Connections are closed after one response; there is no
//! keep-alive.

use serde_json::{json, Value};

#[derive(Debug, Clone)]
pub struct Response {
    pub body: String,
    pub status: u16,
}

impl Response {
    fn envelope(status: u16, body: Value) -> Self {
        Self {
            body: body.to_string(),
            status,
        }
    }

    pub fn ok(data: Value) -> Self {
        Self::envelope(200, json!({ "success": true, "data": data }))
    }

    pub fn created(data: Value) -> Self {
        Self::envelope(201, json!({ "success": true, "data": data }))
    }

    pub fn message(message: &str) -> Self {
        Self::envelope(200, json!({ "success": true, "message": message }))
    }

    pub fn error(status: u16, error: &str) -> Self {
        Self::envelope(status, json!({ "success": false, "error": error }))
    }

    pub fn unauthorized() -> Self {
        Self::error(401, "Invalid or expired session")
    }

    pub fn forbidden() -> Self {
        Self::error(403, "Forbidden")
    }

    pub fn not_found(error: &str) -> Self {
        Self::error(404, error)
    }

    /// Generic 500. Internal error text is never echoed to the client.
    pub fn internal_error() -> Self {
        Self::error(500, "Internal server error")
    }

    /// Serialize to wire bytes. CORS headers are attached uniformly to every
    /// response, success or error.
    pub fn to_bytes(&self, cors_origin: &str) -> Vec<u8> {
        let head = format!(
            "HTTP/1.1 {} {}\r\n\
             Content-Type: application/json\r\n\
             Access-Control-Allow-Origin: {}\r\n\
             Access-Control-Allow-Methods: GET, POST, PUT, DELETE, OPTIONS\r\n\
             Access-Control-Allow-Headers: Content-Type, Authorization\r\n\
             Content-Length: {}\r\n\
             \r\n",
            self.status,
            reason_phrase(self.status),
            cors_origin,
            self.body.len(),
        );

        let mut bytes = head.into_bytes();
        bytes.extend_from_slice(self.body.as_bytes());
        bytes
    }
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        411 => "Length Required",
        413 => "Payload Too Large",
        414 => "URI Too Long",
        500 => "Internal Server Error",
        505 => "HTTP Version Not Supported",
        _ => "Unknown",
    }
}
