//! Request parsing and validation.
//!
//! Turns framed bytes into an [`InboundRequest`]: method, path, protocol,
//! case-folded headers, body and extracted bearer token. Requests live only
//! for the duration of one connection; nothing here is persisted.

use std::collections::HashMap;

use thiserror::Error;

const MAX_PATH_LENGTH: usize = 1000;
const MAX_TOKEN_LENGTH: usize = 512;
const ALLOWED_METHODS: [&str; 5] = ["GET", "POST", "PUT", "DELETE", "OPTIONS"];

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Body shorter than the declared Content-Length")]
    IncompleteBody,
    #[error("Content-Length required for a request with a body")]
    LengthRequired,
    #[error("Request is not parseable HTTP")]
    Malformed,
    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),
    #[error("Invalid request path")]
    BadPath,
    #[error("Request path too long ({0} bytes)")]
    PathTooLong(usize),
    #[error("Unsupported protocol: {0}")]
    BadProtocol(String),
    #[error("Authorization token exceeds the length cap")]
    TokenTooLong,
}

impl ParseError {
    pub fn status(&self) -> u16 {
        match self {
            ParseError::IncompleteBody => 400,
            ParseError::LengthRequired => 411,
            ParseError::Malformed => 400,
            ParseError::MethodNotAllowed(_) => 405,
            ParseError::BadPath => 400,
            ParseError::PathTooLong(_) => 414,
            ParseError::BadProtocol(_) => 505,
            ParseError::TokenTooLong => 400,
        }
    }

    /// Whether this error should be recorded in the security log in addition
    /// to the JSON error returned to the caller.
    pub fn suspicious(&self) -> bool {
        self.security_reason().is_some()
    }

    /// Tag written to the security log, for errors that warrant an entry.
    pub fn security_reason(&self) -> Option<&'static str> {
        match self {
            ParseError::BadPath => Some("invalid-path"),
            ParseError::PathTooLong(_) => Some("oversized-path"),
            ParseError::TokenTooLong => Some("oversized-token"),
            _ => None,
        }
    }

    /// Client-safe error message.
    pub fn message(&self) -> String {
        self.to_string()
    }
}

/// One parsed request, alive for the duration of a single connection.
#[derive(Debug)]
pub struct InboundRequest {
    /// Session token from the `Authorization` header, if any
    pub bearer_token: Option<String>,
    pub body: Vec<u8>,
    /// Header map, keys case-folded to lowercase
    pub headers: HashMap<String, String>,
    pub method: String,
    pub path: String,
    pub protocol: String,
    pub source_ip: String,
}

impl InboundRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

/// Parse a fully framed request.
pub fn parse(raw: &[u8], source_ip: &str) -> Result<InboundRequest, ParseError> {
    let terminator = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .ok_or(ParseError::Malformed)?;

    let head = String::from_utf8_lossy(&raw[..terminator]).into_owned();
    let remainder = &raw[terminator + 4..];

    let mut lines = head.lines();
    let request_line = lines.next().ok_or(ParseError::Malformed)?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().ok_or(ParseError::Malformed)?.to_string();
    let path = parts.next().ok_or(ParseError::Malformed)?.to_string();
    let protocol = parts.next().ok_or(ParseError::Malformed)?.to_string();

    if !ALLOWED_METHODS.contains(&method.as_str()) {
        return Err(ParseError::MethodNotAllowed(method));
    }
    validate_path(&path)?;
    if protocol != "HTTP/1.0" && protocol != "HTTP/1.1" {
        return Err(ParseError::BadProtocol(protocol));
    }

    let mut headers = HashMap::new();
    for line in lines {
        // Split on the first colon and trim the value, the same delimiter
        // rule the framer uses for its Content-Length peek
        let Some((name, value)) = line.split_once(':') else {
            tracing::trace!(line, "Dropping unparseable header line");
            continue;
        };
        if name.is_empty() || !name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-') {
            tracing::trace!(header = name, "Dropping header with invalid name");
            continue;
        }
        headers.insert(name.to_ascii_lowercase(), value.trim().to_string());
    }

    let body = extract_body(&method, &headers, remainder)?;
    let bearer_token = extract_token(&headers)?;

    Ok(InboundRequest {
        bearer_token,
        body,
        headers,
        method,
        path,
        protocol,
        source_ip: source_ip.to_string(),
    })
}

fn validate_path(path: &str) -> Result<(), ParseError> {
    if path.len() > MAX_PATH_LENGTH {
        return Err(ParseError::PathTooLong(path.len()));
    }
    if !path.starts_with('/') {
        return Err(ParseError::BadPath);
    }
    if path.contains("..") {
        return Err(ParseError::BadPath);
    }
    if path.bytes().any(|b| b < 0x20 || b == 0x7f) {
        return Err(ParseError::BadPath);
    }
    Ok(())
}

/// Body bytes for methods that may carry one. A declared body that never
/// fully arrived is a client error; body bytes without a declaration get 411.
fn extract_body(
    method: &str,
    headers: &HashMap<String, String>,
    remainder: &[u8],
) -> Result<Vec<u8>, ParseError> {
    if !matches!(method, "POST" | "PUT" | "DELETE") {
        return Ok(Vec::new());
    }

    match headers.get("content-length") {
        Some(value) => {
            let declared: usize = value.trim().parse().map_err(|_| ParseError::Malformed)?;
            if remainder.len() < declared {
                return Err(ParseError::IncompleteBody);
            }
            Ok(remainder[..declared].to_vec())
        }
        None if remainder.is_empty() => Ok(Vec::new()),
        None => Err(ParseError::LengthRequired),
    }
}

/// Extract the session token from the `Authorization` header.
///
/// `Bearer <token>` is the documented convention; anything else is passed
/// through raw for the auth gate to reject, but logged as non-standard.
/// Either way the token is capped before further processing.
fn extract_token(headers: &HashMap<String, String>) -> Result<Option<String>, ParseError> {
    let Some(value) = headers.get("authorization") else {
        return Ok(None);
    };

    let token = match value.strip_prefix("Bearer ") {
        Some(token) => token.trim(),
        None => {
            tracing::warn!("Non-standard Authorization header form");
            value.trim()
        }
    };

    if token.len() > MAX_TOKEN_LENGTH {
        return Err(ParseError::TokenTooLong);
    }
    if token.is_empty() {
        return Ok(None);
    }
    Ok(Some(token.to_string()))
}
