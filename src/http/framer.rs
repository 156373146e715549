//! Wire-level request framing.
//!
//! Reads from a non-blocking socket until a complete HTTP request (header
//! block plus declared body) has been assembled, without reading past the
//! declared body. Would-block is not an error; the read loop sleeps briefly
//! and retries, bounded by an inactivity timeout after which the connection
//! is abandoned with no response.

use std::io::{ErrorKind, Read};
use std::net::TcpStream;
use std::time::{Duration, Instant};

use thiserror::Error;

const READ_CHUNK_SIZE: usize = 4096;
const RETRY_SLEEP: Duration = Duration::from_millis(25);
/// Anything shorter than "GET / HTTP/1.1\r\n\r\n" cannot be a request.
const MIN_REQUEST_BYTES: usize = 18;
/// Cap on accumulated bytes before the header terminator arrives. The body
/// cap only kicks in once `Content-Length` has been seen; this one bounds a
/// client that streams header bytes forever.
const MAX_HEADER_BYTES: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum FramerError {
    #[error("Declared Content-Length is not a number")]
    BadContentLength,
    #[error("Declared body of {0} bytes exceeds the cap")]
    BodyTooLarge(usize),
    #[error("Header block of {0} bytes exceeds the cap")]
    HeaderBlockTooLarge(usize),
    #[error("Request preamble is not plausible HTTP")]
    MalformedPreamble,
    #[error("Peer closed the connection")]
    PeerClosed,
    #[error("Connection idle past the framing timeout")]
    TimedOut,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FramerError {
    /// Status to answer with, or `None` when the connection is abandoned
    /// without a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            FramerError::BadContentLength => Some(400),
            FramerError::BodyTooLarge(_) => Some(413),
            FramerError::HeaderBlockTooLarge(_) => Some(413),
            FramerError::MalformedPreamble => Some(400),
            FramerError::PeerClosed | FramerError::TimedOut | FramerError::Io(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FramerLimits {
    pub inactivity_timeout: Duration,
    pub max_body_bytes: usize,
}

/// Read one complete request off the wire.
///
/// Returns the exact bytes of the request: header block, CRLFCRLF terminator
/// and `Content-Length` body bytes, nothing more.
pub fn read_request(stream: &mut TcpStream, limits: &FramerLimits) -> Result<Vec<u8>, FramerError> {
    let mut chunk = [0u8; READ_CHUNK_SIZE];
    let mut acc: Vec<u8> = Vec::new();
    let mut last_activity = Instant::now();

    loop {
        match stream.read(&mut chunk) {
            Ok(0) => return Err(FramerError::PeerClosed),
            Ok(n) => {
                acc.extend_from_slice(&chunk[..n]);
                last_activity = Instant::now();

                match find_terminator(&acc) {
                    Some(terminator) => {
                        let body_len = check_preamble(&acc, terminator, limits)?;
                        let total = terminator + 4 + body_len;
                        if acc.len() >= total {
                            acc.truncate(total);
                            return Ok(acc);
                        }
                    }
                    None if acc.len() > MAX_HEADER_BYTES => {
                        return Err(FramerError::HeaderBlockTooLarge(acc.len()));
                    }
                    None => {}
                }
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => {
                if last_activity.elapsed() >= limits.inactivity_timeout {
                    return Err(FramerError::TimedOut);
                }
                std::thread::sleep(RETRY_SLEEP);
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(FramerError::Io(e)),
        }
    }
}

/// Position of the CRLFCRLF header terminator, if present.
fn find_terminator(acc: &[u8]) -> Option<usize> {
    acc.windows(4).position(|w| w == b"\r\n\r\n")
}

/// Guards that run as soon as the header block is complete, before any body
/// bytes are awaited. Returns the declared body length.
fn check_preamble(
    acc: &[u8],
    terminator: usize,
    limits: &FramerLimits,
) -> Result<usize, FramerError> {
    if acc.len() < MIN_REQUEST_BYTES {
        return Err(FramerError::MalformedPreamble);
    }

    let head = String::from_utf8_lossy(&acc[..terminator]);
    let request_line = head.lines().next().unwrap_or("");
    if !request_line.contains(" HTTP/") {
        return Err(FramerError::MalformedPreamble);
    }

    let body_len = match header_value(&head, "content-length") {
        Some(value) => value
            .trim()
            .parse::<usize>()
            .map_err(|_| FramerError::BadContentLength)?,
        None => 0,
    };

    if body_len > limits.max_body_bytes {
        return Err(FramerError::BodyTooLarge(body_len));
    }

    Ok(body_len)
}

/// Case-insensitive header lookup within a raw header block.
fn header_value<'a>(head: &'a str, name: &str) -> Option<&'a str> {
    head.lines().skip(1).find_map(|line| {
        let (key, value) = line.split_once(':')?;
        if key.trim().eq_ignore_ascii_case(name) {
            Some(value.trim())
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::net::TcpListener;

    fn limits() -> FramerLimits {
        FramerLimits {
            inactivity_timeout: Duration::from_millis(400),
            max_body_bytes: 1024,
        }
    }

    /// Connected socket pair on loopback; the server side is non-blocking.
    fn socket_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).unwrap();
        let (server, _) = listener.accept().unwrap();
        server.set_nonblocking(true).unwrap();
        (client, server)
    }

    #[test]
    fn test_frames_bodyless_request() {
        let (mut client, mut server) = socket_pair();
        client
            .write_all(b"GET /sessions HTTP/1.1\r\nHost: x\r\n\r\n")
            .unwrap();

        let raw = read_request(&mut server, &limits()).unwrap();
        assert!(raw.ends_with(b"\r\n\r\n"));
        assert!(raw.starts_with(b"GET /sessions"));
    }

    #[test]
    fn test_frames_body_split_across_writes() {
        let (mut client, mut server) = socket_pair();
        client
            .write_all(b"POST /login HTTP/1.1\r\nContent-Length: 5\r\n\r\nab")
            .unwrap();
        client.flush().unwrap();

        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            client.write_all(b"cde").unwrap();
            client
        });

        let raw = read_request(&mut server, &limits()).unwrap();
        assert!(raw.ends_with(b"abcde"));
        handle.join().unwrap();
    }

    #[test]
    fn test_short_body_times_out() {
        let (mut client, mut server) = socket_pair();
        // Declares 5 body bytes but only 3 ever arrive
        client
            .write_all(b"POST /login HTTP/1.1\r\nContent-Length: 5\r\n\r\nabc")
            .unwrap();

        let result = read_request(&mut server, &limits());
        assert!(matches!(result, Err(FramerError::TimedOut)));
        assert!(result.unwrap_err().status().is_none());
    }

    #[test]
    fn test_peer_close_aborts_silently() {
        let (client, mut server) = socket_pair();
        drop(client);

        let result = read_request(&mut server, &limits());
        assert!(matches!(result, Err(FramerError::PeerClosed)));
    }

    #[test]
    fn test_rejects_missing_version_token() {
        let (mut client, mut server) = socket_pair();
        client.write_all(b"GARBAGE WITHOUT VERSION\r\n\r\n").unwrap();

        let result = read_request(&mut server, &limits());
        assert!(matches!(result, Err(FramerError::MalformedPreamble)));
        assert_eq!(result.unwrap_err().status(), Some(400));
    }

    #[test]
    fn test_rejects_oversized_declared_body_before_reading_it() {
        let (mut client, mut server) = socket_pair();
        client
            .write_all(b"POST /x HTTP/1.1\r\nContent-Length: 999999\r\n\r\n")
            .unwrap();

        let result = read_request(&mut server, &limits());
        match result {
            Err(FramerError::BodyTooLarge(declared)) => assert_eq!(declared, 999999),
            other => panic!("expected BodyTooLarge, got {other:?}"),
        }
    }

    #[test]
    fn test_endless_header_stream_is_capped() {
        let (mut client, mut server) = socket_pair();

        // Streams header lines and never sends the terminator
        let writer = std::thread::spawn(move || {
            let line = b"X-Pad: aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa\r\n";
            for _ in 0..8192 {
                if client.write_all(line).is_err() {
                    break;
                }
            }
        });

        let err = match read_request(&mut server, &limits()) {
            Err(e) => e,
            Ok(raw) => panic!("framed {} bytes without a terminator", raw.len()),
        };
        match &err {
            FramerError::HeaderBlockTooLarge(n) => assert!(*n > MAX_HEADER_BYTES),
            other => panic!("expected HeaderBlockTooLarge, got {other:?}"),
        }
        assert_eq!(err.status(), Some(413));

        // Closing our side unblocks the writer if its buffers filled up
        drop(server);
        writer.join().unwrap();
    }

    #[test]
    fn test_rejects_non_numeric_content_length() {
        let (mut client, mut server) = socket_pair();
        client
            .write_all(b"POST /x HTTP/1.1\r\nContent-Length: banana\r\n\r\n")
            .unwrap();

        let result = read_request(&mut server, &limits());
        assert!(matches!(result, Err(FramerError::BadContentLength)));
    }
}
