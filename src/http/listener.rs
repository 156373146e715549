//! The TCP accept loop.
//!
//! Connections are handled one at a time on the listener thread: a request
//! is framed, parsed and dispatched to completion before the next connection
//! is accepted. The listening socket is non-blocking so the loop can observe
//! the shutdown flag between accepts instead of parking in `accept()`.

use std::io::{ErrorKind, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use super::framer::{self, FramerLimits};
use super::request;
use super::response::Response;
use super::router::Router;
use super::shutdown::ShutdownFlag;
use crate::AppState;

const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(500);
const WRITE_TIMEOUT: Duration = Duration::from_secs(30);

/// Bind the configured address and spawn the listener thread.
///
/// Returns the bound address (useful when the configured port is 0) and the
/// thread handle so the caller can join on shutdown.
pub fn spawn_listener(
    state: Arc<AppState>,
    shutdown: ShutdownFlag,
) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
    let listener = TcpListener::bind(state.config.bind_address())?;
    listener.set_nonblocking(true)?;
    let addr = listener.local_addr()?;

    let handle = std::thread::Builder::new()
        .name("listener".to_string())
        .spawn(move || run_accept_loop(listener, state, shutdown))?;

    Ok((addr, handle))
}

fn run_accept_loop(listener: TcpListener, state: Arc<AppState>, shutdown: ShutdownFlag) {
    let router = Router::new();
    tracing::info!(address = %state.config.bind_address(), "Listener started");

    while shutdown.is_running() {
        match listener.accept() {
            Ok((stream, peer)) => handle_connection(&state, &router, stream, peer),
            Err(e) if e.kind() == ErrorKind::WouldBlock => {
                std::thread::sleep(ACCEPT_POLL_INTERVAL);
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                tracing::error!(error = %e, "Accept failed");
                std::thread::sleep(ACCEPT_POLL_INTERVAL);
            }
        }
    }

    tracing::info!("Listener stopped");
}

/// Serve one connection to completion: frame, parse, dispatch, respond.
fn handle_connection(state: &AppState, router: &Router, mut stream: TcpStream, peer: SocketAddr) {
    if let Err(e) = stream.set_nonblocking(true) {
        tracing::warn!(error = %e, "Could not switch connection to non-blocking");
        return;
    }

    let limits = FramerLimits {
        inactivity_timeout: Duration::from_secs(state.config.server.read_timeout_seconds),
        max_body_bytes: state.config.server.max_body_bytes,
    };
    let ip = peer.ip().to_string();

    let raw = match framer::read_request(&mut stream, &limits) {
        Ok(raw) => raw,
        Err(e) => {
            match e.status() {
                Some(status) => {
                    tracing::debug!(ip = %ip, error = %e, "Rejected request during framing");
                    write_response(&mut stream, &Response::error(status, &e.to_string()), state);
                }
                // Incomplete or dead connections get no response at all
                None => tracing::debug!(ip = %ip, error = %e, "Abandoned connection"),
            }
            return;
        }
    };

    let response = match request::parse(&raw, &ip) {
        Ok(req) => {
            tracing::debug!(method = %req.method, path = %req.path, ip = %ip, "Request");
            router.dispatch(state, &req)
        }
        Err(e) => {
            if let Some(reason) = e.security_reason() {
                state
                    .security
                    .record(&ip, reason, &String::from_utf8_lossy(&raw));
            }
            Response::error(e.status(), &e.message())
        }
    };

    write_response(&mut stream, &response, state);
}

/// Write the full response and close. Write failures are logged and dropped;
/// the client is gone either way.
fn write_response(stream: &mut TcpStream, response: &Response, state: &AppState) {
    let _ = stream.set_nonblocking(false);
    let _ = stream.set_write_timeout(Some(WRITE_TIMEOUT));

    if let Err(e) = stream.write_all(&response.to_bytes(&state.config.cors_origin)) {
        tracing::debug!(error = %e, "Failed to write response");
    }
    let _ = stream.flush();
    let _ = stream.shutdown(Shutdown::Both);
}
