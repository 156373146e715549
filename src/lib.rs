//! campus-admin - administrative backend core for a school administration system
//!
//! This crate implements the transport and session subsystem:
//! - Hand-written HTTP listener with wire-level request framing (no framework)
//! - Explicit routing with bearer-token auth gating
//! - Session lifecycle with sliding expiry (in-memory cache + persistent store)
//! - Single-use password reset tokens
//! - Background expiry sweeps and cooperative shutdown
//!
//! Entity CRUD and credential verification live behind the
//! [`directory::Directory`] trait and are supplied by the surrounding
//! application.

pub mod config;
pub mod device;
pub mod directory;
pub mod handlers;
pub mod http;
pub mod security;
pub mod session;
pub mod storage;
#[cfg(test)]
pub mod testutil;

use std::sync::Arc;

use config::Config;
use directory::Directory;
use security::SecurityLog;
use session::{ResetTokenCache, SessionManager};

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub directory: Arc<dyn Directory>,
    pub reset_tokens: ResetTokenCache,
    pub security: SecurityLog,
    pub sessions: SessionManager,
}
