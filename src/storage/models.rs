use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An authenticated session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Operating system reported by the client's User-Agent
    pub client_os: String,
    /// When the session was created
    pub created_at: DateTime<Utc>,
    /// Email of the owning user
    pub email: String,
    /// When the session expires; pushed forward on every successful validation
    pub expires_at: DateTime<Utc>,
    /// Client address the session was created from
    pub ip_address: String,
    /// Last time the session was successfully validated
    pub last_activity: DateTime<Utc>,
    /// Opaque secret token (32-byte hex, used for verification)
    pub token: String,
    /// The owning user
    pub user_id: i64,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// A single-use password reset token.
///
/// Never renewed: expiry is measured from `created_at` against a fixed window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetToken {
    /// When the token was created
    pub created_at: DateTime<Utc>,
    /// Email of the account being reset
    pub email: String,
    /// Opaque secret token (32-byte hex)
    pub token: String,
}
