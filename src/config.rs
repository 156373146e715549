use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub cors_origin: String,
    /// Empty means the in-memory store (no durability across restarts).
    pub data_dir: Option<String>,
    pub security_log: String,
    pub server: ServerConfig,
    pub sessions: SessionConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    /// Hard cap on a declared request body, in bytes.
    pub max_body_bytes: usize,
    pub port: u16,
    /// Inactivity timeout while framing a request off the wire (seconds).
    pub read_timeout_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub cleanup_interval_seconds: u64,
    pub reset_token_timeout_minutes: i64,
    pub timeout_hours: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            max_body_bytes: 10 * 1024 * 1024,
            port: 8080,
            read_timeout_seconds: 30,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cleanup_interval_seconds: 300,
            reset_token_timeout_minutes: 30,
            timeout_hours: 24,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = std::env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(8080);

        let read_timeout_seconds = std::env::var("READ_TIMEOUT_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        let timeout_hours = std::env::var("SESSION_TIMEOUT_HOURS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(24);

        let reset_token_timeout_minutes = std::env::var("RESET_TOKEN_TIMEOUT_MINUTES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        let cleanup_interval_seconds = std::env::var("CLEANUP_INTERVAL_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(300);

        let cors_origin = std::env::var("CORS_ORIGIN").unwrap_or_else(|_| "*".to_string());

        let data_dir = std::env::var("DATA_DIR").ok().filter(|s| !s.is_empty());

        let security_log =
            std::env::var("SECURITY_LOG").unwrap_or_else(|_| "./security.log".to_string());

        let config = Config {
            cors_origin,
            data_dir,
            security_log,
            server: ServerConfig {
                host,
                max_body_bytes: 10 * 1024 * 1024,
                port,
                read_timeout_seconds,
            },
            sessions: SessionConfig {
                cleanup_interval_seconds,
                reset_token_timeout_minutes,
                timeout_hours,
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.host.is_empty() {
            return Err(ConfigError::ValidationError(
                "HOST cannot be empty".to_string(),
            ));
        }
        if self.sessions.timeout_hours <= 0 {
            return Err(ConfigError::ValidationError(
                "SESSION_TIMEOUT_HOURS must be greater than 0".to_string(),
            ));
        }
        if self.sessions.reset_token_timeout_minutes <= 0 {
            return Err(ConfigError::ValidationError(
                "RESET_TOKEN_TIMEOUT_MINUTES must be greater than 0".to_string(),
            ));
        }
        if self.server.read_timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "READ_TIMEOUT_SECONDS must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = Config {
            cors_origin: "*".to_string(),
            data_dir: None,
            security_log: "/tmp/security.log".to_string(),
            server: ServerConfig::default(),
            sessions: SessionConfig::default(),
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
    }

    #[test]
    fn test_rejects_zero_session_timeout() {
        let config = Config {
            cors_origin: "*".to_string(),
            data_dir: None,
            security_log: "/tmp/security.log".to_string(),
            server: ServerConfig::default(),
            sessions: SessionConfig {
                timeout_hours: 0,
                ..SessionConfig::default()
            },
        };
        assert!(config.validate().is_err());
    }
}
