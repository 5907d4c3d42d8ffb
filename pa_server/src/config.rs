//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated
//! configuration.

use pong_arena::DatabaseConfig;
use pong_arena::tournament::MAX_PARTICIPANTS;
use std::net::SocketAddr;

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Run against the in-memory store instead of PostgreSQL
    pub in_memory: bool,
    /// Per-tournament participant cap enforced at the API edge
    pub max_participants: usize,
    /// Optional Prometheus metrics listener
    pub metrics_bind: Option<SocketAddr>,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `database_url_override` - Optional database URL override (from CLI args)
    /// * `in_memory_override` - Optional in-memory flag override (from CLI args)
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
        in_memory_override: Option<bool>,
    ) -> Result<Self, ConfigError> {
        let bind = bind_override
            .or_else(|| {
                std::env::var("SERVER_BIND")
                    .ok()
                    .and_then(|s| s.parse().ok())
            })
            .unwrap_or_else(|| {
                "127.0.0.1:4242"
                    .parse()
                    .expect("Default bind address is valid")
            });

        let mut database = DatabaseConfig::from_env();
        if let Some(url) = database_url_override {
            database.database_url = url;
        }

        let in_memory =
            in_memory_override.unwrap_or_else(|| parse_env_or("IN_MEMORY_STORE", false));

        let max_participants = parse_env_or("TOURNAMENT_MAX_PARTICIPANTS", MAX_PARTICIPANTS);

        let metrics_bind = std::env::var("METRICS_BIND")
            .ok()
            .and_then(|s| s.parse().ok());

        Ok(ServerConfig {
            bind,
            database,
            in_memory,
            max_participants,
            metrics_bind,
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_participants < 2 {
            return Err(ConfigError::Invalid {
                var: "TOURNAMENT_MAX_PARTICIPANTS".to_string(),
                reason: "Must be at least 2".to_string(),
            });
        }

        if self.max_participants > MAX_PARTICIPANTS {
            return Err(ConfigError::Invalid {
                var: "TOURNAMENT_MAX_PARTICIPANTS".to_string(),
                reason: format!("Must be at most {MAX_PARTICIPANTS} (engine bracket limit)"),
            });
        }

        if !self.in_memory && self.database.database_url.is_empty() {
            return Err(ConfigError::MissingRequired {
                var: "DATABASE_URL".to_string(),
                hint: "Set a PostgreSQL connection string or pass --in-memory".to_string(),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
