//! Process configuration read from the environment (and `.env`).

use crate::hub::DEFAULT_QUEUE_CAPACITY;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DATABASE_URL: &str = "sqlite://chatrelay.db?mode=rwc";

#[derive(Debug, Clone, PartialEq)]
pub struct RelayConfig {
    /// TCP port to listen on
    pub port: u16,
    /// SQLite connection string, or `memory`
    pub database_url: String,
    /// Per-connection outbound queue size; a client that falls this far
    /// behind is disconnected
    pub broadcast_capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            broadcast_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// Read a trimmed, non-empty env var
fn env_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Parse an env var, falling back to the default with a warning
fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env_var(key) {
        Some(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!("Invalid {}={:?}, using default", key, raw);
                default
            }
        },
        None => default,
    }
}

impl RelayConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let database_url = env_var("DATABASE_URL").unwrap_or_else(|| {
            tracing::info!("DATABASE_URL not set, using {}", DEFAULT_DATABASE_URL);
            defaults.database_url.clone()
        });

        let broadcast_capacity = match parse_or("BROADCAST_CAPACITY", defaults.broadcast_capacity) {
            0 => {
                tracing::warn!("BROADCAST_CAPACITY must be positive, using default");
                defaults.broadcast_capacity
            }
            n => n,
        };

        Self {
            port: parse_or("PORT", defaults.port),
            database_url,
            broadcast_capacity,
        }
    }
}
