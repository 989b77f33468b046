//! Server configuration from environment variables

use std::time::Duration;
use tracing::warn;

const DEFAULT_DB_PATH: &str = "data/swap.db";
const DEFAULT_PORT: u16 = 3001;
const DEFAULT_BATCH_INTERVAL_SECS: u64 = 3600;

#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    /// SQLite database file (`SWAP_DB_PATH`)
    pub db_path: String,
    /// Listen port (`SERVER_PORT`)
    pub port: u16,
    /// Seconds between scheduled batch runs; 0 disables (`BATCH_INTERVAL_SECS`)
    pub batch_interval_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            db_path: DEFAULT_DB_PATH.to_string(),
            port: DEFAULT_PORT,
            batch_interval_secs: DEFAULT_BATCH_INTERVAL_SECS,
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            db_path: lookup("SWAP_DB_PATH").unwrap_or(defaults.db_path),
            port: parse_or("SERVER_PORT", lookup("SERVER_PORT"), defaults.port),
            batch_interval_secs: parse_or(
                "BATCH_INTERVAL_SECS",
                lookup("BATCH_INTERVAL_SECS"),
                defaults.batch_interval_secs,
            ),
        }
    }

    /// `None` when the scheduler is disabled
    pub fn batch_interval(&self) -> Option<Duration> {
        (self.batch_interval_secs > 0).then(|| Duration::from_secs(self.batch_interval_secs))
    }
}

fn parse_or<T: std::str::FromStr + Copy + std::fmt::Display>(
    key: &str,
    value: Option<String>,
    default: T,
) -> T {
    match value {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Invalid {}={:?}, using {}", key, raw, default);
            default
        }),
        None => default,
    }
}
