//! Configuration management for the conference service.
//!
//! Loads configuration from environment variables with sensible defaults.

use conference_runtime::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Tracing filter directive (`LOG_FILTER`)
    pub log_filter: String,
    /// Transaction retry configuration
    pub transaction: TransactionConfig,
    /// Background processing configuration
    pub background: BackgroundConfig,
    /// Prometheus exporter address (`METRICS_ADDR`); metrics are off when unset
    pub metrics_addr: Option<SocketAddr>,
}

/// Retry settings for contended transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionConfig {
    /// Retries after the first attempt (default: 3)
    pub max_retries: usize,
    /// Delay before the first retry in milliseconds (default: 10)
    pub initial_delay_ms: u64,
    /// Cap on the retry delay in milliseconds (default: 1000)
    pub max_delay_ms: u64,
}

/// Background worker and scheduler settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackgroundConfig {
    /// Seconds between announcement refreshes (default: 3600)
    pub announcement_refresh_interval_secs: u64,
    /// Bounded task queue capacity (default: 256)
    pub task_queue_capacity: usize,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Unset or unparseable variables fall back to their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            log_filter: lookup("LOG_FILTER").unwrap_or_else(|| "info,conference_service=debug".to_string()),
            transaction: TransactionConfig {
                max_retries: parse_or(&lookup, "TRANSACTION_MAX_RETRIES", 3),
                initial_delay_ms: parse_or(&lookup, "TRANSACTION_RETRY_INITIAL_DELAY_MS", 10),
                max_delay_ms: parse_or(&lookup, "TRANSACTION_RETRY_MAX_DELAY_MS", 1000),
            },
            background: BackgroundConfig {
                announcement_refresh_interval_secs: parse_or(&lookup, "ANNOUNCEMENT_REFRESH_INTERVAL_SECS", 3600),
                task_queue_capacity: parse_or(&lookup, "TASK_QUEUE_CAPACITY", 256),
            },
            metrics_addr: lookup("METRICS_ADDR").and_then(|s| s.parse().ok()),
        }
    }

    /// Retry policy for transactional operations.
    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::builder()
            .max_retries(self.transaction.max_retries)
            .initial_delay(Duration::from_millis(self.transaction.initial_delay_ms))
            .max_delay(Duration::from_millis(self.transaction.max_delay_ms))
            .build()
    }

    /// Interval between announcement refreshes.
    #[must_use]
    pub const fn announcement_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.background.announcement_refresh_interval_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

fn parse_or<F, T>(lookup: &F, name: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(name).and_then(|s| s.trim().parse().ok()).unwrap_or(default)
}
