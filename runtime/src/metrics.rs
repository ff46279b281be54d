//! Prometheus metrics for the conference backend.
//!
//! Recorders are plain unit structs with associated functions so call sites
//! read as `RegistrationMetrics::record_registration()`. Counters are only
//! recorded after a transaction commits; an aborted attempt leaves no trace
//! beyond the retry counters.
//!
//! # Example
//!
//! ```rust,no_run
//! use conference_runtime::metrics::MetricsServer;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//!
//! if let Some(body) = server.render() {
//!     println!("{body}");
//! }
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

pub use metrics::{counter, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus metrics exporter.
pub struct MetricsServer {
    addr: SocketAddr,
    handle: Option<PrometheusHandle>,
}

impl MetricsServer {
    /// Create a new metrics server for `addr`.
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr, handle: None }
    }

    /// Describe all metrics and install the Prometheus recorder.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built or installed. An already
    /// installed recorder is tolerated so tests can start several servers.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                self.handle = Some(handle);
                tracing::info!(addr = %self.addr, "Metrics recorder installed");
                Ok(())
            },
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            },
        }
    }

    /// Address the exporter was configured for.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus text format.
    ///
    /// Returns `None` if this server did not install the recorder.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

fn register_metrics() {
    describe_counter!(
        "conference_transactions_committed_total",
        "Transactions committed, labelled by operation"
    );
    describe_histogram!(
        "conference_transaction_duration_seconds",
        "Wall time of a transaction including retries"
    );

    describe_counter!("conference_registrations_total", "Seats reserved");
    describe_counter!("conference_unregistrations_total", "Seats released");
    describe_counter!(
        "conference_registration_rejections_total",
        "Registration attempts rejected, labelled by reason code"
    );

    describe_counter!("conference_wishlist_additions_total", "Sessions added to wishlists");
    describe_counter!("conference_wishlist_removals_total", "Sessions removed from wishlists");

    describe_counter!(
        "conference_cache_refreshes_total",
        "Derived cache entries written, labelled by entry"
    );
    describe_counter!(
        "conference_cache_clears_total",
        "Derived cache entries deleted, labelled by entry"
    );

    describe_counter!("conference_tasks_enqueued_total", "Background tasks enqueued");
    describe_counter!("conference_tasks_processed_total", "Background tasks completed");
    describe_counter!("conference_tasks_failed_total", "Background tasks that failed");

    describe_counter!("retry_attempts_total", "Transient failures that triggered a retry");
    describe_counter!("retry_successes_total", "Operations that succeeded after retrying");
    describe_counter!("retry_exhausted_total", "Operations that ran out of retries");
}

/// Transaction metrics recorder.
pub struct TransactionMetrics;

impl TransactionMetrics {
    /// Record a committed transaction.
    pub fn record_commit(operation: &'static str, duration: Duration) {
        counter!("conference_transactions_committed_total", "operation" => operation).increment(1);
        histogram!("conference_transaction_duration_seconds", "operation" => operation)
            .record(duration.as_secs_f64());
    }
}

/// Registration metrics recorder.
pub struct RegistrationMetrics;

impl RegistrationMetrics {
    /// Record a reserved seat.
    pub fn record_registration() {
        counter!("conference_registrations_total").increment(1);
    }

    /// Record a released seat.
    pub fn record_unregistration() {
        counter!("conference_unregistrations_total").increment(1);
    }

    /// Record a rejected registration.
    pub fn record_rejection(code: &'static str) {
        counter!("conference_registration_rejections_total", "reason" => code).increment(1);
    }
}

/// Wishlist metrics recorder.
pub struct WishlistMetrics;

impl WishlistMetrics {
    /// Record a session added to a wishlist.
    pub fn record_addition() {
        counter!("conference_wishlist_additions_total").increment(1);
    }

    /// Record a session removed from a wishlist.
    pub fn record_removal() {
        counter!("conference_wishlist_removals_total").increment(1);
    }
}

/// Derived cache metrics recorder.
pub struct CacheMetrics;

impl CacheMetrics {
    /// Record a cache entry written.
    pub fn record_refresh(entry: &'static str) {
        counter!("conference_cache_refreshes_total", "entry" => entry).increment(1);
    }

    /// Record a cache entry deleted.
    pub fn record_clear(entry: &'static str) {
        counter!("conference_cache_clears_total", "entry" => entry).increment(1);
    }
}

/// Background task metrics recorder.
pub struct TaskMetrics;

impl TaskMetrics {
    /// Record a task handed to the queue.
    pub fn record_enqueued(task: &'static str) {
        counter!("conference_tasks_enqueued_total", "task" => task).increment(1);
    }

    /// Record a task that completed.
    pub fn record_processed(task: &'static str) {
        counter!("conference_tasks_processed_total", "task" => task).increment(1);
    }

    /// Record a task that failed.
    pub fn record_failed(task: &'static str) {
        counter!("conference_tasks_failed_total", "task" => task).increment(1);
    }
}

/// Retry metrics recorder.
pub struct RetryMetrics;

impl RetryMetrics {
    /// Record a retry attempt.
    pub fn record_attempt() {
        counter!("retry_attempts_total").increment(1);
    }

    /// Record a successful retry.
    pub fn record_success() {
        counter!("retry_successes_total").increment(1);
    }

    /// Record exhausted retries.
    pub fn record_exhausted() {
        counter!("retry_exhausted_total").increment(1);
    }
}
