//! Transaction runner.
//!
//! A transaction body opens a transaction, reads, checks business rules, buffers
//! writes, and commits. When the store reports a transient failure (contention
//! with a concurrent writer, or a brief outage) the whole body is re-run from
//! scratch, re-reading current state. Business errors abort immediately and the
//! uncommitted transaction is dropped with nothing applied.
//!
//! Bodies must not have observable side effects before their commit succeeds;
//! callers record metrics and enqueue follow-up work only on the returned value.

use crate::metrics::TransactionMetrics;
use crate::retry::{RetryPolicy, retry_while};
use conference_core::error::{ConferenceError, Result};
use std::future::Future;
use std::time::Instant;
use tracing::Instrument;

/// Run `body` until it commits, fails with a non-transient error, or
/// `policy` runs out of retries.
///
/// `operation` names the transaction in logs and metrics.
///
/// # Errors
///
/// Returns the body's error. A transient [`ConferenceError::Store`] error is
/// only returned once retries are exhausted.
pub async fn run_transaction<F, Fut, T>(policy: &RetryPolicy, operation: &'static str, body: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let span = tracing::debug_span!("transaction", operation);
    let started = Instant::now();

    let result = retry_while(policy, body, ConferenceError::is_transient)
        .instrument(span)
        .await;

    match &result {
        Ok(_) => TransactionMetrics::record_commit(operation, started.elapsed()),
        Err(err) if err.is_transient() => {
            tracing::warn!(operation, error = %err, "Transaction abandoned after retries");
        },
        Err(err) => {
            tracing::debug!(operation, code = err.code(), "Transaction aborted");
        },
    }

    result
}
