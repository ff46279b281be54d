//! # Conference Runtime
//!
//! Execution support shared by the conference operations.
//!
//! ## Core Components
//!
//! - **Retry**: exponential backoff for transient failures ([`retry`])
//! - **Transactions**: re-running a transaction body on contention ([`transaction`])
//! - **Metrics**: Prometheus recorders for registrations, caches, and tasks ([`metrics`])
//!
//! ## Example
//!
//! ```ignore
//! use conference_runtime::retry::RetryPolicy;
//! use conference_runtime::transaction::run_transaction;
//!
//! let seats = run_transaction(&RetryPolicy::default(), "register", || async {
//!     let mut txn = store.begin(vec![profile_key.clone().into()]).await?;
//!     // read, check, put ...
//!     txn.commit().await?;
//!     Ok(seats)
//! })
//! .await?;
//! ```

/// Retry logic with exponential backoff
pub mod retry;

/// Transaction re-execution on contention
pub mod transaction;

/// Prometheus metrics for observability
pub mod metrics;

pub use retry::{RetryPolicy, RetryPolicyBuilder};
pub use transaction::run_transaction;
