//! Injected collaborators of the conference service.

use conference_core::cache::Cache;
use conference_core::store::EntityStore;
use conference_core::task::TaskQueue;
use conference_runtime::RetryPolicy;
use std::sync::Arc;

/// Everything a [`ConferenceService`](crate::ConferenceService) talks to.
#[derive(Clone)]
pub struct ConferenceEnvironment {
    /// Entity store for profiles, conferences and sessions
    pub store: Arc<dyn EntityStore>,
    /// Cache for the derived announcement and featured speaker entries
    pub cache: Arc<dyn Cache>,
    /// Fire-and-forget background work
    pub tasks: Arc<dyn TaskQueue>,
    /// Retry policy for contended transactions
    pub retry: RetryPolicy,
}

impl ConferenceEnvironment {
    /// Creates a new `ConferenceEnvironment` with the default retry policy.
    #[must_use]
    pub fn new(store: Arc<dyn EntityStore>, cache: Arc<dyn Cache>, tasks: Arc<dyn TaskQueue>) -> Self {
        Self {
            store,
            cache,
            tasks,
            retry: RetryPolicy::default(),
        }
    }

    /// Replace the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}
