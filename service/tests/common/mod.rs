//! Shared setup for service integration tests.

#![allow(dead_code, clippy::unwrap_used)]

use conference_core::model::{CallerIdentity, Conference};
use conference_runtime::RetryPolicy;
use conference_service::forms::ConferenceForm;
use conference_service::{ConferenceEnvironment, ConferenceService};
use conference_testing::{InMemoryCache, InMemoryEntityStore, RecordingTaskQueue, fixtures};
use std::sync::Arc;
use std::time::Duration;

pub struct Harness {
    pub service: ConferenceService,
    pub store: InMemoryEntityStore,
    pub cache: InMemoryCache,
    pub tasks: RecordingTaskQueue,
    pub organizer: CallerIdentity,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_retry_policy(
            RetryPolicy::builder()
                .max_retries(10)
                .initial_delay(Duration::from_millis(1))
                .max_delay(Duration::from_millis(5))
                .build(),
        )
    }

    pub fn with_retry_policy(policy: RetryPolicy) -> Self {
        let store = InMemoryEntityStore::new();
        let cache = InMemoryCache::new();
        let tasks = RecordingTaskQueue::new();
        let env = ConferenceEnvironment::new(
            Arc::new(store.clone()),
            Arc::new(cache.clone()),
            Arc::new(tasks.clone()),
        )
        .with_retry_policy(policy);

        Self {
            service: ConferenceService::new(env),
            store,
            cache,
            tasks,
            organizer: fixtures::identity("organizer"),
        }
    }

    /// Create a conference with `seats` seats through the service.
    pub async fn conference(&self, name: &str, seats: u32) -> Conference {
        self.service
            .create_conference(
                &self.organizer,
                &ConferenceForm {
                    name: Some(name.into()),
                    max_attendees: Some(seats),
                    ..ConferenceForm::default()
                },
            )
            .await
            .unwrap()
    }

    /// Current stored state of a conference.
    pub async fn reload(&self, conference: &Conference) -> Conference {
        self.service.get_conference(&conference.key.to_websafe()).await.unwrap()
    }
}
