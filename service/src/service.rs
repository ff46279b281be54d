//! The service handle and the lookups every operation shares.

use crate::environment::ConferenceEnvironment;
use conference_core::error::{ConferenceError, Result};
use conference_core::key::{ConferenceKey, EntityKey, EntityKind, SessionKey};
use conference_core::model::{CallerIdentity, Conference, Entity, Profile, Session};
use conference_core::task::Task;
use conference_runtime::metrics::TaskMetrics;

/// Conference operations over an injected [`ConferenceEnvironment`].
///
/// Operations are grouped by concern across this crate's modules
/// (`profile`, `conference`, `session`, `registration`, `wishlist`,
/// `announcement`, `featured_speaker`). Cloning is cheap and shares the
/// collaborators.
#[derive(Clone)]
pub struct ConferenceService {
    pub(crate) env: ConferenceEnvironment,
}

impl ConferenceService {
    /// Creates a new `ConferenceService`.
    #[must_use]
    pub const fn new(env: ConferenceEnvironment) -> Self {
        Self { env }
    }

    /// The injected collaborators.
    #[must_use]
    pub const fn environment(&self) -> &ConferenceEnvironment {
        &self.env
    }

    /// Load the conference a websafe key names.
    pub(crate) async fn load_conference(&self, websafe_key: &str) -> Result<Conference> {
        let key = ConferenceKey::from_websafe(websafe_key)?;
        self.env
            .store
            .get(&key.into())
            .await?
            .and_then(Entity::into_conference)
            .ok_or_else(|| ConferenceError::not_found(EntityKind::Conference, websafe_key))
    }

    /// Load the session a websafe key names.
    pub(crate) async fn load_session(&self, websafe_key: &str) -> Result<Session> {
        let key = SessionKey::from_websafe(websafe_key)?;
        self.env
            .store
            .get(&key.into())
            .await?
            .and_then(Entity::into_session)
            .ok_or_else(|| ConferenceError::not_found(EntityKind::Session, websafe_key))
    }

    /// Load the caller's profile without creating it.
    pub(crate) async fn find_profile(&self, identity: &CallerIdentity) -> Result<Option<Profile>> {
        let key: EntityKey = identity.profile_key().into();
        Ok(self.env.store.get(&key).await?.and_then(Entity::into_profile))
    }

    /// Hand a task to the queue. Failures are logged and swallowed; the
    /// operation that triggered the task has already been persisted.
    pub(crate) async fn enqueue(&self, task: Task) {
        let name = task.name();
        match self.env.tasks.enqueue(task).await {
            Ok(()) => {
                TaskMetrics::record_enqueued(name);
                tracing::debug!(task = name, "Task enqueued");
            },
            Err(error) => {
                tracing::warn!(task = name, %error, "Failed to enqueue task");
            },
        }
    }
}

/// Forbidden unless `identity` organizes `conference`.
pub(crate) fn require_organizer(identity: &CallerIdentity, conference: &Conference, action: &str) -> Result<()> {
    if conference.organizer_user_id == identity.user_id {
        Ok(())
    } else {
        Err(ConferenceError::Forbidden(format!("Only the organizer can {action}")))
    }
}
