//! Fire-and-forget side effects triggered by conference and session creation.

use crate::error::TaskError;
use crate::key::ConferenceKey;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

/// Work handed to a background consumer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Task {
    /// Tell an organizer their conference was created.
    SendConfirmationEmail {
        /// Recipient
        email: String,
        /// Human-readable summary of the conference
        conference_info: String,
    },

    /// Recompute the featured speaker of a conference.
    RefreshFeaturedSpeaker {
        /// Conference whose sessions changed
        conference: ConferenceKey,
    },
}

impl Task {
    /// Short name for logs and metrics.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SendConfirmationEmail { .. } => "send_confirmation_email",
            Self::RefreshFeaturedSpeaker { .. } => "refresh_featured_speaker",
        }
    }
}

/// Enqueue capability. Delivery guarantees belong to the implementation.
pub trait TaskQueue: Send + Sync {
    /// Hand a task to the queue.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError`] if the queue does not accept the task.
    fn enqueue(&self, task: Task) -> BoxFuture<'_, Result<(), TaskError>>;
}
