//! # Conference Testing
//!
//! In-memory implementations of the conference backend's external
//! collaborators, plus fixtures for building entities in tests.
//!
//! - [`InMemoryEntityStore`]: optimistic-concurrency entity store with
//!   commit fault injection
//! - [`InMemoryCache`]: `HashMap`-backed cache
//! - [`RecordingTaskQueue`]: captures enqueued tasks for assertions
//!
//! ## Example
//!
//! ```
//! use conference_testing::{InMemoryEntityStore, fixtures};
//! use conference_core::store::EntityStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = InMemoryEntityStore::new();
//! let conference = fixtures::conference("organizer", 1, "RustConf", 100);
//! store.put(conference.clone().into()).await?;
//!
//! let loaded = store.get(&conference.key.clone().into()).await?;
//! assert!(loaded.is_some());
//! # Ok(())
//! # }
//! ```

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Panics only on poisoned locks

pub mod cache;
pub mod store;
pub mod tasks;

pub use cache::InMemoryCache;
pub use store::InMemoryEntityStore;
pub use tasks::RecordingTaskQueue;

/// Entity builders with sensible defaults.
pub mod fixtures {
    use chrono::NaiveDate;
    use conference_core::key::{ConferenceKey, ProfileKey, SessionKey};
    use conference_core::model::{CallerIdentity, Conference, Session, SessionType};

    /// Identity for `user_id` with derived display name and email.
    #[must_use]
    pub fn identity(user_id: &str) -> CallerIdentity {
        CallerIdentity::new(user_id, format!("User {user_id}"), format!("{user_id}@example.com"))
    }

    /// A conference owned by `organizer` with every seat available.
    #[must_use]
    pub fn conference(organizer: &str, id: u64, name: &str, max_attendees: u32) -> Conference {
        Conference {
            key: ConferenceKey::new(ProfileKey::new(organizer), id),
            name: name.to_string(),
            description: None,
            organizer_user_id: organizer.to_string(),
            topics: vec!["Default".to_string(), "Topic".to_string()],
            city: Some("Default City".to_string()),
            start_date: None,
            end_date: None,
            month: 0,
            max_attendees,
            seats_available: max_attendees,
        }
    }

    /// A session of `conference` given by `speaker`.
    #[must_use]
    pub fn session(conference: &ConferenceKey, id: u64, name: &str, speaker: Option<&str>) -> Session {
        Session {
            key: SessionKey::new(conference.clone(), id),
            name: name.to_string(),
            highlights: None,
            speaker: speaker.map(str::to_string),
            session_type: SessionType::NotSpecified,
            date: None,
            start_time: None,
            end_time: None,
        }
    }

    /// Shorthand for a calendar date.
    #[must_use]
    pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }
}
