//! # Conference Service
//!
//! Conference management operations over injected collaborators: an entity
//! store, a cache, and a task queue.
//!
//! ## Operations
//!
//! - **Profiles**: [`get_profile`](ConferenceService::get_profile), [`save_profile`](ConferenceService::save_profile)
//! - **Conferences**: create, update, lookup, created/attending lists, and
//!   filtered [`query_conferences`](ConferenceService::query_conferences)
//! - **Sessions**: create and list by conference, type or speaker
//! - **Registration**: [`register`](ConferenceService::register) /
//!   [`unregister`](ConferenceService::unregister), atomic over profile and conference
//! - **Wishlist**: add, remove, list per conference or overall
//! - **Derived caches**: near-sold-out announcement and per-conference featured speaker
//!
//! Background processing lives in [`background`].
//!
//! ## Example
//!
//! ```
//! use conference_service::{ConferenceEnvironment, ConferenceService};
//! use conference_service::forms::ConferenceForm;
//! use conference_testing::{InMemoryCache, InMemoryEntityStore, RecordingTaskQueue, fixtures};
//! use std::sync::Arc;
//!
//! # async fn example() -> conference_core::Result<()> {
//! let service = ConferenceService::new(ConferenceEnvironment::new(
//!     Arc::new(InMemoryEntityStore::new()),
//!     Arc::new(InMemoryCache::new()),
//!     Arc::new(RecordingTaskQueue::new()),
//! ));
//!
//! let organizer = fixtures::identity("organizer");
//! let conference = service
//!     .create_conference(&organizer, &ConferenceForm {
//!         name: Some("RustConf".into()),
//!         max_attendees: Some(3),
//!         ..ConferenceForm::default()
//!     })
//!     .await?;
//!
//! let attendee = fixtures::identity("attendee");
//! assert!(service.register(&attendee, &conference.key.to_websafe()).await?);
//! # Ok(())
//! # }
//! ```

pub mod background;
pub mod config;
pub mod environment;
pub mod forms;

mod announcement;
mod conference;
mod featured_speaker;
mod profile;
mod registration;
mod service;
mod session;
mod wishlist;

pub use announcement::{ANNOUNCEMENT_PREFIX, NEARLY_SOLD_OUT_SEATS};
pub use config::Config;
pub use environment::ConferenceEnvironment;
pub use service::ConferenceService;
