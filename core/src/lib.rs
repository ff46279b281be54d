//! # Conference Core
//!
//! Entity model, collaborator contracts and query planning for the conference
//! backend.
//!
//! This crate holds no I/O. It defines:
//!
//! - **Keys** ([`key`]): ownership-chained entity keys and their websafe form
//! - **Model** ([`model`]): profiles, conferences, sessions and typed enums
//! - **Errors** ([`error`]): the failure taxonomy every operation reports
//! - **Store** ([`store`]): the entity store and transaction traits plus the
//!   query model they execute
//! - **Cache** ([`cache`]) and **Tasks** ([`task`]): derived-view storage and
//!   fire-and-forget side effects
//! - **Filters** ([`filter`]): validation of user-supplied conference filters
//!   into an executable query plan
//!
//! ## Architecture Principles
//!
//! - External collaborators are traits, injected by the service layer
//! - Cross-scope atomicity is requested explicitly by naming a key group
//! - Typed enums have exactly one serialized form
//!
//! ## Example
//!
//! ```
//! use conference_core::filter::{ConferenceFilter, build_query_plan};
//!
//! let plan = build_query_plan(&[ConferenceFilter::new("CITY", "EQ", "Paris")]).unwrap();
//! let query = plan.to_query();
//! assert_eq!(query.filters.len(), 1);
//! ```

pub mod cache;
pub mod error;
pub mod filter;
pub mod key;
pub mod model;
pub mod store;
pub mod task;

// Re-export commonly used types
pub use chrono::{NaiveDate, NaiveTime};
pub use error::{ConferenceError, ConflictReason, ErrorKind, Result, StoreError, ValidationError};
pub use key::{ConferenceKey, EntityKey, EntityKind, ProfileKey, SessionKey};
pub use model::{CallerIdentity, Conference, Entity, Profile, Session, SessionType, TeeShirtSize};
