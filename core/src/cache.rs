//! Cache contract for derived projections.
//!
//! Cached values are recomputable views of entity state. A missing entry is
//! the "nothing to show" state; readers treat it as an empty string.

use crate::error::CacheError;
use crate::key::ConferenceKey;
use futures::future::BoxFuture;

/// Cache key of the near-sold-out announcement.
pub const ANNOUNCEMENT_KEY: &str = "RECENT_ANNOUNCEMENTS";

/// Prefix of per-conference featured speaker entries.
pub const FEATURED_SPEAKER_PREFIX: &str = "FEATURED_SPEAKER:";

/// Cache key of the featured speaker entry for `conference`.
#[must_use]
pub fn featured_speaker_key(conference: &ConferenceKey) -> String {
    format!("{FEATURED_SPEAKER_PREFIX}{}", conference.to_websafe())
}

/// A string-valued key/value cache.
pub trait Cache: Send + Sync {
    /// Read an entry.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the cache cannot be reached.
    fn get(&self, key: &str) -> BoxFuture<'_, Result<Option<String>, CacheError>>;

    /// Write an entry, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the cache cannot be reached.
    fn set(&self, key: &str, value: String) -> BoxFuture<'_, Result<(), CacheError>>;

    /// Remove an entry. Removing a missing entry succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the cache cannot be reached.
    fn delete(&self, key: &str) -> BoxFuture<'_, Result<(), CacheError>>;
}
