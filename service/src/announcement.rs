//! The near-sold-out announcement.

use crate::service::ConferenceService;
use conference_core::cache::ANNOUNCEMENT_KEY;
use conference_core::error::Result;
use conference_core::key::EntityKind;
use conference_core::model::Entity;
use conference_core::store::{Operator, Property, PropertyFilter, Query, SortOrder};
use conference_runtime::metrics::CacheMetrics;
use tracing::instrument;

/// Sentence preceding the list of conference names.
pub const ANNOUNCEMENT_PREFIX: &str = "Last chance to attend! The following conferences are nearly sold out:";

/// Conferences with at most this many seats left are announced.
pub const NEARLY_SOLD_OUT_SEATS: i64 = 5;

fn nearly_sold_out() -> Query {
    Query::new(EntityKind::Conference)
        .filter(PropertyFilter::new(Property::SeatsAvailable, Operator::Gt, 0_i64))
        .filter(PropertyFilter::new(Property::SeatsAvailable, Operator::LtEq, NEARLY_SOLD_OUT_SEATS))
        .order_by(SortOrder::ascending(Property::SeatsAvailable))
        .order_by(SortOrder::ascending(Property::Name))
}

impl ConferenceService {
    /// Recompute the announcement from current seat counts.
    ///
    /// Stores the announcement when any conference has between one and five
    /// seats left, and deletes the entry otherwise. Returns the text, empty
    /// when nothing is announced.
    ///
    /// # Errors
    ///
    /// Returns `Store` or `Cache` errors from the collaborators.
    #[instrument(skip_all)]
    pub async fn refresh_announcement(&self) -> Result<String> {
        let names: Vec<String> = self
            .env
            .store
            .query(&nearly_sold_out())
            .await?
            .into_iter()
            .filter_map(Entity::into_conference)
            .map(|conference| conference.name)
            .collect();

        if names.is_empty() {
            self.env.cache.delete(ANNOUNCEMENT_KEY).await?;
            CacheMetrics::record_clear("announcement");
            tracing::debug!("No nearly sold out conferences, announcement cleared");
            return Ok(String::new());
        }

        let announcement = format!("{ANNOUNCEMENT_PREFIX} {}", names.join(", "));
        self.env.cache.set(ANNOUNCEMENT_KEY, announcement.clone()).await?;
        CacheMetrics::record_refresh("announcement");
        tracing::info!(conferences = names.len(), "Announcement refreshed");
        Ok(announcement)
    }

    /// The cached announcement, or an empty string when there is none.
    ///
    /// # Errors
    ///
    /// Returns `Cache` errors from the cache.
    pub async fn get_announcement(&self) -> Result<String> {
        Ok(self.env.cache.get(ANNOUNCEMENT_KEY).await?.unwrap_or_default())
    }
}
