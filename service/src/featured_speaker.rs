//! Per-conference featured speaker.
//!
//! The featured speaker is whoever gives the most sessions at a conference.
//! Sessions are scanned in store order and a later speaker only takes over
//! with a strictly greater count, so ties go to the speaker encountered first.

use crate::service::ConferenceService;
use conference_core::cache::featured_speaker_key;
use conference_core::error::Result;
use conference_core::key::{ConferenceKey, EntityKey, EntityKind, ProfileKey};
use conference_core::model::{Entity, Session};
use conference_core::store::Query;
use conference_runtime::metrics::CacheMetrics;
use tracing::instrument;

/// Speaker with the most sessions and those sessions' names.
#[derive(Debug, PartialEq, Eq)]
struct Featured<'a> {
    speaker: &'a str,
    sessions: Vec<&'a str>,
}

fn most_frequent_speaker(sessions: &[Session]) -> Option<Featured<'_>> {
    // (speaker, session names) in first-encountered order
    let mut tally: Vec<(&str, Vec<&str>)> = Vec::new();
    for session in sessions {
        let Some(speaker) = session.speaker.as_deref() else {
            continue;
        };
        match tally.iter_mut().find(|(name, _)| *name == speaker) {
            Some((_, names)) => names.push(session.name.as_str()),
            None => tally.push((speaker, vec![session.name.as_str()])),
        }
    }

    let mut best: Option<(&str, Vec<&str>)> = None;
    for (speaker, names) in tally {
        if best.as_ref().is_none_or(|(_, top)| names.len() > top.len()) {
            best = Some((speaker, names));
        }
    }
    best.map(|(speaker, sessions)| Featured { speaker, sessions })
}

impl ConferenceService {
    /// Recompute the featured speaker entry of a conference.
    ///
    /// The speaker identifier is looked up as a profile; its display name is
    /// used when found. Deletes the entry when no session has a speaker.
    /// Returns the message, empty when the entry was cleared.
    ///
    /// # Errors
    ///
    /// Returns `Store` or `Cache` errors from the collaborators.
    #[instrument(skip_all, fields(conference = %conference))]
    pub async fn refresh_featured_speaker(&self, conference: &ConferenceKey) -> Result<String> {
        let query = Query::new(EntityKind::Session).with_ancestor(conference.clone());
        let sessions: Vec<Session> = self
            .env
            .store
            .query(&query)
            .await?
            .into_iter()
            .filter_map(Entity::into_session)
            .collect();
        let cache_key = featured_speaker_key(conference);

        let Some(featured) = most_frequent_speaker(&sessions) else {
            self.env.cache.delete(&cache_key).await?;
            CacheMetrics::record_clear("featured_speaker");
            tracing::debug!("No session has a speaker, featured speaker cleared");
            return Ok(String::new());
        };

        let name = self.speaker_display_name(featured.speaker).await?;
        let message = format!("Featured speaker: {name}. Sessions: {}", featured.sessions.join(", "));
        self.env.cache.set(&cache_key, message.clone()).await?;
        CacheMetrics::record_refresh("featured_speaker");
        tracing::info!(speaker = featured.speaker, sessions = featured.sessions.len(), "Featured speaker refreshed");
        Ok(message)
    }

    /// The cached featured speaker message of a conference, or an empty string.
    ///
    /// # Errors
    ///
    /// `BadRequest` for a malformed key, `Cache` errors from the cache.
    pub async fn get_featured_speaker(&self, conference_key: &str) -> Result<String> {
        let key = ConferenceKey::from_websafe(conference_key)?;
        Ok(self.env.cache.get(&featured_speaker_key(&key)).await?.unwrap_or_default())
    }

    async fn speaker_display_name(&self, speaker: &str) -> Result<String> {
        let key: EntityKey = ProfileKey::new(speaker).into();
        let profile = self.env.store.get(&key).await?.and_then(Entity::into_profile);
        Ok(profile.map_or_else(|| speaker.to_string(), |profile| profile.display_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conference_testing::fixtures;

    fn sessions(speakers: &[Option<&str>]) -> Vec<Session> {
        let conference = fixtures::conference("org", 1, "C", 10).key;
        speakers
            .iter()
            .enumerate()
            .map(|(i, speaker)| fixtures::session(&conference, i as u64 + 2, &format!("S{i}"), *speaker))
            .collect()
    }

    #[test]
    fn strictly_greatest_count_wins() {
        let sessions = sessions(&[Some("b"), Some("a"), Some("a"), None, Some("b"), Some("a")]);
        let featured = most_frequent_speaker(&sessions).unwrap();
        assert_eq!(featured.speaker, "a");
        assert_eq!(featured.sessions, vec!["S1", "S2", "S5"]);
    }

    #[test]
    fn ties_go_to_first_encountered() {
        let sessions = sessions(&[Some("b"), Some("a"), Some("a"), Some("b")]);
        assert_eq!(most_frequent_speaker(&sessions).unwrap().speaker, "b");
    }

    #[test]
    fn no_speakers_means_no_feature() {
        assert_eq!(most_frequent_speaker(&sessions(&[None, None])), None);
        assert_eq!(most_frequent_speaker(&[]), None);
    }
}
