//! Session wishlists.
//!
//! Wishlist changes transact over the caller's profile alone. Registration for
//! the session's conference is checked when a session is added; unregistering
//! later leaves the entry in place, and per-conference listings simply keep
//! returning it.

use crate::service::ConferenceService;
use conference_core::error::{ConflictReason, Result};
use conference_core::key::{ConferenceKey, EntityKey, SessionKey};
use conference_core::model::{CallerIdentity, Entity, Profile, Session};
use conference_runtime::metrics::WishlistMetrics;
use conference_runtime::run_transaction;
use tracing::instrument;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Change {
    Add,
    Remove,
}

fn apply(change: Change, profile: &mut Profile, session: &SessionKey) -> Result<()> {
    match change {
        Change::Add => {
            if !profile.is_registered_for(&session.conference) {
                return Err(ConflictReason::NotRegisteredForConference.into());
            }
            if profile.has_wishlisted(session) {
                return Err(ConflictReason::AlreadyInWishlist.into());
            }
            profile.session_keys_wishlist.push(session.clone());
        },
        Change::Remove => {
            if !profile.has_wishlisted(session) {
                return Err(ConflictReason::NotInWishlist.into());
            }
            profile.session_keys_wishlist.retain(|key| key != session);
        },
    }
    Ok(())
}

impl ConferenceService {
    /// Add a session to the caller's wishlist.
    ///
    /// # Errors
    ///
    /// - `BadRequest`: malformed key
    /// - `NotFound`: no such session
    /// - `Conflict(NOT_REGISTERED_FOR_CONFERENCE)`: caller is not registered
    ///   for the session's conference
    /// - `Conflict(ALREADY_IN_WISHLIST)`: session already wishlisted
    /// - `Store`: entity store failure
    #[instrument(skip_all, fields(user_id = %identity.user_id, session = websafe_key))]
    pub async fn add_to_wishlist(&self, identity: &CallerIdentity, websafe_key: &str) -> Result<()> {
        self.change_wishlist(identity, websafe_key, Change::Add).await?;
        WishlistMetrics::record_addition();
        Ok(())
    }

    /// Remove a session from the caller's wishlist.
    ///
    /// # Errors
    ///
    /// - `BadRequest`: malformed key
    /// - `NotFound`: no such session
    /// - `Conflict(NOT_IN_WISHLIST)`: session is not wishlisted
    /// - `Store`: entity store failure
    #[instrument(skip_all, fields(user_id = %identity.user_id, session = websafe_key))]
    pub async fn remove_from_wishlist(&self, identity: &CallerIdentity, websafe_key: &str) -> Result<()> {
        self.change_wishlist(identity, websafe_key, Change::Remove).await?;
        WishlistMetrics::record_removal();
        Ok(())
    }

    /// Wishlisted sessions belonging to one conference.
    ///
    /// Keys whose session no longer resolves are skipped.
    ///
    /// # Errors
    ///
    /// `BadRequest` for a malformed key, `NotFound` when the conference does
    /// not resolve, `Store` for entity store failures.
    #[instrument(skip_all, fields(user_id = %identity.user_id, conference = conference_key))]
    pub async fn wishlist_for_conference(&self, identity: &CallerIdentity, conference_key: &str) -> Result<Vec<Session>> {
        let conference = self.load_conference(conference_key).await?;
        self.resolve_wishlist(identity, Some(&conference.key)).await
    }

    /// Every wishlisted session, in the order they were added.
    ///
    /// # Errors
    ///
    /// Returns `Store` errors from the entity store.
    #[instrument(skip_all, fields(user_id = %identity.user_id))]
    pub async fn wishlist(&self, identity: &CallerIdentity) -> Result<Vec<Session>> {
        self.resolve_wishlist(identity, None).await
    }

    async fn resolve_wishlist(&self, identity: &CallerIdentity, conference: Option<&ConferenceKey>) -> Result<Vec<Session>> {
        let Some(profile) = self.find_profile(identity).await? else {
            return Ok(Vec::new());
        };

        let keys: Vec<EntityKey> = profile
            .session_keys_wishlist
            .into_iter()
            .filter(|key| conference.is_none_or(|conference| &key.conference == conference))
            .map(EntityKey::from)
            .collect();
        let found = self.env.store.get_multi(&keys).await?;
        Ok(found.into_iter().flatten().filter_map(Entity::into_session).collect())
    }

    async fn change_wishlist(&self, identity: &CallerIdentity, websafe_key: &str, change: Change) -> Result<()> {
        let session = self.load_session(websafe_key).await?.key;
        let profile_key: EntityKey = identity.profile_key().into();
        let store = &self.env.store;
        let (profile_key, session) = (&profile_key, &session);

        let operation = match change {
            Change::Add => "wishlist_add",
            Change::Remove => "wishlist_remove",
        };
        run_transaction(&self.env.retry, operation, || async move {
            let mut txn = store.begin(vec![profile_key.clone()]).await?;
            let mut profile = txn
                .get(profile_key)
                .await?
                .and_then(Entity::into_profile)
                .unwrap_or_else(|| Profile::for_identity(identity));

            apply(change, &mut profile, session)?;

            txn.put(profile.into())?;
            txn.commit().await?;
            Ok(())
        })
        .await?;

        tracing::info!(operation, session = %session, "Wishlist updated");
        Ok(())
    }
}
