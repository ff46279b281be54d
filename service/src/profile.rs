//! Profile lookup and editing.

use crate::forms::{ProfileMiniForm, non_blank};
use crate::service::ConferenceService;
use conference_core::error::Result;
use conference_core::key::EntityKey;
use conference_core::model::{CallerIdentity, Entity, Profile};
use conference_runtime::run_transaction;
use tracing::instrument;

impl ConferenceService {
    /// The caller's profile, created from the identity on first access.
    ///
    /// Creation is a transaction over the profile key, so a registration or
    /// wishlist change committed concurrently forces a re-read instead of
    /// being overwritten by the fresh profile.
    ///
    /// # Errors
    ///
    /// Returns `Store` errors from the entity store.
    #[instrument(skip_all, fields(user_id = %identity.user_id))]
    pub async fn get_profile(&self, identity: &CallerIdentity) -> Result<Profile> {
        if let Some(profile) = self.find_profile(identity).await? {
            return Ok(profile);
        }

        let key: EntityKey = identity.profile_key().into();
        let store = &self.env.store;
        let key = &key;

        let (profile, created) = run_transaction(&self.env.retry, "create_profile", || async move {
            let mut txn = store.begin(vec![key.clone()]).await?;
            if let Some(profile) = txn.get(key).await?.and_then(Entity::into_profile) {
                return Ok((profile, false));
            }

            let profile = Profile::for_identity(identity);
            txn.put(profile.clone().into())?;
            txn.commit().await?;
            Ok((profile, true))
        })
        .await?;

        if created {
            tracing::info!("Profile created");
        }
        Ok(profile)
    }

    /// Update the provided, non-blank profile fields.
    ///
    /// Runs as a transaction over the profile so it cannot overwrite a
    /// concurrent registration or wishlist change.
    ///
    /// # Errors
    ///
    /// Returns `Store` errors from the entity store.
    #[instrument(skip_all, fields(user_id = %identity.user_id))]
    pub async fn save_profile(&self, identity: &CallerIdentity, form: &ProfileMiniForm) -> Result<Profile> {
        let key: EntityKey = identity.profile_key().into();
        let display_name = non_blank(form.display_name.as_deref());
        let store = &self.env.store;
        let key = &key;
        let display_name = &display_name;

        run_transaction(&self.env.retry, "save_profile", || async move {
            let mut txn = store.begin(vec![key.clone()]).await?;
            let mut profile = txn
                .get(key)
                .await?
                .and_then(Entity::into_profile)
                .unwrap_or_else(|| Profile::for_identity(identity));

            if let Some(name) = display_name {
                profile.display_name.clone_from(name);
            }
            if let Some(size) = form.tee_shirt_size {
                profile.tee_shirt_size = size;
            }

            txn.put(profile.clone().into())?;
            txn.commit().await?;
            Ok(profile)
        })
        .await
    }
}
