//! Conference registration.
//!
//! A registration touches two entities in different ownership scopes: the
//! caller's profile and the conference. Both are read and written in one
//! transaction over `[profile, conference]`, so a reader sees either both
//! changes or neither. Concurrent registrants for the last seat all read
//! `seats_available == 1`; the store accepts the first commit and rejects the
//! others as contended, and their re-run observes zero seats.
//!
//! | state          | register                    | unregister              |
//! |----------------|-----------------------------|-------------------------|
//! | not registered | seats - 1, key appended     | `false`, no change      |
//! | registered     | `Conflict(ALREADY_REGISTERED)` | seats + 1, key removed |

use crate::service::ConferenceService;
use conference_core::error::{ConferenceError, ConflictReason, Result};
use conference_core::key::{ConferenceKey, EntityKey, EntityKind};
use conference_core::model::{CallerIdentity, Conference, Entity, Profile};
use conference_core::store::Transaction;
use conference_runtime::metrics::RegistrationMetrics;
use conference_runtime::run_transaction;
use tracing::instrument;

/// Direction of a registration change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Transition {
    Register,
    Unregister,
}

impl Transition {
    const fn operation(self) -> &'static str {
        match self {
            Self::Register => "register",
            Self::Unregister => "unregister",
        }
    }
}

/// Read both entities of the registration group.
async fn load_pair(
    txn: &mut dyn Transaction,
    identity: &CallerIdentity,
    profile_key: &EntityKey,
    conference_key: &EntityKey,
    websafe_key: &str,
) -> Result<(Profile, Conference)> {
    let conference = txn
        .get(conference_key)
        .await?
        .and_then(Entity::into_conference)
        .ok_or_else(|| ConferenceError::not_found(EntityKind::Conference, websafe_key))?;
    let profile = txn
        .get(profile_key)
        .await?
        .and_then(Entity::into_profile)
        .unwrap_or_else(|| Profile::for_identity(identity));
    Ok((profile, conference))
}

/// Apply `transition` to the pair. Returns whether anything changed.
fn apply(transition: Transition, profile: &mut Profile, conference: &mut Conference) -> Result<bool> {
    let registered = profile.is_registered_for(&conference.key);
    match transition {
        Transition::Register => {
            if registered {
                return Err(ConflictReason::AlreadyRegistered.into());
            }
            if conference.seats_available == 0 {
                return Err(ConflictReason::NoSeatsAvailable.into());
            }
            profile.conference_keys_to_attend.push(conference.key.clone());
            conference.seats_available -= 1;
            Ok(true)
        },
        Transition::Unregister => {
            if !registered {
                return Ok(false);
            }
            profile.conference_keys_to_attend.retain(|key| key != &conference.key);
            conference.seats_available = (conference.seats_available + 1).min(conference.max_attendees);
            Ok(true)
        },
    }
}

impl ConferenceService {
    /// Register the caller for a conference, taking one seat.
    ///
    /// # Errors
    ///
    /// - `BadRequest`: malformed key
    /// - `NotFound`: no such conference
    /// - `Conflict(ALREADY_REGISTERED)`: caller already holds a seat
    /// - `Conflict(NO_SEATS_AVAILABLE)`: conference is full
    /// - `Store`: entity store failure, or contention that outlasted the retry policy
    #[instrument(skip_all, fields(user_id = %identity.user_id, conference = websafe_key))]
    pub async fn register(&self, identity: &CallerIdentity, websafe_key: &str) -> Result<bool> {
        let result = self.transition(identity, websafe_key, Transition::Register).await;
        match &result {
            Ok(_) => RegistrationMetrics::record_registration(),
            Err(ConferenceError::Conflict(reason)) => RegistrationMetrics::record_rejection(reason.code()),
            Err(_) => {},
        }
        result
    }

    /// Release the caller's seat. Returns `false` when the caller was not
    /// registered, which is not an error.
    ///
    /// # Errors
    ///
    /// - `BadRequest`: malformed key
    /// - `NotFound`: no such conference
    /// - `Store`: entity store failure, or contention that outlasted the retry policy
    #[instrument(skip_all, fields(user_id = %identity.user_id, conference = websafe_key))]
    pub async fn unregister(&self, identity: &CallerIdentity, websafe_key: &str) -> Result<bool> {
        let changed = self.transition(identity, websafe_key, Transition::Unregister).await?;
        if changed {
            RegistrationMetrics::record_unregistration();
        }
        Ok(changed)
    }

    async fn transition(&self, identity: &CallerIdentity, websafe_key: &str, transition: Transition) -> Result<bool> {
        let conference_key: EntityKey = ConferenceKey::from_websafe(websafe_key)?.into();
        let profile_key: EntityKey = identity.profile_key().into();
        let store = &self.env.store;
        let (profile_key, conference_key) = (&profile_key, &conference_key);

        let (changed, seats_available) = run_transaction(&self.env.retry, transition.operation(), || async move {
            let mut txn = store.begin(vec![profile_key.clone(), conference_key.clone()]).await?;
            let (mut profile, mut conference) =
                load_pair(txn.as_mut(), identity, profile_key, conference_key, websafe_key).await?;

            if !apply(transition, &mut profile, &mut conference)? {
                return Ok((false, conference.seats_available));
            }

            let seats_available = conference.seats_available;
            txn.put(profile.into())?;
            txn.put(conference.into())?;
            txn.commit().await?;
            Ok((true, seats_available))
        })
        .await?;

        tracing::info!(
            operation = transition.operation(),
            changed,
            seats_available,
            "Registration transition completed"
        );
        Ok(changed)
    }
}
