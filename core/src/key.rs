//! Entity keys and their websafe encoding.
//!
//! Keys form an ownership chain: a [`SessionKey`] names its conference, and a
//! [`ConferenceKey`] names its organizer's profile. The chain is used for
//! ancestor-scoped queries and to describe transaction groups; it does not imply
//! that parent entities embed their children.
//!
//! # Websafe keys
//!
//! External callers reference conferences and sessions through an opaque,
//! URL-safe string. The encoding is URL-safe base64 (no padding) of the key's
//! JSON form:
//!
//! ```
//! use conference_core::key::{ConferenceKey, ProfileKey};
//!
//! let key = ConferenceKey::new(ProfileKey::new("user-1"), 42);
//! let websafe = key.to_websafe();
//! assert_eq!(ConferenceKey::from_websafe(&websafe).unwrap(), key);
//! ```

use crate::error::ValidationError;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of a persisted entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// A user profile
    Profile,
    /// A conference owned by a profile
    Conference,
    /// A session owned by a conference
    Session,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Profile => "Profile",
            Self::Conference => "Conference",
            Self::Session => "Session",
        };
        f.write_str(name)
    }
}

/// Key of a [`Profile`](crate::model::Profile): the caller's user id.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProfileKey(String);

impl ProfileKey {
    /// Create a profile key from a user id.
    #[must_use]
    pub fn new(user_id: impl Into<String>) -> Self {
        Self(user_id.into())
    }

    /// The user id this key wraps.
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProfileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Profile({})", self.0)
    }
}

/// Key of a [`Conference`](crate::model::Conference), owned by its organizer.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConferenceKey {
    /// Organizer profile
    pub organizer: ProfileKey,
    /// Id allocated under the organizer
    pub id: u64,
}

impl ConferenceKey {
    /// Create a conference key.
    #[must_use]
    pub const fn new(organizer: ProfileKey, id: u64) -> Self {
        Self { organizer, id }
    }

    /// Encode as an opaque websafe string.
    #[must_use]
    pub fn to_websafe(&self) -> String {
        encode_websafe(self)
    }

    /// Decode a websafe string produced by [`ConferenceKey::to_websafe`].
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidKey`] if the string is not a conference key.
    pub fn from_websafe(websafe: &str) -> Result<Self, ValidationError> {
        decode_websafe(websafe)
    }
}

impl fmt::Display for ConferenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/Conference({})", self.organizer, self.id)
    }
}

/// Key of a [`Session`](crate::model::Session), owned by its conference.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    /// Owning conference
    pub conference: ConferenceKey,
    /// Id allocated under the conference
    pub id: u64,
}

impl SessionKey {
    /// Create a session key.
    #[must_use]
    pub const fn new(conference: ConferenceKey, id: u64) -> Self {
        Self { conference, id }
    }

    /// Encode as an opaque websafe string.
    #[must_use]
    pub fn to_websafe(&self) -> String {
        encode_websafe(self)
    }

    /// Decode a websafe string produced by [`SessionKey::to_websafe`].
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidKey`] if the string is not a session key.
    pub fn from_websafe(websafe: &str) -> Result<Self, ValidationError> {
        decode_websafe(websafe)
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/Session({})", self.conference, self.id)
    }
}

/// Any entity key.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityKey {
    /// Profile key
    Profile(ProfileKey),
    /// Conference key
    Conference(ConferenceKey),
    /// Session key
    Session(SessionKey),
}

impl EntityKey {
    /// Kind of the entity this key names.
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        match self {
            Self::Profile(_) => EntityKind::Profile,
            Self::Conference(_) => EntityKind::Conference,
            Self::Session(_) => EntityKind::Session,
        }
    }

    /// The owning key, if any.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        match self {
            Self::Profile(_) => None,
            Self::Conference(key) => Some(Self::Profile(key.organizer.clone())),
            Self::Session(key) => Some(Self::Conference(key.conference.clone())),
        }
    }

    /// Whether `ancestor` is this key or appears in its ownership chain.
    #[must_use]
    pub fn has_ancestor(&self, ancestor: &Self) -> bool {
        let mut current = Some(self.clone());
        while let Some(key) = current {
            if &key == ancestor {
                return true;
            }
            current = key.parent();
        }
        false
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Profile(key) => key.fmt(f),
            Self::Conference(key) => key.fmt(f),
            Self::Session(key) => key.fmt(f),
        }
    }
}

impl From<ProfileKey> for EntityKey {
    fn from(key: ProfileKey) -> Self {
        Self::Profile(key)
    }
}

impl From<ConferenceKey> for EntityKey {
    fn from(key: ConferenceKey) -> Self {
        Self::Conference(key)
    }
}

impl From<SessionKey> for EntityKey {
    fn from(key: SessionKey) -> Self {
        Self::Session(key)
    }
}

fn encode_websafe<K: Serialize>(key: &K) -> String {
    // Keys are plain strings and integers; JSON encoding cannot fail for them.
    let json = serde_json::to_vec(key).unwrap_or_default();
    URL_SAFE_NO_PAD.encode(json)
}

fn decode_websafe<K: DeserializeOwned>(websafe: &str) -> Result<K, ValidationError> {
    let invalid = || ValidationError::InvalidKey(websafe.to_string());
    let bytes = URL_SAFE_NO_PAD.decode(websafe).map_err(|_| invalid())?;
    serde_json::from_slice(&bytes).map_err(|_| invalid())
}
