//! Persisted entities and their typed enumerations.

use crate::error::{ConferenceError, Result};
use crate::key::{ConferenceKey, EntityKey, EntityKind, ProfileKey, SessionKey};
use crate::store::{Property, Value};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identity of the authenticated caller, resolved by the request layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerIdentity {
    /// Stable user id
    pub user_id: String,
    /// Display name reported by the identity provider
    pub display_name: String,
    /// Email address
    pub email: String,
}

impl CallerIdentity {
    /// Create an identity.
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        display_name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
            email: email.into(),
        }
    }

    /// Unwrap an optional identity handed over by the auth layer.
    ///
    /// # Errors
    ///
    /// Returns [`ConferenceError::Unauthorized`] when no identity is present.
    pub fn require(identity: Option<Self>) -> Result<Self> {
        identity.ok_or(ConferenceError::Unauthorized)
    }

    /// Key of this caller's profile.
    #[must_use]
    pub fn profile_key(&self) -> ProfileKey {
        ProfileKey::new(self.user_id.clone())
    }
}

macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident { $( $(#[$vmeta:meta])* $variant:ident => $text:literal ),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $text)] $variant ),+
        }

        impl $name {
            /// Canonical string form, identical to the serialized form.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $( Self::$variant => $text ),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                match s {
                    $( $text => Ok(Self::$variant), )+
                    other => Err(format!("unknown {}: {other}", stringify!($name))),
                }
            }
        }
    };
}

string_enum! {
    /// T-shirt size preference of a profile.
    pub enum TeeShirtSize {
        /// Not specified
        #[default]
        NotSpecified => "NOT_SPECIFIED",
        /// Extra small, men's cut
        XsM => "XS_M",
        /// Extra small, women's cut
        XsW => "XS_W",
        /// Small, men's cut
        SM => "S_M",
        /// Small, women's cut
        SW => "S_W",
        /// Medium, men's cut
        MM => "M_M",
        /// Medium, women's cut
        MW => "M_W",
        /// Large, men's cut
        LM => "L_M",
        /// Large, women's cut
        LW => "L_W",
        /// Extra large, men's cut
        XlM => "XL_M",
        /// Extra large, women's cut
        XlW => "XL_W",
        /// 2XL, men's cut
        XxlM => "XXL_M",
        /// 2XL, women's cut
        XxlW => "XXL_W",
        /// 3XL, men's cut
        XxxlM => "XXXL_M",
        /// 3XL, women's cut
        XxxlW => "XXXL_W",
    }
}

string_enum! {
    /// Format of a conference session.
    pub enum SessionType {
        /// Not specified
        #[default]
        NotSpecified => "NOT_SPECIFIED",
        /// Paper presentation
        Paper => "PAPER",
        /// Panel discussion
        Panel => "PANEL",
        /// Poster session
        Poster => "POSTER",
        /// Hands-on workshop
        Workshop => "WORKSHOP",
        /// Lecture
        Lecture => "LECTURE",
        /// Keynote
        Keynote => "KEYNOTE",
    }
}

/// A user profile. Created lazily on first access by its owner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Owner's key
    pub key: ProfileKey,
    /// Display name
    pub display_name: String,
    /// Main email address
    pub main_email: String,
    /// T-shirt size
    pub tee_shirt_size: TeeShirtSize,
    /// Conferences with an active registration, in registration order
    pub conference_keys_to_attend: Vec<ConferenceKey>,
    /// Wishlisted sessions, in insertion order
    pub session_keys_wishlist: Vec<SessionKey>,
}

impl Profile {
    /// A fresh profile for `identity`.
    #[must_use]
    pub fn for_identity(identity: &CallerIdentity) -> Self {
        Self {
            key: identity.profile_key(),
            display_name: identity.display_name.clone(),
            main_email: identity.email.clone(),
            tee_shirt_size: TeeShirtSize::NotSpecified,
            conference_keys_to_attend: Vec::new(),
            session_keys_wishlist: Vec::new(),
        }
    }

    /// Whether the profile holds an active registration for `conference`.
    #[must_use]
    pub fn is_registered_for(&self, conference: &ConferenceKey) -> bool {
        self.conference_keys_to_attend.contains(conference)
    }

    /// Whether `session` is wishlisted.
    #[must_use]
    pub fn has_wishlisted(&self, session: &SessionKey) -> bool {
        self.session_keys_wishlist.contains(session)
    }
}

/// A conference, owned by its organizer's profile.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conference {
    /// Key under the organizer's profile
    pub key: ConferenceKey,
    /// Name (required)
    pub name: String,
    /// Free-form description
    pub description: Option<String>,
    /// Organizer's user id
    pub organizer_user_id: String,
    /// Topics
    pub topics: Vec<String>,
    /// City
    pub city: Option<String>,
    /// First day
    pub start_date: Option<NaiveDate>,
    /// Last day
    pub end_date: Option<NaiveDate>,
    /// Month of the start date (1-12), or 0 without a start date
    pub month: u32,
    /// Capacity
    pub max_attendees: u32,
    /// Remaining seats; never exceeds `max_attendees`
    pub seats_available: u32,
}

impl Conference {
    /// Number of seats currently taken.
    #[must_use]
    pub const fn seats_taken(&self) -> u32 {
        self.max_attendees.saturating_sub(self.seats_available)
    }
}

/// A session, owned by its conference.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Key under the conference
    pub key: SessionKey,
    /// Name (required)
    pub name: String,
    /// Highlights
    pub highlights: Option<String>,
    /// Speaker identifier
    pub speaker: Option<String>,
    /// Session format
    pub session_type: SessionType,
    /// Day of the session
    pub date: Option<NaiveDate>,
    /// Start time
    pub start_time: Option<NaiveTime>,
    /// End time, derived from start time and duration at creation
    pub end_time: Option<NaiveTime>,
}

/// Any persisted entity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Entity {
    /// Profile
    Profile(Profile),
    /// Conference
    Conference(Conference),
    /// Session
    Session(Session),
}

impl Entity {
    /// Key of this entity.
    #[must_use]
    pub fn key(&self) -> EntityKey {
        match self {
            Self::Profile(p) => EntityKey::Profile(p.key.clone()),
            Self::Conference(c) => EntityKey::Conference(c.key.clone()),
            Self::Session(s) => EntityKey::Session(s.key.clone()),
        }
    }

    /// Kind of this entity.
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        match self {
            Self::Profile(_) => EntityKind::Profile,
            Self::Conference(_) => EntityKind::Conference,
            Self::Session(_) => EntityKind::Session,
        }
    }

    /// The profile inside, if this is one.
    #[must_use]
    pub fn into_profile(self) -> Option<Profile> {
        match self {
            Self::Profile(p) => Some(p),
            _ => None,
        }
    }

    /// The conference inside, if this is one.
    #[must_use]
    pub fn into_conference(self) -> Option<Conference> {
        match self {
            Self::Conference(c) => Some(c),
            _ => None,
        }
    }

    /// The session inside, if this is one.
    #[must_use]
    pub fn into_session(self) -> Option<Session> {
        match self {
            Self::Session(s) => Some(s),
            _ => None,
        }
    }

    /// Indexed values of `property`. Repeated properties yield one value per
    /// element; unset or inapplicable properties yield none.
    #[must_use]
    pub fn property_values(&self, property: Property) -> Vec<Value> {
        match (self, property) {
            (Self::Profile(p), Property::Name) => vec![Value::from(p.display_name.as_str())],
            (Self::Conference(c), Property::Name) => vec![Value::from(c.name.as_str())],
            (Self::Conference(c), Property::City) => c.city.iter().map(|s| Value::from(s.as_str())).collect(),
            (Self::Conference(c), Property::Topics) => {
                c.topics.iter().map(|s| Value::from(s.as_str())).collect()
            },
            (Self::Conference(c), Property::Month) => vec![Value::Integer(i64::from(c.month))],
            (Self::Conference(c), Property::MaxAttendees) => {
                vec![Value::Integer(i64::from(c.max_attendees))]
            },
            (Self::Conference(c), Property::SeatsAvailable) => {
                vec![Value::Integer(i64::from(c.seats_available))]
            },
            (Self::Conference(c), Property::StartDate) => {
                c.start_date.iter().map(|d| Value::Text(d.to_string())).collect()
            },
            (Self::Session(s), Property::Name) => vec![Value::from(s.name.as_str())],
            (Self::Session(s), Property::Speaker) => {
                s.speaker.iter().map(|sp| Value::from(sp.as_str())).collect()
            },
            (Self::Session(s), Property::SessionType) => vec![Value::from(s.session_type.as_str())],
            (Self::Session(s), Property::Date) => s.date.iter().map(|d| Value::Text(d.to_string())).collect(),
            (Self::Session(s), Property::StartTime) => s
                .start_time
                .iter()
                .map(|t| Value::Text(t.format("%H:%M").to_string()))
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl From<Profile> for Entity {
    fn from(profile: Profile) -> Self {
        Self::Profile(profile)
    }
}

impl From<Conference> for Entity {
    fn from(conference: Conference) -> Self {
        Self::Conference(conference)
    }
}

impl From<Session> for Entity {
    fn from(session: Session) -> Self {
        Self::Session(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enums_have_one_canonical_string_form() {
        for size in [TeeShirtSize::NotSpecified, TeeShirtSize::XxxlW, TeeShirtSize::MM] {
            let json = serde_json::to_string(&size).unwrap();
            assert_eq!(json, format!("\"{}\"", size.as_str()));
            assert_eq!(size.as_str().parse::<TeeShirtSize>().unwrap(), size);
        }

        assert_eq!(SessionType::Keynote.to_string(), "KEYNOTE");
        assert_eq!("WORKSHOP".parse::<SessionType>().unwrap(), SessionType::Workshop);
        assert!("workshop".parse::<SessionType>().is_err());
        assert_eq!(SessionType::default(), SessionType::NotSpecified);
    }

    #[test]
    fn identity_is_required() {
        assert_eq!(
            CallerIdentity::require(None).unwrap_err(),
            ConferenceError::Unauthorized
        );
        let identity = CallerIdentity::new("u1", "Ada", "ada@example.com");
        assert_eq!(CallerIdentity::require(Some(identity.clone())).unwrap(), identity);
    }

    #[test]
    fn repeated_property_yields_every_element() {
        let conference = Conference {
            key: ConferenceKey::new(ProfileKey::new("u1"), 1),
            name: "RustConf".into(),
            description: None,
            organizer_user_id: "u1".into(),
            topics: vec!["Rust".into(), "Systems".into()],
            city: None,
            start_date: None,
            end_date: None,
            month: 0,
            max_attendees: 10,
            seats_available: 4,
        };
        let entity = Entity::from(conference.clone());

        assert_eq!(entity.property_values(Property::Topics).len(), 2);
        assert!(entity.property_values(Property::City).is_empty());
        assert_eq!(entity.property_values(Property::SeatsAvailable), vec![Value::Integer(4)]);
        assert_eq!(conference.seats_taken(), 6);
    }
}
