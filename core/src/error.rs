//! Error taxonomy for conference operations.
//!
//! Every business failure is terminal for the current operation. Only
//! [`StoreError`] variants reported as transient by [`StoreError::is_transient`]
//! are worth re-running a transaction for; the runtime crate retries those and
//! nothing else.
//!
//! Each error exposes a stable [`code`](ConferenceError::code) and an
//! [`ErrorKind`] so the request layer can map failures 1:1 onto its own status
//! codes. In particular `NO_SEATS_AVAILABLE` and `ALREADY_REGISTERED` are
//! distinct codes under the same [`ErrorKind::Conflict`].

use crate::key::EntityKind;
use thiserror::Error;

/// Coarse classification of a [`ConferenceError`], one per transport status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No caller identity
    Unauthorized,
    /// Malformed or invalid input
    BadRequest,
    /// Referenced entity does not exist
    NotFound,
    /// Caller may not perform this operation
    Forbidden,
    /// Business rule conflict with current state
    Conflict,
    /// Storage or collaborator failure
    Unavailable,
}

/// Reasons an input is rejected as a bad request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field was absent or empty.
    #[error("'{0}' field required")]
    MissingField(&'static str),

    /// A date did not parse as `YYYY-MM-DD`.
    #[error("Invalid date for '{field}': {value}")]
    InvalidDate {
        /// Field name
        field: &'static str,
        /// Rejected input
        value: String,
    },

    /// A time did not parse as `HH:MM`.
    #[error("Invalid time for '{field}': {value}")]
    InvalidTime {
        /// Field name
        field: &'static str,
        /// Rejected input
        value: String,
    },

    /// The conference end date precedes its start date.
    #[error("End date {end} is before start date {start}")]
    EndBeforeStart {
        /// Start date as supplied
        start: String,
        /// End date as supplied
        end: String,
    },

    /// A filter named a field outside the whitelist.
    #[error("Filter contains invalid field: {0}")]
    InvalidFilterField(String),

    /// A filter named an operator outside the whitelist.
    #[error("Filter contains invalid operator: {0}")]
    InvalidFilterOperator(String),

    /// A numeric filter field was given a non-integer value.
    #[error("Filter value for '{field}' must be an integer, got: {value}")]
    InvalidFilterValue {
        /// Field name
        field: &'static str,
        /// Rejected input
        value: String,
    },

    /// Inequality operators were used on more than one field.
    #[error("Inequality filter is allowed on only one field (found '{first}' and '{second}')")]
    MultipleInequalityFields {
        /// Field that first carried an inequality
        first: &'static str,
        /// Second, different field
        second: &'static str,
    },

    /// A session date lies outside its conference's date range.
    #[error("Session date {date} is outside the conference dates {start} to {end}")]
    SessionDateOutOfRange {
        /// Session date
        date: String,
        /// Conference start date
        start: String,
        /// Conference end date
        end: String,
    },

    /// Max attendees lowered below the number of current registrations.
    #[error("Max attendees {requested} is below the {registered} current registrations")]
    MaxAttendeesBelowRegistrations {
        /// Requested max attendees
        requested: u32,
        /// Seats already taken
        registered: u32,
    },

    /// A websafe key did not decode to the expected kind.
    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

impl ValidationError {
    /// Stable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MissingField(_) => "MISSING_FIELD",
            Self::InvalidDate { .. } => "INVALID_DATE",
            Self::InvalidTime { .. } => "INVALID_TIME",
            Self::EndBeforeStart { .. } => "END_BEFORE_START",
            Self::InvalidFilterField(_) => "INVALID_FILTER_FIELD",
            Self::InvalidFilterOperator(_) => "INVALID_FILTER_OPERATOR",
            Self::InvalidFilterValue { .. } => "INVALID_FILTER_VALUE",
            Self::MultipleInequalityFields { .. } => "MULTIPLE_INEQUALITY_FIELDS",
            Self::SessionDateOutOfRange { .. } => "SESSION_DATE_OUT_OF_RANGE",
            Self::MaxAttendeesBelowRegistrations { .. } => "MAX_ATTENDEES_BELOW_REGISTRATIONS",
            Self::InvalidKey(_) => "INVALID_KEY",
        }
    }
}

/// Reasons an operation conflicts with current state.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConflictReason {
    /// Caller is already registered for the conference.
    #[error("You have already registered for this conference")]
    AlreadyRegistered,

    /// The conference has no seats left.
    #[error("There are no seats available")]
    NoSeatsAvailable,

    /// The session is already in the caller's wishlist.
    #[error("Session is already in your wishlist")]
    AlreadyInWishlist,

    /// The session is not in the caller's wishlist.
    #[error("Session is not in your wishlist")]
    NotInWishlist,

    /// Wishlisting requires registration for the session's conference.
    #[error("You must register for the conference before adding its sessions to your wishlist")]
    NotRegisteredForConference,
}

impl ConflictReason {
    /// Stable error code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::AlreadyRegistered => "ALREADY_REGISTERED",
            Self::NoSeatsAvailable => "NO_SEATS_AVAILABLE",
            Self::AlreadyInWishlist => "ALREADY_IN_WISHLIST",
            Self::NotInWishlist => "NOT_IN_WISHLIST",
            Self::NotRegisteredForConference => "NOT_REGISTERED_FOR_CONFERENCE",
        }
    }
}

/// Failures reported by an [`EntityStore`](crate::store::EntityStore).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A concurrent writer changed an entity this transaction read.
    #[error("Transaction contention on {key}")]
    Contention {
        /// Key whose version changed
        key: String,
    },

    /// A transaction touched a key outside the group it declared.
    #[error("Key {key} is outside the transaction group")]
    OutOfScope {
        /// Offending key
        key: String,
    },

    /// The store could not be reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A stored record could not be decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Whether re-running the whole transaction may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Contention { .. } | Self::Unavailable(_))
    }
}

/// Failures reported by a [`Cache`](crate::cache::Cache).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Cache error: {0}")]
pub struct CacheError(pub String);

/// Failures reported by a [`TaskQueue`](crate::task::TaskQueue).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// The queue is not accepting tasks.
    #[error("Task queue closed")]
    Closed,

    /// The queue is at capacity.
    #[error("Task queue full")]
    Full,
}

/// Error returned by every conference operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConferenceError {
    /// No caller identity was supplied.
    #[error("Authorization required")]
    Unauthorized,

    /// Input rejected.
    #[error("Bad request: {0}")]
    BadRequest(#[from] ValidationError),

    /// Referenced entity does not exist.
    #[error("No {kind} found with key: {key}")]
    NotFound {
        /// Kind of the missing entity
        kind: EntityKind,
        /// Key as the caller supplied it
        key: String,
    },

    /// Caller is not allowed to perform the operation.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Operation conflicts with current state.
    #[error("Conflict: {0}")]
    Conflict(#[from] ConflictReason),

    /// Entity store failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Cache failure.
    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl ConferenceError {
    /// Shorthand for [`ConferenceError::NotFound`].
    #[must_use]
    pub fn not_found(kind: EntityKind, key: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            key: key.into(),
        }
    }

    /// Transport-level classification.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthorized => ErrorKind::Unauthorized,
            Self::BadRequest(_) => ErrorKind::BadRequest,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Store(_) | Self::Cache(_) => ErrorKind::Unavailable,
        }
    }

    /// Stable, reason-specific error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized => "UNAUTHORIZED",
            Self::BadRequest(reason) => reason.code(),
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::Conflict(reason) => reason.code(),
            Self::Store(_) => "STORE_UNAVAILABLE",
            Self::Cache(_) => "CACHE_UNAVAILABLE",
        }
    }

    /// Whether a transaction that failed with this error may be re-executed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Store(err) => err.is_transient(),
            _ => false,
        }
    }
}

/// Result alias for conference operations.
pub type Result<T> = std::result::Result<T, ConferenceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_codes_are_distinct() {
        let reasons = [
            ConflictReason::AlreadyRegistered,
            ConflictReason::NoSeatsAvailable,
            ConflictReason::AlreadyInWishlist,
            ConflictReason::NotInWishlist,
            ConflictReason::NotRegisteredForConference,
        ];
        let mut codes: Vec<_> = reasons.iter().map(|r| r.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), reasons.len());
    }

    #[test]
    fn no_seats_and_already_registered_share_kind_but_not_code() {
        let no_seats = ConferenceError::from(ConflictReason::NoSeatsAvailable);
        let registered = ConferenceError::from(ConflictReason::AlreadyRegistered);

        assert_eq!(no_seats.kind(), ErrorKind::Conflict);
        assert_eq!(registered.kind(), ErrorKind::Conflict);
        assert_ne!(no_seats.code(), registered.code());
    }

    #[test]
    fn only_contention_and_unavailable_are_transient() {
        let contention = ConferenceError::from(StoreError::Contention { key: "k".into() });
        let unavailable = ConferenceError::from(StoreError::Unavailable("down".into()));
        let scope = ConferenceError::from(StoreError::OutOfScope { key: "k".into() });

        assert!(contention.is_transient());
        assert!(unavailable.is_transient());
        assert!(!scope.is_transient());
        assert!(!ConferenceError::from(ConflictReason::NoSeatsAvailable).is_transient());
    }

    #[test]
    fn not_found_display() {
        let err = ConferenceError::not_found(EntityKind::Conference, "abc");
        assert_eq!(err.to_string(), "No Conference found with key: abc");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
