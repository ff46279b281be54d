//! Request payloads and their field parsing.
//!
//! Forms carry optional, caller-supplied text. Dates are read from their first
//! ten characters as `YYYY-MM-DD` and times from their first five as `HH:MM`,
//! so full timestamps such as `2026-05-01T09:00:00Z` are accepted for dates.

use conference_core::error::ValidationError;
use conference_core::model::{SessionType, TeeShirtSize};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Default city of a conference created without one.
pub const DEFAULT_CITY: &str = "Default City";

/// Default topics of a conference created without any.
pub const DEFAULT_TOPICS: [&str; 2] = ["Default", "Topic"];

/// Fields of a conference to create or update.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConferenceForm {
    /// Name, required on create
    pub name: Option<String>,
    /// Description
    pub description: Option<String>,
    /// Topics
    pub topics: Option<Vec<String>>,
    /// City
    pub city: Option<String>,
    /// Start date, `YYYY-MM-DD`
    pub start_date: Option<String>,
    /// End date, `YYYY-MM-DD`
    pub end_date: Option<String>,
    /// Capacity
    pub max_attendees: Option<u32>,
}

/// User-editable profile fields.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileMiniForm {
    /// New display name
    pub display_name: Option<String>,
    /// New t-shirt size
    pub tee_shirt_size: Option<TeeShirtSize>,
}

/// Fields of a session to create.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionForm {
    /// Name (required)
    pub name: Option<String>,
    /// Highlights
    pub highlights: Option<String>,
    /// Speaker identifier
    pub speaker: Option<String>,
    /// Length in minutes; used to derive the end time and then discarded
    pub duration: Option<u32>,
    /// Session format
    #[serde(rename = "typeOfSession")]
    pub session_type: Option<SessionType>,
    /// Day, `YYYY-MM-DD`
    pub date: Option<String>,
    /// Start time, `HH:MM`
    pub start_time: Option<String>,
}

/// `Some(trimmed)` for a non-blank value.
pub(crate) fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

/// The required, non-blank `field`.
pub(crate) fn required(field: &'static str, value: Option<&str>) -> Result<String, ValidationError> {
    non_blank(value).ok_or(ValidationError::MissingField(field))
}

fn prefix(value: &str, len: usize) -> &str {
    value.get(..len).unwrap_or(value)
}

/// Parse an optional date; blank values are treated as absent.
pub(crate) fn parse_date(field: &'static str, value: Option<&str>) -> Result<Option<NaiveDate>, ValidationError> {
    non_blank(value)
        .map(|raw| {
            NaiveDate::parse_from_str(prefix(&raw, 10), "%Y-%m-%d")
                .map_err(|_| ValidationError::InvalidDate { field, value: raw.clone() })
        })
        .transpose()
}

/// Parse an optional time; blank values are treated as absent.
pub(crate) fn parse_time(field: &'static str, value: Option<&str>) -> Result<Option<NaiveTime>, ValidationError> {
    non_blank(value)
        .map(|raw| {
            NaiveTime::parse_from_str(prefix(&raw, 5), "%H:%M")
                .map_err(|_| ValidationError::InvalidTime { field, value: raw.clone() })
        })
        .transpose()
}

/// Reject an end date before the start date.
pub(crate) fn check_date_order(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<(), ValidationError> {
    match (start, end) {
        (Some(start), Some(end)) if end < start => Err(ValidationError::EndBeforeStart {
            start: start.to_string(),
            end: end.to_string(),
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dates_use_first_ten_characters() {
        let parsed = parse_date("startDate", Some("2026-05-01T09:30:00Z")).unwrap();
        assert_eq!(parsed, NaiveDate::from_ymd_opt(2026, 5, 1));

        assert_eq!(parse_date("startDate", None).unwrap(), None);
        assert_eq!(parse_date("startDate", Some("  ")).unwrap(), None);
        assert_eq!(
            parse_date("startDate", Some("01/05/2026")).unwrap_err().code(),
            "INVALID_DATE"
        );
    }

    #[test]
    fn times_use_hours_and_minutes() {
        let parsed = parse_time("startTime", Some("14:45:59")).unwrap();
        assert_eq!(parsed, NaiveTime::from_hms_opt(14, 45, 0));
        assert!(parse_time("startTime", Some("2pm")).is_err());
    }

    #[test]
    fn required_rejects_blank() {
        assert_eq!(required("name", Some("  ")), Err(ValidationError::MissingField("name")));
        assert_eq!(required("name", Some(" RustConf ")), Ok("RustConf".to_string()));
    }

    #[test]
    fn end_before_start_is_rejected() {
        let start = NaiveDate::from_ymd_opt(2026, 5, 3);
        let end = NaiveDate::from_ymd_opt(2026, 5, 1);
        assert!(check_date_order(start, end).is_err());
        assert!(check_date_order(end, start).is_ok());
        assert!(check_date_order(start, None).is_ok());
    }

    #[test]
    fn session_form_uses_wire_names() {
        let form: SessionForm = serde_json::from_str(
            r#"{"name":"Intro","typeOfSession":"WORKSHOP","startTime":"10:00","duration":45}"#,
        )
        .unwrap();
        assert_eq!(form.session_type, Some(SessionType::Workshop));
        assert_eq!(form.duration, Some(45));
    }
}
