//! Conference filter validation and query planning.
//!
//! User-supplied `(field, operator, value)` triples are translated through two
//! closed lookup tables into typed [`PropertyFilter`]s, then assembled into a
//! [`QueryPlan`] that the entity store can execute.
//!
//! # Rules
//!
//! - `field` must be one of `CITY`, `TOPIC`, `MONTH`, `MAX_ATTENDEES`.
//! - `operator` must be one of `EQ`, `GT`, `GTEQ`, `LT`, `LTEQ`, `NE`.
//! - `MONTH` and `MAX_ATTENDEES` values must parse as integers.
//! - At most one field may carry inequality operators. Several inequalities on
//!   that same field are fine (`MONTH GT 3` and `MONTH LT 9`).
//! - Results are ordered by the inequality field first when there is one, then
//!   by conference name.
//!
//! # Example
//!
//! ```
//! use conference_core::filter::{ConferenceFilter, build_query_plan};
//! use conference_core::store::Property;
//!
//! let plan = build_query_plan(&[
//!     ConferenceFilter::new("CITY", "EQ", "London"),
//!     ConferenceFilter::new("MAX_ATTENDEES", "GT", "10"),
//! ])
//! .unwrap();
//!
//! assert_eq!(plan.inequality_property, Some(Property::MaxAttendees));
//! assert_eq!(plan.order.len(), 2);
//! ```

use crate::error::ValidationError;
use crate::key::EntityKind;
use crate::store::{Operator, Property, PropertyFilter, Query, SortOrder, Value};
use serde::{Deserialize, Serialize};

/// Field whitelist: request name → stored property.
const FIELDS: &[(&str, Property)] = &[
    ("CITY", Property::City),
    ("TOPIC", Property::Topics),
    ("MONTH", Property::Month),
    ("MAX_ATTENDEES", Property::MaxAttendees),
];

/// Operator whitelist: request name → store operator.
const OPERATORS: &[(&str, Operator)] = &[
    ("EQ", Operator::Eq),
    ("GT", Operator::Gt),
    ("GTEQ", Operator::GtEq),
    ("LT", Operator::Lt),
    ("LTEQ", Operator::LtEq),
    ("NE", Operator::Ne),
];

/// One raw filter triple as received from a caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConferenceFilter {
    /// Field name, e.g. `CITY`
    pub field: String,
    /// Operator name, e.g. `GTEQ`
    pub operator: String,
    /// Value as text
    pub value: String,
}

impl ConferenceFilter {
    /// Create a filter triple.
    #[must_use]
    pub fn new(field: impl Into<String>, operator: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            operator: operator.into(),
            value: value.into(),
        }
    }
}

/// A validated, executable conference query.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryPlan {
    /// Filters in caller order
    pub filters: Vec<PropertyFilter>,
    /// Sort keys, most significant first
    pub order: Vec<SortOrder>,
    /// The single property carrying inequality operators, if any
    pub inequality_property: Option<Property>,
}

impl QueryPlan {
    /// Store query for this plan.
    #[must_use]
    pub fn to_query(&self) -> Query {
        Query {
            kind: EntityKind::Conference,
            ancestor: None,
            filters: self.filters.clone(),
            order: self.order.clone(),
        }
    }
}

fn lookup<T: Copy>(table: &[(&'static str, T)], name: &str) -> Option<(&'static str, T)> {
    table.iter().find(|(key, _)| *key == name).copied()
}

const fn is_numeric(property: Property) -> bool {
    matches!(property, Property::Month | Property::MaxAttendees)
}

/// Validate one triple.
///
/// # Errors
///
/// Returns [`ValidationError`] for an unknown field or operator, or a
/// non-integer value on a numeric field.
pub fn parse_filter(filter: &ConferenceFilter) -> Result<PropertyFilter, ValidationError> {
    let (field_name, property) = lookup(FIELDS, &filter.field)
        .ok_or_else(|| ValidationError::InvalidFilterField(filter.field.clone()))?;
    let (_, operator) = lookup(OPERATORS, &filter.operator)
        .ok_or_else(|| ValidationError::InvalidFilterOperator(filter.operator.clone()))?;

    let value = if is_numeric(property) {
        let parsed = filter
            .value
            .trim()
            .parse::<i64>()
            .map_err(|_| ValidationError::InvalidFilterValue {
                field: field_name,
                value: filter.value.clone(),
            })?;
        Value::Integer(parsed)
    } else {
        Value::Text(filter.value.clone())
    };

    Ok(PropertyFilter {
        property,
        operator,
        value,
    })
}

/// Validate every triple and assemble the query plan.
///
/// # Errors
///
/// Returns the first [`ValidationError`] encountered, including
/// [`ValidationError::MultipleInequalityFields`] when a second, different field
/// carries an inequality operator.
pub fn build_query_plan(filters: &[ConferenceFilter]) -> Result<QueryPlan, ValidationError> {
    let mut parsed = Vec::with_capacity(filters.len());
    let mut inequality_property: Option<Property> = None;

    for raw in filters {
        let filter = parse_filter(raw)?;
        if filter.operator.is_inequality() {
            match inequality_property {
                Some(existing) if existing != filter.property => {
                    return Err(ValidationError::MultipleInequalityFields {
                        first: existing.name(),
                        second: filter.property.name(),
                    });
                },
                _ => inequality_property = Some(filter.property),
            }
        }
        parsed.push(filter);
    }

    let mut order = Vec::with_capacity(2);
    if let Some(property) = inequality_property {
        order.push(SortOrder::ascending(property));
    }
    order.push(SortOrder::ascending(Property::Name));

    Ok(QueryPlan {
        filters: parsed,
        order,
        inequality_property,
    })
}
