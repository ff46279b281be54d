//! Entity store contract and query model.
//!
//! The store is an external collaborator. This module only fixes what the
//! conference operations need from it:
//!
//! - point reads and writes ([`EntityStore::get`], [`EntityStore::put`])
//! - id allocation under a parent key ([`EntityStore::allocate_id`])
//! - filtered, ordered queries, optionally scoped to an ancestor ([`EntityStore::query`])
//! - atomic read-modify-write across a declared group of keys
//!   ([`EntityStore::begin`] / [`Transaction`])
//!
//! # Transactions
//!
//! A transaction is opened over an explicit group of keys, which may belong to
//! different ownership scopes (a profile and someone else's conference). Reads
//! inside the transaction are tracked; writes are buffered until
//! [`Transaction::commit`]. Commit applies every write or none of them and fails
//! with [`StoreError::Contention`] if any entity read by the transaction was
//! changed by another writer in the meantime. Callers re-run the whole
//! transaction body on contention, so bodies must not have side effects before
//! commit.
//!
//! # Dyn Compatibility
//!
//! Methods return boxed futures so the traits can be used as
//! `Arc<dyn EntityStore>`.

use crate::error::StoreError;
use crate::key::{EntityKey, EntityKind};
use crate::model::Entity;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Indexed entity properties that queries may filter or sort on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Property {
    /// Conference or session name, profile display name
    Name,
    /// Conference city
    City,
    /// Conference topics (repeated)
    Topics,
    /// Conference start month
    Month,
    /// Conference capacity
    MaxAttendees,
    /// Conference remaining seats
    SeatsAvailable,
    /// Conference start date
    StartDate,
    /// Session speaker
    Speaker,
    /// Session type
    SessionType,
    /// Session date
    Date,
    /// Session start time
    StartTime,
}

impl Property {
    /// Stored property name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::City => "city",
            Self::Topics => "topics",
            Self::Month => "month",
            Self::MaxAttendees => "maxAttendees",
            Self::SeatsAvailable => "seatsAvailable",
            Self::StartDate => "startDate",
            Self::Speaker => "speaker",
            Self::SessionType => "typeOfSession",
            Self::Date => "date",
            Self::StartTime => "startTime",
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Comparison operators understood by the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    /// `=`
    Eq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `!=`
    Ne,
}

impl Operator {
    /// Symbolic form.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Ne => "!=",
        }
    }

    /// Every operator except equality is an inequality.
    #[must_use]
    pub const fn is_inequality(self) -> bool {
        !matches!(self, Self::Eq)
    }

    /// Whether `ordering` (stored value compared to the filter value) satisfies this operator.
    #[must_use]
    pub const fn accepts(self, ordering: Ordering) -> bool {
        match self {
            Self::Eq => matches!(ordering, Ordering::Equal),
            Self::Gt => matches!(ordering, Ordering::Greater),
            Self::GtEq => !matches!(ordering, Ordering::Less),
            Self::Lt => matches!(ordering, Ordering::Less),
            Self::LtEq => !matches!(ordering, Ordering::Greater),
            Self::Ne => !matches!(ordering, Ordering::Equal),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A typed property value.
///
/// Integers order before text, mirroring how document stores order mixed types.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Value {
    /// Integer value
    Integer(i64),
    /// Text value
    Text(String),
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(i) => write!(f, "{i}"),
            Self::Text(s) => write!(f, "{s:?}"),
        }
    }
}

/// A single `property op value` predicate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyFilter {
    /// Filtered property
    pub property: Property,
    /// Comparison
    pub operator: Operator,
    /// Right-hand side
    pub value: Value,
}

impl PropertyFilter {
    /// Create a filter.
    #[must_use]
    pub fn new(property: Property, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            property,
            operator,
            value: value.into(),
        }
    }

    /// Whether `entity` satisfies this filter.
    ///
    /// Repeated properties match when any element does; entities without the
    /// property never match.
    #[must_use]
    pub fn matches(&self, entity: &Entity) -> bool {
        entity
            .property_values(self.property)
            .iter()
            .any(|stored| self.operator.accepts(stored.cmp(&self.value)))
    }
}

impl fmt::Display for PropertyFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.property, self.operator, self.value)
    }
}

/// Sort direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Smallest first
    Ascending,
    /// Largest first
    Descending,
}

/// One sort key of a query.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOrder {
    /// Sorted property
    pub property: Property,
    /// Direction
    pub direction: Direction,
}

impl SortOrder {
    /// Ascending order on `property`.
    #[must_use]
    pub const fn ascending(property: Property) -> Self {
        Self {
            property,
            direction: Direction::Ascending,
        }
    }
}

/// A query over one entity kind: conjunctive filters plus sort keys.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    /// Kind to return
    pub kind: EntityKind,
    /// Restrict results to entities owned (transitively) by this key
    pub ancestor: Option<EntityKey>,
    /// Conjunctive filters
    pub filters: Vec<PropertyFilter>,
    /// Sort keys, most significant first
    pub order: Vec<SortOrder>,
}

impl Query {
    /// An unfiltered query over `kind`.
    #[must_use]
    pub const fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            ancestor: None,
            filters: Vec::new(),
            order: Vec::new(),
        }
    }

    /// Restrict to descendants of `ancestor`.
    #[must_use]
    pub fn with_ancestor(mut self, ancestor: impl Into<EntityKey>) -> Self {
        self.ancestor = Some(ancestor.into());
        self
    }

    /// Add a filter.
    #[must_use]
    pub fn filter(mut self, filter: PropertyFilter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Add a sort key.
    #[must_use]
    pub fn order_by(mut self, order: SortOrder) -> Self {
        self.order.push(order);
        self
    }

    /// Whether `entity` belongs in the result set.
    ///
    /// Store implementations may evaluate queries natively; this is the
    /// reference semantics they must agree with.
    #[must_use]
    pub fn matches(&self, entity: &Entity) -> bool {
        entity.kind() == self.kind
            && self
                .ancestor
                .as_ref()
                .is_none_or(|ancestor| entity.key().has_ancestor(ancestor))
            && self.filters.iter().all(|f| f.matches(entity))
    }

    /// Result ordering between two matching entities.
    ///
    /// Each sort key compares the smallest value of the property; entities
    /// missing the property sort first. Ties fall through to the next key and
    /// finally to `Equal`, leaving store order intact under a stable sort.
    #[must_use]
    pub fn compare(&self, a: &Entity, b: &Entity) -> Ordering {
        for order in &self.order {
            let left = a.property_values(order.property).into_iter().min();
            let right = b.property_values(order.property).into_iter().min();
            let ordering = match order.direction {
                Direction::Ascending => left.cmp(&right),
                Direction::Descending => right.cmp(&left),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

/// A read-modify-write unit over a fixed group of keys.
pub trait Transaction: Send {
    /// Read an entity, recording its version for the commit-time check.
    ///
    /// Reads see this transaction's own buffered writes.
    ///
    /// # Errors
    ///
    /// - `OutOfScope`: key is not in the transaction group
    /// - `Unavailable`: store unreachable
    fn get(&mut self, key: &EntityKey) -> BoxFuture<'_, Result<Option<Entity>, StoreError>>;

    /// Buffer a write, applied on commit.
    ///
    /// # Errors
    ///
    /// Returns `OutOfScope` if the entity's key is not in the transaction group.
    fn put(&mut self, entity: Entity) -> Result<(), StoreError>;

    /// Atomically apply every buffered write.
    ///
    /// # Errors
    ///
    /// - `Contention`: an entity read by this transaction changed since it was read
    /// - `Unavailable`: store unreachable; nothing was applied
    fn commit(self: Box<Self>) -> BoxFuture<'static, Result<(), StoreError>>;
}

/// The persistent entity store.
pub trait EntityStore: Send + Sync {
    /// Read one entity.
    ///
    /// # Errors
    ///
    /// Returns `Unavailable` if the store cannot be reached.
    fn get(&self, key: &EntityKey) -> BoxFuture<'_, Result<Option<Entity>, StoreError>>;

    /// Read several entities; the result is positionally aligned with `keys`.
    ///
    /// # Errors
    ///
    /// Returns `Unavailable` if the store cannot be reached.
    fn get_multi(&self, keys: &[EntityKey]) -> BoxFuture<'_, Result<Vec<Option<Entity>>, StoreError>>;

    /// Insert or overwrite one entity outside any transaction.
    ///
    /// # Errors
    ///
    /// Returns `Unavailable` if the store cannot be reached.
    fn put(&self, entity: Entity) -> BoxFuture<'_, Result<(), StoreError>>;

    /// Allocate a fresh id for a `kind` entity under `parent`.
    ///
    /// # Errors
    ///
    /// Returns `Unavailable` if the store cannot be reached.
    fn allocate_id(&self, parent: &EntityKey, kind: EntityKind) -> BoxFuture<'_, Result<u64, StoreError>>;

    /// Run a query. Results follow [`Query::matches`] and [`Query::compare`];
    /// ties keep store order, which is stable across reads without writes.
    ///
    /// # Errors
    ///
    /// Returns `Unavailable` if the store cannot be reached.
    fn query(&self, query: &Query) -> BoxFuture<'_, Result<Vec<Entity>, StoreError>>;

    /// Open a transaction over `group`.
    ///
    /// # Errors
    ///
    /// Returns `Unavailable` if the store cannot be reached.
    fn begin(&self, group: Vec<EntityKey>) -> BoxFuture<'_, Result<Box<dyn Transaction>, StoreError>>;
}
