//! In-memory entity store with optimistic transactions.
//!
//! Every stored entity carries a version drawn from a store-wide counter. A
//! transaction records the version of each key it reads (0 for an absent key)
//! and buffers its writes. Commit takes the store lock, re-checks every
//! recorded version, and either applies all buffered writes or fails with
//! [`StoreError::Contention`].
//!
//! Iteration order is key order, which for sessions and conferences under the
//! same parent is allocation order.

use conference_core::error::StoreError;
use conference_core::key::{EntityKey, EntityKind};
use conference_core::model::Entity;
use conference_core::store::{EntityStore, Query, Transaction};
use futures::future::BoxFuture;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

#[derive(Debug)]
struct Versioned {
    entity: Entity,
    version: u64,
}

#[derive(Debug, Default)]
struct State {
    entities: BTreeMap<EntityKey, Versioned>,
    next_version: u64,
    next_id: u64,
    injected_contention: usize,
    unavailable: bool,
    commits: usize,
    contentions: usize,
}

impl State {
    fn version_of(&self, key: &EntityKey) -> u64 {
        self.entities.get(key).map_or(0, |v| v.version)
    }

    fn write(&mut self, entity: Entity) {
        self.next_version += 1;
        let version = self.next_version;
        self.entities.insert(entity.key(), Versioned { entity, version });
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable {
            Err(StoreError::Unavailable("in-memory store marked unavailable".into()))
        } else {
            Ok(())
        }
    }
}

/// In-memory [`EntityStore`] for fast, deterministic tests.
///
/// Cloning shares the underlying data.
#[derive(Clone, Debug, Default)]
pub struct InMemoryEntityStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryEntityStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` commits fail with [`StoreError::Contention`]
    /// without applying anything.
    pub fn inject_contention(&self, count: usize) {
        self.state.lock().unwrap().injected_contention = count;
    }

    /// Make every operation fail with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().unwrap().unavailable = unavailable;
    }

    /// Number of stored entities of `kind`.
    #[must_use]
    pub fn count(&self, kind: EntityKind) -> usize {
        self.state
            .lock()
            .unwrap()
            .entities
            .keys()
            .filter(|key| key.kind() == kind)
            .count()
    }

    /// Number of successful transaction commits.
    #[must_use]
    pub fn commits(&self) -> usize {
        self.state.lock().unwrap().commits
    }

    /// Number of commits rejected for contention, injected or real.
    #[must_use]
    pub fn contentions(&self) -> usize {
        self.state.lock().unwrap().contentions
    }
}

impl EntityStore for InMemoryEntityStore {
    fn get(&self, key: &EntityKey) -> BoxFuture<'_, Result<Option<Entity>, StoreError>> {
        let result = {
            let state = self.state.lock().unwrap();
            state
                .check_available()
                .map(|()| state.entities.get(key).map(|v| v.entity.clone()))
        };
        Box::pin(async move { result })
    }

    fn get_multi(&self, keys: &[EntityKey]) -> BoxFuture<'_, Result<Vec<Option<Entity>>, StoreError>> {
        let result = {
            let state = self.state.lock().unwrap();
            state.check_available().map(|()| {
                keys.iter()
                    .map(|key| state.entities.get(key).map(|v| v.entity.clone()))
                    .collect()
            })
        };
        Box::pin(async move { result })
    }

    fn put(&self, entity: Entity) -> BoxFuture<'_, Result<(), StoreError>> {
        let result = {
            let mut state = self.state.lock().unwrap();
            state.check_available().map(|()| state.write(entity))
        };
        Box::pin(async move { result })
    }

    fn allocate_id(&self, _parent: &EntityKey, _kind: EntityKind) -> BoxFuture<'_, Result<u64, StoreError>> {
        let result = {
            let mut state = self.state.lock().unwrap();
            state.check_available().map(|()| {
                state.next_id += 1;
                state.next_id
            })
        };
        Box::pin(async move { result })
    }

    fn query(&self, query: &Query) -> BoxFuture<'_, Result<Vec<Entity>, StoreError>> {
        let result = {
            let state = self.state.lock().unwrap();
            state.check_available().map(|()| {
                let mut matches: Vec<Entity> = state
                    .entities
                    .values()
                    .filter(|v| query.matches(&v.entity))
                    .map(|v| v.entity.clone())
                    .collect();
                matches.sort_by(|a, b| query.compare(a, b));
                matches
            })
        };
        Box::pin(async move { result })
    }

    fn begin(&self, group: Vec<EntityKey>) -> BoxFuture<'_, Result<Box<dyn Transaction>, StoreError>> {
        let result = self.state.lock().unwrap().check_available().map(|()| {
            Box::new(InMemoryTransaction {
                state: Arc::clone(&self.state),
                group,
                reads: HashMap::new(),
                writes: BTreeMap::new(),
            }) as Box<dyn Transaction>
        });
        Box::pin(async move { result })
    }
}

struct InMemoryTransaction {
    state: Arc<Mutex<State>>,
    group: Vec<EntityKey>,
    reads: HashMap<EntityKey, u64>,
    writes: BTreeMap<EntityKey, Entity>,
}

impl InMemoryTransaction {
    fn check_scope(&self, key: &EntityKey) -> Result<(), StoreError> {
        if self.group.contains(key) {
            Ok(())
        } else {
            Err(StoreError::OutOfScope { key: key.to_string() })
        }
    }

    fn read(&mut self, key: &EntityKey) -> Result<Option<Entity>, StoreError> {
        self.check_scope(key)?;
        if let Some(entity) = self.writes.get(key) {
            return Ok(Some(entity.clone()));
        }

        let state = self.state.lock().unwrap();
        state.check_available()?;
        let version = state.version_of(key);
        self.reads.entry(key.clone()).or_insert(version);
        Ok(state.entities.get(key).map(|v| v.entity.clone()))
    }
}

impl Transaction for InMemoryTransaction {
    fn get(&mut self, key: &EntityKey) -> BoxFuture<'_, Result<Option<Entity>, StoreError>> {
        let result = self.read(key);
        Box::pin(async move { result })
    }

    fn put(&mut self, entity: Entity) -> Result<(), StoreError> {
        let key = entity.key();
        self.check_scope(&key)?;
        self.writes.insert(key, entity);
        Ok(())
    }

    fn commit(self: Box<Self>) -> BoxFuture<'static, Result<(), StoreError>> {
        let Self {
            state, reads, writes, ..
        } = *self;
        let result = commit_locked(&mut state.lock().unwrap(), &reads, writes);
        Box::pin(async move { result })
    }
}

fn commit_locked(
    state: &mut State,
    reads: &HashMap<EntityKey, u64>,
    writes: BTreeMap<EntityKey, Entity>,
) -> Result<(), StoreError> {
    state.check_available()?;

    if state.injected_contention > 0 {
        state.injected_contention -= 1;
        state.contentions += 1;
        let key = writes.keys().next().map(ToString::to_string).unwrap_or_default();
        return Err(StoreError::Contention { key });
    }

    if let Some((key, _)) = reads.iter().find(|(key, version)| state.version_of(key) != **version) {
        state.contentions += 1;
        return Err(StoreError::Contention { key: key.to_string() });
    }

    for entity in writes.into_values() {
        state.write(entity);
    }
    state.commits += 1;
    Ok(())
}
