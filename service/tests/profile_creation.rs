//! First profile access racing a registration commit.

#![allow(clippy::unwrap_used)]

use conference_core::error::StoreError;
use conference_core::key::{EntityKey, EntityKind};
use conference_core::model::Entity;
use conference_core::store::{EntityStore, Query, Transaction};
use conference_runtime::RetryPolicy;
use conference_service::forms::ConferenceForm;
use conference_service::{ConferenceEnvironment, ConferenceService};
use conference_testing::{InMemoryCache, InMemoryEntityStore, RecordingTaskQueue, fixtures};
use futures::FutureExt;
use futures::future::BoxFuture;
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Hook = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

/// Runs a one-shot hook right before the next write reaches the inner store,
/// whether that write is a plain put or a transaction commit.
#[derive(Clone, Default)]
struct InterleavingStore {
    inner: InMemoryEntityStore,
    hook: Arc<Mutex<Option<Hook>>>,
}

impl InterleavingStore {
    fn before_next_write(&self, hook: Hook) {
        *self.hook.lock().unwrap() = Some(hook);
    }

    fn hook_fired(&self) -> bool {
        self.hook.lock().unwrap().is_none()
    }

    fn take_hook(&self) -> Option<Hook> {
        self.hook.lock().unwrap().take()
    }
}

impl EntityStore for InterleavingStore {
    fn get(&self, key: &EntityKey) -> BoxFuture<'_, Result<Option<Entity>, StoreError>> {
        self.inner.get(key)
    }

    fn get_multi(&self, keys: &[EntityKey]) -> BoxFuture<'_, Result<Vec<Option<Entity>>, StoreError>> {
        self.inner.get_multi(keys)
    }

    fn put(&self, entity: Entity) -> BoxFuture<'_, Result<(), StoreError>> {
        let hook = self.take_hook();
        Box::pin(async move {
            if let Some(hook) = hook {
                hook().await;
            }
            self.inner.put(entity).await
        })
    }

    fn allocate_id(&self, parent: &EntityKey, kind: EntityKind) -> BoxFuture<'_, Result<u64, StoreError>> {
        self.inner.allocate_id(parent, kind)
    }

    fn query(&self, query: &Query) -> BoxFuture<'_, Result<Vec<Entity>, StoreError>> {
        self.inner.query(query)
    }

    fn begin(&self, group: Vec<EntityKey>) -> BoxFuture<'_, Result<Box<dyn Transaction>, StoreError>> {
        Box::pin(async move {
            let inner = self.inner.begin(group).await?;
            Ok(Box::new(InterleavingTransaction {
                inner,
                hook: Arc::clone(&self.hook),
            }) as Box<dyn Transaction>)
        })
    }
}

struct InterleavingTransaction {
    inner: Box<dyn Transaction>,
    hook: Arc<Mutex<Option<Hook>>>,
}

impl Transaction for InterleavingTransaction {
    fn get(&mut self, key: &EntityKey) -> BoxFuture<'_, Result<Option<Entity>, StoreError>> {
        self.inner.get(key)
    }

    fn put(&mut self, entity: Entity) -> Result<(), StoreError> {
        self.inner.put(entity)
    }

    fn commit(self: Box<Self>) -> BoxFuture<'static, Result<(), StoreError>> {
        let Self { inner, hook } = *self;
        let hook = hook.lock().unwrap().take();
        Box::pin(async move {
            if let Some(hook) = hook {
                hook().await;
            }
            inner.commit().await
        })
    }
}

fn service_over(store: Arc<dyn EntityStore>, cache: &InMemoryCache, tasks: &RecordingTaskQueue) -> ConferenceService {
    let env = ConferenceEnvironment::new(store, Arc::new(cache.clone()), Arc::new(tasks.clone())).with_retry_policy(
        RetryPolicy::builder()
            .max_retries(5)
            .initial_delay(Duration::from_millis(1))
            .max_delay(Duration::from_millis(5))
            .build(),
    );
    ConferenceService::new(env)
}

#[tokio::test]
async fn registration_committed_during_profile_creation_is_kept() {
    let store = InterleavingStore::default();
    let cache = InMemoryCache::new();
    let tasks = RecordingTaskQueue::new();
    let direct = service_over(Arc::new(store.inner.clone()), &cache, &tasks);
    let interleaved = service_over(Arc::new(store.clone()), &cache, &tasks);

    let conference = direct
        .create_conference(
            &fixtures::identity("organizer"),
            &ConferenceForm {
                name: Some("RustConf".into()),
                max_attendees: Some(3),
                ..ConferenceForm::default()
            },
        )
        .await
        .unwrap();
    let websafe = conference.key.to_websafe();
    let ada = fixtures::identity("ada");

    // Ada registers from another request after her profile was found missing
    // but before the fresh profile is written.
    {
        let direct = direct.clone();
        let ada = ada.clone();
        let websafe = websafe.clone();
        store.before_next_write(Box::new(move || {
            async move { assert!(direct.register(&ada, &websafe).await.unwrap()) }.boxed()
        }));
    }

    let profile = interleaved.get_profile(&ada).await.unwrap();
    assert!(store.hook_fired());
    assert_eq!(profile.conference_keys_to_attend, vec![conference.key.clone()]);

    let stored = direct.get_conference(&websafe).await.unwrap();
    let registrations = u32::try_from(profile.conference_keys_to_attend.len()).unwrap();
    assert_eq!(stored.seats_available + registrations, 3);

    assert!(direct.unregister(&ada, &websafe).await.unwrap());
    assert_eq!(direct.get_conference(&websafe).await.unwrap().seats_available, 3);
    assert!(direct.get_profile(&ada).await.unwrap().conference_keys_to_attend.is_empty());
}
