//! Behavioral tests for hydrated resources: hydration, optimistic updates,
//! rollback, coalesced saves, and the shared cache.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Notify;
use wellsync_queue::{EnqueueOptions, QueueError, TaskQueue};
use wellsync_resource::{HydratedResource, QueryCache, ResourceError, ResourceOptions, SyncContext};
use wellsync_storage::{MemoryStorage, Result, Storage, StorageError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Prefs {
    theme: String,
    count: u32,
}

fn light() -> Prefs {
    Prefs {
        theme: "light".into(),
        count: 0,
    }
}

fn dark() -> Prefs {
    Prefs {
        theme: "dark".into(),
        count: 0,
    }
}

/// Memory storage with switchable failures and a record of every call
#[derive(Default)]
struct ScriptedStorage {
    inner: MemoryStorage,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    /// Fail writes whose raw value contains this text
    fail_matching: Mutex<Option<String>>,
    /// Reads wait for a permit on this before answering
    read_gate: Mutex<Option<Arc<Notify>>>,
    reads: AtomicUsize,
    writes: Mutex<Vec<String>>,
}

impl ScriptedStorage {
    fn offline() -> StorageError {
        StorageError::io_no_path(std::io::Error::other("offline"), "request")
    }

    fn writes(&self) -> Vec<String> {
        self.writes.lock().clone()
    }
}

#[async_trait]
impl Storage for ScriptedStorage {
    fn backend_name(&self) -> &'static str {
        "scripted"
    }

    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let gate = self.read_gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Self::offline());
        }
        self.inner.get_item(key).await
    }

    async fn set_item(&self, key: &str, value: String) -> Result<()> {
        self.writes.lock().push(value.clone());
        let matches = self
            .fail_matching
            .lock()
            .as_ref()
            .is_some_and(|needle| value.contains(needle.as_str()));
        if self.fail_writes.load(Ordering::SeqCst) || matches {
            return Err(Self::offline());
        }
        self.inner.set_item(key, value).await
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        self.inner.remove_item(key).await
    }
}

fn context(storage: &Arc<ScriptedStorage>) -> SyncContext {
    let storage: Arc<dyn Storage> = storage.clone();
    SyncContext::new(storage, TaskQueue::default())
}

async fn open(storage: &Arc<ScriptedStorage>) -> HydratedResource<Prefs> {
    HydratedResource::open(context(storage), "prefs", light(), ResourceOptions::default()).await
}

// =============================================================================
// Hydration
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_load_failure_keeps_fallback() {
    let storage = Arc::new(ScriptedStorage::default());
    storage.fail_reads.store(true, Ordering::SeqCst);

    let prefs = open(&storage).await;

    let status = prefs.status();
    assert!(status.is_hydrated);
    assert!(!status.is_loading);
    assert!(matches!(status.load_error, Some(ResourceError::Load { .. })));
    assert_eq!(prefs.data(), light());
    // One retry, as configured by default
    assert_eq!(storage.reads.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_hydrates_stored_value() {
    let storage = Arc::new(ScriptedStorage::default());
    storage
        .inner
        .set_item("prefs", r#"{"theme":"dark","count":7}"#.to_string())
        .await
        .unwrap();

    let prefs = HydratedResource::new(context(&storage), "prefs", light(), ResourceOptions::default());
    assert!(!prefs.status().is_hydrated);
    assert_eq!(prefs.data(), light());

    prefs.initialize().await;
    prefs.initialize().await;

    assert_eq!(
        prefs.data(),
        Prefs {
            theme: "dark".into(),
            count: 7
        }
    );
    assert!(prefs.status().is_hydrated);
    assert!(prefs.status().load_error.is_none());
    assert_eq!(storage.reads.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_shared_cache_skips_second_read() {
    let storage = Arc::new(ScriptedStorage::default());
    let cache = Arc::new(QueryCache::new());
    let ctx = context(&storage).with_cache(Arc::clone(&cache));

    let first = HydratedResource::open(ctx.clone(), "prefs", light(), ResourceOptions::default()).await;
    first.replace(dark()).await;
    assert_eq!(cache.get::<Prefs>("prefs"), Some(dark()));

    let second = HydratedResource::open(ctx, "prefs", light(), ResourceOptions::default()).await;
    assert_eq!(second.data(), dark());
    assert_eq!(storage.reads.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_query_key_defaults_to_storage_key() {
    let storage = Arc::new(ScriptedStorage::default());

    let plain = HydratedResource::new(context(&storage), "prefs", light(), ResourceOptions::default());
    assert_eq!(plain.key(), "prefs");
    assert_eq!(plain.query_key(), "prefs");
    assert_eq!(plain.persist_key(), "persist:prefs");

    let custom = HydratedResource::new(
        context(&storage),
        "prefs",
        light(),
        ResourceOptions::default().query_key("prefs-v2"),
    );
    assert_eq!(custom.query_key(), "prefs-v2");
}

#[tokio::test(start_paused = true)]
async fn test_loading_only_while_first_read_pending() {
    let storage = Arc::new(ScriptedStorage::default());
    let gate = Arc::new(Notify::new());
    *storage.read_gate.lock() = Some(Arc::clone(&gate));

    let prefs = HydratedResource::new(context(&storage), "prefs", light(), ResourceOptions::default());
    let status = prefs.status();
    assert!(!status.is_loading);
    assert!(!status.is_hydrated);

    let hydrating = {
        let prefs = prefs.clone();
        tokio::spawn(async move { prefs.initialize().await })
    };
    while storage.reads.load(Ordering::SeqCst) == 0 {
        tokio::task::yield_now().await;
    }

    let status = prefs.status();
    assert!(status.is_loading);
    assert!(!status.is_hydrated);

    gate.notify_one();
    hydrating.await.unwrap();

    let status = prefs.status();
    assert!(!status.is_loading);
    assert!(status.is_hydrated);

    // Refreshing later does not count as the first load
    gate.notify_one();
    let mut updates = prefs.subscribe();
    prefs.refresh().await.unwrap();
    assert!(!updates.borrow_and_update().status.is_loading);
}

#[tokio::test(start_paused = true)]
async fn test_cache_hit_finishes_loading() {
    let storage = Arc::new(ScriptedStorage::default());
    let cache = Arc::new(QueryCache::new());
    cache.set("prefs".to_string(), dark());
    let ctx = context(&storage).with_cache(cache);

    let prefs = HydratedResource::new(ctx, "prefs", light(), ResourceOptions::default());
    let mut updates = prefs.subscribe();
    prefs.initialize().await;

    let snapshot = updates.borrow_and_update().clone();
    assert_eq!(snapshot.data, dark());
    assert!(!snapshot.status.is_loading);
    assert!(snapshot.status.is_hydrated);
    assert_eq!(storage.reads.load(Ordering::SeqCst), 0);
}

// =============================================================================
// Changes
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_change_is_visible_before_save() {
    let storage = Arc::new(ScriptedStorage::default());
    let prefs = open(&storage).await;

    let pending = prefs.set_data(|p| Prefs {
        count: p.count + 1,
        ..p.clone()
    });

    assert_eq!(prefs.data().count, 1);
    assert!(prefs.status().is_saving);
    assert!(storage.writes().is_empty());

    assert_eq!(pending.await.count, 1);
    assert!(!prefs.status().is_saving);
    assert!(prefs.status().save_error.is_none());
    assert_eq!(storage.writes(), vec![r#"{"theme":"light","count":1}"#.to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_failed_save_rolls_back() {
    let storage = Arc::new(ScriptedStorage::default());
    storage.fail_writes.store(true, Ordering::SeqCst);
    let prefs = open(&storage).await;

    let pending = prefs.replace(dark());
    assert_eq!(prefs.data(), dark());

    // Resolves with the attempted value even though it was not stored
    assert_eq!(pending.await, dark());

    assert_eq!(prefs.data(), light());
    let status = prefs.status();
    assert!(!status.is_saving);
    match status.save_error {
        Some(ResourceError::Save { source, .. }) => {
            assert!(matches!(*source, QueueError::Failed { attempts: 3, .. }));
        }
        other => panic!("expected save error, got {other:?}"),
    }
    assert_eq!(storage.writes().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_rapid_changes_save_once() {
    let storage = Arc::new(ScriptedStorage::default());
    let prefs = open(&storage).await;

    let pending: Vec<_> = (0..5)
        .map(|_| {
            prefs.set_data(|p| Prefs {
                count: p.count + 1,
                ..p.clone()
            })
        })
        .collect();
    assert_eq!(prefs.data().count, 5);

    for save in pending {
        save.await;
    }

    assert_eq!(storage.writes(), vec![r#"{"theme":"light","count":5}"#.to_string()]);
    assert_eq!(prefs.data().count, 5);
    assert!(prefs.status().save_error.is_none());
    assert!(!prefs.status().is_saving);
}

#[tokio::test(start_paused = true)]
async fn test_older_failure_keeps_newer_change() {
    let storage = Arc::new(ScriptedStorage::default());
    *storage.fail_matching.lock() = Some(r#""count":1"#.to_string());
    let prefs = HydratedResource::open(
        context(&storage),
        "prefs",
        light(),
        ResourceOptions::default().persist(EnqueueOptions::immediate()),
    )
    .await;

    let first = prefs.set_data(|p| Prefs { count: 1, ..p.clone() });
    // Let the first save start so the second queues behind it
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    let second = prefs.set_data(|p| Prefs { count: 2, ..p.clone() });

    // The older failure does not roll back the newer change
    first.await;
    assert_eq!(prefs.data().count, 2);

    second.await;
    assert_eq!(prefs.data().count, 2);
    // The newest change is stored, so the older failure no longer applies
    assert!(prefs.status().save_error.is_none());
    assert!(!prefs.status().is_saving);
    assert_eq!(storage.writes().len(), 4);
    assert_eq!(
        storage.inner.get_item("prefs").await.unwrap().as_deref(),
        Some(r#"{"theme":"light","count":2}"#)
    );
}

#[tokio::test(start_paused = true)]
async fn test_reset_stores_fallback() {
    let storage = Arc::new(ScriptedStorage::default());
    let prefs = open(&storage).await;

    prefs.replace(dark()).await;
    assert_eq!(prefs.reset().await, light());

    assert_eq!(prefs.data(), light());
    assert_eq!(
        storage.inner.get_item("prefs").await.unwrap().as_deref(),
        Some(r#"{"theme":"light","count":0}"#)
    );
}

#[tokio::test(start_paused = true)]
async fn test_subscribers_see_changes() {
    let storage = Arc::new(ScriptedStorage::default());
    let prefs = open(&storage).await;
    let mut updates = prefs.subscribe();

    let pending = prefs.replace(dark());
    updates.changed().await.unwrap();
    assert_eq!(updates.borrow_and_update().data, dark());

    pending.await;
    updates.changed().await.unwrap();
    assert!(!updates.borrow_and_update().status.is_saving);
}

#[tokio::test(start_paused = true)]
async fn test_separate_resources_on_one_key_keep_last_submission() {
    let storage = Arc::new(ScriptedStorage::default());
    let ctx = context(&storage);
    let first = HydratedResource::open(ctx.clone(), "prefs", light(), ResourceOptions::default()).await;
    let second = HydratedResource::open(ctx, "prefs", light(), ResourceOptions::default()).await;

    let replaced = first.replace(dark());
    let kept = second.replace(Prefs {
        theme: "solar".into(),
        count: 0,
    });
    replaced.await;
    kept.await;

    // Only the last submission is written; the replaced resource is not flagged
    assert_eq!(
        storage.writes(),
        vec![r#"{"theme":"solar","count":0}"#.to_string()]
    );
    assert_eq!(first.data(), dark());
    assert!(first.status().save_error.is_none());
    assert!(!first.status().is_saving);

    // Refreshing picks up what was stored
    assert_eq!(first.refresh().await.unwrap().theme, "solar");
}

// =============================================================================
// Refresh
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_refresh_reads_storage_again() {
    let storage = Arc::new(ScriptedStorage::default());
    let prefs = open(&storage).await;

    storage
        .inner
        .set_item("prefs", r#"{"theme":"dark","count":0}"#.to_string())
        .await
        .unwrap();

    assert_eq!(prefs.refresh().await.unwrap(), dark());
    assert_eq!(prefs.data(), dark());
    assert_eq!(storage.reads.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_refresh_failure_returns_error_and_fallback() {
    let storage = Arc::new(ScriptedStorage::default());
    let prefs = open(&storage).await;
    prefs.replace(dark()).await;

    storage.fail_reads.store(true, Ordering::SeqCst);
    let err = prefs.refresh().await.unwrap_err();

    assert_eq!(err.key(), "prefs");
    assert_eq!(prefs.data(), light());
    assert!(prefs.status().load_error.is_some());

    storage.fail_reads.store(false, Ordering::SeqCst);
    assert_eq!(prefs.refresh().await.unwrap(), dark());
    assert!(prefs.status().load_error.is_none());
}
