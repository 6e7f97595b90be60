use async_trait::async_trait;
use lockbox_core::model::sort_canonical;
use lockbox_core::{CreateLockbox, Lockbox, SecretStore, StoreError, UpdateLockbox};
use lockbox_engine::{Authenticator, EngineError, Session, SessionConfig};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const PASSWORD: &str = "sesame-street-8";

/// In-memory store with a scriptable failure switch and a logical clock for
/// `updated_at` stamps, so merge ordering can be exercised deterministically.
#[derive(Default)]
struct MockStore {
    entries: Mutex<Vec<Lockbox>>,
    next_id: AtomicI64,
    clock: AtomicI64,
    fail_commands: AtomicBool,
    fail_reconcile: AtomicBool,
    reconcile_calls: AtomicUsize,
}

impl MockStore {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            next_id: AtomicI64::new(1),
            clock: AtomicI64::new(1),
            ..Self::default()
        })
    }

    fn stamp(&self) -> i64 {
        self.clock.fetch_add(1, Ordering::SeqCst)
    }

    fn seed(&self, name: &str) -> Lockbox {
        let entry = Lockbox {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            name: name.to_string(),
            content: format!("sealed:{name}"),
            category: None,
            is_locked: true,
            unlock_delay_seconds: 60,
            relock_delay_seconds: 3600,
            unlock_timestamp: None,
            relock_timestamp: None,
            created_at: 0,
            updated_at: self.stamp(),
        };
        self.entries.lock().push(entry.clone());
        entry
    }

    fn check_commands(&self) -> Result<(), StoreError> {
        if self.fail_commands.load(Ordering::SeqCst) {
            return Err(StoreError::Storage("backend unavailable".into()));
        }
        Ok(())
    }

    /// Overwrite a record in place, simulating a server-side transition that
    /// the next reconcile will deliver.
    fn server_write(&self, updated: Lockbox) {
        let mut entries = self.entries.lock();
        if let Some(e) = entries.iter_mut().find(|e| e.id == updated.id) {
            *e = updated;
        }
    }
}

#[async_trait]
impl SecretStore for MockStore {
    async fn list_all(&self) -> Result<Vec<Lockbox>, StoreError> {
        self.check_commands()?;
        let mut entries = self.entries.lock().clone();
        sort_canonical(&mut entries);
        Ok(entries)
    }

    async fn get_decrypted(&self, id: i64) -> Result<Option<Lockbox>, StoreError> {
        self.check_commands()?;
        let entry = self.entries.lock().iter().find(|e| e.id == id).cloned();
        Ok(entry.map(|mut e| {
            if !e.is_locked {
                e.content = e.content.replace("sealed:", "plain:");
            }
            e
        }))
    }

    async fn create(&self, req: CreateLockbox) -> Result<Lockbox, StoreError> {
        self.check_commands()?;
        let entry = Lockbox {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            name: req.name,
            content: format!("sealed:{}", req.content),
            category: req.category,
            is_locked: true,
            unlock_delay_seconds: req.unlock_delay_seconds,
            relock_delay_seconds: req.relock_delay_seconds,
            unlock_timestamp: None,
            relock_timestamp: None,
            created_at: 0,
            updated_at: self.stamp(),
        };
        self.entries.lock().push(entry.clone());
        Ok(entry)
    }

    async fn update(&self, id: i64, req: UpdateLockbox) -> Result<Lockbox, StoreError> {
        self.check_commands()?;
        let stamp = self.stamp();
        let mut entries = self.entries.lock();
        let entry = entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(StoreError::NotFound(id))?;
        if let Some(name) = req.name {
            entry.name = name;
        }
        if let Some(content) = req.content {
            entry.content = format!("sealed:{content}");
        }
        if req.category.is_some() {
            entry.category = req.category;
        }
        entry.updated_at = stamp;
        Ok(entry.clone())
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        self.check_commands()?;
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|e| e.id != id);
        if entries.len() == before {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    async fn unlock(&self, id: i64) -> Result<Lockbox, StoreError> {
        self.check_commands()?;
        let stamp = self.stamp();
        let mut entries = self.entries.lock();
        let entry = entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(StoreError::NotFound(id))?;
        entry.unlock_timestamp = Some(stamp + entry.unlock_delay_seconds * 1000);
        entry.updated_at = stamp;
        Ok(entry.clone())
    }

    async fn relock(&self, id: i64) -> Result<Lockbox, StoreError> {
        self.check_commands()?;
        let stamp = self.stamp();
        let mut entries = self.entries.lock();
        let entry = entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(StoreError::NotFound(id))?;
        entry.is_locked = true;
        entry.unlock_timestamp = None;
        entry.relock_timestamp = None;
        entry.updated_at = stamp;
        Ok(entry.clone())
    }

    async fn reconcile_all(&self) -> Result<Vec<Lockbox>, StoreError> {
        self.reconcile_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_reconcile.load(Ordering::SeqCst) {
            return Err(StoreError::Storage("poll failed".into()));
        }
        let mut entries = self.entries.lock().clone();
        sort_canonical(&mut entries);
        Ok(entries)
    }

    async fn is_master_password_set(&self) -> Result<bool, StoreError> {
        Ok(true)
    }

    async fn set_master_password(&self, _password: &str) -> Result<(), StoreError> {
        Ok(())
    }

    async fn verify_master_password(&self, password: &str) -> Result<bool, StoreError> {
        Ok(password == PASSWORD)
    }

    async fn export_all(&self) -> Result<String, StoreError> {
        lockbox_core::export::to_blob(&self.entries.lock(), 0)
    }

    async fn import_all(&self, blob: &str) -> Result<Vec<String>, StoreError> {
        let data = lockbox_core::export::parse_blob(blob)?;
        let mut imported = Vec::new();
        for item in data.lockboxes {
            let exists = self.entries.lock().iter().any(|e| e.name == item.name);
            if exists {
                continue;
            }
            self.seed(&item.name);
            imported.push(item.name);
        }
        Ok(imported)
    }
}

fn slow_config() -> SessionConfig {
    // Effectively no background ticks; tests drive reconciliation by hand.
    SessionConfig {
        reconcile_interval: Duration::from_secs(3600),
        ..SessionConfig::default()
    }
}

async fn login(store: &Arc<MockStore>, config: SessionConfig) -> Session {
    Authenticator::new(store.clone(), config)
        .login(PASSWORD)
        .await
        .unwrap()
}

fn names(entries: &[Lockbox]) -> Vec<&str> {
    entries.iter().map(|e| e.name.as_str()).collect()
}

#[tokio::test]
async fn wrong_password_is_an_auth_error() {
    let store = MockStore::new();
    let auth = Authenticator::new(store.clone(), slow_config());
    let err = auth.login("open says me").await.unwrap_err();
    assert!(matches!(err, EngineError::Auth));
}

#[tokio::test]
async fn login_loads_the_canonical_list() {
    let store = MockStore::new();
    store.seed("Charlie");
    store.seed("Alpha");
    let session = login(&store, slow_config()).await;
    assert_eq!(names(&session.snapshot()), vec!["Alpha", "Charlie"]);
    session.logout().await;
}

#[tokio::test]
async fn create_inserts_at_sorted_position_without_duplicates() {
    let store = MockStore::new();
    store.seed("Alpha");
    store.seed("Charlie");
    let session = login(&store, slow_config()).await;

    let req = CreateLockbox {
        name: "Bravo".into(),
        content: "payload".into(),
        category: None,
        unlock_delay_seconds: 60,
        relock_delay_seconds: 3600,
    };
    session.create(req).await.unwrap();

    let snapshot = session.snapshot();
    assert_eq!(names(&snapshot), vec!["Alpha", "Bravo", "Charlie"]);
    session.logout().await;
}

#[tokio::test]
async fn validation_failure_never_reaches_the_store() {
    let store = MockStore::new();
    let session = login(&store, slow_config()).await;

    let req = CreateLockbox {
        name: "".into(),
        content: "payload".into(),
        category: None,
        unlock_delay_seconds: 60,
        relock_delay_seconds: 3600,
    };
    let err = session.create(req).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
    assert!(store.entries.lock().is_empty());
    assert!(session.snapshot().is_empty());
    session.logout().await;
}

#[tokio::test]
async fn deleting_the_selected_entry_clears_selection() {
    let store = MockStore::new();
    let a = store.seed("Alpha");
    let b = store.seed("Bravo");
    let session = login(&store, slow_config()).await;

    session.select(Some(a.id));
    session.delete(b.id).await.unwrap();
    assert_eq!(session.selected_id(), Some(a.id));

    session.delete(a.id).await.unwrap();
    assert_eq!(session.selected_id(), None);
    assert!(session.snapshot().is_empty());
    session.logout().await;
}

#[tokio::test]
async fn failed_fetch_leaves_the_list_untouched_and_records_the_error() {
    let store = MockStore::new();
    store.seed("Alpha");
    let session = login(&store, slow_config()).await;
    assert_eq!(session.snapshot().len(), 1);

    store.fail_commands.store(true, Ordering::SeqCst);
    let err = session.fetch_all().await.unwrap_err();
    assert!(matches!(err, EngineError::Store(_)));
    assert_eq!(session.snapshot().len(), 1);
    assert!(session.last_error().is_some());

    store.fail_commands.store(false, Ordering::SeqCst);
    session.fetch_all().await.unwrap();
    assert!(session.last_error().is_none());
    session.logout().await;
}

#[tokio::test]
async fn reconcile_failures_are_swallowed() {
    let store = MockStore::new();
    store.seed("Alpha");
    let session = login(&store, slow_config()).await;

    store.fail_reconcile.store(true, Ordering::SeqCst);
    session.reconcile_now().await;
    // Not surfaced: the next tick retries.
    assert!(session.last_error().is_none());
    assert_eq!(session.snapshot().len(), 1);
    session.logout().await;
}

#[tokio::test]
async fn reconcile_delivers_server_side_transitions() {
    let store = MockStore::new();
    let entry = store.seed("Alpha");
    let session = login(&store, slow_config()).await;

    let mut flipped = entry.clone();
    flipped.is_locked = false;
    flipped.relock_timestamp = Some(i64::MAX);
    flipped.updated_at = store.stamp();
    store.server_write(flipped);

    session.reconcile_now().await;
    let snapshot = session.snapshot();
    assert!(!snapshot[0].is_locked);
    session.logout().await;
}

#[tokio::test]
async fn stale_reconcile_cannot_clobber_a_newer_explicit_response() {
    let store = MockStore::new();
    let entry = store.seed("Alpha");
    let session = login(&store, slow_config()).await;

    // Explicit unlock response lands first with a fresh stamp.
    let unlocked = session.unlock(entry.id).await.unwrap();
    assert!(unlocked.unlock_timestamp.is_some());

    // The poll then delivers an older snapshot of the same id.
    let mut stale = entry.clone();
    stale.unlock_timestamp = None;
    store.server_write(stale);
    session.reconcile_now().await;

    let snapshot = session.snapshot();
    assert_eq!(snapshot[0].updated_at, unlocked.updated_at);
    assert!(snapshot[0].unlock_timestamp.is_some());
    session.logout().await;
}

#[tokio::test]
async fn reconcile_drops_concurrently_deleted_entries_and_deselects() {
    let store = MockStore::new();
    let a = store.seed("Alpha");
    store.seed("Bravo");
    let session = login(&store, slow_config()).await;
    session.select(Some(a.id));

    store.entries.lock().retain(|e| e.id != a.id);
    session.reconcile_now().await;

    assert_eq!(names(&session.snapshot()), vec!["Bravo"]);
    assert_eq!(session.selected_id(), None);
    session.logout().await;
}

#[tokio::test]
async fn decrypted_cache_is_purged_when_the_entry_relocks() {
    let store = MockStore::new();
    let entry = store.seed("Alpha");
    let session = login(&store, slow_config()).await;

    // Server-side: the unlock completed and the open window is active.
    let mut open = entry.clone();
    open.is_locked = false;
    open.relock_timestamp = Some(i64::MAX);
    open.updated_at = store.stamp();
    store.server_write(open);
    session.reconcile_now().await;

    let fetched = session.fetch_decrypted(entry.id).await.unwrap();
    assert_eq!(fetched.content, "plain:Alpha");
    assert_eq!(
        session.cached_plaintext(entry.id),
        Some("plain:Alpha".to_string())
    );

    // Server-side relock: the next poll must wipe the cached plaintext.
    let mut relocked = entry.clone();
    relocked.is_locked = true;
    relocked.relock_timestamp = None;
    relocked.updated_at = store.stamp();
    store.server_write(relocked);
    session.reconcile_now().await;

    assert_eq!(session.cached_plaintext(entry.id), None);
    session.logout().await;
}

#[tokio::test]
async fn failed_decrypted_fetch_is_absent_not_thrown() {
    let store = MockStore::new();
    let entry = store.seed("Alpha");
    let session = login(&store, slow_config()).await;

    store.fail_commands.store(true, Ordering::SeqCst);
    assert!(session.fetch_decrypted(entry.id).await.is_none());
    // The collection is untouched.
    assert_eq!(session.snapshot().len(), 1);
    session.logout().await;
}

#[tokio::test]
async fn background_loop_polls_and_stops_at_logout() {
    let store = MockStore::new();
    store.seed("Alpha");
    let config = SessionConfig {
        reconcile_interval: Duration::from_millis(20),
        ..SessionConfig::default()
    };
    let session = login(&store, config).await;

    tokio::time::sleep(Duration::from_millis(120)).await;
    let polled = store.reconcile_calls.load(Ordering::SeqCst);
    assert!(polled >= 2, "expected repeated polls, saw {polled}");

    session.logout().await;
    let after_logout = store.reconcile_calls.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(
        store.reconcile_calls.load(Ordering::SeqCst),
        after_logout,
        "reconcile loop kept ticking after logout"
    );
}

#[tokio::test]
async fn rename_resorts_the_canonical_list() {
    let store = MockStore::new();
    let a = store.seed("Alpha");
    store.seed("Bravo");
    let session = login(&store, slow_config()).await;

    let req = UpdateLockbox {
        name: Some("Zulu".into()),
        ..Default::default()
    };
    session.update(a.id, req).await.unwrap();
    assert_eq!(names(&session.snapshot()), vec!["Bravo", "Zulu"]);
    session.logout().await;
}
