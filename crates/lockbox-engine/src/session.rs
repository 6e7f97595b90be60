//! Session-scoped synchronization engine.
//!
//! A [`Session`] owns the canonical in-memory collection, the selection and
//! the error slot. It is constructed at authentication and torn down at
//! logout; consumers receive it by reference instead of reaching for ambient
//! global state. Every mutation waits for the authoritative store's response
//! before touching the cache, and each apply step runs under a single lock
//! guard so concurrent responses for the same id cannot interleave.

use crate::config::SessionConfig;
use crate::error::EngineError;
use crate::filter::filter_lockboxes;
use crate::reconcile::{spawn_reconcile_loop, ReconcileHandle};
use crate::validate;
use chrono::Utc;
use lockbox_core::model::sort_canonical;
use lockbox_core::{
    resolve_status, CreateLockbox, Lockbox, LockboxStatus, SecretStore, UpdateLockbox,
};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::warn;
use zeroize::Zeroizing;

#[derive(Default)]
pub(crate) struct SessionState {
    pub(crate) lockboxes: Vec<Lockbox>,
    pub(crate) selected_id: Option<i64>,
    pub(crate) last_error: Option<String>,
    pub(crate) plaintext: Option<PlaintextSecret>,
}

/// Decrypted payload cached for the detail view. Wiped on relock, on
/// deletion, and at logout; the wrapper zeroizes the buffer on drop.
pub(crate) struct PlaintextSecret {
    pub(crate) id: i64,
    pub(crate) content: Zeroizing<String>,
}

/// Splice one explicit mutation response into the cache.
///
/// A record already superseded by a newer write is left alone: per id, the
/// greater `updated_at` wins, and a tie keeps the most recently applied
/// write — which is the incoming one.
pub(crate) fn apply_response(state: &mut SessionState, incoming: Lockbox) {
    match state.lockboxes.iter().position(|e| e.id == incoming.id) {
        Some(idx) => {
            if incoming.updated_at >= state.lockboxes[idx].updated_at {
                let name_changed = state.lockboxes[idx].name != incoming.name;
                state.lockboxes[idx] = incoming;
                if name_changed {
                    sort_canonical(&mut state.lockboxes);
                }
            }
        }
        None => {
            state.lockboxes.push(incoming);
            sort_canonical(&mut state.lockboxes);
        }
    }
}

/// Merge an authoritative reconcile snapshot into the cache.
///
/// Ids absent from the snapshot are dropped (deleted elsewhere); for ids
/// present on both sides the record with the greater `updated_at` survives,
/// so a stale poll response cannot clobber a just-applied explicit
/// transition. Selection is re-resolved by lookup afterwards.
pub(crate) fn merge_reconciled(
    state: &mut SessionState,
    authoritative: Vec<Lockbox>,
    now_ms: i64,
) {
    let mut merged = Vec::with_capacity(authoritative.len());
    for incoming in authoritative {
        match state.lockboxes.iter().find(|e| e.id == incoming.id) {
            Some(local) if local.updated_at > incoming.updated_at => merged.push(local.clone()),
            _ => merged.push(incoming),
        }
    }
    sort_canonical(&mut merged);
    state.lockboxes = merged;

    if let Some(id) = state.selected_id {
        if !state.lockboxes.iter().any(|e| e.id == id) {
            state.selected_id = None;
        }
    }
    purge_stale_plaintext(state, now_ms);
}

/// Drop cached plaintext once its entry is no longer unlocked (or no longer
/// exists). Decrypted material must not outlive its open window.
pub(crate) fn purge_stale_plaintext(state: &mut SessionState, now_ms: i64) {
    let keep = state.plaintext.as_ref().is_some_and(|secret| {
        state
            .lockboxes
            .iter()
            .find(|e| e.id == secret.id)
            .is_some_and(|e| resolve_status(e, now_ms) == LockboxStatus::Unlocked)
    });
    if !keep {
        state.plaintext = None;
    }
}

pub struct Session {
    store: Arc<dyn SecretStore>,
    config: SessionConfig,
    state: Arc<Mutex<SessionState>>,
    reconcile: ReconcileHandle,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}

impl Session {
    /// Load the canonical list and start the background reconciliation loop.
    pub(crate) async fn start(
        store: Arc<dyn SecretStore>,
        config: SessionConfig,
    ) -> Result<Self, EngineError> {
        let mut initial = store.list_all().await?;
        sort_canonical(&mut initial);
        let state = Arc::new(Mutex::new(SessionState {
            lockboxes: initial,
            ..SessionState::default()
        }));
        let reconcile =
            spawn_reconcile_loop(store.clone(), state.clone(), config.reconcile_interval);
        Ok(Self {
            store,
            config,
            state,
            reconcile,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Immutable snapshot of the canonical list.
    pub fn snapshot(&self) -> Vec<Lockbox> {
        self.state.lock().lockboxes.clone()
    }

    /// Filtered projection of the current snapshot; order preserved.
    pub fn filtered(&self, search_text: &str, category_filter: Option<&str>) -> Vec<Lockbox> {
        let state = self.state.lock();
        filter_lockboxes(&state.lockboxes, search_text, category_filter)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Select by id; selection survives re-fetches because it is resolved by
    /// lookup, never by object identity.
    pub fn select(&self, id: Option<i64>) {
        self.state.lock().selected_id = id;
    }

    pub fn selected_id(&self) -> Option<i64> {
        self.state.lock().selected_id
    }

    pub fn selected(&self) -> Option<Lockbox> {
        let state = self.state.lock();
        let id = state.selected_id?;
        state.lockboxes.iter().find(|e| e.id == id).cloned()
    }

    /// The cached decrypted payload for an entry, present only while the
    /// entry is still unlocked and a `fetch_decrypted` has populated it.
    pub fn cached_plaintext(&self, id: i64) -> Option<String> {
        let state = self.state.lock();
        state
            .plaintext
            .as_ref()
            .filter(|secret| secret.id == id)
            .map(|secret| secret.content.to_string())
    }

    pub fn last_error(&self) -> Option<String> {
        self.state.lock().last_error.clone()
    }

    pub fn clear_error(&self) {
        self.state.lock().last_error = None;
    }

    /// Replace the canonical list wholesale with the authoritative one. On
    /// failure the list is left untouched and the error recorded.
    pub async fn fetch_all(&self) -> Result<Vec<Lockbox>, EngineError> {
        match self.store.list_all().await {
            Ok(mut entries) => {
                sort_canonical(&mut entries);
                let now = Utc::now().timestamp_millis();
                let mut state = self.state.lock();
                state.lockboxes = entries.clone();
                if let Some(id) = state.selected_id {
                    if !state.lockboxes.iter().any(|e| e.id == id) {
                        state.selected_id = None;
                    }
                }
                purge_stale_plaintext(&mut state, now);
                state.last_error = None;
                Ok(entries)
            }
            Err(err) => Err(self.record(err)),
        }
    }

    /// Fetch one entry with its payload decrypted when unlocked. Absent on
    /// failure; the canonical collection is never touched. The decrypted
    /// payload is cached until the entry's status leaves `unlocked`.
    pub async fn fetch_decrypted(&self, id: i64) -> Option<Lockbox> {
        match self.store.get_decrypted(id).await {
            Ok(Some(entry)) => {
                let now = Utc::now().timestamp_millis();
                let mut state = self.state.lock();
                if resolve_status(&entry, now) == LockboxStatus::Unlocked {
                    state.plaintext = Some(PlaintextSecret {
                        id,
                        content: Zeroizing::new(entry.content.clone()),
                    });
                }
                Some(entry)
            }
            Ok(None) => None,
            Err(err) => {
                warn!(error = %err, id, "decrypted fetch failed");
                self.state.lock().last_error = Some(err.to_string());
                None
            }
        }
    }

    /// Create a new entry and insert the authoritative record at its
    /// name-sorted position. No optimistic pre-insert.
    pub async fn create(&self, req: CreateLockbox) -> Result<Lockbox, EngineError> {
        validate::validate_create(&req)?;
        match self.store.create(req).await {
            Ok(entry) => Ok(self.apply(entry)),
            Err(err) => Err(self.record(err)),
        }
    }

    /// Apply a partial update; the list re-sorts if the name changed.
    pub async fn update(&self, id: i64, req: UpdateLockbox) -> Result<Lockbox, EngineError> {
        validate::validate_update(&req)?;
        match self.store.update(id, req).await {
            Ok(entry) => Ok(self.apply(entry)),
            Err(err) => Err(self.record(err)),
        }
    }

    /// Delete after authoritative confirmation; deselects if the deleted id
    /// was selected.
    pub async fn delete(&self, id: i64) -> Result<(), EngineError> {
        match self.store.delete(id).await {
            Ok(()) => {
                let now = Utc::now().timestamp_millis();
                let mut state = self.state.lock();
                state.lockboxes.retain(|e| e.id != id);
                if state.selected_id == Some(id) {
                    state.selected_id = None;
                }
                purge_stale_plaintext(&mut state, now);
                state.last_error = None;
                Ok(())
            }
            Err(err) => Err(self.record(err)),
        }
    }

    /// Request an unlock; the authoritative record (carrying the new
    /// `unlock_timestamp`) is spliced in place.
    pub async fn unlock(&self, id: i64) -> Result<Lockbox, EngineError> {
        match self.store.unlock(id).await {
            Ok(entry) => Ok(self.apply(entry)),
            Err(err) => Err(self.record(err)),
        }
    }

    /// Relock immediately on the store's authority.
    pub async fn relock(&self, id: i64) -> Result<Lockbox, EngineError> {
        match self.store.relock(id).await {
            Ok(entry) => Ok(self.apply(entry)),
            Err(err) => Err(self.record(err)),
        }
    }

    /// One reconciliation pass: fetch the authoritative recomputed list and
    /// merge it by id. Failures are swallowed — the next tick retries, and
    /// surfacing every poll failure would produce alert storms for a
    /// transient, self-healing condition.
    pub async fn reconcile_now(&self) {
        match self.store.reconcile_all().await {
            Ok(entries) => {
                let now = Utc::now().timestamp_millis();
                let mut state = self.state.lock();
                merge_reconciled(&mut state, entries, now);
            }
            Err(err) => {
                warn!(error = %err, "reconcile failed");
            }
        }
    }

    /// Serialize the authoritative collection (content sealed) into a
    /// versioned blob.
    pub async fn export_all(&self) -> Result<String, EngineError> {
        match self.store.export_all().await {
            Ok(blob) => Ok(blob),
            Err(err) => Err(self.record(err)),
        }
    }

    /// Import entries from an exported blob (existing names are skipped),
    /// then refresh the canonical list so the new entries appear.
    pub async fn import_all(&self, blob: &str) -> Result<Vec<String>, EngineError> {
        let imported = match self.store.import_all(blob).await {
            Ok(imported) => imported,
            Err(err) => return Err(self.record(err)),
        };
        self.fetch_all().await?;
        Ok(imported)
    }

    /// Cancel the reconciliation loop, clear the canonical list and the
    /// selection, and purge decrypted secret material. Nothing sensitive
    /// survives the session boundary.
    pub async fn logout(self) {
        self.reconcile.shutdown();
        let _ = self.reconcile.task.await;
        let mut state = self.state.lock();
        state.lockboxes.clear();
        state.selected_id = None;
        state.last_error = None;
        state.plaintext = None;
    }

    fn apply(&self, entry: Lockbox) -> Lockbox {
        let now = Utc::now().timestamp_millis();
        let mut state = self.state.lock();
        apply_response(&mut state, entry.clone());
        purge_stale_plaintext(&mut state, now);
        state.last_error = None;
        entry
    }

    fn record(&self, err: lockbox_core::StoreError) -> EngineError {
        self.state.lock().last_error = Some(err.to_string());
        EngineError::Store(err)
    }
}
