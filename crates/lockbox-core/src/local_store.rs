//! File-backed authoritative store.
//!
//! State lives in a single JSON file under the platform data directory. Entry
//! content is sealed individually (fresh salt and nonce per write) so listing
//! never exposes plaintext; the master password is held in memory only after
//! a successful verify and is required for sealing and opening content.

use crate::crypto;
use crate::error::StoreError;
use crate::export;
use crate::model::{sort_canonical, CreateLockbox, Lockbox, UpdateLockbox, CATEGORIES};
use crate::store::SecretStore;
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;
use zeroize::Zeroizing;

pub const STORE_FILE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct StoreFile {
    version: u32,
    next_id: i64,
    master_password_hash: Option<String>,
    lockboxes: Vec<Lockbox>,
}

impl Default for StoreFile {
    fn default() -> Self {
        Self {
            version: STORE_FILE_VERSION,
            next_id: 1,
            master_password_hash: None,
            lockboxes: Vec::new(),
        }
    }
}

pub struct LocalStore {
    path: PathBuf,
    inner: Mutex<StoreFile>,
    /// Master password for the current process session. Populated by
    /// `set_master_password` / a successful `verify_master_password`.
    session_password: Mutex<Option<Zeroizing<String>>>,
}

impl LocalStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let state = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            let state: StoreFile = serde_json::from_str(&raw)?;
            if state.version != STORE_FILE_VERSION {
                return Err(StoreError::Storage(format!(
                    "unsupported store file version {}",
                    state.version
                )));
            }
            state
        } else {
            StoreFile::default()
        };
        debug!(path = %path.display(), entries = state.lockboxes.len(), "store opened");
        Ok(Self {
            path,
            inner: Mutex::new(state),
            session_password: Mutex::new(None),
        })
    }

    fn persist(&self, state: &StoreFile) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(state)?;
        let mut file = File::create(&self.path)?;
        file.write_all(data.as_bytes())?;
        file.flush()?;
        Ok(())
    }

    fn now_ms() -> i64 {
        Utc::now().timestamp_millis()
    }

    fn session_password(&self) -> Result<Zeroizing<String>, StoreError> {
        self.session_password
            .lock()
            .clone()
            .ok_or(StoreError::Sealed)
    }

    fn validate_category(category: &Option<String>) -> Result<(), StoreError> {
        if let Some(cat) = category {
            if !CATEGORIES.contains(&cat.as_str()) {
                return Err(StoreError::InvalidCategory(cat.clone()));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl SecretStore for LocalStore {
    async fn list_all(&self) -> Result<Vec<Lockbox>, StoreError> {
        let state = self.inner.lock();
        let mut entries = state.lockboxes.clone();
        sort_canonical(&mut entries);
        Ok(entries)
    }

    async fn get_decrypted(&self, id: i64) -> Result<Option<Lockbox>, StoreError> {
        let entry = {
            let state = self.inner.lock();
            state.lockboxes.iter().find(|e| e.id == id).cloned()
        };
        let Some(mut entry) = entry else {
            return Ok(None);
        };
        if !entry.is_locked {
            let password = self.session_password()?;
            // A payload that fails to open stays sealed rather than erroring
            // the whole fetch.
            if let Ok(plaintext) = crypto::open_content(&entry.content, &password) {
                entry.content = plaintext;
            }
        }
        Ok(Some(entry))
    }

    async fn create(&self, req: CreateLockbox) -> Result<Lockbox, StoreError> {
        Self::validate_category(&req.category)?;
        let password = self.session_password()?;
        let sealed = crypto::seal_content(&req.content, &password)
            .map_err(|e| StoreError::Crypto(e.to_string()))?;

        let now = Self::now_ms();
        let mut state = self.inner.lock();
        if state.lockboxes.iter().any(|e| e.name == req.name) {
            return Err(StoreError::DuplicateName(req.name));
        }
        let entry = Lockbox {
            id: state.next_id,
            name: req.name,
            content: sealed,
            category: req.category,
            is_locked: true,
            unlock_delay_seconds: req.unlock_delay_seconds,
            relock_delay_seconds: req.relock_delay_seconds,
            unlock_timestamp: None,
            relock_timestamp: None,
            created_at: now,
            updated_at: now,
        };
        state.next_id += 1;
        state.lockboxes.push(entry.clone());
        sort_canonical(&mut state.lockboxes);
        self.persist(&state)?;
        Ok(entry)
    }

    async fn update(&self, id: i64, req: UpdateLockbox) -> Result<Lockbox, StoreError> {
        Self::validate_category(&req.category)?;
        let sealed = match &req.content {
            Some(content) => {
                let password = self.session_password()?;
                Some(
                    crypto::seal_content(content, &password)
                        .map_err(|e| StoreError::Crypto(e.to_string()))?,
                )
            }
            None => None,
        };

        let now = Self::now_ms();
        let mut state = self.inner.lock();
        if let Some(name) = &req.name {
            if state.lockboxes.iter().any(|e| e.name == *name && e.id != id) {
                return Err(StoreError::DuplicateName(name.clone()));
            }
        }
        let entry = state
            .lockboxes
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(StoreError::NotFound(id))?;
        if let Some(name) = req.name {
            entry.name = name;
        }
        if let Some(sealed) = sealed {
            entry.content = sealed;
        }
        if req.category.is_some() {
            entry.category = req.category;
        }
        if let Some(delay) = req.unlock_delay_seconds {
            entry.unlock_delay_seconds = delay;
        }
        if let Some(delay) = req.relock_delay_seconds {
            entry.relock_delay_seconds = delay;
        }
        entry.updated_at = now;
        let updated = entry.clone();
        sort_canonical(&mut state.lockboxes);
        self.persist(&state)?;
        Ok(updated)
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        let mut state = self.inner.lock();
        let before = state.lockboxes.len();
        state.lockboxes.retain(|e| e.id != id);
        if state.lockboxes.len() == before {
            return Err(StoreError::NotFound(id));
        }
        self.persist(&state)?;
        Ok(())
    }

    async fn unlock(&self, id: i64) -> Result<Lockbox, StoreError> {
        let now = Self::now_ms();
        let mut state = self.inner.lock();
        let entry = state
            .lockboxes
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(StoreError::NotFound(id))?;
        entry.unlock_timestamp = Some(now + entry.unlock_delay_seconds * 1000);
        entry.updated_at = now;
        let updated = entry.clone();
        self.persist(&state)?;
        Ok(updated)
    }

    async fn relock(&self, id: i64) -> Result<Lockbox, StoreError> {
        let now = Self::now_ms();
        let mut state = self.inner.lock();
        let entry = state
            .lockboxes
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(StoreError::NotFound(id))?;
        entry.is_locked = true;
        entry.unlock_timestamp = None;
        entry.relock_timestamp = None;
        entry.updated_at = now;
        let updated = entry.clone();
        self.persist(&state)?;
        Ok(updated)
    }

    async fn reconcile_all(&self) -> Result<Vec<Lockbox>, StoreError> {
        let now = Self::now_ms();
        let mut state = self.inner.lock();
        let mut changed = false;

        // Complete unlocks whose delay has elapsed.
        for entry in &mut state.lockboxes {
            if entry.is_locked && entry.unlock_timestamp.is_some_and(|ts| ts <= now) {
                entry.is_locked = false;
                entry.unlock_timestamp = None;
                entry.relock_timestamp = Some(now + entry.relock_delay_seconds * 1000);
                entry.updated_at = now;
                changed = true;
            }
        }
        // Relock entries whose open window has closed.
        for entry in &mut state.lockboxes {
            if !entry.is_locked && entry.relock_timestamp.is_some_and(|ts| ts <= now) {
                entry.is_locked = true;
                entry.relock_timestamp = None;
                entry.updated_at = now;
                changed = true;
            }
        }

        if changed {
            self.persist(&state)?;
        }
        let mut entries = state.lockboxes.clone();
        sort_canonical(&mut entries);
        Ok(entries)
    }

    async fn is_master_password_set(&self) -> Result<bool, StoreError> {
        Ok(self.inner.lock().master_password_hash.is_some())
    }

    async fn set_master_password(&self, password: &str) -> Result<(), StoreError> {
        let hash =
            crypto::hash_password(password).map_err(|e| StoreError::Crypto(e.to_string()))?;
        let mut state = self.inner.lock();
        state.master_password_hash = Some(hash);
        self.persist(&state)?;
        drop(state);
        *self.session_password.lock() = Some(Zeroizing::new(password.to_string()));
        Ok(())
    }

    async fn verify_master_password(&self, password: &str) -> Result<bool, StoreError> {
        let hash = self.inner.lock().master_password_hash.clone();
        let Some(hash) = hash else {
            return Ok(false);
        };
        let valid = crypto::verify_password(password, &hash);
        if valid {
            *self.session_password.lock() = Some(Zeroizing::new(password.to_string()));
        }
        Ok(valid)
    }

    async fn export_all(&self) -> Result<String, StoreError> {
        let state = self.inner.lock();
        let mut entries = state.lockboxes.clone();
        sort_canonical(&mut entries);
        export::to_blob(&entries, Self::now_ms())
    }

    async fn import_all(&self, blob: &str) -> Result<Vec<String>, StoreError> {
        let data = export::parse_blob(blob)?;
        let now = Self::now_ms();
        let mut state = self.inner.lock();
        let mut imported = Vec::new();
        for item in data.lockboxes {
            if state.lockboxes.iter().any(|e| e.name == item.name) {
                continue;
            }
            // Content arrives already sealed from the exporting store.
            let entry = Lockbox {
                id: state.next_id,
                name: item.name.clone(),
                content: item.content,
                category: item.category,
                is_locked: true,
                unlock_delay_seconds: item.unlock_delay_seconds,
                relock_delay_seconds: item.relock_delay_seconds,
                unlock_timestamp: None,
                relock_timestamp: None,
                created_at: now,
                updated_at: now,
            };
            state.next_id += 1;
            state.lockboxes.push(entry);
            imported.push(item.name);
        }
        if !imported.is_empty() {
            sort_canonical(&mut state.lockboxes);
            self.persist(&state)?;
        }
        Ok(imported)
    }
}
