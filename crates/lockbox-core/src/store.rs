use crate::error::StoreError;
use crate::model::{CreateLockbox, Lockbox, UpdateLockbox};
use async_trait::async_trait;

/// Asynchronous contract of the authoritative secret store.
///
/// The synchronization engine owns no persistent state; every mutation goes
/// through this trait and only the returned records are spliced back into the
/// engine's cache. Implementations evaluate time-driven transitions against
/// their own clock in [`SecretStore::reconcile_all`].
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// All entries in canonical (name, case-insensitive ascending) order.
    /// Content stays sealed regardless of lock state.
    async fn list_all(&self) -> Result<Vec<Lockbox>, StoreError>;

    /// One entry with its content decrypted if, and only if, it is currently
    /// unlocked. `Ok(None)` when the id is unknown.
    async fn get_decrypted(&self, id: i64) -> Result<Option<Lockbox>, StoreError>;

    /// Create a new entry. New entries always start locked.
    async fn create(&self, req: CreateLockbox) -> Result<Lockbox, StoreError>;

    /// Apply a partial update; absent fields keep their current value.
    async fn update(&self, id: i64, req: UpdateLockbox) -> Result<Lockbox, StoreError>;

    async fn delete(&self, id: i64) -> Result<(), StoreError>;

    /// Accept an unlock request: schedules the unlock to complete
    /// `unlock_delay_seconds` from now. Does not flip the lock flag.
    async fn unlock(&self, id: i64) -> Result<Lockbox, StoreError>;

    /// Relock immediately, clearing any pending unlock or open window.
    async fn relock(&self, id: i64) -> Result<Lockbox, StoreError>;

    /// Re-evaluate every entry's lock state against the store's clock and
    /// return the full, updated collection.
    async fn reconcile_all(&self) -> Result<Vec<Lockbox>, StoreError>;

    async fn is_master_password_set(&self) -> Result<bool, StoreError>;

    async fn set_master_password(&self, password: &str) -> Result<(), StoreError>;

    /// `Ok(false)` for a wrong password; errors are reserved for storage
    /// failures.
    async fn verify_master_password(&self, password: &str) -> Result<bool, StoreError>;

    /// Serialize every entry (content still sealed) into a versioned blob.
    async fn export_all(&self) -> Result<String, StoreError>;

    /// Import entries from a blob produced by [`SecretStore::export_all`],
    /// skipping names that already exist. Returns the imported names.
    async fn import_all(&self, blob: &str) -> Result<Vec<String>, StoreError>;
}
