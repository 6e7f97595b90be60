use lockbox_core::StoreError;

/// Failures surfaced by the synchronization engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Client-side rejection. Never reaches the store, never retried.
    #[error("{0}")]
    Validation(String),

    /// Wrong master password. The session stays unauthenticated; the engine
    /// initiates no retry loop.
    #[error("wrong master password")]
    Auth,

    /// A rejected store call, opaque to the engine. The canonical list is
    /// left exactly as it was.
    #[error(transparent)]
    Store(#[from] StoreError),
}
