/// Failures surfaced by an authoritative secret store.
///
/// The engine treats every variant as an opaque, recoverable rejection; the
/// distinctions exist for store implementations and their tests.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("lockbox not found: {0}")]
    NotFound(i64),

    #[error("a lockbox named \"{0}\" already exists")]
    DuplicateName(String),

    #[error("unknown category: {0}")]
    InvalidCategory(String),

    #[error("store is sealed; verify the master password first")]
    Sealed,

    #[error("crypto failure: {0}")]
    Crypto(String),

    #[error("storage failure: {0}")]
    Storage(String),

    #[error("invalid export data: {0}")]
    InvalidBlob(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Storage(err.to_string())
    }
}
