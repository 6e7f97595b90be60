use crate::error::StoreError;
use crate::model::Lockbox;
use serde::{Deserialize, Serialize};

pub const EXPORT_VERSION: &str = "2.0.0";

/// Versioned export blob. Content travels sealed; an export is only readable
/// by a store holding the same master password.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExportData {
    pub version: String,
    pub exported_at: i64,
    pub lockboxes: Vec<ExportLockbox>,
}

/// The portable subset of a lockbox: identity, schedule, and sealed payload.
/// Lock state and timestamps are deliberately not carried — imported entries
/// always start locked.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExportLockbox {
    pub name: String,
    pub content: String,
    pub category: Option<String>,
    pub unlock_delay_seconds: i64,
    pub relock_delay_seconds: i64,
}

pub fn to_blob(entries: &[Lockbox], exported_at: i64) -> Result<String, StoreError> {
    let data = ExportData {
        version: EXPORT_VERSION.to_string(),
        exported_at,
        lockboxes: entries
            .iter()
            .map(|e| ExportLockbox {
                name: e.name.clone(),
                content: e.content.clone(),
                category: e.category.clone(),
                unlock_delay_seconds: e.unlock_delay_seconds,
                relock_delay_seconds: e.relock_delay_seconds,
            })
            .collect(),
    };
    serde_json::to_string_pretty(&data).map_err(|e| StoreError::Storage(e.to_string()))
}

pub fn parse_blob(blob: &str) -> Result<ExportData, StoreError> {
    serde_json::from_str(blob).map_err(|e| StoreError::InvalidBlob(e.to_string()))
}
