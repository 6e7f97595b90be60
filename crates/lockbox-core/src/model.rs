use serde::{Deserialize, Serialize};

/// Closed label set for the optional `category` tag. Entries outside this set
/// are rejected at the store boundary; an absent category means
/// "uncategorized".
pub const CATEGORIES: [&str; 7] = [
    "Passwords",
    "Financial",
    "Personal",
    "Work",
    "Social",
    "Gaming",
    "Other",
];

/// A named secret entry governed by a time-delay access policy.
///
/// The record never encodes its accessibility directly; status is always
/// derived from `is_locked` and the two timestamps (see [`crate::status`]).
/// Only authoritative store responses mutate a `Lockbox` — the engine never
/// applies local optimistic guesses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lockbox {
    pub id: i64,
    pub name: String,
    /// Secret payload. Ciphertext (or a placeholder) unless the entry is
    /// currently unlocked and was fetched through `get_decrypted`.
    pub content: String,
    pub category: Option<String>,
    /// Authoritative lock flag; flips only via store responses.
    pub is_locked: bool,
    pub unlock_delay_seconds: i64,
    pub relock_delay_seconds: i64,
    /// Epoch-ms instant at which a pending unlock completes. Set when an
    /// unlock request is accepted, cleared once the unlock completes.
    pub unlock_timestamp: Option<i64>,
    /// Epoch-ms instant at which the open window closes. Set when an unlock
    /// completes, cleared once the entry relocks.
    pub relock_timestamp: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Lockbox {
    /// Canonical sort key: case-insensitive name.
    pub fn sort_key(&self) -> String {
        self.name.to_lowercase()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLockbox {
    pub name: String,
    pub content: String,
    pub category: Option<String>,
    pub unlock_delay_seconds: i64,
    pub relock_delay_seconds: i64,
}

/// Partial update; `None` fields keep their current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateLockbox {
    pub name: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
    pub unlock_delay_seconds: Option<i64>,
    pub relock_delay_seconds: Option<i64>,
}

/// Sort a collection of lockboxes into canonical order (name, case-insensitive
/// ascending). Both the store and the engine cache apply this same rule.
pub fn sort_canonical(entries: &mut [Lockbox]) {
    entries.sort_by_key(|e| e.sort_key());
}
