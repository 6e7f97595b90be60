use crate::model::Lockbox;
use serde::{Deserialize, Serialize};

/// Derived accessibility of a lockbox at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockboxStatus {
    Locked,
    Unlocking,
    Unlocked,
    Relocking,
}

impl std::fmt::Display for LockboxStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            LockboxStatus::Locked => "locked",
            LockboxStatus::Unlocking => "unlocking",
            LockboxStatus::Unlocked => "unlocked",
            LockboxStatus::Relocking => "relocking",
        };
        f.write_str(label)
    }
}

/// Derive the current status of an entry from its lock flag and timestamps.
///
/// Pure and total over every reachable field combination. Because it reads a
/// caller-supplied clock, the result can change between two calls with no
/// event firing; callers re-invoke it on a fixed cadence rather than caching.
///
/// An entry whose `relock_timestamp` has elapsed while `is_locked` is still
/// false reports `Locked` even though the authoritative flip is pending — the
/// flag itself only changes through a store response.
pub fn resolve_status(entry: &Lockbox, now_ms: i64) -> LockboxStatus {
    if entry.is_locked {
        match entry.unlock_timestamp {
            Some(ts) if ts > now_ms => LockboxStatus::Unlocking,
            _ => LockboxStatus::Locked,
        }
    } else {
        match entry.relock_timestamp {
            Some(ts) if ts > now_ms => LockboxStatus::Unlocked,
            _ => LockboxStatus::Locked,
        }
    }
}

/// The timestamp a countdown should track for this entry, if any: the pending
/// unlock instant while unlocking, the closing of the open window while
/// unlocked.
pub fn countdown_target(entry: &Lockbox, now_ms: i64) -> Option<i64> {
    match resolve_status(entry, now_ms) {
        LockboxStatus::Unlocking => entry.unlock_timestamp,
        LockboxStatus::Unlocked => entry.relock_timestamp,
        LockboxStatus::Locked | LockboxStatus::Relocking => None,
    }
}
