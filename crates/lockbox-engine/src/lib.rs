//! Client-side synchronization engine for the time-delayed disclosure vault.
//!
//! Owns the canonical in-memory collection and keeps it reconciled against an
//! authoritative [`lockbox_core::SecretStore`] under a polling discipline.
//! Derived status and countdowns are pure recomputations over snapshots; the
//! locally derived label can transiently disagree with server-authoritative
//! state between reconciliation ticks, by design.

pub mod auth;
pub mod config;
pub mod countdown;
pub mod error;
pub mod filter;
mod reconcile;
pub mod session;
mod validate;

pub use auth::Authenticator;
pub use config::SessionConfig;
pub use countdown::CountdownTicker;
pub use error::EngineError;
pub use filter::{filter_lockboxes, UNCATEGORIZED_FILTER};
pub use session::Session;
