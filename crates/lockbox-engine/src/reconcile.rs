//! Background reconciliation loop.
//!
//! The authoritative store re-evaluates lock state against its own clock, so
//! time-driven transitions (unlock completing, open window closing) only
//! become visible through this poll. Tick failures are logged and swallowed;
//! the next tick retries.

use crate::session::{merge_reconciled, SessionState};
use chrono::Utc;
use lockbox_core::SecretStore;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub(crate) struct ReconcileHandle {
    shutdown_tx: watch::Sender<bool>,
    pub(crate) task: JoinHandle<()>,
}

impl ReconcileHandle {
    pub(crate) fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

pub(crate) fn spawn_reconcile_loop(
    store: Arc<dyn SecretStore>,
    state: Arc<Mutex<SessionState>>,
    interval: Duration,
) -> ReconcileHandle {
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    let task = tokio::spawn(async move {
        debug!(interval_ms = interval.as_millis() as u64, "reconcile loop started");
        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                changed = shutdown_rx.changed() => {
                    // A dropped sender means the session is gone.
                    if changed.is_err() || *shutdown_rx.borrow() {
                        debug!("reconcile loop shutting down");
                        return;
                    }
                }
            }

            match store.reconcile_all().await {
                Ok(entries) => {
                    let now = Utc::now().timestamp_millis();
                    let mut guard = state.lock();
                    merge_reconciled(&mut guard, entries, now);
                }
                Err(err) => {
                    // Transient and self-healing; the next tick retries.
                    warn!(error = %err, "reconcile tick failed");
                }
            }
        }
    });

    ReconcileHandle { shutdown_tx, task }
}
