//! Per-detail-view countdown ticker.
//!
//! One ticker per open detail view, targeting whichever timestamp is active
//! for the viewed entry. Consumers watch the output channel; the task
//! recomputes on a fixed cadence, recomputes immediately when retargeted, and
//! stops scheduling once the countdown bottoms out instead of ticking forever
//! at zero.

use chrono::Utc;
use lockbox_core::countdown::TimeRemaining;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub struct CountdownTicker {
    target_tx: watch::Sender<Option<i64>>,
    output_rx: watch::Receiver<Option<TimeRemaining>>,
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

impl CountdownTicker {
    /// Start ticking toward `target_ms` (`None` = idle). The first value is
    /// published immediately, not at the first tick boundary.
    pub fn spawn(target_ms: Option<i64>, tick: Duration) -> Self {
        let (target_tx, mut target_rx) = watch::channel(target_ms);
        let initial = target_ms.map(|t| TimeRemaining::until(t, now_ms()));
        let (output_tx, output_rx) = watch::channel(initial);
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            loop {
                let target = *target_rx.borrow_and_update();
                let remaining = target.map(|t| TimeRemaining::until(t, now_ms()));
                let _ = output_tx.send(remaining);

                // Once the countdown reaches zero there is nothing left to
                // schedule; only a retarget or shutdown wakes the task.
                let active = remaining.is_some_and(|r| r.total_ms > 0);
                let next_tick = async {
                    if active {
                        tokio::time::sleep(tick).await;
                    } else {
                        std::future::pending::<()>().await;
                    }
                };

                tokio::select! {
                    _ = next_tick => {}
                    changed = target_rx.changed() => {
                        // Sender gone means the handle was dropped.
                        if changed.is_err() {
                            return;
                        }
                        // Loop head recomputes immediately for the new target.
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            return;
                        }
                    }
                }
            }
        });

        Self {
            target_tx,
            output_rx,
            shutdown_tx,
            task,
        }
    }

    /// Swap the target: cancels the pending tick, recomputes immediately and
    /// restarts the schedule.
    pub fn retarget(&self, target_ms: Option<i64>) {
        let _ = self.target_tx.send(target_ms);
    }

    /// Watch the remaining-time breakdown. `None` while idle.
    pub fn subscribe(&self) -> watch::Receiver<Option<TimeRemaining>> {
        self.output_rx.clone()
    }

    pub fn current(&self) -> Option<TimeRemaining> {
        *self.output_rx.borrow()
    }

    /// Cancel the ticker; no further ticks fire.
    pub fn stop(self) {
        let _ = self.shutdown_tx.send(true);
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::timeout;

    #[tokio::test]
    async fn publishes_immediately_and_counts_down_to_zero() {
        let target = now_ms() + 100;
        let ticker = CountdownTicker::spawn(Some(target), Duration::from_millis(20));
        let mut rx = ticker.subscribe();

        let first = rx.borrow_and_update().expect("initial value");
        assert!(first.total_ms <= 100);

        // Wait until the countdown bottoms out.
        let deadline = Duration::from_secs(2);
        let reached_zero = timeout(deadline, async {
            loop {
                if rx.changed().await.is_err() {
                    panic!("ticker died");
                }
                let current = *rx.borrow();
                if current.is_some_and(|r| r.total_ms == 0) {
                    break;
                }
            }
        })
        .await;
        assert!(reached_zero.is_ok(), "countdown never reached zero");
        ticker.stop();
    }

    #[tokio::test]
    async fn retarget_recomputes_without_waiting_for_tick() {
        // Long cadence: any prompt update must come from the retarget path.
        let far = now_ms() + 120_000;
        let ticker = CountdownTicker::spawn(Some(far), Duration::from_secs(60));
        let mut rx = ticker.subscribe();
        let initial = rx.borrow_and_update().expect("initial value");
        assert!(initial.total_ms > 100_000);

        ticker.retarget(Some(now_ms() + 1_000));
        // The 60s cadence means any value this small within 500ms can only
        // come from the immediate retarget recompute.
        let updated = timeout(Duration::from_millis(500), async {
            loop {
                rx.changed().await.expect("ticker died");
                let current = *rx.borrow();
                if current.is_some_and(|r| r.total_ms <= 1_000) {
                    break;
                }
            }
        })
        .await;
        assert!(updated.is_ok(), "no recompute after retarget");
        ticker.stop();
    }

    #[tokio::test]
    async fn idle_target_publishes_none() {
        let ticker = CountdownTicker::spawn(None, Duration::from_millis(20));
        let rx = ticker.subscribe();
        assert!(rx.borrow().is_none());

        ticker.retarget(Some(now_ms() + 50));
        let mut rx = ticker.subscribe();
        let got_value = timeout(Duration::from_millis(500), async {
            loop {
                if rx.changed().await.is_err() {
                    panic!("ticker died");
                }
                if rx.borrow().is_some() {
                    break;
                }
            }
        })
        .await;
        assert!(got_value.is_ok());
        ticker.stop();
    }
}
