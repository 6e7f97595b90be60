use std::time::Duration;

/// Session-scoped tuning. Cadences are explicit parameters rather than
/// literals at the call sites; tests shrink them to keep wall-clock short.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Cadence of the background reconciliation tick.
    pub reconcile_interval: Duration,
    /// Cadence of per-detail-view countdown ticks.
    pub countdown_interval: Duration,
    /// Minimum master password length enforced at set time.
    pub min_password_len: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reconcile_interval: Duration::from_secs(1),
            countdown_interval: Duration::from_secs(1),
            min_password_len: 8,
        }
    }
}
