use serde::{Deserialize, Serialize};

const MS_PER_SECOND: i64 = 1_000;
const MS_PER_MINUTE: i64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: i64 = 60 * MS_PER_MINUTE;
const MS_PER_DAY: i64 = 24 * MS_PER_HOUR;

/// Remaining-time breakdown toward a target instant.
///
/// `total_ms` is clamped to zero; each unit is the integer quotient of the
/// remainder left by the next-larger unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRemaining {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
    pub total_ms: i64,
}

impl TimeRemaining {
    pub fn until(target_ms: i64, now_ms: i64) -> Self {
        let total_ms = (target_ms - now_ms).max(0);
        Self {
            days: total_ms / MS_PER_DAY,
            hours: (total_ms % MS_PER_DAY) / MS_PER_HOUR,
            minutes: (total_ms % MS_PER_HOUR) / MS_PER_MINUTE,
            seconds: (total_ms % MS_PER_MINUTE) / MS_PER_SECOND,
            total_ms,
        }
    }

    pub fn is_elapsed(&self) -> bool {
        self.total_ms == 0
    }
}

/// `HH:MM:SS`, zero-padded, with a leading day segment only when days > 0.
pub fn format_remaining(remaining: Option<&TimeRemaining>) -> String {
    let Some(t) = remaining else {
        return "00:00:00".to_string();
    };
    if t.total_ms <= 0 {
        return "00:00:00".to_string();
    }
    let clock = format!("{:02}:{:02}:{:02}", t.hours, t.minutes, t.seconds);
    if t.days > 0 {
        format!("{}d {clock}", t.days)
    } else {
        clock
    }
}

/// Human-readable label for a configured delay, largest whole unit only.
pub fn format_delay(seconds: i64) -> String {
    if seconds < 60 {
        let s = seconds;
        return format!("{s} second{}", if s == 1 { "" } else { "s" });
    }
    if seconds < 3_600 {
        let m = seconds / 60;
        return format!("{m} minute{}", if m == 1 { "" } else { "s" });
    }
    if seconds < 86_400 {
        let h = seconds / 3_600;
        return format!("{h} hour{}", if h == 1 { "" } else { "s" });
    }
    let d = seconds / 86_400;
    format!("{d} day{}", if d == 1 { "" } else { "s" })
}
