use crate::models::UsageEvent;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Platform foreground/background log for real apps.
///
/// Best effort: an unavailable log yields no events, never an error.
pub trait UsageLog {
    /// Events with `start_ms <= timestamp_ms <= end_ms`, oldest first.
    fn query_events(&self, start_ms: i64, end_ms: i64) -> Vec<UsageEvent>;
}

impl<T: UsageLog + ?Sized> UsageLog for Arc<T> {
    fn query_events(&self, start_ms: i64, end_ms: i64) -> Vec<UsageEvent> {
        (**self).query_events(start_ms, end_ms)
    }
}

pub trait Clock: Send {
    fn now_ms(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
    }
}
