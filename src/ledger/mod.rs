use crate::constants::MS_PER_SEC;
use crate::models::{QuotaConfig, TargetId, UsageEvent, UsageEventKind};
use crate::platform::UsageLog;
use crate::store::QuotaStore;
use std::collections::HashMap;

/// Start of the clock-aligned window containing `now_ms`.
pub fn window_start_ms(now_ms: i64, window_ms: i64) -> i64 {
    now_ms.div_euclid(window_ms) * window_ms
}

pub fn window_end_ms(now_ms: i64, window_ms: i64) -> i64 {
    window_start_ms(now_ms, window_ms) + window_ms
}

/// Foreground time of `apps` inside `[window_start_ms, now_ms]`.
///
/// Resumed/Paused events are paired per app. A repeated Resumed restarts
/// the interval, a Paused with no open interval is ignored, and an interval
/// still open at the end is credited up to `now_ms`.
pub fn compute_usage_ms(events: &[UsageEvent], apps: &[&str], window_start_ms: i64, now_ms: i64) -> i64 {
    let mut sorted: Vec<&UsageEvent> = events
        .iter()
        .filter(|e| apps.contains(&e.target.as_str()))
        .collect();
    sorted.sort_by_key(|e| e.timestamp_ms);

    let clip = |start: i64, end: i64| (end.min(now_ms) - start.max(window_start_ms)).max(0);

    let mut open: HashMap<&str, i64> = HashMap::new();
    let mut total = 0;
    for event in sorted {
        match event.kind {
            UsageEventKind::Resumed => {
                open.insert(event.target.as_str(), event.timestamp_ms);
            }
            UsageEventKind::Paused => {
                if let Some(start) = open.remove(event.target.as_str()) {
                    total += clip(start, event.timestamp_ms);
                }
            }
        }
    }

    total + open.values().map(|&start| clip(start, now_ms)).sum::<i64>()
}

/// `max(0, round(quota_minutes * 60) - used_seconds)`.
pub fn compute_remaining_seconds(quota_minutes: f64, used_seconds: i64) -> i64 {
    #[allow(clippy::as_conversions, reason = "validated quota is at most a day of seconds")]
    #[allow(clippy::cast_possible_truncation, reason = "validated quota is at most a day of seconds")]
    let quota_seconds = (quota_minutes * 60.0).round() as i64;
    (quota_seconds - used_seconds).max(0)
}

/// Read-only view over a store and usage log answering quota questions.
pub struct UsageLedger<'a, S: QuotaStore + ?Sized, L: UsageLog + ?Sized> {
    store: &'a S,
    log: &'a L,
}

impl<'a, S: QuotaStore + ?Sized, L: UsageLog + ?Sized> UsageLedger<'a, S, L> {
    pub fn new(store: &'a S, log: &'a L) -> Self {
        Self { store, log }
    }

    /// Milliseconds used by all members of `config` in the current window.
    pub fn used_ms(&self, config: &QuotaConfig, now_ms: i64) -> i64 {
        let window_ms = config.window_ms();
        let window_start = window_start_ms(now_ms, window_ms);

        let real_apps: Vec<&str> = config
            .targets
            .iter()
            .filter_map(|t| match t {
                TargetId::RealApp(id) => Some(id.as_str()),
                TargetId::Virtual { .. } => None,
            })
            .collect();

        let real_ms = if real_apps.is_empty() {
            0
        } else {
            // One window of lookback so a session opened before the
            // rollover still has its Resumed event.
            let events = self.log.query_events(window_start - window_ms, now_ms);
            compute_usage_ms(&events, &real_apps, window_start, now_ms)
        };

        let virtual_ms: i64 = config
            .targets
            .iter()
            .filter(|t| t.is_virtual())
            .map(|t| self.store.virtual_sessions(t.as_str()).used_ms(window_start, now_ms))
            .sum();

        real_ms + virtual_ms
    }

    pub fn used_seconds(&self, config: &QuotaConfig, now_ms: i64) -> i64 {
        self.used_ms(config, now_ms) / MS_PER_SEC
    }

    pub fn remaining_seconds(&self, config: &QuotaConfig, now_ms: i64) -> i64 {
        compute_remaining_seconds(config.quota_minutes, self.used_seconds(config, now_ms))
    }

    pub fn is_exceeded(&self, config: &QuotaConfig, now_ms: i64) -> bool {
        self.remaining_seconds(config, now_ms) == 0
    }

    /// Overrides only count for configs that allow them.
    pub fn override_expiry(&self, config: &QuotaConfig, now_ms: i64) -> Option<i64> {
        if !config.allow_override {
            return None;
        }
        self.store.override_expiry(&config.id, now_ms)
    }

    pub fn is_override_active(&self, config: &QuotaConfig, now_ms: i64) -> bool {
        self.override_expiry(config, now_ms).is_some()
    }

    /// Seconds left on the override, rounded up; 0 when none is active.
    pub fn override_remaining_seconds(&self, config: &QuotaConfig, now_ms: i64) -> i64 {
        self.override_expiry(config, now_ms)
            .map_or(0, |expiry| ceil_seconds(expiry - now_ms))
    }

    /// Blocking-relevant exceeded state: an active override suppresses it.
    pub fn should_block(&self, config: &QuotaConfig, now_ms: i64) -> bool {
        self.is_exceeded(config, now_ms) && !self.is_override_active(config, now_ms)
    }

    pub fn lockdown_expiry(&self, now_ms: i64) -> Option<i64> {
        self.store.lockdown_expiry(now_ms)
    }

    pub fn lockdown_remaining_seconds(&self, now_ms: i64) -> i64 {
        self.lockdown_expiry(now_ms)
            .map_or(0, |expiry| ceil_seconds(expiry - now_ms))
    }
}

fn ceil_seconds(ms: i64) -> i64 {
    (ms.max(0) + MS_PER_SEC - 1) / MS_PER_SEC
}
