//! The tracking state machine.
//!
//! One [`Engine`] owns all tracking state and is driven from a single
//! thread: foreground events via [`Engine::handle_event`], timers via
//! [`Engine::fire_due_timers`], and admin requests via
//! [`Engine::apply_admin`]. Time is always passed in; the engine never reads
//! a clock. Timers are plain deadlines tagged with the session they belong
//! to, and every stop cancels them before touching the session.

mod admin;
mod signal;


pub use admin::{AdminOutcome, AdminRequest};
pub use signal::{BlockMode, BlockReason, BlockRequest, Display, DisplayKind, EngineStatus, Signal};

use crate::challenge::AuthGate;
use crate::config::EngineConfig;
use crate::constants::MS_PER_SEC;
use crate::ledger::{window_end_ms, UsageLedger};
use crate::models::{EventKind, ForegroundEvent, InterventionMode, QuotaConfig, TargetId};
use crate::platform::UsageLog;
use crate::registry;
use crate::resolver::TargetResolver;
use crate::store::QuotaStore;
use log::{debug, error, info, warn};
use std::mem;

#[derive(Debug, Clone)]
struct Session {
    target: TargetId,
    config: QuotaConfig,
    session_start_ms: i64,
    initial_remaining_seconds: i64,
    window_end_ms: i64,
    token: u64,
}

impl Session {
    fn local_remaining_seconds(&self, now_ms: i64) -> i64 {
        let elapsed = (now_ms - self.session_start_ms).max(0) / MS_PER_SEC;
        (self.initial_remaining_seconds - elapsed).max(0)
    }
}

#[derive(Debug, Clone)]
enum TrackingState {
    Idle,
    Tracking(Session),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Deadline {
    at_ms: i64,
    token: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerKind {
    PendingStop,
    Heartbeat,
    Tick,
}

pub struct Engine<S: QuotaStore, L: UsageLog> {
    config: EngineConfig,
    store: S,
    usage_log: L,
    resolver: TargetResolver,
    auth: AuthGate,
    state: TrackingState,
    pending_stop: Option<Deadline>,
    next_heartbeat: Option<Deadline>,
    next_tick: Option<Deadline>,
    last_blocked_event_ms: Option<i64>,
    last_foreground: Option<String>,
    last_token: u64,
}

impl<S: QuotaStore, L: UsageLog> Engine<S, L> {
    pub fn new(config: EngineConfig, store: S, usage_log: L) -> Self {
        let config = config.sanitized();
        Self {
            resolver: TargetResolver::new(&config),
            config,
            store,
            usage_log,
            auth: AuthGate::new(),
            state: TrackingState::Idle,
            pending_stop: None,
            next_heartbeat: None,
            next_tick: None,
            last_blocked_event_ms: None,
            last_foreground: None,
            last_token: 0,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn usage_log(&self) -> &L {
        &self.usage_log
    }

    pub fn tracked_target(&self) -> Option<&TargetId> {
        self.session().map(|s| &s.target)
    }

    pub fn is_tracking(&self) -> bool {
        self.session().is_some()
    }

    pub fn pending_stop_at(&self) -> Option<i64> {
        self.pending_stop.map(|d| d.at_ms)
    }

    /// Earliest time [`Engine::fire_due_timers`] has work to do.
    pub fn next_deadline(&self) -> Option<i64> {
        [self.pending_stop, self.next_heartbeat, self.next_tick]
            .into_iter()
            .flatten()
            .map(|d| d.at_ms)
            .min()
    }

    pub fn status(&self, now_ms: i64) -> EngineStatus {
        let ledger = UsageLedger::new(&self.store, &self.usage_log);
        EngineStatus {
            tracking: self.tracked_target().cloned(),
            display: self.display(now_ms),
            pending_stop_at_ms: self.pending_stop_at(),
            lockdown_until_ms: ledger.lockdown_expiry(now_ms),
            lockdown_remaining_seconds: ledger.lockdown_remaining_seconds(now_ms),
        }
    }

    /// Process one foreground event, using its timestamp as the current
    /// time. Timers that fell due before it are fired first.
    pub fn handle_event(&mut self, event: &ForegroundEvent) -> Vec<Signal> {
        let now = event.timestamp_ms;
        let mut signals = self.fire_due_timers(now);

        let raw = event.raw_target.as_str();
        if event.kind == EventKind::WindowChanged {
            if !registry::is_transient_surface(raw) {
                self.last_foreground = Some(raw.to_string());
            }
        } else if self.last_foreground.as_deref().is_some_and(|last| last != raw) {
            debug!("Dropping {:?} from background window {raw}", event.kind);
            return signals;
        }

        let configs = self.store.quota_configs();
        let target = self.resolver.resolve(&configs, event);
        let config = match QuotaConfig::find_for_target(&configs, target.as_str()) {
            Ok(config) => config.cloned(),
            Err(e) => {
                error!("{e}; ignoring event");
                return signals;
            }
        };

        if let Some(config) = config {
            self.on_covered_target(target, config, now, &mut signals);
        } else if raw == self.config.own_app_id {
            self.on_own_app(event, now, &mut signals);
        } else if registry::is_transient_surface(target.as_str()) {
            debug!("Ignoring transient surface {target}");
        } else if registry::is_launcher(target.as_str()) {
            debug!("Launcher in front");
            self.stop(now, &mut signals);
        } else {
            self.schedule_stop(now);
        }

        signals
    }

    /// Fire every timer due at or before `now_ms`, earliest first.
    pub fn fire_due_timers(&mut self, now_ms: i64) -> Vec<Signal> {
        let mut signals = Vec::new();

        while let Some((kind, deadline)) = self.earliest_due(now_ms) {
            if Some(deadline.token) != self.session().map(|s| s.token) {
                debug!("Dropping stale {kind:?} timer");
                self.clear_timer(kind);
                continue;
            }
            match kind {
                TimerKind::PendingStop => {
                    debug!("Deferred stop fired");
                    self.stop(now_ms, &mut signals);
                }
                TimerKind::Heartbeat => self.heartbeat(now_ms),
                TimerKind::Tick => self.tick(now_ms, &mut signals),
            }
        }

        signals
    }

    /// Screen off or shutdown: stop tracking right away.
    pub fn suspend(&mut self, now_ms: i64) -> Vec<Signal> {
        let mut signals = Vec::new();
        self.stop(now_ms, &mut signals);
        signals
    }

    fn session(&self) -> Option<&Session> {
        match &self.state {
            TrackingState::Tracking(session) => Some(session),
            TrackingState::Idle => None,
        }
    }

    fn session_mut(&mut self) -> Option<&mut Session> {
        match &mut self.state {
            TrackingState::Tracking(session) => Some(session),
            TrackingState::Idle => None,
        }
    }

    fn earliest_due(&self, now_ms: i64) -> Option<(TimerKind, Deadline)> {
        [
            (TimerKind::PendingStop, self.pending_stop),
            (TimerKind::Heartbeat, self.next_heartbeat),
            (TimerKind::Tick, self.next_tick),
        ]
        .into_iter()
        .filter_map(|(kind, deadline)| deadline.map(|d| (kind, d)))
        .filter(|(_, d)| d.at_ms <= now_ms)
        .min_by_key(|(_, d)| d.at_ms)
    }

    fn clear_timer(&mut self, kind: TimerKind) {
        match kind {
            TimerKind::PendingStop => self.pending_stop = None,
            TimerKind::Heartbeat => self.next_heartbeat = None,
            TimerKind::Tick => self.next_tick = None,
        }
    }

    fn cancel_timers(&mut self) {
        self.pending_stop = None;
        self.next_heartbeat = None;
        self.next_tick = None;
    }

    fn on_covered_target(&mut self, target: TargetId, config: QuotaConfig, now: i64, signals: &mut Vec<Signal>) {
        self.last_blocked_event_ms = Some(now);
        self.cancel_pending_stop();

        let (lockdown_expiry, quota_blocked) = {
            let ledger = UsageLedger::new(&self.store, &self.usage_log);
            (ledger.lockdown_expiry(now), ledger.should_block(&config, now))
        };

        if let Some(expiry) = lockdown_expiry {
            info!("Lockdown active, blocking {target}");
            self.block(BlockRequest::new(config, target, BlockReason::Lockdown, Some(expiry)), now, signals);
            return;
        }
        if quota_blocked {
            info!("Quota '{}' exceeded, blocking {target}", config.name);
            let unblock_at = window_end_ms(now, config.window_ms());
            self.block(BlockRequest::new(config, target, BlockReason::QuotaExceeded, Some(unblock_at)), now, signals);
            return;
        }

        let already_tracking = self.tracked_target() == Some(&target);
        if !already_tracking && config.intervention != InterventionMode::None {
            if self.store.consume_intervention_bypass(target.as_str()) {
                info!("Intervention bypass used for {target}");
            } else {
                info!("Intervention required for {target}");
                let challenge = self.auth.issue_intervention(target.as_str(), config.intervention);
                let request = BlockRequest::new(config, target, BlockReason::Intervention, None).with_challenge(challenge);
                self.block(request, now, signals);
                return;
            }
        }

        if already_tracking {
            if let Some(session) = self.session_mut() {
                session.config = config;
            }
        } else {
            self.stop(now, signals);
            self.start(target, config, now);
        }
        signals.push(Signal::DisplayUpdate(self.display(now)));
    }

    fn on_own_app(&mut self, event: &ForegroundEvent, now: i64, signals: &mut Vec<Signal>) {
        let own_ui = self.config.is_own_ui(event.view_hint.as_deref());
        let in_grace = self
            .last_blocked_event_ms
            .is_some_and(|at| now - at < self.config.own_app_grace_ms);

        if !own_ui && (self.is_tracking() || in_grace) {
            debug!("Ignoring own-app hand-off frame");
            return;
        }
        if self.is_tracking() {
            self.schedule_stop(now);
        } else {
            self.stop(now, signals);
        }
    }

    fn start(&mut self, target: TargetId, config: QuotaConfig, now: i64) {
        self.last_token += 1;
        let token = self.last_token;

        if target.is_virtual() {
            if let Err(e) = self.store.start_virtual_session(target.as_str(), now) {
                warn!("Failed to open virtual session for {target}: {e}");
            }
        }

        let initial_remaining_seconds = UsageLedger::new(&self.store, &self.usage_log).remaining_seconds(&config, now);
        info!("Tracking {target} under '{}' with {initial_remaining_seconds}s left", config.name);

        self.next_tick = Some(Deadline {
            at_ms: now + self.config.tick_interval_ms,
            token,
        });
        if target.is_virtual() {
            self.next_heartbeat = Some(Deadline {
                at_ms: now + self.config.heartbeat_interval_ms,
                token,
            });
        }
        self.state = TrackingState::Tracking(Session {
            window_end_ms: window_end_ms(now, config.window_ms()),
            target,
            config,
            session_start_ms: now,
            initial_remaining_seconds,
            token,
        });
    }

    /// Stop tracking. Timers go first so nothing fires into a cleared
    /// session. A no-op when idle.
    fn stop(&mut self, now: i64, signals: &mut Vec<Signal>) {
        self.cancel_timers();

        let TrackingState::Tracking(session) = mem::replace(&mut self.state, TrackingState::Idle) else {
            return;
        };
        if session.target.is_virtual() {
            if let Err(e) = self.store.end_virtual_session(session.target.as_str(), now) {
                warn!("Failed to close virtual session for {}: {e}", session.target);
            }
        }
        info!("Stopped tracking {}", session.target);
        signals.push(Signal::DisplayUpdate(None));
    }

    fn block(&mut self, request: BlockRequest, now: i64, signals: &mut Vec<Signal>) {
        self.stop(now, signals);
        signals.push(Signal::BlockRequested(request));
    }

    fn schedule_stop(&mut self, now: i64) {
        let Some(token) = self.session().map(|s| s.token) else {
            return;
        };
        if self.pending_stop.is_some() {
            return;
        }
        let at_ms = now + self.config.pending_stop_delay_ms;
        debug!("Stop scheduled for {at_ms}");
        self.pending_stop = Some(Deadline { at_ms, token });
    }

    fn cancel_pending_stop(&mut self) {
        if self.pending_stop.take().is_some() {
            debug!("Pending stop cancelled");
        }
    }

    fn heartbeat(&mut self, now: i64) {
        let Some((target, token)) = self.session().map(|s| (s.target.clone(), s.token)) else {
            self.next_heartbeat = None;
            return;
        };
        if let Err(e) = self.store.heartbeat_virtual_session(target.as_str(), now) {
            warn!("Virtual session heartbeat failed for {target}: {e}");
        }
        self.next_heartbeat = Some(Deadline {
            at_ms: now + self.config.heartbeat_interval_ms,
            token,
        });
    }

    /// Local countdown. Blocks as soon as the local estimate hits zero
    /// instead of waiting for the platform log to catch up.
    fn tick(&mut self, now: i64, signals: &mut Vec<Signal>) {
        let Some((target, config_id, window_end, token)) = self
            .session()
            .map(|s| (s.target.clone(), s.config.id.clone(), s.window_end_ms, s.token))
        else {
            self.next_tick = None;
            return;
        };

        let fresh = self
            .store
            .quota_configs()
            .into_iter()
            .find(|c| c.id == config_id && c.covers(target.as_str()));
        let Some(config) = fresh else {
            info!("Config for {target} removed, stopping");
            self.stop(now, signals);
            return;
        };

        let (lockdown_expiry, override_active, rollover_remaining) = {
            let ledger = UsageLedger::new(&self.store, &self.usage_log);
            (
                ledger.lockdown_expiry(now),
                ledger.is_override_active(&config, now),
                (now >= window_end).then(|| ledger.remaining_seconds(&config, now)),
            )
        };

        if let Some(expiry) = lockdown_expiry {
            info!("Lockdown started, blocking {target}");
            self.block(BlockRequest::new(config, target, BlockReason::Lockdown, Some(expiry)), now, signals);
            return;
        }

        let window_ms = config.window_ms();
        let Some(session) = self.session_mut() else {
            return;
        };
        if let Some(initial) = rollover_remaining {
            debug!("Window rolled over for {target}: {initial}s available");
            session.session_start_ms = now;
            session.initial_remaining_seconds = initial;
            session.window_end_ms = window_end_ms(now, window_ms);
        }
        session.config = config.clone();
        let local_remaining = session.local_remaining_seconds(now);
        let window_end = session.window_end_ms;

        if !override_active && local_remaining == 0 {
            info!("Local countdown for {target} reached zero");
            self.block(BlockRequest::new(config, target, BlockReason::QuotaExceeded, Some(window_end)), now, signals);
            return;
        }

        signals.push(Signal::DisplayUpdate(self.display(now)));
        self.next_tick = Some(Deadline {
            at_ms: now + self.config.tick_interval_ms,
            token,
        });
    }

    /// Overlay contents: the override countdown if one is running, else the
    /// local quota countdown.
    fn display(&self, now: i64) -> Option<Display> {
        let session = self.session()?;
        let override_seconds =
            UsageLedger::new(&self.store, &self.usage_log).override_remaining_seconds(&session.config, now);
        let (seconds, kind) = if override_seconds > 0 {
            (override_seconds, DisplayKind::Override)
        } else {
            (session.local_remaining_seconds(now), DisplayKind::Quota)
        };

        Some(Display {
            target: session.target.clone(),
            config_id: session.config.id.clone(),
            config_name: session.config.name.clone(),
            seconds,
            kind,
            overlay_position: self.store.overlay_position(session.target.as_str()),
        })
    }
}
