use crate::engine::{AdminOutcome, AdminRequest, Engine, EngineStatus, Signal};
use crate::error::{QuotaError, Result};
use crate::models::ForegroundEvent;
use crate::platform::{Clock, UsageLog};
use crate::store::QuotaStore;
use log::{debug, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

pub enum TrackerCommand {
    Foreground(ForegroundEvent),
    Admin(AdminRequest, Sender<Result<AdminOutcome>>),
    ScreenOff,
    RequestState(Sender<EngineStatus>),
    Shutdown,
}

pub struct TrackerService {
    running: Arc<AtomicBool>,
    commands: Sender<TrackerCommand>,
}

impl TrackerService {
    /// Move `engine` onto a worker thread. Signals it produces are sent to
    /// `signals`.
    pub fn start<S, L, C>(engine: Engine<S, L>, clock: C, signals: Sender<Signal>) -> (Self, thread::JoinHandle<()>)
    where
        S: QuotaStore + Send + 'static,
        L: UsageLog + Send + 'static,
        C: Clock + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let (commands, receiver) = mpsc::channel();

        let worker = Worker {
            engine,
            clock,
            signals,
            running: Arc::clone(&running),
        };
        let handle = thread::spawn(move || worker.run(&receiver));

        (Self { running, commands }, handle)
    }

    pub fn send_event(&self, event: ForegroundEvent) -> Result<()> {
        self.send(TrackerCommand::Foreground(event))
    }

    pub fn screen_off(&self) -> Result<()> {
        self.send(TrackerCommand::ScreenOff)
    }

    /// Apply an admin request and wait for the outcome.
    pub fn admin(&self, request: AdminRequest) -> Result<AdminOutcome> {
        let (reply, response) = mpsc::channel();
        self.send(TrackerCommand::Admin(request, reply))?;
        response.recv().map_err(|_| QuotaError::ChannelClosed)?
    }

    pub fn status(&self) -> Result<EngineStatus> {
        let (reply, response) = mpsc::channel();
        self.send(TrackerCommand::RequestState(reply))?;
        response.recv().map_err(|_| QuotaError::ChannelClosed)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        // The worker may already be gone.
        let _ = self.commands.send(TrackerCommand::Shutdown);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn send(&self, command: TrackerCommand) -> Result<()> {
        self.commands.send(command).map_err(|_| QuotaError::ChannelClosed)
    }
}

struct Worker<S: QuotaStore, L: UsageLog, C: Clock> {
    engine: Engine<S, L>,
    clock: C,
    signals: Sender<Signal>,
    running: Arc<AtomicBool>,
}

impl<S: QuotaStore, L: UsageLog, C: Clock> Worker<S, L, C> {
    fn run(mut self, commands: &Receiver<TrackerCommand>) {
        info!("Tracker started");

        while self.running.load(Ordering::SeqCst) {
            let command = match self.wait_timeout() {
                Some(timeout) => match commands.recv_timeout(timeout) {
                    Ok(command) => Some(command),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => break,
                },
                None => match commands.recv() {
                    Ok(command) => Some(command),
                    Err(_) => break,
                },
            };

            let now = self.clock.now_ms();
            let mut out = self.engine.fire_due_timers(now);
            match command {
                None => {}
                Some(TrackerCommand::Foreground(event)) => out.extend(self.engine.handle_event(&event)),
                Some(TrackerCommand::Admin(request, reply)) => {
                    let result = self.engine.apply_admin(request, now).map(|mut outcome| {
                        out.append(&mut outcome.signals);
                        outcome
                    });
                    if reply.send(result).is_err() {
                        debug!("Admin caller went away before the reply");
                    }
                }
                Some(TrackerCommand::ScreenOff) => out.extend(self.engine.suspend(now)),
                Some(TrackerCommand::RequestState(reply)) => {
                    if reply.send(self.engine.status(now)).is_err() {
                        debug!("State caller went away before the reply");
                    }
                }
                Some(TrackerCommand::Shutdown) => {
                    self.running.store(false, Ordering::SeqCst);
                }
            }
            self.emit(out);
        }

        let out = self.engine.suspend(self.clock.now_ms());
        self.emit(out);
        self.running.store(false, Ordering::SeqCst);
        info!("Tracker stopped");
    }

    /// Time until the next engine deadline; `None` waits for a command.
    fn wait_timeout(&self) -> Option<Duration> {
        let deadline = self.engine.next_deadline()?;
        let wait_ms = u64::try_from(deadline - self.clock.now_ms()).unwrap_or(0);
        Some(Duration::from_millis(wait_ms))
    }

    fn emit(&self, signals: Vec<Signal>) {
        for signal in signals {
            if self.signals.send(signal).is_err() {
                debug!("Signal receiver closed");
                return;
            }
        }
    }
}

impl Drop for TrackerService {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::constants::MS_PER_HOUR;
    use crate::models::QuotaConfig;
    use crate::store::{SqliteStore, KEY_QUOTA_CONFIGS};
    use crate::test_utils::{setup_test_store, StaticUsageLog};
    use std::sync::atomic::AtomicI64;

    const RECV_TIMEOUT: Duration = Duration::from_secs(2);

    #[derive(Clone, Default)]
    struct ManualClock(Arc<AtomicI64>);

    impl Clock for ManualClock {
        fn now_ms(&self) -> i64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    fn engine(configs: &[QuotaConfig]) -> (Engine<SqliteStore, StaticUsageLog>, tempfile::TempDir) {
        let (store, dir) = setup_test_store();
        store.put_json(KEY_QUOTA_CONFIGS, configs).unwrap();
        (Engine::new(EngineConfig::default(), store, StaticUsageLog::default()), dir)
    }

    #[test]
    fn test_tracker_starts_and_stops() {
        let (engine, _dir) = engine(&[]);
        let (signals, _received) = mpsc::channel();

        let (tracker, handle) = TrackerService::start(engine, ManualClock::default(), signals);
        assert!(tracker.is_running());

        tracker.stop();
        handle.join().unwrap();
        assert!(!tracker.is_running());
    }

    #[test]
    fn test_events_flow_through_worker() {
        let config = QuotaConfig::new("A", &["com.example.a"], 10.0, 60);
        let (engine, _dir) = engine(&[config]);
        let (signals, received) = mpsc::channel();
        let (tracker, handle) = TrackerService::start(engine, ManualClock::default(), signals);

        tracker
            .send_event(ForegroundEvent::window_changed("com.example.a", 0))
            .unwrap();
        let Signal::DisplayUpdate(Some(display)) = received.recv_timeout(RECV_TIMEOUT).unwrap() else {
            panic!("expected a display update");
        };
        assert_eq!(display.seconds, 600);

        let status = tracker.status().unwrap();
        assert_eq!(status.tracking.unwrap().as_str(), "com.example.a");

        tracker.screen_off().unwrap();
        assert_eq!(received.recv_timeout(RECV_TIMEOUT).unwrap(), Signal::DisplayUpdate(None));
        assert!(tracker.status().unwrap().tracking.is_none());

        tracker.stop();
        handle.join().unwrap();
    }

    #[test]
    fn test_timers_fire_from_clock() {
        let config = QuotaConfig::new("A", &["com.example.a"], 10.0, 60);
        let (engine, _dir) = engine(&[config]);
        let (signals, received) = mpsc::channel();
        let clock = ManualClock::default();
        let (tracker, handle) = TrackerService::start(engine, clock.clone(), signals);

        tracker
            .send_event(ForegroundEvent::window_changed("com.example.a", 0))
            .unwrap();
        received.recv_timeout(RECV_TIMEOUT).unwrap();

        // The tick is already overdue, so the worker stops waiting at once.
        clock.0.store(5_000, Ordering::SeqCst);
        tracker.status().unwrap();
        let Signal::DisplayUpdate(Some(display)) = received.recv_timeout(RECV_TIMEOUT).unwrap() else {
            panic!("expected a tick");
        };
        assert_eq!(display.seconds, 595);

        tracker.stop();
        handle.join().unwrap();
    }

    #[test]
    fn test_admin_round_trip() {
        let (engine, _dir) = engine(&[]);
        let (signals, _received) = mpsc::channel();
        let (tracker, handle) = TrackerService::start(engine, ManualClock::default(), signals);

        let outcome = tracker.admin(AdminRequest::SetLockdown { hours: 1 }).unwrap();
        assert!(outcome.signals.is_empty());
        let status = tracker.status().unwrap();
        assert_eq!(status.lockdown_until_ms, Some(MS_PER_HOUR));
        assert_eq!(status.lockdown_remaining_seconds, 3_600);

        let err = tracker.admin(AdminRequest::SetLockdown { hours: 0 }).unwrap_err();
        assert!(matches!(err, QuotaError::InvalidInput { .. }));

        tracker.stop();
        handle.join().unwrap();
    }
}
