use crate::constants::MAX_FRAME_SIZE;
use crate::engine::{AdminRequest, BlockRequest, Display, Engine, EngineStatus, Signal};
use crate::error::QuotaError;
use crate::models::{AuthPurpose, AuthSettings, ForegroundEvent, OverlayPosition, QuotaConfig, UsageEvent};
use crate::platform::{Clock, RecordedUsageLog, UsageLog};
use crate::store::QuotaStore;
use crate::tracker::TrackerService;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::io::{self, Read, Write};
use std::sync::mpsc;
use std::thread;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IncomingMessage {
    Foreground(ForegroundEvent),
    Usage(UsageEvent),
    ScreenOff,
    RequestState,
    SaveConfigs {
        configs: Vec<QuotaConfig>,
        #[serde(default)]
        response: Option<String>,
    },
    DeleteConfig {
        config_id: String,
        #[serde(default)]
        response: Option<String>,
    },
    SetOverride {
        config_id: String,
        minutes: i64,
        #[serde(default)]
        response: Option<String>,
    },
    ClearOverride {
        config_id: String,
    },
    SetLockdown {
        hours: i64,
    },
    ClearLockdown {
        #[serde(default)]
        response: Option<String>,
    },
    RequestChallenge {
        purpose: AuthPurpose,
    },
    RequestInterventionChallenge {
        target: String,
    },
    AnswerIntervention {
        target: String,
        response: String,
    },
    SetOverlayPosition {
        target: String,
        position: OverlayPosition,
    },
    SetAuthSettings {
        settings: AuthSettings,
        #[serde(default)]
        response: Option<String>,
    },
}

impl IncomingMessage {
    /// The admin request carried by this message, if it is one.
    fn into_admin(self) -> Option<AdminRequest> {
        let request = match self {
            Self::SaveConfigs { configs, response } => AdminRequest::SaveConfigs { configs, response },
            Self::DeleteConfig { config_id, response } => AdminRequest::DeleteConfig { config_id, response },
            Self::SetOverride {
                config_id,
                minutes,
                response,
            } => AdminRequest::SetOverride {
                config_id,
                minutes,
                response,
            },
            Self::ClearOverride { config_id } => AdminRequest::ClearOverride { config_id },
            Self::SetLockdown { hours } => AdminRequest::SetLockdown { hours },
            Self::ClearLockdown { response } => AdminRequest::ClearLockdown { response },
            Self::RequestChallenge { purpose } => AdminRequest::RequestChallenge { purpose },
            Self::RequestInterventionChallenge { target } => AdminRequest::RequestInterventionChallenge { target },
            Self::AnswerIntervention { target, response } => AdminRequest::AnswerIntervention { target, response },
            Self::SetOverlayPosition { target, position } => AdminRequest::SetOverlayPosition { target, position },
            Self::SetAuthSettings { settings, response } => AdminRequest::SetAuthSettings { settings, response },
            Self::Foreground(_) | Self::Usage(_) | Self::ScreenOff | Self::RequestState => return None,
        };
        Some(request)
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutgoingMessage {
    /// Overlay contents; `display: null` hides it.
    Display { display: Option<Display> },
    Block(BlockRequest),
    /// Admin request applied; carries a challenge when one was issued.
    Ack { challenge: Option<String> },
    State(EngineStatus),
    Error { message: String },
}

impl From<Signal> for OutgoingMessage {
    fn from(signal: Signal) -> Self {
        match signal {
            Signal::DisplayUpdate(display) => Self::Display { display },
            Signal::BlockRequested(request) => Self::Block(request),
        }
    }
}

impl From<QuotaError> for OutgoingMessage {
    fn from(error: QuotaError) -> Self {
        Self::Error {
            message: error.to_string(),
        }
    }
}

/// Read one frame body. `Ok(None)` on a clean end of stream between frames.
pub fn read_frame(reader: &mut impl Read) -> io::Result<Option<Vec<u8>>> {
    let mut len_bytes = [0u8; 4];
    match reader.read_exact(&mut len_bytes) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }

    let len = usize::try_from(u32::from_le_bytes(len_bytes)).unwrap_or(usize::MAX);
    if len > MAX_FRAME_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Message too large: {len} bytes (max: {MAX_FRAME_SIZE} bytes)"),
        ));
    }

    let mut buffer = vec![0u8; len];
    reader.read_exact(&mut buffer)?;
    Ok(Some(buffer))
}

pub fn write_frame<T: Serialize>(writer: &mut impl Write, message: &T) -> io::Result<()> {
    let json = serde_json::to_vec(message)?;
    let len = u32::try_from(json.len())
        .ok()
        .filter(|&len| usize::try_from(len).is_ok_and(|len| len <= MAX_FRAME_SIZE))
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "Outgoing message too large"))?;

    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(&json)?;
    writer.flush()
}

pub struct NativeHost {
    usage: RecordedUsageLog,
}

impl NativeHost {
    /// `usage` records incoming platform usage events; it should be a
    /// separate connection from the one the engine reads through.
    pub fn new(usage: RecordedUsageLog) -> Self {
        Self { usage }
    }

    /// Serve frames from `reader` until end of stream, writing replies and
    /// engine signals to `writer`.
    pub fn run<S, L, C, R, W>(&self, engine: Engine<S, L>, clock: C, mut reader: R, writer: W) -> io::Result<()>
    where
        S: QuotaStore + Send + 'static,
        L: UsageLog + Send + 'static,
        C: Clock + 'static,
        R: Read,
        W: Write + Send + 'static,
    {
        let (outgoing, outgoing_rx) = mpsc::channel::<OutgoingMessage>();
        let writer_handle = thread::spawn(move || {
            let mut writer = writer;
            for message in outgoing_rx {
                write_frame(&mut writer, &message)?;
            }
            Ok::<(), io::Error>(())
        });

        let (signals, signals_rx) = mpsc::channel::<Signal>();
        let bridge_outgoing = outgoing.clone();
        let bridge_handle = thread::spawn(move || {
            for signal in signals_rx {
                if bridge_outgoing.send(signal.into()).is_err() {
                    break;
                }
            }
        });

        let (tracker, tracker_handle) = TrackerService::start(engine, clock, signals);
        info!("Native host ready");

        let result = loop {
            let body = match read_frame(&mut reader) {
                Ok(Some(body)) => body,
                Ok(None) => {
                    info!("Input closed, shutting down");
                    break Ok(());
                }
                Err(e) => break Err(e),
            };

            let reply = match serde_json::from_slice::<IncomingMessage>(&body) {
                Ok(message) => self.handle_message(&tracker, message),
                Err(e) => {
                    warn!("Dropping malformed message: {e}");
                    Some(OutgoingMessage::Error {
                        message: format!("Malformed message: {e}"),
                    })
                }
            };
            if let Some(reply) = reply {
                if outgoing.send(reply).is_err() {
                    break Err(io::Error::new(io::ErrorKind::BrokenPipe, "Writer stopped"));
                }
            }
        };

        tracker.stop();
        if tracker_handle.join().is_err() {
            warn!("Tracker thread panicked");
        }
        if bridge_handle.join().is_err() {
            warn!("Signal bridge panicked");
        }
        drop(outgoing);
        match writer_handle.join() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Writer failed: {e}"),
            Err(_) => warn!("Writer thread panicked"),
        }

        result
    }

    fn handle_message(&self, tracker: &TrackerService, message: IncomingMessage) -> Option<OutgoingMessage> {
        match message {
            IncomingMessage::Foreground(event) => {
                debug!("Foreground {} ({:?})", event.raw_target, event.kind);
                tracker.send_event(event).err().map(OutgoingMessage::from)
            }
            IncomingMessage::Usage(event) => self.usage.record(&event).err().map(|e| {
                warn!("Failed to record usage event: {e}");
                OutgoingMessage::from(e)
            }),
            IncomingMessage::ScreenOff => tracker.screen_off().err().map(OutgoingMessage::from),
            IncomingMessage::RequestState => Some(match tracker.status() {
                Ok(status) => OutgoingMessage::State(status),
                Err(e) => e.into(),
            }),
            admin @ (IncomingMessage::SaveConfigs { .. }
            | IncomingMessage::DeleteConfig { .. }
            | IncomingMessage::SetOverride { .. }
            | IncomingMessage::ClearOverride { .. }
            | IncomingMessage::SetLockdown { .. }
            | IncomingMessage::ClearLockdown { .. }
            | IncomingMessage::RequestChallenge { .. }
            | IncomingMessage::RequestInterventionChallenge { .. }
            | IncomingMessage::AnswerIntervention { .. }
            | IncomingMessage::SetOverlayPosition { .. }
            | IncomingMessage::SetAuthSettings { .. }) => {
                let request = admin.into_admin()?;
                Some(match tracker.admin(request) {
                    Ok(outcome) => OutgoingMessage::Ack {
                        challenge: outcome.challenge,
                    },
                    Err(e) => {
                        info!("Admin request rejected: {e}");
                        e.into()
                    }
                })
            }
        }
    }
}
