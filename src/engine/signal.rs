use crate::models::{InterventionMode, OverlayPosition, QuotaConfig, TargetId};
use serde::Serialize;

/// Which countdown the overlay shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayKind {
    Quota,
    Override,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Display {
    pub target: TargetId,
    pub config_id: String,
    pub config_name: String,
    pub seconds: i64,
    pub kind: DisplayKind,
    pub overlay_position: Option<OverlayPosition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockMode {
    Quota,
    Intervention,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockReason {
    QuotaExceeded,
    Lockdown,
    Intervention,
}

/// Everything the block screen needs to explain itself and send the user
/// back afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockRequest {
    pub config: QuotaConfig,
    pub mode: BlockMode,
    pub reason: BlockReason,
    pub origin: TargetId,
    /// Real app to return to; the parent app for a virtual origin.
    pub return_target: String,
    pub intervention: InterventionMode,
    pub unblock_at_ms: Option<i64>,
    /// Retype challenge for an intervention block.
    pub challenge: Option<String>,
}

impl BlockRequest {
    pub(crate) fn new(config: QuotaConfig, origin: TargetId, reason: BlockReason, unblock_at_ms: Option<i64>) -> Self {
        let mode = match reason {
            BlockReason::QuotaExceeded | BlockReason::Lockdown => BlockMode::Quota,
            BlockReason::Intervention => BlockMode::Intervention,
        };
        Self {
            intervention: config.intervention,
            return_target: origin.real_app().to_string(),
            config,
            mode,
            reason,
            origin,
            unblock_at_ms,
            challenge: None,
        }
    }

    pub(crate) fn with_challenge(mut self, challenge: Option<String>) -> Self {
        self.challenge = challenge;
        self
    }
}

/// Side effects requested by the engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "signal", content = "data", rename_all = "snake_case")]
pub enum Signal {
    /// New overlay contents; `None` hides the overlay.
    DisplayUpdate(Option<Display>),
    BlockRequested(BlockRequest),
}

/// Snapshot of the engine for status queries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineStatus {
    pub tracking: Option<TargetId>,
    pub display: Option<Display>,
    pub pending_stop_at_ms: Option<i64>,
    pub lockdown_until_ms: Option<i64>,
    /// Seconds of lockdown left, rounded up; 0 when none is active.
    pub lockdown_remaining_seconds: i64,
}
