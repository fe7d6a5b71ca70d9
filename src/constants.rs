// src/constants.rs

/// Milliseconds in one second
pub const MS_PER_SEC: i64 = 1000;

/// Milliseconds in one minute
pub const MS_PER_MINUTE: i64 = 60 * MS_PER_SEC;

/// Milliseconds in one hour
pub const MS_PER_HOUR: i64 = 60 * MS_PER_MINUTE;

/// Milliseconds in one day (24 * 60 * 60 * 1000)
pub const MS_PER_DAY: i64 = 24 * MS_PER_HOUR;

/// Clock-aligned window lengths a quota config may use, in minutes
pub const ALLOWED_WINDOW_MINUTES: [u32; 6] = [5, 10, 15, 20, 30, 60];

/// Maximum quota in minutes (24 hours)
pub const MAX_QUOTA_MINUTES: f64 = 24.0 * 60.0;

/// Maximum override length in minutes (24 hours)
pub const MAX_OVERRIDE_MINUTES: i64 = 24 * 60;

/// Maximum lockdown length in hours (one week)
pub const MAX_LOCKDOWN_HOURS: i64 = 7 * 24;

/// Maximum quota config name length
pub const MAX_CONFIG_NAME_LEN: usize = 100;

/// Virtual session records whose last point is older than this are pruned
pub const VIRTUAL_SESSION_RETENTION_MS: i64 = 7 * MS_PER_DAY;

/// Recorded platform usage events older than this are pruned
pub const USAGE_EVENT_RETENTION_MS: i64 = 7 * MS_PER_DAY;

/// Minimum interval between two feature detections for the same host
pub const DEFAULT_DETECTION_INTERVAL_MS: i64 = 400;

/// Debounce before a switch to an unrelated app stops tracking
pub const DEFAULT_PENDING_STOP_DELAY_MS: i64 = 1000;

/// Grace period after a blocked-target event during which our own
/// non-UI events are ignored
pub const DEFAULT_OWN_APP_GRACE_MS: i64 = 1500;

/// Local countdown tick interval
pub const DEFAULT_TICK_INTERVAL_MS: i64 = 1000;

/// Virtual session heartbeat interval
pub const DEFAULT_HEARTBEAT_INTERVAL_MS: i64 = 1000;

/// Labels above this vertical offset (in dp) count as header tabs
pub const DEFAULT_HEADER_MAX_Y_DP: f64 = 260.0;

/// Host bridge frame size limit (1 MiB)
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;
