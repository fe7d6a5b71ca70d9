use crate::constants::{
    DEFAULT_DETECTION_INTERVAL_MS, DEFAULT_HEADER_MAX_Y_DP, DEFAULT_HEARTBEAT_INTERVAL_MS,
    DEFAULT_OWN_APP_GRACE_MS, DEFAULT_PENDING_STOP_DELAY_MS, DEFAULT_TICK_INTERVAL_MS,
};
use directories::ProjectDirs;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "config.json";
const DATABASE_FILE: &str = "quotaguard.db";

/// Engine tunables. Every field falls back to its default when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Id of the app hosting the block screen and settings.
    pub own_app_id: String,
    /// View hints that count as our own UI surfaces.
    pub own_ui_prefixes: Vec<String>,
    pub detection_interval_ms: i64,
    pub pending_stop_delay_ms: i64,
    pub own_app_grace_ms: i64,
    pub tick_interval_ms: i64,
    pub heartbeat_interval_ms: i64,
    pub header_max_y_dp: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            own_app_id: "com.quotaguard".to_string(),
            own_ui_prefixes: vec!["com.quotaguard".to_string()],
            detection_interval_ms: DEFAULT_DETECTION_INTERVAL_MS,
            pending_stop_delay_ms: DEFAULT_PENDING_STOP_DELAY_MS,
            own_app_grace_ms: DEFAULT_OWN_APP_GRACE_MS,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            heartbeat_interval_ms: DEFAULT_HEARTBEAT_INTERVAL_MS,
            header_max_y_dp: DEFAULT_HEADER_MAX_Y_DP,
        }
    }
}

impl EngineConfig {
    /// Read `path`. A missing file yields defaults; so does a corrupt one,
    /// with a warning.
    pub fn load(path: &Path) -> Self {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                warn!("Could not read {}: {e}; using defaults", path.display());
                return Self::default();
            }
        };

        let config: Self = serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!("Ignoring corrupt engine config {}: {e}", path.display());
            Self::default()
        });
        config.sanitized()
    }

    /// Replace non-positive timings with their defaults. A zero interval
    /// would reschedule a timer at the instant it fired.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        let fields = [
            ("detection_interval_ms", &mut self.detection_interval_ms, defaults.detection_interval_ms),
            ("pending_stop_delay_ms", &mut self.pending_stop_delay_ms, defaults.pending_stop_delay_ms),
            ("own_app_grace_ms", &mut self.own_app_grace_ms, defaults.own_app_grace_ms),
            ("tick_interval_ms", &mut self.tick_interval_ms, defaults.tick_interval_ms),
            ("heartbeat_interval_ms", &mut self.heartbeat_interval_ms, defaults.heartbeat_interval_ms),
        ];
        for (name, value, default) in fields {
            if *value <= 0 {
                warn!("Engine config {name} must be positive, got {value}; using {default}");
                *value = default;
            }
        }
        if !self.header_max_y_dp.is_finite() || self.header_max_y_dp <= 0.0 {
            warn!("Engine config header_max_y_dp must be positive; using {}", defaults.header_max_y_dp);
            self.header_max_y_dp = defaults.header_max_y_dp;
        }
        self
    }

    pub fn is_own_ui(&self, view_hint: Option<&str>) -> bool {
        view_hint.is_some_and(|hint| self.own_ui_prefixes.iter().any(|p| hint.starts_with(p.as_str())))
    }
}

/// Where the host keeps its config file and database.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_file: PathBuf,
    pub database_file: PathBuf,
}

impl AppPaths {
    /// Resolve the platform directories, creating them if needed.
    pub fn resolve() -> io::Result<Self> {
        let dirs = ProjectDirs::from("com", "quotaguard", "QuotaGuard").ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "could not determine project directories")
        })?;
        fs::create_dir_all(dirs.config_dir())?;
        fs::create_dir_all(dirs.data_dir())?;

        Ok(Self {
            config_file: dirs.config_dir().join(CONFIG_FILE),
            database_file: dirs.data_dir().join(DATABASE_FILE),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let config = EngineConfig::load(&dir.path().join("missing.json"));
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, r#"{"pending_stop_delay_ms": 2500, "own_app_id": "org.example.guard"}"#).unwrap();

        let config = EngineConfig::load(&path);
        assert_eq!(config.pending_stop_delay_ms, 2500);
        assert_eq!(config.own_app_id, "org.example.guard");
        assert_eq!(config.tick_interval_ms, DEFAULT_TICK_INTERVAL_MS);
    }

    #[test]
    fn test_corrupt_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "{not json").unwrap();

        assert_eq!(EngineConfig::load(&path), EngineConfig::default());
    }

    #[test]
    fn test_zero_tick_interval_uses_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, r#"{"tick_interval_ms": 0}"#).unwrap();

        let config = EngineConfig::load(&path);
        assert_eq!(config.tick_interval_ms, DEFAULT_TICK_INTERVAL_MS);
    }

    #[test]
    fn test_non_positive_timings_use_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(
            &path,
            r#"{"heartbeat_interval_ms": -5, "pending_stop_delay_ms": 0, "own_app_grace_ms": 0,
                "detection_interval_ms": -1, "header_max_y_dp": 0.0, "tick_interval_ms": 250}"#,
        )
        .unwrap();

        let config = EngineConfig::load(&path);
        assert_eq!(config.heartbeat_interval_ms, DEFAULT_HEARTBEAT_INTERVAL_MS);
        assert_eq!(config.pending_stop_delay_ms, DEFAULT_PENDING_STOP_DELAY_MS);
        assert_eq!(config.own_app_grace_ms, DEFAULT_OWN_APP_GRACE_MS);
        assert_eq!(config.detection_interval_ms, DEFAULT_DETECTION_INTERVAL_MS);
        assert!((config.header_max_y_dp - DEFAULT_HEADER_MAX_Y_DP).abs() < f64::EPSILON);
        assert_eq!(config.tick_interval_ms, 250);
    }

    #[test]
    fn test_own_ui_prefix_match() {
        let config = EngineConfig::default();
        assert!(config.is_own_ui(Some("com.quotaguard.BlockedActivity")));
        assert!(!config.is_own_ui(Some("android.widget.FrameLayout")));
        assert!(!config.is_own_ui(None));
    }
}
