use crate::constants::MS_PER_MINUTE;
use crate::error::{QuotaError, Result};
use crate::models::TargetId;
use serde::{Deserialize, Serialize};

/// Friction required before a blocked target can be re-entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterventionMode {
    #[default]
    None,
    Random32,
    Random64,
    Random128,
}

impl InterventionMode {
    /// Length of the random string the user has to retype.
    pub fn challenge_len(self) -> Option<usize> {
        match self {
            Self::None => None,
            Self::Random32 => Some(32),
            Self::Random64 => Some(64),
            Self::Random128 => Some(128),
        }
    }
}

fn default_combined() -> bool {
    true
}

/// A quota shared by a set of targets, reset on clock-aligned windows.
///
/// Written by the external editor; the engine only reads it. Usage is
/// always pooled across members, whatever `combined_quota` says.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub targets: Vec<TargetId>,
    pub quota_minutes: f64,
    /// One of `ALLOWED_WINDOW_MINUTES`.
    pub window_minutes: u32,
    #[serde(default = "default_combined")]
    pub combined_quota: bool,
    #[serde(default)]
    pub allow_override: bool,
    #[serde(default)]
    pub intervention: InterventionMode,
}

impl QuotaConfig {
    /// Create a new config with a fresh random id (not yet saved).
    pub fn new(name: &str, targets: &[&str], quota_minutes: f64, window_minutes: u32) -> Self {
        Self {
            id: format!("{:016x}", rand::random::<u64>()),
            name: name.to_string(),
            targets: targets.iter().map(|t| TargetId::new(t)).collect(),
            quota_minutes,
            window_minutes,
            combined_quota: true,
            allow_override: false,
            intervention: InterventionMode::None,
        }
    }

    pub fn covers(&self, target: &str) -> bool {
        self.targets.iter().any(|t| t.as_str() == target)
    }

    pub fn window_ms(&self) -> i64 {
        i64::from(self.window_minutes) * MS_PER_MINUTE
    }

    /// Find the single config covering `target`.
    ///
    /// A target listed by more than one config is a configuration error the
    /// editor should have rejected; it is reported, never resolved silently.
    pub fn find_for_target<'a>(configs: &'a [QuotaConfig], target: &str) -> Result<Option<&'a QuotaConfig>> {
        let mut matching = configs.iter().filter(|c| c.covers(target));
        let first = matching.next();
        let rest: Vec<&QuotaConfig> = matching.collect();

        match first {
            Some(config) if rest.is_empty() => Ok(Some(config)),
            Some(config) => Err(QuotaError::ConfigConflict {
                target: target.to_string(),
                configs: std::iter::once(config)
                    .chain(rest)
                    .map(|c| c.id.clone())
                    .collect(),
            }),
            None => Ok(None),
        }
    }

    pub fn is_covered(configs: &[QuotaConfig], target: &str) -> bool {
        configs.iter().any(|c| c.covers(target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry;

    #[test]
    fn test_new_generates_distinct_ids() {
        let a = QuotaConfig::new("Social", &["com.example.a"], 10.0, 60);
        let b = QuotaConfig::new("Social", &["com.example.a"], 10.0, 60);
        assert_ne!(a.id, b.id);
        assert_eq!(a.id.len(), 16);
    }

    #[test]
    fn test_window_ms() {
        let config = QuotaConfig::new("Games", &["com.example.game"], 5.0, 15);
        assert_eq!(config.window_ms(), 15 * 60 * 1000);
    }

    #[test]
    fn test_find_for_target() {
        let configs = vec![
            QuotaConfig::new("Social", &["com.example.a"], 10.0, 60),
            QuotaConfig::new("Games", &["com.example.b"], 5.0, 30),
        ];

        let found = QuotaConfig::find_for_target(&configs, "com.example.b").unwrap();
        assert_eq!(found.map(|c| c.name.as_str()), Some("Games"));

        let missing = QuotaConfig::find_for_target(&configs, "com.example.missing").unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_find_for_target_reports_conflict() {
        let configs = vec![
            QuotaConfig::new("Social", &["com.example.a"], 10.0, 60),
            QuotaConfig::new("Also social", &["com.example.a"], 5.0, 30),
        ];

        let err = QuotaConfig::find_for_target(&configs, "com.example.a").unwrap_err();
        match err {
            QuotaError::ConfigConflict { target, configs: ids } => {
                assert_eq!(target, "com.example.a");
                assert_eq!(ids.len(), 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_deserializes_with_defaults() {
        let json = format!(
            r#"{{"id":"abc","name":"Snap","targets":["{}"],"quota_minutes":2.5,"window_minutes":10}}"#,
            registry::SNAPCHAT_SPOTLIGHT
        );
        let config: QuotaConfig = serde_json::from_str(&json).unwrap();

        assert!(config.combined_quota);
        assert!(!config.allow_override);
        assert_eq!(config.intervention, InterventionMode::None);
        assert!(config.targets.first().is_some_and(TargetId::is_virtual));
    }

    #[test]
    fn test_intervention_challenge_len() {
        assert_eq!(InterventionMode::None.challenge_len(), None);
        assert_eq!(InterventionMode::Random32.challenge_len(), Some(32));
        assert_eq!(InterventionMode::Random128.challenge_len(), Some(128));
    }
}
