use crate::constants::{
    ALLOWED_WINDOW_MINUTES, MAX_CONFIG_NAME_LEN, MAX_LOCKDOWN_HOURS, MAX_OVERRIDE_MINUTES,
    MAX_QUOTA_MINUTES,
};
use crate::error::{QuotaError, Result};
use crate::models::QuotaConfig;
use std::collections::{HashMap, HashSet};

/// Validate one config on its own.
pub fn validate_quota_config(config: &QuotaConfig) -> Result<()> {
    if config.id.trim().is_empty() {
        return Err(QuotaError::InvalidInput {
            field: "id",
            reason: "must not be empty".to_string(),
        });
    }

    let name = config.name.trim();
    if name.is_empty() {
        return Err(QuotaError::InvalidInput {
            field: "name",
            reason: "must not be empty".to_string(),
        });
    }
    if name.chars().count() > MAX_CONFIG_NAME_LEN {
        return Err(QuotaError::InvalidInput {
            field: "name",
            reason: format!("must be at most {MAX_CONFIG_NAME_LEN} characters"),
        });
    }

    if !config.quota_minutes.is_finite() || config.quota_minutes <= 0.0 || config.quota_minutes > MAX_QUOTA_MINUTES {
        return Err(QuotaError::InvalidInput {
            field: "quota_minutes",
            reason: format!("must be positive and at most {MAX_QUOTA_MINUTES}"),
        });
    }

    if !ALLOWED_WINDOW_MINUTES.contains(&config.window_minutes) {
        return Err(QuotaError::InvalidInput {
            field: "window_minutes",
            reason: format!("must be one of {ALLOWED_WINDOW_MINUTES:?}"),
        });
    }

    if config.targets.is_empty() {
        return Err(QuotaError::InvalidInput {
            field: "targets",
            reason: "must list at least one target".to_string(),
        });
    }
    let mut seen = HashSet::new();
    for target in &config.targets {
        if target.as_str().trim().is_empty() {
            return Err(QuotaError::InvalidInput {
                field: "targets",
                reason: "target ids must not be empty".to_string(),
            });
        }
        if !seen.insert(target.as_str()) {
            return Err(QuotaError::InvalidInput {
                field: "targets",
                reason: format!("'{target}' is listed twice"),
            });
        }
    }

    Ok(())
}

/// Validate a whole config set: each config, unique ids, and no target in
/// more than one config.
pub fn validate_quota_configs(configs: &[QuotaConfig]) -> Result<()> {
    let mut ids = HashSet::new();
    let mut owners: HashMap<&str, &str> = HashMap::new();

    for config in configs {
        validate_quota_config(config)?;

        if !ids.insert(config.id.as_str()) {
            return Err(QuotaError::InvalidInput {
                field: "id",
                reason: format!("'{}' is used by more than one config", config.id),
            });
        }

        for target in &config.targets {
            if let Some(owner) = owners.insert(target.as_str(), config.id.as_str()) {
                return Err(QuotaError::ConfigConflict {
                    target: target.to_string(),
                    configs: vec![owner.to_string(), config.id.clone()],
                });
            }
        }
    }

    Ok(())
}

pub fn validate_override_minutes(minutes: i64) -> Result<()> {
    if !(1..=MAX_OVERRIDE_MINUTES).contains(&minutes) {
        return Err(QuotaError::InvalidInput {
            field: "minutes",
            reason: format!("must be between 1 and {MAX_OVERRIDE_MINUTES}"),
        });
    }
    Ok(())
}

pub fn validate_lockdown_hours(hours: i64) -> Result<()> {
    if !(1..=MAX_LOCKDOWN_HOURS).contains(&hours) {
        return Err(QuotaError::InvalidInput {
            field: "hours",
            reason: format!("must be between 1 and {MAX_LOCKDOWN_HOURS}"),
        });
    }
    Ok(())
}
