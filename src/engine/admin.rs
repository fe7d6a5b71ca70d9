use super::{Engine, Signal};
use crate::error::{QuotaError, Result};
use crate::models::{AuthPurpose, AuthSettings, OverlayPosition, QuotaConfig};
use crate::platform::UsageLog;
use crate::store::QuotaStore;
use log::info;

/// Privileged or settings-changing requests from the editor UI.
#[derive(Debug, Clone, PartialEq)]
pub enum AdminRequest {
    SaveConfigs {
        configs: Vec<QuotaConfig>,
        response: Option<String>,
    },
    DeleteConfig {
        config_id: String,
        response: Option<String>,
    },
    SetOverride {
        config_id: String,
        minutes: i64,
        response: Option<String>,
    },
    ClearOverride {
        config_id: String,
    },
    SetLockdown {
        hours: i64,
    },
    ClearLockdown {
        response: Option<String>,
    },
    /// Issue a retype challenge for a gated action.
    RequestChallenge {
        purpose: AuthPurpose,
    },
    /// Re-issue the intervention challenge for a target.
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
        response: Option<String>,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdminOutcome {
    /// Challenge string to show, for challenge requests.
    pub challenge: Option<String>,
    /// Signals caused by the change, e.g. a block when lockdown starts.
    pub signals: Vec<Signal>,
}

impl<S: QuotaStore, L: UsageLog> Engine<S, L> {
    /// Apply an admin request, then re-evaluate the tracked session so the
    /// change takes effect immediately.
    pub fn apply_admin(&mut self, request: AdminRequest, now_ms: i64) -> Result<AdminOutcome> {
        let mut outcome = AdminOutcome::default();

        match request {
            AdminRequest::SaveConfigs { configs, response } => {
                self.verify(AuthPurpose::Settings, response.as_deref())?;
                self.store.save_quota_configs(&configs)?;
            }
            AdminRequest::DeleteConfig { config_id, response } => {
                self.verify(AuthPurpose::Settings, response.as_deref())?;
                if !self.store.delete_quota_config(&config_id)? {
                    return Err(QuotaError::NotFound { entity: "quota config" });
                }
            }
            AdminRequest::SetOverride {
                config_id,
                minutes,
                response,
            } => {
                let config = self
                    .store
                    .quota_configs()
                    .into_iter()
                    .find(|c| c.id == config_id)
                    .ok_or(QuotaError::NotFound { entity: "quota config" })?;
                if !config.allow_override {
                    return Err(QuotaError::InvalidInput {
                        field: "config_id",
                        reason: format!("'{}' does not allow overrides", config.name),
                    });
                }
                self.verify(AuthPurpose::Override, response.as_deref())?;
                self.store.set_override_minutes(&config_id, minutes, now_ms)?;
            }
            AdminRequest::ClearOverride { config_id } => self.store.clear_override(&config_id)?,
            AdminRequest::SetLockdown { hours } => {
                self.store.set_lockdown_hours(hours, now_ms)?;
            }
            AdminRequest::ClearLockdown { response } => {
                self.verify(AuthPurpose::LockdownCancel, response.as_deref())?;
                self.store.clear_lockdown()?;
                info!("Lockdown cancelled");
            }
            AdminRequest::RequestChallenge { purpose } => {
                let settings = self.store.auth_settings();
                outcome.challenge = self.auth.issue(purpose, &settings);
            }
            AdminRequest::RequestInterventionChallenge { target } => {
                let config = QuotaConfig::find_for_target(&self.store.quota_configs(), &target)?
                    .cloned()
                    .ok_or(QuotaError::NotFound { entity: "quota config" })?;
                outcome.challenge = self.auth.issue_intervention(&target, config.intervention);
            }
            AdminRequest::AnswerIntervention { target, response } => {
                self.auth.answer_intervention(&target, &response)?;
                self.store.grant_intervention_bypass(&target)?;
                info!("Intervention passed for {target}");
            }
            AdminRequest::SetOverlayPosition { target, position } => {
                self.store.set_overlay_position(&target, position)?;
            }
            AdminRequest::SetAuthSettings { settings, response } => {
                self.verify(AuthPurpose::Settings, response.as_deref())?;
                self.store.set_auth_settings(&settings)?;
            }
        }

        if self.is_tracking() {
            self.tick(now_ms, &mut outcome.signals);
        }
        Ok(outcome)
    }

    fn verify(&mut self, purpose: AuthPurpose, response: Option<&str>) -> Result<()> {
        let settings = self.store.auth_settings();
        self.auth.verify(purpose, &settings, response)
    }
}
