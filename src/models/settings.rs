use serde::{Deserialize, Serialize};

/// Saved overlay position for one target, in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayPosition {
    pub x: i32,
    pub y: i32,
}

/// How a privileged action has to be confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    #[default]
    None,
    Password,
    Random32,
    Random64,
    Random128,
}

impl AuthMode {
    pub fn challenge_len(self) -> Option<usize> {
        match self {
            Self::None | Self::Password => None,
            Self::Random32 => Some(32),
            Self::Random64 => Some(64),
            Self::Random128 => Some(128),
        }
    }
}

/// Actions gated behind [`AuthSettings`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthPurpose {
    Override,
    LockdownCancel,
    Settings,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    pub override_mode: AuthMode,
    pub lockdown_cancel_mode: AuthMode,
    pub settings_mode: AuthMode,
    pub override_password: Option<String>,
    pub lockdown_password: Option<String>,
    pub settings_password: Option<String>,
}

impl AuthSettings {
    pub fn mode_for(&self, purpose: AuthPurpose) -> AuthMode {
        match purpose {
            AuthPurpose::Override => self.override_mode,
            AuthPurpose::LockdownCancel => self.lockdown_cancel_mode,
            AuthPurpose::Settings => self.settings_mode,
        }
    }

    pub fn password_for(&self, purpose: AuthPurpose) -> Option<&str> {
        match purpose {
            AuthPurpose::Override => self.override_password.as_deref(),
            AuthPurpose::LockdownCancel => self.lockdown_password.as_deref(),
            AuthPurpose::Settings => self.settings_password.as_deref(),
        }
    }
}
