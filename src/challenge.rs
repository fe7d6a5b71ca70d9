use crate::error::{QuotaError, Result};
use crate::models::{AuthMode, AuthPurpose, AuthSettings, InterventionMode};
use log::{debug, warn};
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::collections::HashMap;

/// Random string over `[A-Za-z0-9]`.
pub fn generate_challenge(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Outstanding challenges. Each one can be answered once; a wrong answer
/// burns it too.
#[derive(Debug, Default)]
pub struct AuthGate {
    issued: HashMap<AuthPurpose, String>,
    interventions: HashMap<String, String>,
}

impl AuthGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a challenge for `purpose` if its mode uses one. Replaces any
    /// earlier challenge for the same purpose.
    pub fn issue(&mut self, purpose: AuthPurpose, settings: &AuthSettings) -> Option<String> {
        let len = settings.mode_for(purpose).challenge_len()?;
        let challenge = generate_challenge(len);
        self.issued.insert(purpose, challenge.clone());
        debug!("Issued {len}-char challenge for {purpose:?}");
        Some(challenge)
    }

    /// Check `response` against the configured mode for `purpose`.
    pub fn verify(&mut self, purpose: AuthPurpose, settings: &AuthSettings, response: Option<&str>) -> Result<()> {
        let passed = match settings.mode_for(purpose) {
            AuthMode::None => true,
            AuthMode::Password => match settings.password_for(purpose) {
                Some(password) => response == Some(password),
                None => {
                    warn!("{purpose:?} requires a password but none is set");
                    false
                }
            },
            AuthMode::Random32 | AuthMode::Random64 | AuthMode::Random128 => {
                let expected = self.issued.remove(&purpose);
                expected.is_some() && expected.as_deref() == response
            }
        };

        if passed {
            Ok(())
        } else {
            Err(QuotaError::ChallengeFailed)
        }
    }

    pub fn issue_intervention(&mut self, target: &str, mode: InterventionMode) -> Option<String> {
        let challenge = generate_challenge(mode.challenge_len()?);
        self.interventions.insert(target.to_string(), challenge.clone());
        Some(challenge)
    }

    pub fn answer_intervention(&mut self, target: &str, response: &str) -> Result<()> {
        match self.interventions.remove(target) {
            Some(expected) if expected == response => Ok(()),
            Some(_) | None => Err(QuotaError::ChallengeFailed),
        }
    }
}
