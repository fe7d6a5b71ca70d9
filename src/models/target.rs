use crate::registry;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A logical target a quota config can cover: an installed app, or a
/// feature inside one that the registry knows how to detect.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TargetId {
    RealApp(String),
    Virtual { id: String, parent: String },
}

impl TargetId {
    /// Build a target from its persisted id. The registry decides whether
    /// the id names a virtual sub-target.
    pub fn new(id: &str) -> Self {
        match registry::parent_of(id) {
            Some(parent) => Self::Virtual {
                id: id.to_string(),
                parent: parent.to_string(),
            },
            None => Self::RealApp(id.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::RealApp(id) | Self::Virtual { id, .. } => id,
        }
    }

    pub fn is_virtual(&self) -> bool {
        matches!(self, Self::Virtual { .. })
    }

    /// The installed app that hosts this target.
    pub fn real_app(&self) -> &str {
        match self {
            Self::RealApp(id) => id,
            Self::Virtual { parent, .. } => parent,
        }
    }
}

impl From<String> for TargetId {
    fn from(id: String) -> Self {
        Self::new(&id)
    }
}

impl From<&str> for TargetId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<TargetId> for String {
    fn from(target: TargetId) -> Self {
        match target {
            TargetId::RealApp(id) | TargetId::Virtual { id, .. } => id,
        }
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
