use thiserror::Error;

/// Engine error type
#[derive(Debug, Error)]
pub enum QuotaError {
    #[error("Invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    #[error("Target '{target}' belongs to more than one quota config: {configs:?}")]
    ConfigConflict { target: String, configs: Vec<String> },

    #[error("Challenge response did not match")]
    ChallengeFailed,

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Tracker channel closed")]
    ChannelClosed,
}

pub type Result<T> = std::result::Result<T, QuotaError>;

