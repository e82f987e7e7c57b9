use std::time::Duration;

use thiserror::Error;

use crate::core::types::Address;

#[derive(Error, Debug)]
pub enum ForecastError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("State fetch timed out after {after:?}")]
    FetchTimeout { after: Duration },

    #[error("Could not decode {what}: {reason}")]
    Decode { what: &'static str, reason: String },

    #[error("Avatar not found: {0}")]
    AvatarNotFound(Address),

    #[error("No local avatar is loaded")]
    MissingLocalAvatar,

    #[error("Game config state is absent and no fallback is configured")]
    MissingGameConfig,

    #[error("Unknown stage: {0}")]
    UnknownStage(u32),

    #[error("Unknown character: {0}")]
    UnknownCharacter(u32),

    #[error("Trial count must be in 1..=u32::MAX, got {0}")]
    InvalidTrialCount(i64),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Sheet error: {0}")]
    Sheet(String),

    #[error("Simulation worker failed: {0}")]
    WorkerFailed(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
}

impl ForecastError {
    /// Shorthand for a decode failure on a named record kind
    pub fn decode(what: &'static str, reason: impl ToString) -> Self {
        Self::Decode {
            what,
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ForecastError>;
