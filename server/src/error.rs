//! Error type shared by the simulation core.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GameError {
    #[error("unknown game mode `{0}`")]
    UnknownGameMode(String),

    #[error("unknown modifier `{0}`")]
    UnknownModifier(String),

    #[error("unknown power-up `{0}`")]
    UnknownPowerUp(String),

    #[error("unknown sampler `{0}`")]
    UnknownSampler(String),

    #[error("unknown AI strategy `{0}`")]
    UnknownStrategy(String),

    #[error("game mode `{mode}` does not support {count} players")]
    InvalidPlayerCount { mode: String, count: usize },

    #[error("missing registry entry `{0}`")]
    MissingRegistryEntry(String),

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("`{unit}` failed: {reason}")]
    Hook { unit: String, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl GameError {
    pub fn hook(unit: impl Into<String>, reason: impl Into<String>) -> Self {
        GameError::Hook {
            unit: unit.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GameError>;
