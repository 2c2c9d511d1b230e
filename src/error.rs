//! Error types for DishaSLAM

use thiserror::Error;

/// DishaSLAM error type
#[derive(Error, Debug)]
pub enum DishaError {
    #[error("Driver error: {0}")]
    Driver(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<toml::de::Error> for DishaError {
    fn from(e: toml::de::Error) -> Self {
        DishaError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DishaError>;
