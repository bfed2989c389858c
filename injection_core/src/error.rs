//! Error types for the injection engine.
//!
//! Evaluation itself never fails; only loading configuration can.

use thiserror::Error;

/// Errors raised while configuring the engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// A configuration value is out of range.
    #[error("config error: {0}")]
    Config(String),

    /// The configuration text is not valid TOML.
    #[error("config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// The configuration file could not be read.
    #[error("config read error: {0}")]
    Io(#[from] std::io::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;
