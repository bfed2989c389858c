//! Engine configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// How secondary keywords take part in triggering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SecondaryKeywordMode {
    /// Secondary keywords are display-only metadata.
    #[default]
    Ignore,
    /// A rule with secondary keywords also needs at least one of them to
    /// appear in the scan text.
    RequireAny,
}

/// Configuration for the injection engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum total token weight injected per turn.
    pub token_budget: u32,

    /// Placed between consecutive rule contents in the injection block.
    pub separator: String,

    /// Optional line placed above a non-empty injection block.
    pub header: Option<String>,

    pub secondary_keywords: SecondaryKeywordMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            token_budget: 2048,
            separator: "\n\n".to_string(),
            header: None,
            secondary_keywords: SecondaryKeywordMode::Ignore,
        }
    }
}

impl EngineConfig {
    /// Default configuration with a different budget.
    pub fn with_budget(token_budget: u32) -> Self {
        Self {
            token_budget,
            ..Self::default()
        }
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> EngineResult<()> {
        if self.separator.is_empty() {
            return Err(EngineError::Config(
                "separator must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Load and validate from TOML text.
    pub fn from_toml_str(text: &str) -> EngineResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> EngineResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}
