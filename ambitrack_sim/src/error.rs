//! Error types for the simulation harness.

use ambitrack_core::DisambiguationError;
use thiserror::Error;

/// Errors that can occur while configuring or running the harness.
#[derive(Debug, Error)]
pub enum SimError {
    /// Reading a config or writing an export failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Config or export (de)serialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The engine rejected its configuration or input
    #[error("Engine error: {0}")]
    Engine(#[from] DisambiguationError),

    /// Unknown scenario name or unusable scenario combination
    #[error("Scenario error: {0}")]
    Scenario(String),
}

impl SimError {
    /// Creates a scenario error.
    pub fn scenario(msg: impl Into<String>) -> Self {
        Self::Scenario(msg.into())
    }
}
