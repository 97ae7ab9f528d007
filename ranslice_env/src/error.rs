//! Error types for the RanSlice environment abstraction.

use thiserror::Error;

/// Errors that can occur while exchanging artifacts with the radio side.
#[derive(Debug, Error)]
pub enum EnvError {
    /// Reading or writing an artifact file failed
    #[error("I/O error: {0}")]
    Io(String),

    /// Artifact serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Measurements did not arrive in time
    #[error("Timeout after {0}ms")]
    Timeout(u64),

    /// The artifact exists but holds no records
    #[error("Empty artifact: {0}")]
    EmptyArtifact(String),
}

impl EnvError {
    /// Creates an I/O error.
    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    /// Creates an empty-artifact error.
    pub fn empty(path: impl std::fmt::Display) -> Self {
        Self::EmptyArtifact(path.to_string())
    }
}

impl From<std::io::Error> for EnvError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<serde_json::Error> for EnvError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
