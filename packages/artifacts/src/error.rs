// ABOUTME: Artifact collector / log writer error type

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type ArtifactResult<T> = Result<T, ArtifactError>;
