// ABOUTME: Error type shared by every external-collaborator port
// ABOUTME: Mirrors the per-crate thiserror taxonomy used throughout runsafe

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PortError {
    #[error("{resource} not found: {id}")]
    NotFound { resource: &'static str, id: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type PortResult<T> = std::result::Result<T, PortError>;
