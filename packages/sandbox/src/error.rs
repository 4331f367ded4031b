// ABOUTME: Errors the sandbox driver can raise, distinct from PortError (which covers the collaborators it calls)

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SandboxError {
    #[error("failed to spawn child process: {0}")]
    Spawn(String),

    #[error("container runtime error: {0}")]
    Runtime(#[from] runsafe_ports::PortError),

    #[error("I/O error while pumping child output: {0}")]
    Io(#[from] std::io::Error),
}

pub type SandboxResult<T> = std::result::Result<T, SandboxError>;
