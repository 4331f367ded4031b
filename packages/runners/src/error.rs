// ABOUTME: Errors a language runner can raise out of CanHandle/Analyze/Validate/Build/Execute

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("required toolchain is unavailable: {0}")]
    ToolchainUnavailable(String),

    #[error("no runnable entry point could be resolved in this project")]
    NoEntryPoint,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Sandbox(#[from] runsafe_sandbox::SandboxError),

    #[error(transparent)]
    Port(#[from] runsafe_ports::PortError),

    #[error("{0}")]
    Other(String),
}

pub type RunnerResult<T> = std::result::Result<T, RunnerError>;
