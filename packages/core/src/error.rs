// ABOUTME: The execution error taxonomy
// ABOUTME: Every variant is terminal for one execution and never escapes Engine::execute as a panic/exception

use thiserror::Error;

use crate::types::BuildResult;

/// Error taxonomy for a single execution. All variants produce a failure
/// [`crate::types::ExecutionResult`] with `exit_code = -1`; none of these
/// propagate out of the engine as a Rust panic.
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("no version id was given and the program has no current or latest approved version")]
    VersionUnresolvable,

    #[error("program or version is not eligible for execution: {0}")]
    IneligibleVersion(String),

    #[error("extraction produced an empty project directory")]
    ExtractionEmpty,

    #[error("project validation failed: {0:?}")]
    ValidationFailed(Vec<String>),

    #[error("no language runner could handle this project")]
    NoRunner,

    #[error("build failed")]
    BuildFailed(Box<BuildResult>),

    #[error("execution timed out")]
    Timeout,

    #[error("execution was cancelled")]
    Cancelled,

    #[error("language runner execution failed: {0}")]
    RunnerError(String),

    #[error("infrastructure failure: {0}")]
    Infrastructure(String),
}

impl ExecutionError {
    /// The exit code a failure result carries for this error kind.
    pub fn exit_code(&self) -> i32 {
        -1
    }

    /// A short machine-stable tag, useful for the streaming sink's
    /// `status` field and for structured logging.
    pub fn kind(&self) -> &'static str {
        match self {
            ExecutionError::VersionUnresolvable => "version_unresolvable",
            ExecutionError::IneligibleVersion(_) => "ineligible_version",
            ExecutionError::ExtractionEmpty => "extraction_empty",
            ExecutionError::ValidationFailed(_) => "validation_failed",
            ExecutionError::NoRunner => "no_runner",
            ExecutionError::BuildFailed(_) => "build_failed",
            ExecutionError::Timeout => "timed_out",
            ExecutionError::Cancelled => "cancelled",
            ExecutionError::RunnerError(_) => "runner_error",
            ExecutionError::Infrastructure(_) => "infrastructure",
        }
    }
}
