// ABOUTME: Run plans for the two sandbox modes, and the outcome the driver hands back

use std::collections::HashMap;
use std::path::PathBuf;

use runsafe_ports::ContainerRunSpec;

/// One direct-host process launch: no container, no resource caps beyond
/// what the OS gives a plain child process.
#[derive(Debug, Clone)]
pub struct DirectRunPlan {
    pub argv: Vec<String>,
    pub working_dir: PathBuf,
    pub env: HashMap<String, String>,
}

/// Either mode the driver can run. Sandboxed mode wraps the same
/// `ContainerRunSpec` the tier dispatcher and language runners build.
#[derive(Debug, Clone)]
pub enum RunPlan {
    Direct(DirectRunPlan),
    Sandboxed(ContainerRunSpec),
}

/// What a single child-process run produced, before the tier dispatcher or
/// the runner decides what to do with it.
#[derive(Debug, Clone)]
pub struct SandboxOutcome {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration: chrono::Duration,
    pub cancelled: bool,
    /// Peak resident set size observed while the child ran, in bytes. Best
    /// effort: 0 for sandboxed runs and on platforms without `/proc`.
    pub peak_memory_bytes: u64,
}

impl SandboxOutcome {
    pub fn succeeded(&self) -> bool {
        !self.cancelled && self.exit_code == 0
    }
}
