// ABOUTME: Data model for the project execution engine
// ABOUTME: ExecutionRequest/Session/ProjectStructureAnalysis/ExecutionResult and their parts

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cancel::CancelHandle;
use crate::value::ParameterTree;

/// Which resource tier an execution should run under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionTier {
    Ram,
    Disk,
}

/// Caller-supplied resource overrides for one execution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceLimits {
    pub memory_mb: Option<u64>,
    pub cpus: Option<f64>,
    pub time_minutes: Option<f64>,
}

/// Caller-supplied build configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildArgs {
    pub configuration: Option<String>,
    #[serde(default)]
    pub additional_args: Vec<String>,
    #[serde(default)]
    pub skip_build: bool,
    #[serde(default = "default_true")]
    pub restore_dependencies: bool,
}

fn default_true() -> bool {
    true
}

/// Caller-supplied request to execute a `(program, version)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub program_id: String,
    pub version_id: Option<String>,
    pub user_id: String,
    #[serde(default)]
    pub parameters: ParameterTree,
    #[serde(default)]
    pub environment: HashMap<String, String>,
    #[serde(default)]
    pub resource_limits: Option<ResourceLimits>,
    #[serde(default)]
    pub build_args: BuildArgs,
    #[serde(default = "default_true")]
    pub save_results: bool,
    #[serde(default = "default_true")]
    pub cleanup_on_completion: bool,
    #[serde(default)]
    pub execution_tier: Option<ExecutionTier>,
    #[serde(default)]
    pub job_profile: Option<String>,
}

/// Coarse classification of one file in the project tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileKind {
    CSharpSource,
    PythonSource,
    JavaScriptSource,
    TypeScriptSource,
    Config,
    CSharpSolutionOrProject,
    MavenPom,
    GradleBuild,
    Text,
    Markdown,
    Html,
    Css,
    DockerFile,
    Other,
}

/// One entry in the project's file inventory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileEntry {
    pub relative_path: String,
    pub extension: Option<String>,
    pub size_bytes: u64,
    pub kind: FileKind,
    pub estimated_lines: u64,
}

/// Complexity bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComplexityLevel {
    Simple,
    Moderate,
    Complex,
    VeryComplex,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Complexity {
    pub total_files: usize,
    pub dependency_count: usize,
    pub estimated_total_lines: u64,
    pub score: f64,
    pub level: ComplexityLevel,
}

/// Derived structure analysis for one extracted project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectStructureAnalysis {
    pub language: String,
    pub project_type: String,
    pub entry_points: Vec<String>,
    pub main_entry_point: Option<String>,
    pub source_files: Vec<FileEntry>,
    pub config_files: Vec<FileEntry>,
    pub binary_files: Vec<FileEntry>,
    pub dependencies: Vec<String>,
    pub has_build_file: bool,
    pub complexity: Complexity,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// One finding from the validator (error, warning, or suggestion).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub suggestions: Vec<String>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
        self.suggestions.extend(other.suggestions);
        self.valid = self.valid && other.valid && self.errors.is_empty();
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
        self.valid = false;
    }

    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}

/// A compiler warning parsed out of a runner's build output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilerWarning {
    pub file: Option<String>,
    pub line: Option<u32>,
    pub code: Option<String>,
    pub message: String,
}

/// Result of a runner's `Build` step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildResult {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub warnings: Vec<CompilerWarning>,
    pub duration: chrono::Duration,
}

impl BuildResult {
    pub fn success(stdout: String, stderr: String, warnings: Vec<CompilerWarning>, duration: chrono::Duration) -> Self {
        Self { success: true, stdout, stderr, warnings, duration }
    }

    pub fn failure(stdout: String, stderr: String, duration: chrono::Duration) -> Self {
        Self { success: false, stdout, stderr, warnings: Vec::new(), duration }
    }
}

/// Resource usage observed for one execution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceUsage {
    pub cpu_seconds: f64,
    pub estimated_peak_memory_bytes: u64,
    pub output_bytes: u64,
}

/// Final result of `Engine::execute`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub execution_id: String,
    pub success: bool,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration: chrono::Duration,
    pub resource_usage: ResourceUsage,
    pub output_files: Vec<PathBuf>,
    pub build_result: Option<BuildResult>,
}

impl ExecutionResult {
    pub fn duration_seconds(&self) -> f64 {
        self.duration.num_milliseconds() as f64 / 1000.0
    }
}

/// Internal per-execution session. Lives in the active-sessions
/// registry from creation until the pipeline's `finally` removes it.
pub struct ExecutionSession {
    pub execution_id: String,
    pub started_at: DateTime<Utc>,
    pub version_id: String,
    pub execution_directory: PathBuf,
    pub project_directory: PathBuf,
    pub initial_files: HashSet<String>,
    pub project_structure: Option<ProjectStructureAnalysis>,
    pub runner_name: Option<String>,
    pub package_volume_name: Option<String>,
    pub cancel: CancelHandle,
}

impl ExecutionSession {
    pub fn new(
        execution_id: String,
        version_id: String,
        execution_directory: PathBuf,
        project_directory: PathBuf,
        cancel: CancelHandle,
    ) -> Self {
        Self {
            execution_id,
            started_at: Utc::now(),
            version_id,
            execution_directory,
            project_directory,
            initial_files: HashSet::new(),
            project_structure: None,
            runner_name: None,
            package_volume_name: None,
            cancel,
        }
    }
}
