// ABOUTME: The project execution engine: ties the analyzer, validator, runner registry, and tier
// ABOUTME: dispatcher together behind Execute/Cancel/Validate/Analyze, plus session bookkeeping

mod broadcast;
mod extract;
mod pipeline;
mod sessions;

use std::sync::Arc;

use chrono::Utc;
use runsafe_analyzer::Analyzer;
use runsafe_config::EngineConfig;
use runsafe_core::ids::generate_execution_id;
use runsafe_core::paths;
use runsafe_core::types::{ExecutionRequest, ExecutionResult, ExecutionSession, ProjectStructureAnalysis, ResourceUsage, ValidationResult};
use runsafe_core::{CancelHandle, ExecutionError};
use runsafe_ports::{ArtifactStore, CompletedEvent, ContainerRuntime, ProgramRepository, StreamSink, StreamStatus, UiComponentRepository, VersionRepository, WorkflowInputsProvider};
use runsafe_runners::{RunnerRegistry, TierDispatch};
use runsafe_tiers::TierDispatcher;
use runsafe_validator::Validator;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

pub use broadcast::StreamEvent;

use pipeline::StepState;

/// The execution engine. One instance is typically shared (behind an
/// `Arc`) across every caller in a process; it owns no per-execution state
/// beyond the active-sessions registry.
pub struct Engine {
    config: Arc<EngineConfig>,
    artifact_store: Arc<dyn ArtifactStore>,
    program_repo: Arc<dyn ProgramRepository>,
    version_repo: Arc<dyn VersionRepository>,
    ui_components: Arc<dyn UiComponentRepository>,
    workflow_inputs: Arc<dyn WorkflowInputsProvider>,
    container_runtime: Option<Arc<dyn ContainerRuntime>>,
    registry: Arc<RunnerRegistry>,
    analyzer: Analyzer,
    validator: Validator,
    dispatch: Arc<dyn TierDispatch>,
    sessions: sessions::SessionRegistry,
    combined_sink: Arc<broadcast::CombinedSink>,
}

impl Engine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Arc<EngineConfig>,
        artifact_store: Arc<dyn ArtifactStore>,
        program_repo: Arc<dyn ProgramRepository>,
        version_repo: Arc<dyn VersionRepository>,
        ui_components: Arc<dyn UiComponentRepository>,
        workflow_inputs: Arc<dyn WorkflowInputsProvider>,
        container_runtime: Option<Arc<dyn ContainerRuntime>>,
        external_sink: Option<Arc<dyn StreamSink>>,
    ) -> Self {
        let registry = Arc::new(RunnerRegistry::with_defaults());
        let analyzer = Analyzer::new(registry.clone());
        let validator = Validator::new(config.clone(), registry.clone());
        let dispatch: Arc<dyn TierDispatch> = Arc::new(TierDispatcher::new(config.clone(), container_runtime.clone()));

        Self {
            config,
            artifact_store,
            program_repo,
            version_repo,
            ui_components,
            workflow_inputs,
            container_runtime,
            registry,
            analyzer,
            validator,
            dispatch,
            sessions: sessions::SessionRegistry::new(),
            combined_sink: Arc::new(broadcast::CombinedSink::new(external_sink)),
        }
    }

    /// Runs one `(program, version)` to completion under a fresh execution
    /// id. Never returns a Rust error: every exceptional flow is reported
    /// as a failure-shaped [`ExecutionResult`].
    #[instrument(skip(self, request, request_token), fields(program_id = %request.program_id))]
    pub async fn execute(&self, request: ExecutionRequest, request_token: Option<CancellationToken>) -> ExecutionResult {
        let execution_id = generate_execution_id();
        let started_at = Utc::now();

        let timeout_minutes = request
            .resource_limits
            .as_ref()
            .and_then(|r| r.time_minutes)
            .unwrap_or(self.config.default_timeout_minutes);
        let deadline = std::time::Duration::from_secs_f64(timeout_minutes.max(0.0) * 60.0);

        let cancel = CancelHandle::new(request_token.unwrap_or_default(), Some(deadline));

        let session = ExecutionSession::new(
            execution_id.clone(),
            request.version_id.clone().unwrap_or_default(),
            self.config.working_directory.clone(),
            self.config.working_directory.clone(),
            cancel.clone(),
        );
        self.sessions.register(session);

        let volume_name = runsafe_core::ids::generate_volume_name(&execution_id);
        let package_volume_name = if let Some(runtime) = &self.container_runtime {
            match runtime.create_volume(&volume_name).await {
                Ok(()) => Some(volume_name),
                Err(e) => {
                    warn!(execution_id = %execution_id, error = %e, "failed to create package-cache volume; continuing without one");
                    None
                }
            }
        } else {
            None
        };

        let mut state = StepState::default();
        let result = self
            .run_pipeline(&request, &execution_id, &cancel, package_volume_name, &mut state)
            .await;

        self.cleanup(&request, &execution_id, &state).await;
        self.sessions.deregister(&execution_id);

        let completed_at = Utc::now();
        let execution_result = self
            .build_result(&execution_id, started_at, completed_at, &result, &state, &request, &cancel)
            .await;

        if let Some(root) = &state.execution_root {
            if let Err(e) = runsafe_artifacts::write_logs(&paths::logs_dir(root), &execution_result).await {
                warn!(execution_id = %execution_id, error = %e, "failed to persist execution logs");
            }
        }

        self.combined_sink
            .stream_completed(&execution_id, completed_event(&result, &execution_result))
            .await;

        info!(execution_id = %execution_id, success = execution_result.success, "execution finished");
        execution_result
    }

    async fn cleanup(&self, request: &ExecutionRequest, execution_id: &str, state: &StepState) {
        if let Some(name) = &state.package_volume_name {
            if let Some(runtime) = &self.container_runtime {
                if let Err(e) = runtime.delete_volume(name).await {
                    warn!(execution_id, error = %e, "failed to delete package-cache volume");
                }
            }
        }

        if request.cleanup_on_completion {
            if let Some(root) = &state.execution_root {
                if let Err(e) = tokio::fs::remove_dir_all(paths::project_dir(root)).await {
                    warn!(execution_id, error = %e, "failed to clean up project directory");
                }
            }
        }
    }

    async fn build_result(
        &self,
        execution_id: &str,
        started_at: chrono::DateTime<Utc>,
        completed_at: chrono::DateTime<Utc>,
        result: &Result<(), ExecutionError>,
        state: &StepState,
        request: &ExecutionRequest,
        cancel: &CancelHandle,
    ) -> ExecutionResult {
        let duration = completed_at - started_at;

        let (success, exit_code, stdout, stderr, error_message) = match (result, &state.outcome) {
            (Ok(()), Some(outcome)) => (outcome.succeeded(), outcome.exit_code, outcome.stdout.clone(), outcome.stderr.clone(), None),
            (Err(e), Some(outcome)) => (false, outcome.exit_code, outcome.stdout.clone(), outcome.stderr.clone(), Some(e.to_string())),
            (Err(e), None) => (false, e.exit_code(), String::new(), String::new(), Some(e.to_string())),
            (Ok(()), None) => (false, -1, String::new(), String::new(), Some("pipeline reported success without an outcome".to_string())),
        };

        let output_files = if request.save_results {
            match (&state.initial_files, &state.execution_root) {
                (Some(initial), Some(root)) => {
                    match runsafe_artifacts::collect(&paths::project_dir(root), &paths::outputs_dir(root), initial, cancel).await {
                        Ok(files) => files,
                        Err(e) => {
                            warn!(execution_id, error = %e, "failed to collect output artifacts");
                            Vec::new()
                        }
                    }
                }
                _ => Vec::new(),
            }
        } else {
            Vec::new()
        };

        let resource_usage = ResourceUsage {
            cpu_seconds: duration.num_milliseconds() as f64 / 1000.0,
            estimated_peak_memory_bytes: state.outcome.as_ref().map(|o| o.peak_memory_bytes).unwrap_or(0),
            output_bytes: (stdout.len() + stderr.len()) as u64,
        };

        ExecutionResult {
            execution_id: execution_id.to_string(),
            success,
            exit_code,
            stdout,
            stderr,
            error_message,
            started_at,
            completed_at,
            duration,
            resource_usage,
            output_files,
            build_result: state.build_result.clone(),
        }
    }

    /// Cancels a running execution by id. Returns `false` if no such
    /// execution is currently registered (it may already have finished).
    pub fn cancel(&self, execution_id: &str) -> bool {
        self.sessions.cancel(execution_id)
    }

    /// Extracts `(program_id, version_id)` into a scratch directory and
    /// validates it, deleting the scratch directory on the way out
    /// regardless of outcome.
    pub async fn validate(&self, program_id: &str, version_id: &str) -> Result<ValidationResult, ExecutionError> {
        let scratch = tempfile::tempdir().map_err(|e| ExecutionError::Infrastructure(e.to_string()))?;
        let written = extract::extract_into(self.artifact_store.as_ref(), program_id, version_id, scratch.path())
            .await
            .map_err(|e| ExecutionError::Infrastructure(e.to_string()))?;
        if written == 0 {
            return Err(ExecutionError::ExtractionEmpty);
        }
        Ok(self.validator.validate(scratch.path()).await)
    }

    /// Extracts `(program_id, version_id)` into a scratch directory and
    /// analyzes it, deleting the scratch directory on the way out.
    pub async fn analyze(&self, program_id: &str, version_id: &str) -> Result<ProjectStructureAnalysis, ExecutionError> {
        let scratch = tempfile::tempdir().map_err(|e| ExecutionError::Infrastructure(e.to_string()))?;
        let written = extract::extract_into(self.artifact_store.as_ref(), program_id, version_id, scratch.path())
            .await
            .map_err(|e| ExecutionError::Infrastructure(e.to_string()))?;
        if written == 0 {
            return Err(ExecutionError::ExtractionEmpty);
        }
        Ok(self.analyzer.analyze(scratch.path()).await)
    }

    /// Removes execution directories under the working directory that are
    /// older than `max_age` and have no corresponding active session —
    /// leftovers from a process that was killed mid-execution, or from a
    /// misconfigured `cleanup_on_completion = false` caller that never came
    /// back to collect its results.
    pub async fn cleanup_stale(&self, max_age: chrono::Duration) -> std::io::Result<usize> {
        let active = self.sessions.active_ids();
        let now = Utc::now();
        let mut removed = 0usize;

        let mut programs = match tokio::fs::read_dir(&self.config.working_directory).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e),
        };

        while let Some(program_entry) = programs.next_entry().await? {
            if !program_entry.file_type().await?.is_dir() {
                continue;
            }
            let Ok(mut versions) = tokio::fs::read_dir(program_entry.path()).await else {
                continue;
            };
            while let Some(version_entry) = versions.next_entry().await? {
                let executions_dir = version_entry.path().join("execution");
                let Ok(mut executions) = tokio::fs::read_dir(&executions_dir).await else {
                    continue;
                };
                while let Some(exec_entry) = executions.next_entry().await? {
                    let id = exec_entry.file_name().to_string_lossy().to_string();
                    if active.contains(&id) {
                        continue;
                    }
                    let metadata = exec_entry.metadata().await?;
                    let modified: chrono::DateTime<Utc> = metadata.modified()?.into();
                    if now.signed_duration_since(modified) > max_age && tokio::fs::remove_dir_all(exec_entry.path()).await.is_ok() {
                        removed += 1;
                    }
                }
            }
        }

        Ok(removed)
    }

    /// Subscribes to every stream event across every execution this engine
    /// drives, independent of whatever external sink a caller configured.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<StreamEvent> {
        self.combined_sink.subscribe()
    }
}

fn completed_event(result: &Result<(), ExecutionError>, execution_result: &ExecutionResult) -> CompletedEvent {
    let status = match result {
        Ok(()) => StreamStatus::Completed,
        Err(ExecutionError::Timeout) => StreamStatus::TimedOut,
        Err(ExecutionError::Cancelled) => StreamStatus::Cancelled,
        Err(_) => StreamStatus::Failed,
    };
    CompletedEvent {
        status,
        exit_code: execution_result.exit_code,
        error_message: execution_result.error_message.clone(),
        completed_at: execution_result.completed_at,
        duration_seconds: execution_result.duration_seconds(),
        success: execution_result.success,
        output_files: execution_result.output_files.iter().map(|p| p.to_string_lossy().to_string()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runsafe_ports::fakes::{DirectSpawnRuntime, FakeArtifactStore, FakeMetadataStore, FixedWorkflowInputsProvider, RecordingStreamSink};
    use runsafe_ports::{ProgramStatus, VersionStatus};

    fn test_engine(metadata: Arc<FakeMetadataStore>, artifacts: Arc<FakeArtifactStore>) -> (Engine, Arc<RecordingStreamSink>, tempfile::TempDir) {
        let working_dir = tempfile::tempdir().unwrap();
        let mut config = EngineConfig::default();
        config.working_directory = working_dir.path().to_path_buf();
        config.enable_sandbox = false;
        config.enable_security_scanning = false;

        let sink = Arc::new(RecordingStreamSink::new());

        let engine = Engine::new(
            Arc::new(config),
            artifacts,
            metadata.clone() as Arc<dyn ProgramRepository>,
            metadata.clone() as Arc<dyn VersionRepository>,
            metadata as Arc<dyn UiComponentRepository>,
            Arc::new(FixedWorkflowInputsProvider::default()),
            Some(Arc::new(DirectSpawnRuntime::new())),
            Some(sink.clone() as Arc<dyn StreamSink>),
        );
        (engine, sink, working_dir)
    }

    fn base_request(program_id: &str) -> ExecutionRequest {
        ExecutionRequest {
            program_id: program_id.to_string(),
            version_id: None,
            user_id: "user-1".to_string(),
            parameters: Default::default(),
            environment: Default::default(),
            resource_limits: None,
            build_args: Default::default(),
            save_results: true,
            cleanup_on_completion: false,
            execution_tier: None,
            job_profile: None,
        }
    }

    #[tokio::test]
    async fn happy_path_runs_a_python_script_end_to_end() {
        let metadata = Arc::new(FakeMetadataStore::new());
        metadata.add_program("prog1", Some("v1"), ProgramStatus::Active);
        metadata.add_version("v1", "prog1", 1, VersionStatus::Approved);

        let artifacts = Arc::new(FakeArtifactStore::new());
        artifacts.put_file("prog1", "v1", "main.py", "print('hello from runsafe')\n");

        let (engine, sink, _working_dir) = test_engine(metadata, artifacts);
        let result = engine.execute(base_request("prog1"), None).await;

        assert!(result.success, "expected success, got {result:?}");
        assert_eq!(result.exit_code, 0);
        assert!(result.stdout.contains("hello from runsafe"));
        assert_eq!(sink.completed.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn a_missing_program_produces_an_infrastructure_error_not_a_panic() {
        let metadata = Arc::new(FakeMetadataStore::new());
        let artifacts = Arc::new(FakeArtifactStore::new());
        let (engine, _sink, _working_dir) = test_engine(metadata, artifacts);

        let result = engine.execute(base_request("does-not-exist"), None).await;

        assert!(!result.success);
        assert_eq!(result.exit_code, -1);
        assert!(result.error_message.is_some());
    }

    #[tokio::test]
    async fn an_unapproved_version_is_ineligible() {
        let metadata = Arc::new(FakeMetadataStore::new());
        metadata.add_program("prog1", Some("v1"), ProgramStatus::Active);
        metadata.add_version("v1", "prog1", 1, VersionStatus::Draft);
        let artifacts = Arc::new(FakeArtifactStore::new());
        artifacts.put_file("prog1", "v1", "main.py", "print('hi')\n");

        let (engine, _sink, _working_dir) = test_engine(metadata, artifacts);
        let result = engine.execute(base_request("prog1"), None).await;

        assert!(!result.success);
        assert!(result.error_message.unwrap().contains("not approved"));
    }

    #[tokio::test]
    async fn an_empty_version_reports_extraction_empty() {
        let metadata = Arc::new(FakeMetadataStore::new());
        metadata.add_program("prog1", Some("v1"), ProgramStatus::Active);
        metadata.add_version("v1", "prog1", 1, VersionStatus::Approved);
        let artifacts = Arc::new(FakeArtifactStore::new());

        let (engine, _sink, _working_dir) = test_engine(metadata, artifacts);
        let result = engine.execute(base_request("prog1"), None).await;

        assert!(!result.success);
        assert!(result.error_message.unwrap().contains("empty"));
    }

    #[tokio::test]
    async fn cancel_on_an_unregistered_execution_is_a_safe_no_op() {
        let metadata = Arc::new(FakeMetadataStore::new());
        let artifacts = Arc::new(FakeArtifactStore::new());
        let (engine, _sink, _working_dir) = test_engine(metadata, artifacts);

        assert!(!engine.cancel("exec-does-not-exist"));
    }

    #[tokio::test]
    async fn cleanup_stale_removes_directories_with_no_active_session() {
        let metadata = Arc::new(FakeMetadataStore::new());
        let artifacts = Arc::new(FakeArtifactStore::new());
        let (engine, _sink, working_dir) = test_engine(metadata, artifacts);

        let stale_root = working_dir.path().join("prog1").join("v1").join("execution").join("exec-old");
        runsafe_core::paths::create_layout(&stale_root).await.unwrap();

        let removed = engine.cleanup_stale(chrono::Duration::seconds(-1)).await.unwrap();

        assert_eq!(removed, 1);
        assert!(!stale_root.exists());
    }
}
