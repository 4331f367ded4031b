// ABOUTME: The twelve-step run pipeline Engine::execute drives: version resolution through to
// ABOUTME: the final sandboxed run. Steps 1/2 and the finally-block cleanup live in Engine::execute itself

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use runsafe_core::paths;
use runsafe_core::types::{BuildArgs, BuildResult, ExecutionRequest, ExecutionTier, ProjectStructureAnalysis, ResourceLimits};
use runsafe_core::{CancelHandle, CancelReason, ExecutionError};
use runsafe_ports::{ProgramStatus, VersionStatus};
use runsafe_runners::{BuildContext, ExecuteContext, SandboxSettings};
use runsafe_sandbox::SandboxOutcome;
use walkdir::WalkDir;

use crate::Engine;

/// Everything the pipeline accumulates as it goes, so a failure at any step
/// still leaves `Engine::execute` with enough partial state to persist logs
/// and build a failure-shaped result.
#[derive(Default)]
pub(crate) struct StepState {
    pub execution_root: Option<PathBuf>,
    pub package_volume_name: Option<String>,
    pub initial_files: Option<HashSet<String>>,
    pub build_result: Option<BuildResult>,
    pub outcome: Option<SandboxOutcome>,
}

/// Which [`ExecutionError`] an execution that ended via cancellation should
/// report, based on which source fired the handle first. A deadline that
/// elapses without the caller ever cancelling is a timeout; every other
/// cancellation source (the caller's token, or `Engine::cancel`) is reported
/// as a plain cancellation.
fn cancel_error(cancel: &CancelHandle) -> ExecutionError {
    match cancel.reason() {
        Some(CancelReason::Deadline) => ExecutionError::Timeout,
        _ => ExecutionError::Cancelled,
    }
}

fn check_cancelled(cancel: &CancelHandle) -> Result<(), ExecutionError> {
    if cancel.is_cancelled() {
        Err(cancel_error(cancel))
    } else {
        Ok(())
    }
}

fn infra(err: impl std::fmt::Display) -> ExecutionError {
    ExecutionError::Infrastructure(err.to_string())
}

/// Relative paths of every file currently under `dir`, used both as the
/// pre-run snapshot and (by the artifact collector) as the baseline new
/// files are diffed against.
fn snapshot_files(dir: &std::path::Path) -> HashSet<String> {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.path().strip_prefix(dir).ok().map(|p| p.to_string_lossy().to_string()))
        .collect()
}

impl Engine {
    pub(crate) fn sandbox_settings(&self, runner_name: &str, resource_limits: &ResourceLimits) -> SandboxSettings {
        SandboxSettings {
            enabled: self.config.enable_sandbox,
            runtime: self.container_runtime.clone(),
            image: self.config.sandbox_images.get(runner_name).cloned().unwrap_or_default(),
            memory_mb: resource_limits.memory_mb.unwrap_or(self.config.resource_limits.memory_mb),
            cpus: resource_limits.cpus.unwrap_or(self.config.resource_limits.cpus),
            pid_limit: self.config.resource_limits.process_limit,
        }
    }

    /// Resolves which version to run: the caller's explicit id, else the
    /// program's current version, else the latest approved version.
    async fn resolve_version(
        &self,
        request: &ExecutionRequest,
    ) -> Result<(runsafe_ports::ProgramRecord, runsafe_ports::VersionRecord), ExecutionError> {
        let program = self.program_repo.get(&request.program_id).await.map_err(infra)?;

        let version_id = if let Some(id) = &request.version_id {
            id.clone()
        } else if let Some(current) = &program.current_version {
            current.clone()
        } else if let Some(version) = self
            .version_repo
            .get_latest_approved(&request.program_id)
            .await
            .map_err(infra)?
        {
            version.id
        } else {
            return Err(ExecutionError::VersionUnresolvable);
        };

        let version = self
            .version_repo
            .get(&version_id)
            .await
            .map_err(|_| ExecutionError::VersionUnresolvable)?;

        Ok((program, version))
    }

    fn check_eligibility(
        &self,
        program: &runsafe_ports::ProgramRecord,
        version: &runsafe_ports::VersionRecord,
    ) -> Result<(), ExecutionError> {
        if matches!(program.status, ProgramStatus::Archived | ProgramStatus::Deleted) {
            return Err(ExecutionError::IneligibleVersion(format!(
                "program {} is archived or deleted",
                program.id
            )));
        }
        if version.status != VersionStatus::Approved {
            return Err(ExecutionError::IneligibleVersion(format!(
                "version {} is not approved",
                version.id
            )));
        }
        Ok(())
    }

    /// Runs steps 3 through 12. Steps 1 (session registration) and 2
    /// (package-cache volume) are handled by the caller, which already
    /// needs the resolved volume name before this runs.
    pub(crate) async fn run_pipeline(
        &self,
        request: &ExecutionRequest,
        execution_id: &str,
        cancel: &CancelHandle,
        package_volume_name: Option<String>,
        state: &mut StepState,
    ) -> Result<(), ExecutionError> {
        state.package_volume_name = package_volume_name.clone();

        // Step 3 + 4: resolve the version and check it is eligible to run.
        let (program, version) = self.resolve_version(request).await?;
        self.check_eligibility(&program, &version)?;
        check_cancelled(cancel)?;

        // Step 5: lay out the execution directory.
        let execution_root = paths::execution_root(&self.config.working_directory, &program.id, &version.id, execution_id);
        paths::create_layout(&execution_root).await.map_err(infra)?;
        state.execution_root = Some(execution_root.clone());
        let project_dir = paths::project_dir(&execution_root);

        // Step 6: extract the version's stored source tree.
        let written = crate::extract::extract_into(self.artifact_store.as_ref(), &program.id, &version.id, &project_dir)
            .await
            .map_err(infra)?;
        if written == 0 {
            return Err(ExecutionError::ExtractionEmpty);
        }
        check_cancelled(cancel)?;

        // Step 7: analyze the extracted project.
        let analysis: ProjectStructureAnalysis = self.analyzer.analyze(&project_dir).await;

        // Step 8: validate it.
        let validation = self.validator.validate(&project_dir).await;
        if !validation.valid {
            return Err(ExecutionError::ValidationFailed(validation.errors));
        }
        check_cancelled(cancel)?;

        // Step 9: select a runner.
        let runner = self
            .registry
            .find_handler(&project_dir)
            .await
            .ok_or(ExecutionError::NoRunner)?;

        let resource_limits = request.resource_limits.clone().unwrap_or_default();
        let sandbox = self.sandbox_settings(runner.name(), &resource_limits);

        // Step 10: conditional build.
        let build_args: BuildArgs = request.build_args.clone();
        if analysis.has_build_file && !build_args.skip_build {
            let ui_component_source = self
                .ui_components
                .get_latest_active(&program.id)
                .await
                .map_err(infra)?
                .map(|c| c.source);

            let build_ctx = BuildContext {
                build_args,
                sandbox: sandbox.clone(),
                package_volume_name: package_volume_name.clone(),
                ui_component_source,
                execution_id: execution_id.to_string(),
                cancel: cancel.clone(),
            };

            let build_result = runner
                .build(&project_dir, &build_ctx)
                .await
                .map_err(|e| ExecutionError::RunnerError(e.to_string()))?;

            if !build_result.success {
                return Err(ExecutionError::BuildFailed(Box::new(build_result)));
            }
            state.build_result = Some(build_result);
        }
        check_cancelled(cancel)?;

        // Step 11: snapshot the project tree before execution, so the
        // artifact collector can tell new/changed files from pre-existing ones.
        let initial_files = snapshot_files(&project_dir);
        state.initial_files = Some(initial_files);

        // Step 12: execute under the cancel handle.
        let ui_component_source = self
            .ui_components
            .get_latest_active(&program.id)
            .await
            .map_err(infra)?
            .map(|c| c.source);
        let workflow_inputs_source = Some(self.workflow_inputs.source_for(&program.id).await.map_err(infra)?);

        let exec_ctx = ExecuteContext {
            parameters: request.parameters.clone(),
            environment: request.environment.clone(),
            resource_limits,
            execution_tier: request.execution_tier.or(default_tier(&self.config, request)),
            job_profile: request.job_profile.clone(),
            sandbox,
            package_volume_name,
            cancel: cancel.clone(),
            sink: Some(self.combined_sink.clone() as Arc<dyn runsafe_ports::StreamSink>),
            execution_id: execution_id.to_string(),
            ui_component_source,
            workflow_inputs_source,
        };

        let outcome = runner
            .execute(&project_dir, &exec_ctx, self.dispatch.as_ref())
            .await
            .map_err(|e| ExecutionError::RunnerError(e.to_string()))?;

        if outcome.cancelled {
            state.outcome = Some(outcome);
            return Err(cancel_error(cancel));
        }
        state.outcome = Some(outcome);
        Ok(())
    }
}

/// Falls back to the configured default job profile's preferred tier when
/// the caller didn't name one and tiered execution is enabled.
fn default_tier(config: &runsafe_config::EngineConfig, request: &ExecutionRequest) -> Option<ExecutionTier> {
    if !config.tiered_execution.enabled {
        return None;
    }
    let profile_name = request.job_profile.as_ref().or(config.tiered_execution.default_job_profile.as_ref())?;
    let profile = config.tiered_execution.job_profiles.get(profile_name)?;
    Some(match profile.preferred_tier {
        runsafe_config::PreferredTier::Ram => ExecutionTier::Ram,
        runsafe_config::PreferredTier::Disk => ExecutionTier::Disk,
    })
}
