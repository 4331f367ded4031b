// ABOUTME: Shared build/execute context every language runner receives, and the
// ABOUTME: container-spec builder that applies the sandboxing rules common to all three

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use runsafe_core::types::{BuildArgs, ExecutionTier, ResourceLimits};
use runsafe_core::{CancelHandle, ParameterTree};
use runsafe_ports::{ContainerRunSpec, ContainerRuntime, MountSpec, StreamSink};
use runsafe_sandbox::{DirectRunPlan, RunPlan};

/// The project-relative mount point inside the container for the source tree.
pub const CONTAINER_APP_DIR: &str = "/app";
/// The project-relative mount point inside the container for collected outputs.
pub const CONTAINER_OUTPUTS_DIR: &str = "/app_outputs";
/// The non-root user every sandboxed step (other than the ownership fix) runs as.
pub const EXECUTOR_USER: &str = "executor";

#[derive(Clone)]
pub struct SandboxSettings {
    pub enabled: bool,
    pub runtime: Option<Arc<dyn ContainerRuntime>>,
    pub image: String,
    pub memory_mb: u64,
    pub cpus: f64,
    pub pid_limit: u32,
}

pub struct BuildContext {
    pub build_args: BuildArgs,
    pub sandbox: SandboxSettings,
    pub package_volume_name: Option<String>,
    /// Pre-fetched source of the C# UI-component helper, written before compile.
    pub ui_component_source: Option<String>,
    pub execution_id: String,
    pub cancel: CancelHandle,
}

pub struct ExecuteContext {
    pub parameters: ParameterTree,
    pub environment: HashMap<String, String>,
    pub resource_limits: ResourceLimits,
    pub execution_tier: Option<ExecutionTier>,
    pub job_profile: Option<String>,
    pub sandbox: SandboxSettings,
    pub package_volume_name: Option<String>,
    pub cancel: CancelHandle,
    pub sink: Option<Arc<dyn StreamSink>>,
    pub execution_id: String,
    /// Pre-fetched source of the Python UI-component helper.
    pub ui_component_source: Option<String>,
    /// Pre-fetched source of the workflow-inputs helper.
    pub workflow_inputs_source: Option<String>,
}

/// Builds a [`ContainerRunSpec`] for one sandboxed step of a runner's
/// build or execute pipeline, mounting the project/outputs directories and
/// the package cache, applying the resource caps from `sandbox`.
#[allow(clippy::too_many_arguments)]
pub fn container_spec(
    sandbox: &SandboxSettings,
    project_dir: &Path,
    outputs_dir: &Path,
    argv: Vec<String>,
    env: HashMap<String, String>,
    cache_mount: Option<(&Path, &str)>,
    network_enabled: bool,
    allow_chown: bool,
    tmpfs_mb: Option<u64>,
) -> ContainerRunSpec {
    let mut mounts = vec![
        MountSpec::read_write(project_dir, CONTAINER_APP_DIR),
        MountSpec::read_write(outputs_dir, CONTAINER_OUTPUTS_DIR),
    ];
    if let Some((host_path, container_path)) = cache_mount {
        mounts.push(MountSpec::read_write(host_path, container_path));
    }

    ContainerRunSpec {
        image: sandbox.image.clone(),
        argv,
        working_dir: CONTAINER_APP_DIR.to_string(),
        env,
        mounts,
        cpus: sandbox.cpus,
        memory_mb: sandbox.memory_mb,
        pid_limit: sandbox.pid_limit,
        tmpfs_mb,
        network_enabled,
        user: if allow_chown {
            None
        } else {
            Some(EXECUTOR_USER.to_string())
        },
        allow_chown,
    }
}

/// Builds the right [`RunPlan`] variant for one step: sandboxed when
/// `sandbox.enabled`, otherwise a direct host launch rooted at `project_dir`.
#[allow(clippy::too_many_arguments)]
pub fn build_plan(
    sandbox: &SandboxSettings,
    project_dir: &Path,
    outputs_dir: &Path,
    argv: Vec<String>,
    env: HashMap<String, String>,
    cache_mount: Option<(&Path, &str)>,
    network_enabled: bool,
    allow_chown: bool,
    tmpfs_mb: Option<u64>,
) -> RunPlan {
    if sandbox.enabled {
        RunPlan::Sandboxed(container_spec(
            sandbox,
            project_dir,
            outputs_dir,
            argv,
            env,
            cache_mount,
            network_enabled,
            allow_chown,
            tmpfs_mb,
        ))
    } else {
        RunPlan::Direct(DirectRunPlan {
            argv,
            working_dir: project_dir.to_path_buf(),
            env,
        })
    }
}
