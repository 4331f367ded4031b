// ABOUTME: TierDispatcher implements runsafe_runners::TierDispatch: RAM-tier retry loop, Disk-tier
// ABOUTME: persistent volumes, and the non-tiered fallback for unspecified or unrecognized tiers

use std::sync::Arc;

use async_trait::async_trait;
use runsafe_config::EngineConfig;
use runsafe_core::types::ExecutionTier;
use runsafe_core::CancelHandle;
use runsafe_ports::{ContainerRuntime, StreamSink};
use runsafe_runners::TierDispatch;
use runsafe_sandbox::{RunPlan, SandboxOutcome, SandboxResult};
use tracing::{debug, warn};

pub struct TierDispatcher {
    config: Arc<EngineConfig>,
    runtime: Option<Arc<dyn ContainerRuntime>>,
}

impl TierDispatcher {
    pub fn new(config: Arc<EngineConfig>, runtime: Option<Arc<dyn ContainerRuntime>>) -> Self {
        Self { config, runtime }
    }

    async fn launch(
        &self,
        plan: &RunPlan,
        cancel: &CancelHandle,
        sink: Option<Arc<dyn StreamSink>>,
        execution_id: &str,
    ) -> SandboxResult<SandboxOutcome> {
        runsafe_sandbox::run(plan, self.runtime.as_deref(), cancel, sink, execution_id).await
    }

    /// Bounded retry loop: relaunch with a larger tmpfs while the captured
    /// output matches a configured OOM trigger pattern, attempts are
    /// strictly sequential.
    async fn run_ram_tier(
        &self,
        plan: RunPlan,
        cancel: &CancelHandle,
        sink: Option<Arc<dyn StreamSink>>,
        execution_id: &str,
    ) -> SandboxResult<SandboxOutcome> {
        let ram = &self.config.tiered_execution.ram_pool;
        let relaunch = &ram.iterative_relaunch;
        let mut tmpfs_mb = ram.tmpfs_base_size_mb;
        let mut attempt = 0u32;

        loop {
            let attempt_plan = with_tmpfs(plan.clone(), tmpfs_mb);
            let outcome = self.launch(&attempt_plan, cancel, sink.clone(), execution_id).await?;

            if outcome.succeeded() || outcome.cancelled {
                return Ok(outcome);
            }

            let combined_output = format!("{}\n{}", outcome.stdout, outcome.stderr);
            let oom_matched = relaunch.trigger_patterns.iter().any(|p| combined_output.contains(p.as_str()));
            let next_size = ((tmpfs_mb as f64) * relaunch.multiplier_factor).min(relaunch.max_size_mb as f64) as u64;

            if oom_matched && attempt < relaunch.max_retries && next_size > tmpfs_mb {
                attempt += 1;
                debug!(execution_id, attempt, next_size, "OOM trigger matched, relaunching with a larger tmpfs");
                tmpfs_mb = next_size;
                continue;
            }

            return Ok(outcome);
        }
    }

    /// Single attempt under a per-execution persistent volume.
    async fn run_disk_tier(
        &self,
        plan: RunPlan,
        cancel: &CancelHandle,
        sink: Option<Arc<dyn StreamSink>>,
        execution_id: &str,
    ) -> SandboxResult<SandboxOutcome> {
        let disk = &self.config.tiered_execution.disk_pool;
        let volume_dir = disk.disk_volume_path.join(execution_id);
        tokio::fs::create_dir_all(&volume_dir).await?;

        let attempt_plan = with_persistent_volume(plan, &volume_dir);
        let outcome = self.launch(&attempt_plan, cancel, sink, execution_id).await;

        if !disk.enable_volume_reuse {
            if let Err(e) = tokio::fs::remove_dir_all(&volume_dir).await {
                warn!(execution_id, error = %e, "failed to remove per-execution disk-tier volume");
            }
        }

        outcome
    }
}

#[async_trait]
impl TierDispatch for TierDispatcher {
    async fn dispatch(
        &self,
        plan: RunPlan,
        tier: Option<ExecutionTier>,
        _job_profile: Option<&str>,
        cancel: &CancelHandle,
        sink: Option<Arc<dyn StreamSink>>,
        execution_id: &str,
    ) -> SandboxResult<SandboxOutcome> {
        if !self.config.tiered_execution.enabled {
            return self.launch(&plan, cancel, sink, execution_id).await;
        }

        match tier {
            Some(ExecutionTier::Ram) => self.run_ram_tier(plan, cancel, sink, execution_id).await,
            Some(ExecutionTier::Disk) => self.run_disk_tier(plan, cancel, sink, execution_id).await,
            None => {
                warn!(execution_id, "tiered execution enabled but no tier was specified; falling back to a single non-tiered launch");
                self.launch(&plan, cancel, sink, execution_id).await
            }
        }
    }
}

fn with_tmpfs(plan: RunPlan, tmpfs_mb: u64) -> RunPlan {
    match plan {
        RunPlan::Sandboxed(mut spec) => {
            spec.tmpfs_mb = Some(tmpfs_mb);
            RunPlan::Sandboxed(spec)
        }
        direct => direct,
    }
}

fn with_persistent_volume(plan: RunPlan, volume_dir: &std::path::Path) -> RunPlan {
    const EXECUTION_VOLUME_CONTAINER_PATH: &str = "/execution_volume";
    match plan {
        RunPlan::Sandboxed(mut spec) => {
            spec.mounts.push(runsafe_ports::MountSpec::read_write(volume_dir, EXECUTION_VOLUME_CONTAINER_PATH));
            RunPlan::Sandboxed(spec)
        }
        RunPlan::Direct(mut direct) => {
            direct.env.insert("RUNSAFE_EXECUTION_VOLUME".to_string(), volume_dir.to_string_lossy().to_string());
            RunPlan::Direct(direct)
        }
    }
}
