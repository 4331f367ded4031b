// ABOUTME: Tier dispatcher crate: selects between RAM-tier and Disk-tier execution strategies
// ABOUTME: and implements runsafe_runners::TierDispatch so runners never depend on this crate

pub mod dispatcher;

pub use dispatcher::TierDispatcher;

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use runsafe_config::EngineConfig;
    use runsafe_core::types::ExecutionTier;
    use runsafe_core::CancelHandle;
    use runsafe_ports::fakes::DirectSpawnRuntime;
    use runsafe_ports::ContainerRunSpec;
    use runsafe_runners::TierDispatch;
    use runsafe_sandbox::RunPlan;
    use tokio_util::sync::CancellationToken;

    use super::*;

    fn spec_with_working_dir(argv: Vec<&str>, working_dir: &str) -> ContainerRunSpec {
        ContainerRunSpec {
            image: "unused".to_string(),
            argv: argv.into_iter().map(str::to_string).collect(),
            working_dir: working_dir.to_string(),
            env: HashMap::new(),
            mounts: Vec::new(),
            cpus: 1.0,
            memory_mb: 256,
            pid_limit: 64,
            tmpfs_mb: None,
            network_enabled: false,
            user: None,
            allow_chown: false,
        }
    }

    #[tokio::test]
    async fn non_tiered_execution_runs_the_plan_once() {
        let config = Arc::new(EngineConfig::default());
        let runtime = Arc::new(DirectSpawnRuntime::new());
        let dispatcher = TierDispatcher::new(config, Some(runtime));
        let cancel = CancelHandle::new(CancellationToken::new(), None);

        let dir = tempfile::tempdir().unwrap();
        let spec = spec_with_working_dir(vec!["echo", "hi"], dir.path().to_str().unwrap());
        let outcome = dispatcher
            .dispatch(RunPlan::Sandboxed(spec), None, None, &cancel, None, "exec-1")
            .await
            .unwrap();

        assert!(outcome.succeeded());
    }

    #[tokio::test]
    async fn disk_tier_creates_and_removes_its_volume_directory() {
        let mut config = EngineConfig::default();
        config.tiered_execution.enabled = true;
        let volume_root = tempfile::tempdir().unwrap();
        config.tiered_execution.disk_pool.disk_volume_path = volume_root.path().to_path_buf();
        config.tiered_execution.disk_pool.enable_volume_reuse = false;

        let runtime = Arc::new(DirectSpawnRuntime::new());
        let dispatcher = TierDispatcher::new(Arc::new(config), Some(runtime));
        let cancel = CancelHandle::new(CancellationToken::new(), None);

        let project_dir = tempfile::tempdir().unwrap();
        let spec = spec_with_working_dir(vec!["echo", "hi"], project_dir.path().to_str().unwrap());
        let outcome = dispatcher
            .dispatch(
                RunPlan::Sandboxed(spec),
                Some(ExecutionTier::Disk),
                None,
                &cancel,
                None,
                "exec-disk-1",
            )
            .await
            .unwrap();

        assert!(outcome.succeeded());
        assert!(!volume_root.path().join("exec-disk-1").exists());
    }

    #[tokio::test]
    async fn disk_tier_keeps_its_volume_when_reuse_is_enabled() {
        let mut config = EngineConfig::default();
        config.tiered_execution.enabled = true;
        let volume_root = tempfile::tempdir().unwrap();
        config.tiered_execution.disk_pool.disk_volume_path = volume_root.path().to_path_buf();
        config.tiered_execution.disk_pool.enable_volume_reuse = true;

        let runtime = Arc::new(DirectSpawnRuntime::new());
        let dispatcher = TierDispatcher::new(Arc::new(config), Some(runtime));
        let cancel = CancelHandle::new(CancellationToken::new(), None);

        let project_dir = tempfile::tempdir().unwrap();
        let spec = spec_with_working_dir(vec!["echo", "hi"], project_dir.path().to_str().unwrap());
        dispatcher
            .dispatch(
                RunPlan::Sandboxed(spec),
                Some(ExecutionTier::Disk),
                None,
                &cancel,
                None,
                "exec-disk-2",
            )
            .await
            .unwrap();

        assert!(volume_root.path().join("exec-disk-2").exists());
    }

    #[tokio::test]
    async fn ram_tier_retries_with_a_larger_tmpfs_on_an_oom_trigger() {
        let mut config = EngineConfig::default();
        config.tiered_execution.enabled = true;
        config.tiered_execution.ram_pool.tmpfs_base_size_mb = 64;
        config.tiered_execution.ram_pool.iterative_relaunch.max_retries = 2;
        config.tiered_execution.ram_pool.iterative_relaunch.multiplier_factor = 2.0;
        config.tiered_execution.ram_pool.iterative_relaunch.max_size_mb = 1024;
        config.tiered_execution.ram_pool.iterative_relaunch.trigger_patterns =
            vec!["Cannot allocate memory".to_string()];

        let runtime = Arc::new(DirectSpawnRuntime::new());
        let dispatcher = TierDispatcher::new(Arc::new(config), Some(runtime));
        let cancel = CancelHandle::new(CancellationToken::new(), None);

        let dir = tempfile::tempdir().unwrap();
        // every attempt fails with the OOM trigger on stderr; this proves the
        // loop keeps retrying up to max_retries rather than looping forever
        let spec = spec_with_working_dir(
            vec!["sh", "-c", "echo Cannot allocate memory 1>&2; exit 1"],
            dir.path().to_str().unwrap(),
        );
        let outcome = dispatcher
            .dispatch(
                RunPlan::Sandboxed(spec),
                Some(ExecutionTier::Ram),
                None,
                &cancel,
                None,
                "exec-ram-1",
            )
            .await
            .unwrap();

        assert!(!outcome.succeeded());
        assert!(outcome.stderr.contains("Cannot allocate memory"));
    }

    #[tokio::test]
    async fn ram_tier_returns_immediately_on_success() {
        let mut config = EngineConfig::default();
        config.tiered_execution.enabled = true;

        let runtime = Arc::new(DirectSpawnRuntime::new());
        let dispatcher = TierDispatcher::new(Arc::new(config), Some(runtime));
        let cancel = CancelHandle::new(CancellationToken::new(), None);

        let dir = tempfile::tempdir().unwrap();
        let spec = spec_with_working_dir(vec!["echo", "ok"], dir.path().to_str().unwrap());
        let outcome = dispatcher
            .dispatch(
                RunPlan::Sandboxed(spec),
                Some(ExecutionTier::Ram),
                None,
                &cancel,
                None,
                "exec-ram-2",
            )
            .await
            .unwrap();

        assert!(outcome.succeeded());
    }
}
