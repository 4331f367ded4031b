// ABOUTME: Container runtime port — volume lifecycle plus spawning one container
// ABOUTME: spawn() returns a tokio::process::Child so direct-host and sandboxed modes share one I/O pump

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::PortResult;

#[derive(Debug, Clone)]
pub struct MountSpec {
    pub host_path: PathBuf,
    pub container_path: String,
    pub read_only: bool,
}

impl MountSpec {
    pub fn read_write(host_path: impl Into<PathBuf>, container_path: impl Into<String>) -> Self {
        Self {
            host_path: host_path.into(),
            container_path: container_path.into(),
            read_only: false,
        }
    }
}

/// One container launch, fully specified: image, command, argv, working
/// dir, env, mounts, cpus, memory, pid limit, tmpfs size, network on/off,
/// user, capabilities.
#[derive(Debug, Clone)]
pub struct ContainerRunSpec {
    pub image: String,
    pub argv: Vec<String>,
    pub working_dir: String,
    pub env: HashMap<String, String>,
    pub mounts: Vec<MountSpec>,
    pub cpus: f64,
    pub memory_mb: u64,
    pub pid_limit: u32,
    pub tmpfs_mb: Option<u64>,
    pub network_enabled: bool,
    pub user: Option<String>,
    pub allow_chown: bool,
}

#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    async fn create_volume(&self, name: &str) -> PortResult<()>;
    async fn delete_volume(&self, name: &str) -> PortResult<()>;

    /// Spawn the container as a child process. Killing the returned child
    /// (tree-kill at the process-group level for the CLI-shelled-out
    /// implementations) is how cancellation is enforced.
    fn spawn(&self, spec: &ContainerRunSpec) -> PortResult<tokio::process::Child>;
}
