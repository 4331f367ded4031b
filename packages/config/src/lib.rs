// ABOUTME: Configuration and environment variable management for runsafe
// ABOUTME: EngineConfig plus its defaults, with environment-variable overrides

pub mod constants;

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Default per-execution deadline: 2880 minutes (48 hours).
pub const DEFAULT_TIMEOUT_MINUTES: f64 = 2880.0;

/// Default project size cap: 500 MiB.
pub const DEFAULT_MAX_PROJECT_SIZE_BYTES: u64 = 500 * 1024 * 1024;

fn default_blocked_extensions() -> Vec<String> {
    [".exe", ".bat", ".cmd", ".ps1", ".sh", ".scr", ".vbs"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultResourceLimits {
    pub memory_mb: u64,
    pub cpus: f64,
    pub process_limit: u32,
    pub temp_storage_mb: u64,
}

impl Default for DefaultResourceLimits {
    fn default() -> Self {
        Self {
            memory_mb: 2048,
            cpus: 2.0,
            process_limit: 256,
            temp_storage_mb: 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterativeRelaunchConfig {
    pub max_retries: u32,
    pub multiplier_factor: f64,
    pub max_size_mb: u64,
    pub trigger_patterns: Vec<String>,
}

impl Default for IterativeRelaunchConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            multiplier_factor: 1.5,
            max_size_mb: 4096,
            trigger_patterns: vec![
                "No space left on device".to_string(),
                "Cannot allocate memory".to_string(),
                "OutOfMemoryError".to_string(),
                "MemoryError".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RamPoolConfig {
    pub tmpfs_base_size_mb: u64,
    pub iterative_relaunch: IterativeRelaunchConfig,
}

impl Default for RamPoolConfig {
    fn default() -> Self {
        Self {
            tmpfs_base_size_mb: 512,
            iterative_relaunch: IterativeRelaunchConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiskPoolConfig {
    pub disk_volume_path: PathBuf,
    pub enable_volume_reuse: bool,
    pub volume_cleanup_delay_minutes: u32,
}

impl Default for DiskPoolConfig {
    fn default() -> Self {
        Self {
            disk_volume_path: PathBuf::from("/var/lib/runsafe/disk-pool"),
            enable_volume_reuse: false,
            volume_cleanup_delay_minutes: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreferredTier {
    Ram,
    Disk,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobProfile {
    pub ram_cost_gb: f64,
    pub cpu_cost: f64,
    pub preferred_tier: PreferredTier,
    pub max_execution_minutes: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RamPoolFullBehavior {
    Queue,
    Reject,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierSelectionStrategy {
    pub enable_auto: bool,
    pub fallback_to_disk: bool,
    pub ram_pool_full_behavior: RamPoolFullBehavior,
    pub max_queue_depth: u32,
    pub queue_timeout_minutes: f64,
}

impl Default for TierSelectionStrategy {
    fn default() -> Self {
        Self {
            enable_auto: false,
            fallback_to_disk: true,
            ram_pool_full_behavior: RamPoolFullBehavior::Queue,
            max_queue_depth: 50,
            queue_timeout_minutes: 10.0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TieredExecutionConfig {
    pub enabled: bool,
    pub ram_pool: RamPoolConfig,
    pub disk_pool: DiskPoolConfig,
    #[serde(default)]
    pub job_profiles: HashMap<String, JobProfile>,
    pub default_job_profile: Option<String>,
    pub tier_selection_strategy: TierSelectionStrategy,
}

/// All configuration options the engine recognizes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub working_directory: PathBuf,
    pub max_concurrent_executions: usize,
    pub default_timeout_minutes: f64,
    pub max_project_size_bytes: u64,
    pub blocked_file_extensions: Vec<String>,
    pub enable_security_scanning: bool,
    pub cleanup_on_completion: bool,
    pub execution_retention_days: u32,
    pub enable_sandbox: bool,
    pub sandbox_images: HashMap<String, String>,
    pub enable_network_access: bool,
    pub resource_limits: DefaultResourceLimits,
    pub tiered_execution: TieredExecutionConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let mut sandbox_images = HashMap::new();
        sandbox_images.insert("csharp".to_string(), "mcr.microsoft.com/dotnet/sdk:8.0".to_string());
        sandbox_images.insert("python".to_string(), "python:3.12-slim".to_string());
        sandbox_images.insert("node".to_string(), "node:20-slim".to_string());

        Self {
            working_directory: PathBuf::from("/var/lib/runsafe/executions"),
            max_concurrent_executions: 10,
            default_timeout_minutes: DEFAULT_TIMEOUT_MINUTES,
            max_project_size_bytes: DEFAULT_MAX_PROJECT_SIZE_BYTES,
            blocked_file_extensions: default_blocked_extensions(),
            enable_security_scanning: true,
            cleanup_on_completion: true,
            execution_retention_days: 7,
            enable_sandbox: true,
            sandbox_images,
            enable_network_access: false,
            resource_limits: DefaultResourceLimits::default(),
            tiered_execution: TieredExecutionConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration, applying environment variable overrides for the
    /// flat scalar settings on top of [`EngineConfig::default`]. Nested
    /// structures (job profiles, sandbox image map, trigger patterns) are
    /// not meaningfully expressible as single env vars and are left at
    /// their defaults; build them programmatically for non-default setups.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(v) = env_path(constants::RUNSAFE_WORKING_DIRECTORY) {
            config.working_directory = v;
        }
        if let Some(v) = env_parse(constants::RUNSAFE_MAX_CONCURRENT_EXECUTIONS) {
            config.max_concurrent_executions = v;
        }
        if let Some(v) = env_parse(constants::RUNSAFE_DEFAULT_TIMEOUT_MINUTES) {
            config.default_timeout_minutes = v;
        }
        if let Some(v) = env_parse(constants::RUNSAFE_MAX_PROJECT_SIZE_BYTES) {
            config.max_project_size_bytes = v;
        }
        if let Some(v) = env_bool(constants::RUNSAFE_ENABLE_SECURITY_SCANNING) {
            config.enable_security_scanning = v;
        }
        if let Some(v) = env_bool(constants::RUNSAFE_CLEANUP_ON_COMPLETION) {
            config.cleanup_on_completion = v;
        }
        if let Some(v) = env_parse(constants::RUNSAFE_EXECUTION_RETENTION_DAYS) {
            config.execution_retention_days = v;
        }
        if let Some(v) = env_bool(constants::RUNSAFE_ENABLE_SANDBOX) {
            config.enable_sandbox = v;
        }
        if let Some(v) = env_bool(constants::RUNSAFE_ENABLE_NETWORK_ACCESS) {
            config.enable_network_access = v;
        }
        if let Some(v) = env_parse(constants::RUNSAFE_DEFAULT_MEMORY_MB) {
            config.resource_limits.memory_mb = v;
        }
        if let Some(v) = env_parse(constants::RUNSAFE_DEFAULT_CPUS) {
            config.resource_limits.cpus = v;
        }
        if let Some(v) = env_parse(constants::RUNSAFE_DEFAULT_PROCESS_LIMIT) {
            config.resource_limits.process_limit = v;
        }
        if let Some(v) = env_parse(constants::RUNSAFE_DEFAULT_TEMP_STORAGE_MB) {
            config.resource_limits.temp_storage_mb = v;
        }
        if let Some(v) = env_bool(constants::RUNSAFE_TIERED_EXECUTION_ENABLED) {
            config.tiered_execution.enabled = v;
        }
        if let Some(v) = env_parse(constants::RUNSAFE_RAM_TMPFS_BASE_SIZE_MB) {
            config.tiered_execution.ram_pool.tmpfs_base_size_mb = v;
        }
        if let Some(v) = env_parse(constants::RUNSAFE_RAM_MAX_RETRIES) {
            config.tiered_execution.ram_pool.iterative_relaunch.max_retries = v;
        }
        if let Some(v) = env_parse(constants::RUNSAFE_RAM_MULTIPLIER_FACTOR) {
            config.tiered_execution.ram_pool.iterative_relaunch.multiplier_factor = v;
        }
        if let Some(v) = env_parse(constants::RUNSAFE_RAM_MAX_SIZE_MB) {
            config.tiered_execution.ram_pool.iterative_relaunch.max_size_mb = v;
        }
        if let Some(v) = env_path(constants::RUNSAFE_DISK_VOLUME_PATH) {
            config.tiered_execution.disk_pool.disk_volume_path = v;
        }
        if let Some(v) = env_bool(constants::RUNSAFE_DISK_ENABLE_VOLUME_REUSE) {
            config.tiered_execution.disk_pool.enable_volume_reuse = v;
        }
        if let Some(v) = env_parse(constants::RUNSAFE_DISK_VOLUME_CLEANUP_DELAY_MINUTES) {
            config.tiered_execution.disk_pool.volume_cleanup_delay_minutes = v;
        }

        config
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    match std::env::var(name) {
        Ok(raw) => match raw.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!("ignoring invalid value for {name}: {raw}");
                None
            }
        },
        Err(_) => None,
    }
}

fn env_bool(name: &str) -> Option<bool> {
    env_parse::<String>(name).map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var(name).ok().map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_spec_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.default_timeout_minutes, 2880.0);
        assert_eq!(config.max_project_size_bytes, 500 * 1024 * 1024);
        assert_eq!(config.tiered_execution.ram_pool.tmpfs_base_size_mb, 512);
        assert_eq!(
            config.tiered_execution.ram_pool.iterative_relaunch.max_retries,
            3
        );
        assert_eq!(
            config.tiered_execution.ram_pool.iterative_relaunch.multiplier_factor,
            1.5
        );
        assert_eq!(
            config.tiered_execution.ram_pool.iterative_relaunch.max_size_mb,
            4096
        );
    }

    #[test]
    fn env_override_applies_on_top_of_defaults() {
        std::env::set_var(constants::RUNSAFE_DEFAULT_TIMEOUT_MINUTES, "15");
        let config = EngineConfig::from_env();
        assert_eq!(config.default_timeout_minutes, 15.0);
        std::env::remove_var(constants::RUNSAFE_DEFAULT_TIMEOUT_MINUTES);
    }
}
