// ABOUTME: Environment variable name constants
// ABOUTME: Centralized definitions of the env vars EngineConfig::from_env reads

pub const RUNSAFE_WORKING_DIRECTORY: &str = "RUNSAFE_WORKING_DIRECTORY";
pub const RUNSAFE_MAX_CONCURRENT_EXECUTIONS: &str = "RUNSAFE_MAX_CONCURRENT_EXECUTIONS";
pub const RUNSAFE_DEFAULT_TIMEOUT_MINUTES: &str = "RUNSAFE_DEFAULT_TIMEOUT_MINUTES";
pub const RUNSAFE_MAX_PROJECT_SIZE_BYTES: &str = "RUNSAFE_MAX_PROJECT_SIZE_BYTES";
pub const RUNSAFE_ENABLE_SECURITY_SCANNING: &str = "RUNSAFE_ENABLE_SECURITY_SCANNING";
pub const RUNSAFE_CLEANUP_ON_COMPLETION: &str = "RUNSAFE_CLEANUP_ON_COMPLETION";
pub const RUNSAFE_EXECUTION_RETENTION_DAYS: &str = "RUNSAFE_EXECUTION_RETENTION_DAYS";
pub const RUNSAFE_ENABLE_SANDBOX: &str = "RUNSAFE_ENABLE_SANDBOX";
pub const RUNSAFE_ENABLE_NETWORK_ACCESS: &str = "RUNSAFE_ENABLE_NETWORK_ACCESS";

// Default resource limits
pub const RUNSAFE_DEFAULT_MEMORY_MB: &str = "RUNSAFE_DEFAULT_MEMORY_MB";
pub const RUNSAFE_DEFAULT_CPUS: &str = "RUNSAFE_DEFAULT_CPUS";
pub const RUNSAFE_DEFAULT_PROCESS_LIMIT: &str = "RUNSAFE_DEFAULT_PROCESS_LIMIT";
pub const RUNSAFE_DEFAULT_TEMP_STORAGE_MB: &str = "RUNSAFE_DEFAULT_TEMP_STORAGE_MB";

// Tiered execution
pub const RUNSAFE_TIERED_EXECUTION_ENABLED: &str = "RUNSAFE_TIERED_EXECUTION_ENABLED";
pub const RUNSAFE_RAM_TMPFS_BASE_SIZE_MB: &str = "RUNSAFE_RAM_TMPFS_BASE_SIZE_MB";
pub const RUNSAFE_RAM_MAX_RETRIES: &str = "RUNSAFE_RAM_MAX_RETRIES";
pub const RUNSAFE_RAM_MULTIPLIER_FACTOR: &str = "RUNSAFE_RAM_MULTIPLIER_FACTOR";
pub const RUNSAFE_RAM_MAX_SIZE_MB: &str = "RUNSAFE_RAM_MAX_SIZE_MB";
pub const RUNSAFE_DISK_VOLUME_PATH: &str = "RUNSAFE_DISK_VOLUME_PATH";
pub const RUNSAFE_DISK_ENABLE_VOLUME_REUSE: &str = "RUNSAFE_DISK_ENABLE_VOLUME_REUSE";
pub const RUNSAFE_DISK_VOLUME_CLEANUP_DELAY_MINUTES: &str =
    "RUNSAFE_DISK_VOLUME_CLEANUP_DELAY_MINUTES";
