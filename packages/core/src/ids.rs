// ABOUTME: ID generation helpers for executions and sessions
// ABOUTME: Centralizes the id alphabet/length so every id in the system looks the same

/// Generate a new execution id.
///
/// Matches the 12-character nanoid used for artifact/log ids elsewhere in
/// the pipeline, so ids are visually interchangeable in logs.
pub fn generate_execution_id() -> String {
    format!("exec_{}", nanoid::nanoid!(12))
}

/// Generate a new package-cache volume name for an execution.
pub fn generate_volume_name(execution_id: &str) -> String {
    format!("runsafe-pkgcache-{execution_id}")
}

/// Generate a new log entry id.
pub fn generate_log_id() -> String {
    format!("log_{}", nanoid::nanoid!(12))
}
