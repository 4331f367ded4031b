// ABOUTME: Persists the per-execution logs/ directory: full result, captured streams, compact metadata

use std::path::Path;

use runsafe_core::types::ExecutionResult;
use serde::Serialize;

use crate::error::ArtifactResult;

#[derive(Debug, Serialize)]
struct ExecutionMetadata<'a> {
    execution_id: &'a str,
    started_at: chrono::DateTime<chrono::Utc>,
    completed_at: chrono::DateTime<chrono::Utc>,
    duration_seconds: f64,
    exit_code: i32,
    success: bool,
    resource_usage: &'a runsafe_core::types::ResourceUsage,
    output_file_count: usize,
}

/// Writes `execution-result.json` and `execution-metadata.json` always;
/// `output.log`/`error.log` only when the corresponding stream is non-empty.
pub async fn write_logs(logs_dir: &Path, result: &ExecutionResult) -> ArtifactResult<()> {
    tokio::fs::create_dir_all(logs_dir).await?;

    let result_json = serde_json::to_vec_pretty(result)?;
    tokio::fs::write(logs_dir.join("execution-result.json"), result_json).await?;

    let metadata = ExecutionMetadata {
        execution_id: &result.execution_id,
        started_at: result.started_at,
        completed_at: result.completed_at,
        duration_seconds: result.duration_seconds(),
        exit_code: result.exit_code,
        success: result.success,
        resource_usage: &result.resource_usage,
        output_file_count: result.output_files.len(),
    };
    let metadata_json = serde_json::to_vec(&metadata)?;
    tokio::fs::write(logs_dir.join("execution-metadata.json"), metadata_json).await?;

    if !result.stdout.is_empty() {
        tokio::fs::write(logs_dir.join("output.log"), &result.stdout).await?;
    }
    if !result.stderr.is_empty() {
        tokio::fs::write(logs_dir.join("error.log"), &result.stderr).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use runsafe_core::types::ResourceUsage;
    use chrono::Utc;

    fn sample_result(stdout: &str, stderr: &str) -> ExecutionResult {
        let now = Utc::now();
        ExecutionResult {
            execution_id: "exec-1".to_string(),
            success: true,
            exit_code: 0,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            error_message: None,
            started_at: now,
            completed_at: now,
            duration: chrono::Duration::seconds(1),
            resource_usage: ResourceUsage::default(),
            output_files: Vec::new(),
            build_result: None,
        }
    }

    #[tokio::test]
    async fn writes_result_and_metadata_always() {
        let dir = tempfile::tempdir().unwrap();
        let result = sample_result("", "");

        write_logs(dir.path(), &result).await.unwrap();

        assert!(dir.path().join("execution-result.json").exists());
        assert!(dir.path().join("execution-metadata.json").exists());
        assert!(!dir.path().join("output.log").exists());
        assert!(!dir.path().join("error.log").exists());
    }

    #[tokio::test]
    async fn writes_stream_logs_only_when_non_empty() {
        let dir = tempfile::tempdir().unwrap();
        let result = sample_result("hello\n", "");

        write_logs(dir.path(), &result).await.unwrap();

        assert!(dir.path().join("output.log").exists());
        assert!(!dir.path().join("error.log").exists());
    }
}
