// ABOUTME: Streaming sink port — fire-and-forget stdout/stderr/completed events
// ABOUTME: Best-effort by contract: a failing sink must never fail the execution it reports on

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamStatus {
    Completed,
    TimedOut,
    Cancelled,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedEvent {
    pub status: StreamStatus,
    pub exit_code: i32,
    pub error_message: Option<String>,
    pub completed_at: DateTime<Utc>,
    pub duration_seconds: f64,
    pub success: bool,
    pub output_files: Vec<String>,
}

/// Fire-and-forget streaming sink. Implementations must swallow their own
/// errors (log and move on) — nothing here is allowed to fail an execution.
#[async_trait]
pub trait StreamSink: Send + Sync {
    async fn stream_stdout(&self, execution_id: &str, line: &str, timestamp: DateTime<Utc>);
    async fn stream_stderr(&self, execution_id: &str, line: &str, timestamp: DateTime<Utc>);
    async fn stream_completed(&self, execution_id: &str, event: CompletedEvent);
}
