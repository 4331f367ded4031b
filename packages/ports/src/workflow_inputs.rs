// ABOUTME: Generated-helper-source port — opaque string providers for the per-run helper files
// ABOUTME: runners write into sandboxed projects (UI-component module, workflow-inputs module)

use async_trait::async_trait;

use crate::error::PortResult;

/// Supplies the source text of the workflow-inputs helper module a runner
/// writes into `project/` before executing. Content is opaque to this crate;
/// only the caller's implementation knows how it is generated.
#[async_trait]
pub trait WorkflowInputsProvider: Send + Sync {
    async fn source_for(&self, program_id: &str) -> PortResult<String>;
}
