// ABOUTME: The seam between a language runner and the tier dispatcher, so this crate never
// ABOUTME: depends on the tiers crate directly -- tiers depends on this crate and implements it

use std::sync::Arc;

use async_trait::async_trait;
use runsafe_core::types::ExecutionTier;
use runsafe_core::CancelHandle;
use runsafe_ports::StreamSink;
use runsafe_sandbox::{RunPlan, SandboxResult};

#[async_trait]
pub trait TierDispatch: Send + Sync {
    /// Runs `plan`, applying the RAM-tier retry loop or the Disk-tier
    /// persistent volume as `tier` dictates. `None` or an unrecognized
    /// tier falls back to a single non-tiered launch of `plan`.
    async fn dispatch(
        &self,
        plan: RunPlan,
        tier: Option<ExecutionTier>,
        job_profile: Option<&str>,
        cancel: &CancelHandle,
        sink: Option<Arc<dyn StreamSink>>,
        execution_id: &str,
    ) -> SandboxResult<runsafe_sandbox::SandboxOutcome>;
}
