// ABOUTME: The language runner plug-in interface every C#/Python/Node implementation satisfies

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use runsafe_core::types::{BuildResult, ValidationResult};
use runsafe_sandbox::SandboxOutcome;

use crate::context::{BuildContext, ExecuteContext};
use crate::dispatch::TierDispatch;
use crate::error::RunnerResult;

/// What a runner's `Analyze` contributes into the aggregate
/// `ProjectStructureAnalysis` the analyzer builds.
#[derive(Debug, Clone, Default)]
pub struct RunnerAnalysis {
    pub language: String,
    pub project_type: String,
    pub entry_points: Vec<String>,
    pub main_entry_point: Option<String>,
    pub dependencies: Vec<String>,
    pub has_build_file: bool,
    pub metadata: HashMap<String, String>,
}

#[async_trait]
pub trait LanguageRunner: Send + Sync {
    /// Stable identifier, e.g. `"csharp"`, `"python"`, `"node"`.
    fn name(&self) -> &'static str;

    /// Lower runs first. C# = 10, Python = 20, Node.js = 40.
    fn priority(&self) -> i32;

    /// Filename-pattern check: does this directory look like a project this
    /// runner owns?
    async fn can_handle(&self, dir: &Path) -> bool;

    async fn analyze(&self, dir: &Path) -> RunnerAnalysis;

    /// Confirms the local toolchain is available and optionally runs a
    /// lightweight syntax check over a bounded sample of sources.
    async fn validate(&self, dir: &Path) -> ValidationResult;

    async fn build(&self, dir: &Path, ctx: &BuildContext) -> RunnerResult<BuildResult>;

    async fn execute(
        &self,
        dir: &Path,
        ctx: &ExecuteContext,
        dispatch: &dyn TierDispatch,
    ) -> RunnerResult<SandboxOutcome>;
}
