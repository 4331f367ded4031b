// ABOUTME: The Python runner: requirements.txt install, entry-point heuristics, helper file injection

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use runsafe_core::types::{BuildResult, ValidationResult};
use runsafe_sandbox::SandboxOutcome;

use super::shared::{check_toolchain, fix_cache_ownership};
use crate::context::{build_plan, BuildContext, ExecuteContext};
use crate::dispatch::TierDispatch;
use crate::error::{RunnerError, RunnerResult};
use crate::runner::{LanguageRunner, RunnerAnalysis};

const CACHE_CONTAINER_PATH: &str = "/home/executor/.cache/pip";
const CACHE_HOST_PATH: &str = "/var/lib/runsafe/cache/pip";
const UI_COMPONENT_FILE: &str = "generated_ui_component.py";
const WORKFLOW_INPUTS_FILE: &str = "workflow_inputs.py";
const ENTRY_CANDIDATES: &[&str] = &["main.py", "__main__.py", "app.py", "run.py", "start.py"];

#[derive(Default)]
pub struct PythonRunner;

impl PythonRunner {
    async fn requirements_path(dir: &Path) -> Option<std::path::PathBuf> {
        let path = dir.join("requirements.txt");
        if tokio::fs::metadata(&path).await.is_ok() {
            Some(path)
        } else {
            None
        }
    }

    async fn parse_dependencies(requirements: &Path) -> Vec<String> {
        let Ok(text) = tokio::fs::read_to_string(requirements).await else {
            return Vec::new();
        };
        text.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(|line| {
                line.split(|c: char| matches!(c, '=' | '<' | '>' | '~' | ';'))
                    .next()
                    .unwrap_or(line)
                    .trim()
                    .to_string()
            })
            .collect()
    }

    /// Prefers a conventional entry filename; otherwise any file whose text
    /// contains the `__name__ == "__main__"` idiom.
    async fn find_entry_point(dir: &Path) -> Option<String> {
        for candidate in ENTRY_CANDIDATES {
            if tokio::fs::metadata(dir.join(candidate)).await.is_ok() {
                return Some(candidate.to_string());
            }
        }
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(_) => return None,
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("py") {
                continue;
            }
            if let Ok(text) = tokio::fs::read_to_string(&path).await {
                if text.contains("__name__ == \"__main__\"") || text.contains("__name__ == '__main__'") {
                    return path.file_name().map(|n| n.to_string_lossy().to_string());
                }
            }
        }
        None
    }
}

#[async_trait]
impl LanguageRunner for PythonRunner {
    fn name(&self) -> &'static str {
        "python"
    }

    fn priority(&self) -> i32 {
        20
    }

    async fn can_handle(&self, dir: &Path) -> bool {
        Self::requirements_path(dir).await.is_some() || Self::find_entry_point(dir).await.is_some()
    }

    async fn analyze(&self, dir: &Path) -> RunnerAnalysis {
        let requirements = Self::requirements_path(dir).await;
        let dependencies = match &requirements {
            Some(path) => Self::parse_dependencies(path).await,
            None => Vec::new(),
        };
        let main_entry_point = Self::find_entry_point(dir).await;

        RunnerAnalysis {
            language: "Python".to_string(),
            project_type: "script".to_string(),
            entry_points: main_entry_point.clone().into_iter().collect(),
            main_entry_point,
            dependencies,
            has_build_file: requirements.is_some(),
            metadata: HashMap::new(),
        }
    }

    async fn validate(&self, _dir: &Path) -> ValidationResult {
        let mut result = check_toolchain("python", &["--version"]).await;
        result.merge(check_toolchain("pip", &["--version"]).await);
        result
    }

    async fn build(&self, dir: &Path, ctx: &BuildContext) -> RunnerResult<BuildResult> {
        let Some(_requirements) = Self::requirements_path(dir).await else {
            return Ok(BuildResult::success(String::new(), String::new(), Vec::new(), chrono::Duration::zero()));
        };

        let outputs_dir = dir.join("..").join("outputs");
        fix_cache_ownership(ctx, dir, &outputs_dir, Path::new(CACHE_HOST_PATH), CACHE_CONTAINER_PATH).await?;
        let plan = build_plan(
            &ctx.sandbox,
            dir,
            &outputs_dir,
            vec![
                "pip".to_string(),
                "install".to_string(),
                "--user".to_string(),
                "-r".to_string(),
                "requirements.txt".to_string(),
            ],
            HashMap::new(),
            Some((Path::new(CACHE_HOST_PATH), CACHE_CONTAINER_PATH)),
            true,
            false,
            None,
        );
        let install = runsafe_sandbox::run(&plan, ctx.sandbox.runtime.as_deref(), &ctx.cancel, None, &ctx.execution_id)
            .await
            .map_err(RunnerError::from)?;

        Ok(if install.succeeded() {
            BuildResult::success(install.stdout, install.stderr, Vec::new(), install.duration)
        } else {
            BuildResult::failure(install.stdout, install.stderr, install.duration)
        })
    }

    async fn execute(
        &self,
        dir: &Path,
        ctx: &ExecuteContext,
        dispatch: &dyn TierDispatch,
    ) -> RunnerResult<SandboxOutcome> {
        if let Some(source) = &ctx.ui_component_source {
            super::shared::write_helper_file(dir, UI_COMPONENT_FILE, source).await?;
        }
        if let Some(source) = &ctx.workflow_inputs_source {
            super::shared::write_helper_file(dir, WORKFLOW_INPUTS_FILE, source).await?;
        }

        let entry = Self::find_entry_point(dir).await.ok_or(RunnerError::NoEntryPoint)?;
        let argv = vec!["python".to_string(), entry];

        let mut env = ctx.environment.clone();
        if let Ok(params) = serde_json::to_string(&ctx.parameters) {
            env.insert("RUNSAFE_PARAMETERS".to_string(), params);
        }

        let outputs_dir = dir.join("..").join("outputs");
        let plan = build_plan(
            &ctx.sandbox,
            dir,
            &outputs_dir,
            argv,
            env,
            Some((Path::new(CACHE_HOST_PATH), CACHE_CONTAINER_PATH)),
            false,
            false,
            None,
        );

        dispatch
            .dispatch(
                plan,
                ctx.execution_tier,
                ctx.job_profile.as_deref(),
                &ctx.cancel,
                ctx.sink.clone(),
                &ctx.execution_id,
            )
            .await
            .map_err(RunnerError::from)
    }
}
