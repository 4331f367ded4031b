// ABOUTME: The Node.js runner: package.json parsing, yarn/npm install, optional build script, entry resolution

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use runsafe_core::types::{BuildResult, ValidationResult};
use runsafe_sandbox::SandboxOutcome;
use serde_json::Value;

use super::shared::{check_toolchain, fix_cache_ownership};
use crate::context::{build_plan, BuildContext, ExecuteContext};
use crate::dispatch::TierDispatch;
use crate::error::{RunnerError, RunnerResult};
use crate::runner::{LanguageRunner, RunnerAnalysis};

const CACHE_CONTAINER_PATH: &str = "/home/executor/node_modules";
const CACHE_HOST_PATH: &str = "/var/lib/runsafe/cache/npm";
const ENTRY_CANDIDATES: &[&str] = &["index.js", "app.js", "server.js", "main.js", "start.js"];

#[derive(Default)]
pub struct NodeRunner;

impl NodeRunner {
    async fn package_json(dir: &Path) -> Option<Value> {
        let text = tokio::fs::read_to_string(dir.join("package.json")).await.ok()?;
        serde_json::from_str(&text).ok()
    }

    async fn uses_yarn(dir: &Path) -> bool {
        tokio::fs::metadata(dir.join("yarn.lock")).await.is_ok()
    }

    async fn resolve_entry(dir: &Path, package: &Option<Value>) -> Option<String> {
        if let Some(main) = package.as_ref().and_then(|p| p.get("main")).and_then(|m| m.as_str()) {
            if tokio::fs::metadata(dir.join(main)).await.is_ok() {
                return Some(main.to_string());
            }
        }
        for candidate in ENTRY_CANDIDATES {
            if tokio::fs::metadata(dir.join(candidate)).await.is_ok() {
                return Some(candidate.to_string());
            }
        }
        None
    }

    fn has_build_script(package: &Option<Value>) -> bool {
        package
            .as_ref()
            .and_then(|p| p.get("scripts"))
            .and_then(|s| s.get("build"))
            .is_some()
    }

    fn dependencies(package: &Option<Value>) -> Vec<String> {
        package
            .as_ref()
            .and_then(|p| p.get("dependencies"))
            .and_then(|d| d.as_object())
            .map(|deps| deps.keys().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LanguageRunner for NodeRunner {
    fn name(&self) -> &'static str {
        "node"
    }

    fn priority(&self) -> i32 {
        40
    }

    async fn can_handle(&self, dir: &Path) -> bool {
        tokio::fs::metadata(dir.join("package.json")).await.is_ok()
    }

    async fn analyze(&self, dir: &Path) -> RunnerAnalysis {
        let package = Self::package_json(dir).await;
        let main_entry_point = Self::resolve_entry(dir, &package).await;
        let project_type = package
            .as_ref()
            .and_then(|p| p.get("name"))
            .and_then(|n| n.as_str())
            .map(|n| format!("node ({n})"))
            .unwrap_or_else(|| "node".to_string());

        RunnerAnalysis {
            language: "JavaScript".to_string(),
            project_type,
            entry_points: main_entry_point.clone().into_iter().collect(),
            main_entry_point,
            dependencies: Self::dependencies(&package),
            has_build_file: package.is_some(),
            metadata: HashMap::new(),
        }
    }

    async fn validate(&self, dir: &Path) -> ValidationResult {
        let mut result = check_toolchain("node", &["--version"]).await;
        if Self::uses_yarn(dir).await {
            result.merge(check_toolchain("yarn", &["--version"]).await);
        } else {
            result.merge(check_toolchain("npm", &["--version"]).await);
        }
        result
    }

    async fn build(&self, dir: &Path, ctx: &BuildContext) -> RunnerResult<BuildResult> {
        let package = Self::package_json(dir).await;
        if package.is_none() {
            return Ok(BuildResult::success(String::new(), String::new(), Vec::new(), chrono::Duration::zero()));
        }
        let use_yarn = Self::uses_yarn(dir).await;
        let outputs_dir = dir.join("..").join("outputs");
        let cache_mount = Some((Path::new(CACHE_HOST_PATH), CACHE_CONTAINER_PATH));
        fix_cache_ownership(ctx, dir, &outputs_dir, Path::new(CACHE_HOST_PATH), CACHE_CONTAINER_PATH).await?;

        let install_argv = if use_yarn {
            vec!["yarn".to_string(), "install".to_string()]
        } else {
            vec!["npm".to_string(), "install".to_string()]
        };
        let mut cache_env = HashMap::new();
        cache_env.insert(
            if use_yarn { "YARN_CACHE_FOLDER" } else { "NPM_CONFIG_CACHE" }.to_string(),
            CACHE_CONTAINER_PATH.to_string(),
        );

        let install_plan = build_plan(&ctx.sandbox, dir, &outputs_dir, install_argv, cache_env, cache_mount, true, false, None);
        let install = run_step(ctx, install_plan).await?;
        if !install.succeeded() {
            return Ok(BuildResult::failure(install.stdout, install.stderr, install.duration));
        }

        if Self::has_build_script(&package) {
            let build_argv = if use_yarn {
                vec!["yarn".to_string(), "build".to_string()]
            } else {
                vec!["npm".to_string(), "run".to_string(), "build".to_string()]
            };
            let build_plan_spec = build_plan(&ctx.sandbox, dir, &outputs_dir, build_argv, HashMap::new(), cache_mount, false, false, None);
            let build = run_step(ctx, build_plan_spec).await?;
            return Ok(if build.succeeded() {
                BuildResult::success(
                    format!("{}\n{}", install.stdout, build.stdout),
                    format!("{}\n{}", install.stderr, build.stderr),
                    Vec::new(),
                    install.duration + build.duration,
                )
            } else {
                BuildResult::failure(build.stdout, build.stderr, build.duration)
            });
        }

        Ok(BuildResult::success(install.stdout, install.stderr, Vec::new(), install.duration))
    }

    async fn execute(
        &self,
        dir: &Path,
        ctx: &ExecuteContext,
        dispatch: &dyn TierDispatch,
    ) -> RunnerResult<SandboxOutcome> {
        let package = Self::package_json(dir).await;
        let entry = Self::resolve_entry(dir, &package).await.ok_or(RunnerError::NoEntryPoint)?;
        let argv = vec!["node".to_string(), entry];

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

async fn run_step(ctx: &BuildContext, plan: runsafe_sandbox::RunPlan) -> RunnerResult<SandboxOutcome> {
    runsafe_sandbox::run(&plan, ctx.sandbox.runtime.as_deref(), &ctx.cancel, None, &ctx.execution_id)
        .await
        .map_err(RunnerError::from)
}
