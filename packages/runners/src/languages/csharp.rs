// ABOUTME: The C# runner: csproj discovery, dotnet restore/build/run, UI-component helper injection

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use regex::Regex;
use runsafe_core::types::{BuildResult, CompilerWarning, ValidationResult};
use runsafe_sandbox::SandboxOutcome;
use tracing::warn;

use super::shared::{check_toolchain, find_files_with_extensions, fix_cache_ownership, write_helper_file};
use crate::context::{build_plan, BuildContext, ExecuteContext};
use crate::dispatch::TierDispatch;
use crate::error::{RunnerError, RunnerResult};
use crate::runner::{LanguageRunner, RunnerAnalysis};

const CACHE_CONTAINER_PATH: &str = "/home/executor/.nuget";
const CACHE_HOST_PATH: &str = "/var/lib/runsafe/cache/nuget";
const UI_COMPONENT_FILE: &str = "GeneratedUiComponent.cs";

#[derive(Default)]
pub struct CSharpRunner;

impl CSharpRunner {
    /// Prefers a csproj declaring `OutputType` Exe/WinExe; otherwise the
    /// first one found, with a warning.
    fn select_runnable_project(projects: &[PathBuf], contents: &HashMap<PathBuf, String>) -> Option<PathBuf> {
        if let Some(exe) = projects.iter().find(|p| {
            contents.get(*p).is_some_and(|text| {
                text.contains("<OutputType>Exe</OutputType>") || text.contains("<OutputType>WinExe</OutputType>")
            })
        }) {
            return Some(exe.clone());
        }
        if let Some(first) = projects.first() {
            warn!(project = %first.display(), "no csproj declares an Exe OutputType; using the first project found");
            return Some(first.clone());
        }
        None
    }

    fn parse_dependencies(text: &str) -> Vec<String> {
        let re = Regex::new(r#"<PackageReference\s+Include="([^"]+)""#).unwrap();
        re.captures_iter(text).map(|c| c[1].to_string()).collect()
    }

    async fn read_projects(dir: &Path) -> (Vec<PathBuf>, HashMap<PathBuf, String>) {
        let projects = find_files_with_extensions(dir, &["csproj"]);
        let mut contents = HashMap::new();
        for project in &projects {
            if let Ok(text) = tokio::fs::read_to_string(project).await {
                contents.insert(project.clone(), text);
            }
        }
        (projects, contents)
    }
}

#[async_trait]
impl LanguageRunner for CSharpRunner {
    fn name(&self) -> &'static str {
        "csharp"
    }

    fn priority(&self) -> i32 {
        10
    }

    async fn can_handle(&self, dir: &Path) -> bool {
        !find_files_with_extensions(dir, &["csproj"]).is_empty()
    }

    async fn analyze(&self, dir: &Path) -> RunnerAnalysis {
        let (projects, contents) = Self::read_projects(dir).await;
        let dependencies = contents.values().flat_map(|text| Self::parse_dependencies(text)).collect();
        let main = Self::select_runnable_project(&projects, &contents);

        RunnerAnalysis {
            language: "C#".to_string(),
            project_type: "console/web".to_string(),
            entry_points: relative_paths(dir, &projects),
            main_entry_point: main.and_then(|p| p.strip_prefix(dir).ok().map(|p| p.to_string_lossy().to_string())),
            dependencies,
            has_build_file: !projects.is_empty(),
            metadata: HashMap::new(),
        }
    }

    async fn validate(&self, _dir: &Path) -> ValidationResult {
        check_toolchain("dotnet", &["--version"]).await
    }

    async fn build(&self, dir: &Path, ctx: &BuildContext) -> RunnerResult<BuildResult> {
        if let Some(source) = &ctx.ui_component_source {
            write_helper_file(dir, UI_COMPONENT_FILE, source).await?;
        }

        let outputs_dir = dir.join("..").join("outputs");
        let cache_mount = Some((Path::new(CACHE_HOST_PATH), CACHE_CONTAINER_PATH));

        fix_cache_ownership(ctx, dir, &outputs_dir, Path::new(CACHE_HOST_PATH), CACHE_CONTAINER_PATH).await?;

        let restore_plan = build_plan(
            &ctx.sandbox,
            dir,
            &outputs_dir,
            vec!["dotnet".into(), "restore".into()],
            HashMap::new(),
            cache_mount,
            true,
            false,
            None,
        );
        let restore = run_step(ctx, restore_plan).await?;
        if !restore.succeeded() {
            return Ok(BuildResult::failure(restore.stdout, restore.stderr, restore.duration));
        }

        let mut argv = vec!["dotnet".to_string(), "build".to_string(), "--no-restore".to_string()];
        if let Some(configuration) = &ctx.build_args.configuration {
            argv.push("--configuration".to_string());
            argv.push(configuration.clone());
        }
        argv.extend(ctx.build_args.additional_args.iter().cloned());

        let compile_plan = build_plan(&ctx.sandbox, dir, &outputs_dir, argv, HashMap::new(), cache_mount, false, false, None);
        let compile = run_step(ctx, compile_plan).await?;
        let warnings = parse_warnings(&compile.stdout);

        Ok(if compile.succeeded() {
            BuildResult::success(compile.stdout, compile.stderr, warnings, compile.duration)
        } else {
            BuildResult::failure(compile.stdout, compile.stderr, compile.duration)
        })
    }

    async fn execute(
        &self,
        dir: &Path,
        ctx: &ExecuteContext,
        dispatch: &dyn TierDispatch,
    ) -> RunnerResult<SandboxOutcome> {
        let (projects, contents) = Self::read_projects(dir).await;
        let project = Self::select_runnable_project(&projects, &contents);

        let mut argv = vec!["dotnet".to_string(), "run".to_string()];
        if let Some(project) = &project {
            argv.push("--project".to_string());
            argv.push(project.to_string_lossy().to_string());
        }
        argv.push("--no-build".to_string());
        argv.push("--no-restore".to_string());

        if !ctx.parameters.is_empty() {
            argv.push("--".to_string());
            argv.push(serde_json::to_string(&ctx.parameters).unwrap_or_default());
        }

        let outputs_dir = dir.join("..").join("outputs");
        let plan = build_plan(
            &ctx.sandbox,
            dir,
            &outputs_dir,
            argv,
            ctx.environment.clone(),
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

fn relative_paths(dir: &Path, paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .filter_map(|p| p.strip_prefix(dir).ok())
        .map(|p| p.to_string_lossy().to_string())
        .collect()
}

async fn run_step(ctx: &BuildContext, plan: runsafe_sandbox::RunPlan) -> RunnerResult<SandboxOutcome> {
    runsafe_sandbox::run(&plan, ctx.sandbox.runtime.as_deref(), &ctx.cancel, None, &ctx.execution_id)
        .await
        .map_err(RunnerError::from)
}

fn parse_warnings(stdout: &str) -> Vec<CompilerWarning> {
    let re =
        Regex::new(r"(?P<file>[^\s:]+)\((?P<line>\d+),\d+\): warning (?P<code>CS\d+): (?P<message>.+?) \[").unwrap();
    re.captures_iter(stdout)
        .map(|c| CompilerWarning {
            file: Some(c["file"].to_string()),
            line: c["line"].parse().ok(),
            code: Some(c["code"].to_string()),
            message: c["message"].to_string(),
        })
        .collect()
}
