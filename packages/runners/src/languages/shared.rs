// ABOUTME: Helpers shared by the three language runner implementations

use std::path::{Path, PathBuf};

use runsafe_core::types::ValidationResult;
use walkdir::WalkDir;

use crate::context::{build_plan, BuildContext, EXECUTOR_USER};
use crate::error::{RunnerError, RunnerResult};

/// Runs the privileged ownership-fix against the mounted package-cache
/// volume before its first unprivileged use. Skipped outside sandboxed
/// mode, where there is no volume to own.
pub async fn fix_cache_ownership(
    ctx: &BuildContext,
    dir: &Path,
    outputs_dir: &Path,
    cache_host_path: &Path,
    cache_container_path: &str,
) -> RunnerResult<()> {
    if !ctx.sandbox.enabled || ctx.package_volume_name.is_none() {
        return Ok(());
    }

    let plan = build_plan(
        &ctx.sandbox,
        dir,
        outputs_dir,
        vec!["chown".to_string(), "-R".to_string(), format!("{EXECUTOR_USER}:{EXECUTOR_USER}"), cache_container_path.to_string()],
        std::collections::HashMap::new(),
        Some((cache_host_path, cache_container_path)),
        false,
        true,
        None,
    );
    let outcome = runsafe_sandbox::run(&plan, ctx.sandbox.runtime.as_deref(), &ctx.cancel, None, &ctx.execution_id)
        .await
        .map_err(RunnerError::from)?;
    if !outcome.succeeded() {
        tracing::warn!(execution_id = %ctx.execution_id, "package-cache ownership fix failed; proceeding unprivileged");
    }
    Ok(())
}

/// Finds files with one of `extensions` under `dir`, skipping the same
/// noise directories the artifact collector excludes.
pub fn find_files_with_extensions(dir: &Path, extensions: &[&str]) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .max_depth(8)
        .into_iter()
        .filter_entry(|e| !is_noise_dir(e.file_name().to_string_lossy().as_ref()))
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| extensions.contains(&ext))
        })
        .map(|entry| entry.path().to_path_buf())
        .collect()
}

fn is_noise_dir(name: &str) -> bool {
    matches!(
        name,
        "node_modules" | "bin" | "obj" | "__pycache__" | ".git" | "dist" | "build"
    )
}

/// Runs `program --version`-style local toolchain availability checks and
/// turns a missing/failing toolchain into a validation error.
pub async fn check_toolchain(program: &str, args: &[&str]) -> ValidationResult {
    let mut result = ValidationResult::ok();
    match tokio::process::Command::new(program).args(args).output().await {
        Ok(output) if output.status.success() => {}
        Ok(output) => {
            result.add_error(format!(
                "{program} reported a non-zero exit checking its version: {}",
                String::from_utf8_lossy(&output.stderr)
            ));
        }
        Err(e) => {
            result.add_error(format!("required toolchain `{program}` is not available: {e}"));
        }
    }
    result
}

pub async fn write_helper_file(dir: &Path, relative_path: &str, source: &str) -> std::io::Result<()> {
    let path = dir.join(relative_path);
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, source).await
}
