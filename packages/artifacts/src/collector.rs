// ABOUTME: Diffs project/ against the pre-run snapshot and copies selected files into outputs/

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use runsafe_core::CancelHandle;
use walkdir::WalkDir;

use crate::error::ArtifactResult;

const WELL_KNOWN_OUTPUT_DIRS: &[&str] = &["dist", "build", "target", "out", "output"];
const EXCLUDED_SEGMENTS: &[&str] = &["__pycache__", ".git", "node_modules", "bin", "obj"];

fn is_excluded(relative: &Path) -> bool {
    if relative
        .components()
        .any(|c| EXCLUDED_SEGMENTS.contains(&c.as_os_str().to_string_lossy().as_ref()))
    {
        return true;
    }
    relative.file_stem().and_then(|s| s.to_str()) == Some("WorkflowInputs")
}

fn is_well_known_output(relative: &Path) -> bool {
    relative
        .components()
        .next()
        .and_then(|c| c.as_os_str().to_str())
        .map(|first| WELL_KNOWN_OUTPUT_DIRS.contains(&first))
        .unwrap_or(false)
}

/// Walks `project_dir`, selecting files under a well-known output directory
/// or not present in `initial_files`, and copies each to the matching path
/// under `outputs_dir`. Returns the absolute destination paths. Stops (but
/// does not fail) as soon as `cancel` fires, returning whatever was copied
/// so far.
pub async fn collect(
    project_dir: &Path,
    outputs_dir: &Path,
    initial_files: &HashSet<String>,
    cancel: &CancelHandle,
) -> ArtifactResult<Vec<PathBuf>> {
    let mut collected = Vec::new();

    for entry in WalkDir::new(project_dir).into_iter().filter_map(|e| e.ok()) {
        if cancel.is_cancelled() {
            break;
        }
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry.path().strip_prefix(project_dir).unwrap_or(entry.path());
        if is_excluded(relative) {
            continue;
        }

        let relative_str = relative.to_string_lossy().replace('\\', "/");
        let selected = is_well_known_output(relative) || !initial_files.contains(&relative_str);
        if !selected {
            continue;
        }

        let dest = outputs_dir.join(relative);
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(entry.path(), &dest).await?;
        collected.push(dest);
    }

    Ok(collected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_util::sync::CancellationToken;

    fn handle() -> CancelHandle {
        CancelHandle::new(CancellationToken::new(), None)
    }

    #[tokio::test]
    async fn collects_new_files_and_well_known_output_dirs() {
        let project = tempfile::tempdir().unwrap();
        let outputs = tempfile::tempdir().unwrap();

        std::fs::write(project.path().join("Program.cs"), "class Program {}").unwrap();
        let initial_files: HashSet<String> = ["Program.cs".to_string()].into_iter().collect();

        std::fs::write(project.path().join("result.txt"), "done").unwrap();
        std::fs::create_dir_all(project.path().join("build")).unwrap();
        std::fs::write(project.path().join("build").join("lib.dll"), b"\0\0").unwrap();

        let collected = collect(project.path(), outputs.path(), &initial_files, &handle())
            .await
            .unwrap();

        assert!(collected.iter().any(|p| p.ends_with("result.txt")));
        assert!(collected.iter().any(|p| p.ends_with("build/lib.dll") || p.ends_with("build\\lib.dll")));
        assert!(!collected.iter().any(|p| p.ends_with("Program.cs")));
    }

    #[tokio::test]
    async fn excludes_noise_directories_even_when_new() {
        let project = tempfile::tempdir().unwrap();
        let outputs = tempfile::tempdir().unwrap();

        std::fs::create_dir_all(project.path().join("node_modules")).unwrap();
        std::fs::write(project.path().join("node_modules").join("pkg.js"), "module.exports = {}").unwrap();
        std::fs::create_dir_all(project.path().join("__pycache__")).unwrap();
        std::fs::write(project.path().join("__pycache__").join("mod.pyc"), b"\0").unwrap();
        std::fs::write(project.path().join("WorkflowInputs.py"), "WORKFLOW_INPUTS = {}").unwrap();

        let collected = collect(project.path(), outputs.path(), &HashSet::new(), &handle())
            .await
            .unwrap();

        assert!(collected.is_empty());
    }

    #[tokio::test]
    async fn already_cancelled_handle_yields_empty_collection() {
        let project = tempfile::tempdir().unwrap();
        let outputs = tempfile::tempdir().unwrap();
        std::fs::write(project.path().join("result.txt"), "done").unwrap();

        let cancel = handle();
        cancel.cancel_session();
        cancel.cancelled().await;

        let collected = collect(project.path(), outputs.path(), &HashSet::new(), &cancel)
            .await
            .unwrap();

        assert!(collected.is_empty());
    }
}
