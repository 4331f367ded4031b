// ABOUTME: Per-execution directory layout helpers
// ABOUTME: Enforces the {workingDir}/{program}/{version}/execution/{id}/{project,outputs,logs} invariant

use std::path::{Path, PathBuf};

/// Root directory for a single execution, per the layout invariant:
/// `{workingDir}/{programId}/{versionId}/execution/{executionId}/`.
pub fn execution_root(
    working_dir: &Path,
    program_id: &str,
    version_id: &str,
    execution_id: &str,
) -> PathBuf {
    working_dir
        .join(program_id)
        .join(version_id)
        .join("execution")
        .join(execution_id)
}

pub fn project_dir(execution_root: &Path) -> PathBuf {
    execution_root.join("project")
}

pub fn outputs_dir(execution_root: &Path) -> PathBuf {
    execution_root.join("outputs")
}

pub fn logs_dir(execution_root: &Path) -> PathBuf {
    execution_root.join("logs")
}

/// Create the `project/`, `outputs/`, and `logs/` subtree under `root`.
pub async fn create_layout(root: &Path) -> std::io::Result<()> {
    tokio::fs::create_dir_all(project_dir(root)).await?;
    tokio::fs::create_dir_all(outputs_dir(root)).await?;
    tokio::fs::create_dir_all(logs_dir(root)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_the_invariant_layout() {
        let working_dir = Path::new("/var/runsafe");
        let root = execution_root(working_dir, "prog1", "v2", "exec3");
        assert_eq!(
            root,
            Path::new("/var/runsafe/prog1/v2/execution/exec3")
        );
        assert_eq!(project_dir(&root), root.join("project"));
        assert_eq!(outputs_dir(&root), root.join("outputs"));
        assert_eq!(logs_dir(&root), root.join("logs"));
    }

    #[tokio::test]
    async fn create_layout_makes_all_three_subdirs() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("exec1");
        create_layout(&root).await.unwrap();
        assert!(project_dir(&root).is_dir());
        assert!(outputs_dir(&root).is_dir());
        assert!(logs_dir(&root).is_dir());
    }
}
