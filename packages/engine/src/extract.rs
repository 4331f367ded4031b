// ABOUTME: Extracts one version's stored source tree into a directory on disk
// ABOUTME: Missing individual files are logged and skipped; they do not fail the extraction

use std::path::Path;

use runsafe_ports::{ArtifactStore, PortResult};
use tracing::warn;

/// Writes every artifact for `(program_id, version_id)` under `dest_dir`,
/// preserving relative paths. Returns the count of files actually written.
pub async fn extract_into(
    store: &dyn ArtifactStore,
    program_id: &str,
    version_id: &str,
    dest_dir: &Path,
) -> PortResult<usize> {
    let files = store.list(program_id, version_id).await?;
    let mut written = 0usize;

    for meta in files {
        let bytes = match store.read(program_id, version_id, &meta.path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(path = %meta.path, error = %e, "skipping unreadable artifact during extraction");
                continue;
            }
        };

        let dest = dest_dir.join(&meta.path);
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&dest, &bytes).await?;
        written += 1;
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use runsafe_ports::fakes::FakeArtifactStore;

    #[tokio::test]
    async fn extracts_every_stored_file_preserving_relative_paths() {
        let store = FakeArtifactStore::new();
        store.put_file("prog1", "v1", "main.py", "print('hi')");
        store.put_file("prog1", "v1", "lib/helper.py", "def f(): pass");
        let dest = tempfile::tempdir().unwrap();

        let written = extract_into(&store, "prog1", "v1", dest.path()).await.unwrap();

        assert_eq!(written, 2);
        assert!(dest.path().join("main.py").exists());
        assert!(dest.path().join("lib/helper.py").exists());
    }

    #[tokio::test]
    async fn an_unknown_version_yields_zero_files_without_erroring() {
        let store = FakeArtifactStore::new();
        let dest = tempfile::tempdir().unwrap();

        let written = extract_into(&store, "prog1", "missing", dest.path()).await.unwrap();

        assert_eq!(written, 0);
    }
}
