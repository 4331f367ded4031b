// ABOUTME: Project analyzer: file inventory, complexity scoring, and runner-contributed structure
// ABOUTME: Iterates the runner registry in priority order; the first CanHandle match wins

pub mod complexity;
pub mod inventory;

use std::path::Path;
use std::sync::Arc;

use runsafe_core::types::ProjectStructureAnalysis;
use runsafe_runners::RunnerRegistry;
use tracing::warn;

pub struct Analyzer {
    registry: Arc<RunnerRegistry>,
}

impl Analyzer {
    pub fn new(registry: Arc<RunnerRegistry>) -> Self {
        Self { registry }
    }

    pub async fn analyze(&self, project_dir: &Path) -> ProjectStructureAnalysis {
        let files = inventory::walk(project_dir);

        let mut source_files = Vec::new();
        let mut config_files = Vec::new();
        let mut binary_files = Vec::new();
        for file in &files {
            use runsafe_core::types::FileKind;
            match file.kind {
                FileKind::Config => config_files.push(file.clone()),
                FileKind::Other => binary_files.push(file.clone()),
                _ => source_files.push(file.clone()),
            }
        }

        let total_lines: u64 = files.iter().map(|f| f.estimated_lines).sum();

        let runner = self.registry.find_handler(project_dir).await;
        let contributed = match &runner {
            Some(runner) => Some(runner.analyze(project_dir).await),
            None => {
                warn!(project_dir = %project_dir.display(), "no runner could handle this project during analysis");
                None
            }
        };

        let complexity = complexity::score(
            files.len(),
            contributed.as_ref().map(|c| c.dependencies.len()).unwrap_or(0),
            total_lines,
        );

        ProjectStructureAnalysis {
            language: contributed.as_ref().map(|c| c.language.clone()).unwrap_or_else(|| "unknown".to_string()),
            project_type: contributed.as_ref().map(|c| c.project_type.clone()).unwrap_or_else(|| "unknown".to_string()),
            entry_points: contributed.as_ref().map(|c| c.entry_points.clone()).unwrap_or_default(),
            main_entry_point: contributed.as_ref().and_then(|c| c.main_entry_point.clone()),
            source_files,
            config_files,
            binary_files,
            dependencies: contributed.as_ref().map(|c| c.dependencies.clone()).unwrap_or_default(),
            has_build_file: contributed.as_ref().map(|c| c.has_build_file).unwrap_or(false),
            complexity,
            metadata: contributed.map(|c| c.metadata).unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn analyzes_a_minimal_python_project() {
        let dir = tempfile::tempdir().unwrap();
        let mut main = std::fs::File::create(dir.path().join("main.py")).unwrap();
        writeln!(main, "print('hello')").unwrap();
        let mut reqs = std::fs::File::create(dir.path().join("requirements.txt")).unwrap();
        writeln!(reqs, "requests==2.31.0").unwrap();

        let analyzer = Analyzer::new(Arc::new(RunnerRegistry::with_defaults()));
        let analysis = analyzer.analyze(dir.path()).await;

        assert_eq!(analysis.language, "Python");
        assert!(analysis.has_build_file);
        assert_eq!(analysis.main_entry_point.as_deref(), Some("main.py"));
        assert!(analysis.dependencies.contains(&"requests".to_string()));
    }

    #[tokio::test]
    async fn unknown_project_still_produces_an_inventory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "hello").unwrap();

        let analyzer = Analyzer::new(Arc::new(RunnerRegistry::with_defaults()));
        let analysis = analyzer.analyze(dir.path()).await;

        assert_eq!(analysis.language, "unknown");
        assert_eq!(analysis.complexity.total_files, 1);
    }
}
