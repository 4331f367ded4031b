// ABOUTME: Project validator: sequential checks (existence, size, blocked extensions, security scan,
// ABOUTME: runner-specific Validate), aggregated into one ValidationResult

pub mod security;

use std::path::Path;
use std::sync::Arc;

use runsafe_config::EngineConfig;
use runsafe_core::types::ValidationResult;
use runsafe_runners::RunnerRegistry;
use walkdir::WalkDir;

pub struct Validator {
    config: Arc<EngineConfig>,
    registry: Arc<RunnerRegistry>,
}

impl Validator {
    pub fn new(config: Arc<EngineConfig>, registry: Arc<RunnerRegistry>) -> Self {
        Self { config, registry }
    }

    pub async fn validate(&self, project_dir: &Path) -> ValidationResult {
        let mut result = ValidationResult::ok();

        if !project_dir.is_dir() {
            result.add_error(format!("{} does not exist or is not a directory", project_dir.display()));
            return result;
        }

        let entries: Vec<_> = WalkDir::new(project_dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .collect();

        if entries.is_empty() {
            result.add_error("extracted project directory is empty".to_string());
            return result;
        }

        for entry in &entries {
            if let Some(ext) = entry.path().extension().and_then(|e| e.to_str()) {
                let dotted = format!(".{ext}");
                if self.config.blocked_file_extensions.iter().any(|b| b.eq_ignore_ascii_case(&dotted)) {
                    result.add_warning(format!(
                        "{} has a blocked extension ({dotted})",
                        entry.path().strip_prefix(project_dir).unwrap_or(entry.path()).display()
                    ));
                }
            }
        }

        let total_size: u64 = entries.iter().filter_map(|e| e.metadata().ok()).map(|m| m.len()).sum();
        if total_size > self.config.max_project_size_bytes {
            result.add_error(format!(
                "project size {total_size} bytes exceeds the {} byte cap",
                self.config.max_project_size_bytes
            ));
        }

        if self.config.enable_security_scanning {
            let scan = security::scan(project_dir);
            for issue in &scan.issues {
                result.add_warning(format!(
                    "{}: suspicious pattern `{}` ({})",
                    issue.file, issue.pattern, issue.severity
                ));
            }
        }

        if let Some(runner) = self.registry.find_handler(project_dir).await {
            result.merge(runner.validate(project_dir).await);
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_directory_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let validator = Validator::new(Arc::new(EngineConfig::default()), Arc::new(RunnerRegistry::with_defaults()));

        let result = validator.validate(dir.path()).await;

        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e.contains("empty")));
    }

    #[tokio::test]
    async fn oversized_project_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("big.bin"), vec![0u8; 1024]).unwrap();
        let mut config = EngineConfig::default();
        config.max_project_size_bytes = 10;

        let validator = Validator::new(Arc::new(config), Arc::new(RunnerRegistry::with_defaults()));
        let result = validator.validate(dir.path()).await;

        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e.contains("exceeds")));
    }

    #[tokio::test]
    async fn blocked_extension_is_a_warning_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("setup.sh"), "#!/bin/sh\necho hi\n").unwrap();

        let validator = Validator::new(Arc::new(EngineConfig::default()), Arc::new(RunnerRegistry::with_defaults()));
        let result = validator.validate(dir.path()).await;

        assert!(result.valid);
        assert!(result.warnings.iter().any(|w| w.contains(".sh")));
    }
}
