// ABOUTME: Security scan: a fixed substring list over a fixed set of source extensions, advisory only

use std::path::Path;

use walkdir::WalkDir;

const SCANNED_EXTENSIONS: &[&str] = &["cs", "py", "java", "js", "ts", "php", "rb"];

struct Pattern {
    needle: &'static str,
    severity: &'static str,
}

const PATTERNS: &[Pattern] = &[
    Pattern { needle: "eval(", severity: "medium" },
    Pattern { needle: "exec(", severity: "medium" },
    Pattern { needle: "os.system(", severity: "high" },
    Pattern { needle: "subprocess.call", severity: "high" },
    Pattern { needle: "subprocess.Popen", severity: "high" },
    Pattern { needle: "require('child_process')", severity: "high" },
    Pattern { needle: "require(\"child_process\")", severity: "high" },
    Pattern { needle: "Process.Start", severity: "high" },
    Pattern { needle: "ProcessBuilder", severity: "high" },
    Pattern { needle: "Runtime.getRuntime().exec", severity: "high" },
    Pattern { needle: "shell_exec(", severity: "high" },
    Pattern { needle: "popen(", severity: "medium" },
];

#[derive(Debug, Clone)]
pub struct SecurityIssue {
    pub file: String,
    pub pattern: String,
    pub severity: String,
}

#[derive(Debug, Clone)]
pub struct SecurityScanResult {
    pub issues: Vec<SecurityIssue>,
    pub risk_level: u8,
}

/// Reads every file whose extension is in the scanned set and looks for a
/// fixed list of suspicious substrings. Risk level buckets on issue count:
/// 0 -> 1, <3 -> 2, <6 -> 3, <10 -> 4, else 5.
pub fn scan(project_dir: &Path) -> SecurityScanResult {
    let mut issues = Vec::new();

    for entry in WalkDir::new(project_dir).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(ext) = entry.path().extension().and_then(|e| e.to_str()) else {
            continue;
        };
        if !SCANNED_EXTENSIONS.contains(&ext) {
            continue;
        }
        let Ok(text) = std::fs::read_to_string(entry.path()) else {
            continue;
        };
        let relative = entry
            .path()
            .strip_prefix(project_dir)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .to_string();

        for pattern in PATTERNS {
            if text.contains(pattern.needle) {
                issues.push(SecurityIssue {
                    file: relative.clone(),
                    pattern: pattern.needle.to_string(),
                    severity: pattern.severity.to_string(),
                });
            }
        }
    }

    let risk_level = match issues.len() {
        0 => 1,
        n if n < 3 => 2,
        n if n < 6 => 3,
        n if n < 10 => 4,
        _ => 5,
    };

    SecurityScanResult { issues, risk_level }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_a_process_spawn_idiom() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.py"), "import os\nos.system('rm -rf /')\n").unwrap();

        let result = scan(dir.path());

        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.risk_level, 2);
    }

    #[test]
    fn clean_project_has_risk_level_one() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ok.py"), "print('hello')\n").unwrap();

        let result = scan(dir.path());

        assert!(result.issues.is_empty());
        assert_eq!(result.risk_level, 1);
    }
}
