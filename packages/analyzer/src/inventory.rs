// ABOUTME: Walks the extracted project tree and classifies every file into a coarse FileKind

use std::path::Path;

use runsafe_core::types::{FileEntry, FileKind};
use walkdir::WalkDir;

const NOISE_DIRS: &[&str] = &["node_modules", ".git", "__pycache__", "bin", "obj"];

pub fn walk(project_dir: &Path) -> Vec<FileEntry> {
    WalkDir::new(project_dir)
        .into_iter()
        .filter_entry(|entry| {
            entry.file_type().is_file() || !NOISE_DIRS.contains(&entry.file_name().to_string_lossy().as_ref())
        })
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| build_entry(project_dir, entry.path()))
        .collect()
}

fn build_entry(project_dir: &Path, path: &Path) -> Option<FileEntry> {
    let relative_path = path.strip_prefix(project_dir).ok()?.to_string_lossy().to_string();
    let metadata = std::fs::metadata(path).ok()?;
    let size_bytes = metadata.len();
    let extension = path.extension().map(|e| e.to_string_lossy().to_string());
    let file_name = path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();

    Some(FileEntry {
        relative_path,
        extension: extension.clone(),
        size_bytes,
        kind: classify(&file_name, extension.as_deref()),
        estimated_lines: (size_bytes / 50).max(1),
    })
}

fn classify(file_name: &str, extension: Option<&str>) -> FileKind {
    if file_name.eq_ignore_ascii_case("dockerfile") {
        return FileKind::DockerFile;
    }
    if file_name.eq_ignore_ascii_case("pom.xml") {
        return FileKind::MavenPom;
    }
    if file_name.eq_ignore_ascii_case("build.gradle") || file_name.eq_ignore_ascii_case("build.gradle.kts") {
        return FileKind::GradleBuild;
    }
    match extension.map(|e| e.to_ascii_lowercase()).as_deref() {
        Some("cs") => FileKind::CSharpSource,
        Some("csproj") | Some("sln") => FileKind::CSharpSolutionOrProject,
        Some("py") => FileKind::PythonSource,
        Some("js" | "mjs" | "cjs" | "jsx") => FileKind::JavaScriptSource,
        Some("ts" | "tsx") => FileKind::TypeScriptSource,
        Some("json" | "xml" | "yaml" | "yml" | "toml") => FileKind::Config,
        Some("md" | "markdown") => FileKind::Markdown,
        Some("html" | "htm") => FileKind::Html,
        Some("css" | "scss" | "less") => FileKind::Css,
        Some("txt" | "log") => FileKind::Text,
        _ => FileKind::Other,
    }
}
