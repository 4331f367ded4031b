// ABOUTME: In-memory fakes for every port, used by the engine's own integration tests
// ABOUTME: Mirrors the test-support pattern the oddjobs/oj-adapters sibling uses for its FakeAdapter

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::artifact_store::{sha256_hex, ArtifactMeta, ArtifactStore, ArtifactValidation};
use crate::container_runtime::{ContainerRunSpec, ContainerRuntime};
use crate::error::{PortError, PortResult};
use crate::metadata::{
    ProgramRecord, ProgramRepository, ProgramStatus, UiComponentMetadata, UiComponentRepository,
    VersionRecord, VersionRepository, VersionStatus,
};
use crate::stream_sink::{CompletedEvent, StreamSink};
use crate::workflow_inputs::WorkflowInputsProvider;

/// An in-memory artifact store: `(program_id, version_id) -> { path -> bytes }`.
#[derive(Default)]
pub struct FakeArtifactStore {
    files: Mutex<HashMap<(String, String), HashMap<String, Vec<u8>>>>,
}

impl FakeArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_file(&self, program_id: &str, version_id: &str, path: &str, bytes: impl Into<Vec<u8>>) {
        self.files
            .lock()
            .unwrap()
            .entry((program_id.to_string(), version_id.to_string()))
            .or_default()
            .insert(path.to_string(), bytes.into());
    }
}

#[async_trait]
impl ArtifactStore for FakeArtifactStore {
    async fn list(&self, program_id: &str, version_id: &str) -> PortResult<Vec<ArtifactMeta>> {
        let files = self.files.lock().unwrap();
        let Some(entry) = files.get(&(program_id.to_string(), version_id.to_string())) else {
            return Ok(Vec::new());
        };
        Ok(entry
            .iter()
            .map(|(path, bytes)| ArtifactMeta {
                path: path.clone(),
                size: bytes.len() as u64,
                hash: sha256_hex(bytes),
            })
            .collect())
    }

    async fn read(&self, program_id: &str, version_id: &str, path: &str) -> PortResult<Vec<u8>> {
        let files = self.files.lock().unwrap();
        files
            .get(&(program_id.to_string(), version_id.to_string()))
            .and_then(|entry| entry.get(path))
            .cloned()
            .ok_or_else(|| PortError::NotFound {
                resource: "artifact",
                id: path.to_string(),
            })
    }

    fn hash(&self, bytes: &[u8]) -> String {
        sha256_hex(bytes)
    }

    async fn validate(
        &self,
        _path: &str,
        _bytes: &[u8],
        _content_type: Option<&str>,
    ) -> PortResult<ArtifactValidation> {
        Ok(ArtifactValidation {
            valid: true,
            errors: Vec::new(),
        })
    }
}

#[derive(Default)]
pub struct FakeMetadataStore {
    programs: Mutex<HashMap<String, ProgramRecord>>,
    versions: Mutex<HashMap<String, VersionRecord>>,
    components: Mutex<HashMap<String, UiComponentMetadata>>,
}

impl FakeMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_program(&self, id: &str, current_version: Option<&str>, status: ProgramStatus) {
        self.programs.lock().unwrap().insert(
            id.to_string(),
            ProgramRecord {
                id: id.to_string(),
                current_version: current_version.map(str::to_string),
                status,
            },
        );
    }

    pub fn add_version(
        &self,
        id: &str,
        program_id: &str,
        version_number: u32,
        status: VersionStatus,
    ) {
        self.versions.lock().unwrap().insert(
            id.to_string(),
            VersionRecord {
                id: id.to_string(),
                program_id: program_id.to_string(),
                version_number,
                status,
            },
        );
    }

    pub fn add_component(&self, program_id: &str, component_name: &str, source: &str) {
        self.components.lock().unwrap().insert(
            program_id.to_string(),
            UiComponentMetadata {
                component_name: component_name.to_string(),
                source: source.to_string(),
            },
        );
    }
}

#[async_trait]
impl ProgramRepository for FakeMetadataStore {
    async fn get(&self, id: &str) -> PortResult<ProgramRecord> {
        self.programs
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| PortError::NotFound {
                resource: "program",
                id: id.to_string(),
            })
    }
}

#[async_trait]
impl VersionRepository for FakeMetadataStore {
    async fn get(&self, id: &str) -> PortResult<VersionRecord> {
        self.versions
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| PortError::NotFound {
                resource: "version",
                id: id.to_string(),
            })
    }

    async fn get_latest(&self, program_id: &str) -> PortResult<Option<VersionRecord>> {
        Ok(self
            .versions
            .lock()
            .unwrap()
            .values()
            .filter(|v| v.program_id == program_id)
            .max_by_key(|v| v.version_number)
            .cloned())
    }

    async fn get_latest_approved(&self, program_id: &str) -> PortResult<Option<VersionRecord>> {
        Ok(self
            .versions
            .lock()
            .unwrap()
            .values()
            .filter(|v| v.program_id == program_id && v.status == VersionStatus::Approved)
            .max_by_key(|v| v.version_number)
            .cloned())
    }
}

#[async_trait]
impl UiComponentRepository for FakeMetadataStore {
    async fn get_latest_active(&self, program_id: &str) -> PortResult<Option<UiComponentMetadata>> {
        Ok(self.components.lock().unwrap().get(program_id).cloned())
    }
}

/// Collects every event it receives, for assertions in pipeline tests.
#[derive(Default)]
pub struct RecordingStreamSink {
    pub stdout_lines: Mutex<Vec<String>>,
    pub stderr_lines: Mutex<Vec<String>>,
    pub completed: Mutex<Vec<CompletedEvent>>,
}

impl RecordingStreamSink {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StreamSink for RecordingStreamSink {
    async fn stream_stdout(&self, _execution_id: &str, line: &str, _timestamp: DateTime<Utc>) {
        self.stdout_lines.lock().unwrap().push(line.to_string());
    }

    async fn stream_stderr(&self, _execution_id: &str, line: &str, _timestamp: DateTime<Utc>) {
        self.stderr_lines.lock().unwrap().push(line.to_string());
    }

    async fn stream_completed(&self, _execution_id: &str, event: CompletedEvent) {
        self.completed.lock().unwrap().push(event);
    }
}

/// Hands back a fixed source string (or a templated default) regardless of
/// which program asks for it.
pub struct FixedWorkflowInputsProvider {
    source: String,
}

impl FixedWorkflowInputsProvider {
    pub fn new(source: impl Into<String>) -> Self {
        Self { source: source.into() }
    }
}

impl Default for FixedWorkflowInputsProvider {
    fn default() -> Self {
        Self::new("# generated workflow inputs\nWORKFLOW_INPUTS = {}\n")
    }
}

#[async_trait]
impl WorkflowInputsProvider for FixedWorkflowInputsProvider {
    async fn source_for(&self, _program_id: &str) -> PortResult<String> {
        Ok(self.source.clone())
    }
}

/// A container runtime fake that ignores image/mounts/caps and just spawns
/// the argv directly on the host. Lets tier-dispatcher and engine tests run
/// without a real container runtime while still exercising the real
/// spawn/pump/kill code paths.
#[derive(Default)]
pub struct DirectSpawnRuntime {
    created_volumes: Mutex<Vec<String>>,
}

impl DirectSpawnRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn created_volumes(&self) -> Vec<String> {
        self.created_volumes.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContainerRuntime for DirectSpawnRuntime {
    async fn create_volume(&self, name: &str) -> PortResult<()> {
        self.created_volumes.lock().unwrap().push(name.to_string());
        Ok(())
    }

    async fn delete_volume(&self, name: &str) -> PortResult<()> {
        self.created_volumes.lock().unwrap().retain(|v| v != name);
        Ok(())
    }

    fn spawn(&self, spec: &ContainerRunSpec) -> PortResult<tokio::process::Child> {
        let Some((program, args)) = spec.argv.split_first() else {
            return Err(PortError::Other("empty argv".to_string()));
        };
        let mut command = tokio::process::Command::new(program);
        command
            .args(args)
            .current_dir(&spec.working_dir)
            .envs(&spec.env)
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped());
        command.spawn().map_err(PortError::from)
    }
}
