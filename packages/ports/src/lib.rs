// ABOUTME: External collaborator interfaces: artifact storage, metadata lookups,
// ABOUTME: streaming sink, and container runtime, plus in-memory fakes of each for testing

pub mod artifact_store;
pub mod container_runtime;
pub mod error;
pub mod fakes;
pub mod metadata;
pub mod stream_sink;
pub mod workflow_inputs;

pub use artifact_store::{sha256_hex, ArtifactMeta, ArtifactStore, ArtifactValidation};
pub use container_runtime::{ContainerRunSpec, ContainerRuntime, MountSpec};
pub use error::{PortError, PortResult};
pub use metadata::{
    ProgramRecord, ProgramRepository, ProgramStatus, UiComponentMetadata, UiComponentRepository,
    VersionRecord, VersionRepository, VersionStatus,
};
pub use stream_sink::{CompletedEvent, StreamSink, StreamStatus};
pub use workflow_inputs::WorkflowInputsProvider;
