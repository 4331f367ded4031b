// ABOUTME: Metadata lookup ports — read-only program/version/UI-component accessors
// ABOUTME: The metadata database itself is out of scope; these are the interfaces the engine consumes

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::PortResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgramStatus {
    Active,
    Archived,
    Deleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VersionStatus {
    Draft,
    PendingApproval,
    Approved,
    Rejected,
}

#[derive(Debug, Clone)]
pub struct ProgramRecord {
    pub id: String,
    pub current_version: Option<String>,
    pub status: ProgramStatus,
}

#[derive(Debug, Clone)]
pub struct VersionRecord {
    pub id: String,
    pub program_id: String,
    pub version_number: u32,
    pub status: VersionStatus,
}

#[async_trait]
pub trait ProgramRepository: Send + Sync {
    async fn get(&self, id: &str) -> PortResult<ProgramRecord>;
}

#[async_trait]
pub trait VersionRepository: Send + Sync {
    async fn get(&self, id: &str) -> PortResult<VersionRecord>;
    async fn get_latest(&self, program_id: &str) -> PortResult<Option<VersionRecord>>;
    /// The latest version with `status == Approved`, used as the last-resort
    /// fallback in the engine's version-resolution step.
    async fn get_latest_approved(&self, program_id: &str) -> PortResult<Option<VersionRecord>>;
}

/// Static source-text metadata for the UI-component helper the C# and
/// Python runners generate into the sandboxed project before build/execute.
#[derive(Debug, Clone)]
pub struct UiComponentMetadata {
    pub component_name: String,
    pub source: String,
}

#[async_trait]
pub trait UiComponentRepository: Send + Sync {
    async fn get_latest_active(&self, program_id: &str) -> PortResult<Option<UiComponentMetadata>>;
}
