// ABOUTME: Artifact storage port — list/read/hash/validate over a program's stored source tree
// ABOUTME: Content-addressable by design: Hash is deterministic over bytes, independent of the backend

use async_trait::async_trait;

use crate::error::PortResult;

#[derive(Debug, Clone)]
pub struct ArtifactMeta {
    pub path: String,
    pub size: u64,
    pub hash: String,
}

#[derive(Debug, Clone)]
pub struct ArtifactValidation {
    pub valid: bool,
    pub errors: Vec<String>,
}

#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn list(&self, program_id: &str, version_id: &str) -> PortResult<Vec<ArtifactMeta>>;
    async fn read(&self, program_id: &str, version_id: &str, path: &str) -> PortResult<Vec<u8>>;
    fn hash(&self, bytes: &[u8]) -> String;
    async fn validate(
        &self,
        path: &str,
        bytes: &[u8],
        content_type: Option<&str>,
    ) -> PortResult<ArtifactValidation>;
}

/// Deterministic content hash shared by every `ArtifactStore` implementation.
pub fn sha256_hex(bytes: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}
