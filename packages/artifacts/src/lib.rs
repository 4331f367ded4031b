// ABOUTME: Artifact collector (post-run project/ -> outputs/ diff-and-copy) plus the logs/ writer

pub mod collector;
pub mod error;
pub mod log_writer;

pub use collector::collect;
pub use error::{ArtifactError, ArtifactResult};
pub use log_writer::write_logs;
