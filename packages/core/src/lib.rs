// ABOUTME: Core types and utilities for the runsafe project execution engine
// ABOUTME: Shared by every other package: the data model, directory layout, cancel handle, and parameter tree

pub mod cancel;
pub mod error;
pub mod ids;
pub mod paths;
pub mod types;
pub mod value;

pub use cancel::{CancelHandle, CancelReason};
pub use error::ExecutionError;
pub use value::{flatten_parameters, ParameterTree};
