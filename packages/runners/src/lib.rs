// ABOUTME: Language runner plug-in interface, priority registry, and the C#/Python/Node.js runners
// ABOUTME: Each runner owns its own toolchain invocations; the tier dispatcher is reached only via TierDispatch

pub mod context;
pub mod dispatch;
pub mod error;
pub mod languages;
pub mod registry;
pub mod runner;

pub use context::{BuildContext, ExecuteContext, SandboxSettings};
pub use dispatch::TierDispatch;
pub use error::{RunnerError, RunnerResult};
pub use registry::RunnerRegistry;
pub use runner::{LanguageRunner, RunnerAnalysis};
