// ABOUTME: Sandbox process driver: runs one child to completion, direct-host or sandboxed,
// ABOUTME: pumping stdout/stderr line by line with live streaming and cancellation support

pub mod driver;
pub mod error;
pub mod stats;
pub mod types;

pub use driver::run;
pub use error::{SandboxError, SandboxResult};
pub use types::{DirectRunPlan, RunPlan, SandboxOutcome};

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::PathBuf;

    use runsafe_core::CancelHandle;
    use tokio_util::sync::CancellationToken;

    use super::*;

    #[tokio::test]
    async fn direct_run_captures_stdout_and_exit_code() {
        let plan = RunPlan::Direct(DirectRunPlan {
            argv: vec!["sh".into(), "-c".into(), "echo hello; exit 3".into()],
            working_dir: PathBuf::from("/tmp"),
            env: HashMap::new(),
        });
        let cancel = CancelHandle::new(CancellationToken::new(), None);

        let outcome = run(&plan, None, &cancel, None, "exec-1").await.unwrap();

        assert_eq!(outcome.exit_code, 3);
        assert!(outcome.stdout.contains("hello"));
        assert!(!outcome.cancelled);
        assert!(!outcome.succeeded());
    }

    #[tokio::test]
    async fn stderr_line_with_error_substring_is_still_captured() {
        let plan = RunPlan::Direct(DirectRunPlan {
            argv: vec!["sh".into(), "-c".into(), "echo boom 1>&2".into()],
            working_dir: PathBuf::from("/tmp"),
            env: HashMap::new(),
        });
        let cancel = CancelHandle::new(CancellationToken::new(), None);

        let outcome = run(&plan, None, &cancel, None, "exec-2").await.unwrap();

        assert!(outcome.stderr.contains("boom"));
        assert_eq!(outcome.exit_code, 0);
        assert!(outcome.succeeded());
    }

    #[tokio::test]
    async fn cancellation_kills_a_long_running_child() {
        let plan = RunPlan::Direct(DirectRunPlan {
            argv: vec!["sh".into(), "-c".into(), "sleep 30".into()],
            working_dir: PathBuf::from("/tmp"),
            env: HashMap::new(),
        });
        let cancel = CancelHandle::new(CancellationToken::new(), None);
        cancel.cancel_session();

        let outcome = run(&plan, None, &cancel, None, "exec-3").await.unwrap();

        assert!(outcome.cancelled);
        assert_eq!(outcome.exit_code, -1);
    }

    #[tokio::test]
    async fn cancellation_racing_a_natural_exit_preserves_the_exit_code() {
        let plan = RunPlan::Direct(DirectRunPlan {
            argv: vec!["sh".into(), "-c".into(), "exit 7".into()],
            working_dir: PathBuf::from("/tmp"),
            env: HashMap::new(),
        });
        let cancel = CancelHandle::new(CancellationToken::new(), None);
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            canceller.cancel_session();
        });

        let outcome = run(&plan, None, &cancel, None, "exec-4").await.unwrap();

        assert!(!outcome.cancelled);
        assert_eq!(outcome.exit_code, 7);
        assert!(!outcome.succeeded());
    }
}
