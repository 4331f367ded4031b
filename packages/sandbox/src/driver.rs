// ABOUTME: Runs one child process to completion: direct-host or sandboxed, with a line-by-line
// ABOUTME: stdout/stderr pump, optional live streaming, and kill-on-cancel

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use runsafe_core::CancelHandle;
use runsafe_ports::{ContainerRuntime, StreamSink};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{SandboxError, SandboxResult};
use crate::stats::PeakMemorySampler;
use crate::types::{DirectRunPlan, RunPlan, SandboxOutcome};

enum Line {
    Stdout(String),
    Stderr(String),
}

/// Runs `plan` to completion under `cancel`. `sink`, if present, receives a
/// live stdout/stderr event per line; a failing sink never fails the run.
pub async fn run(
    plan: &RunPlan,
    runtime: Option<&dyn ContainerRuntime>,
    cancel: &CancelHandle,
    sink: Option<Arc<dyn StreamSink>>,
    execution_id: &str,
) -> SandboxResult<SandboxOutcome> {
    let child = match plan {
        RunPlan::Direct(direct) => spawn_direct(direct)?,
        RunPlan::Sandboxed(spec) => {
            let runtime = runtime.expect("sandboxed run plan requires a container runtime");
            runtime.spawn(spec).map_err(SandboxError::from)?
        }
    };
    pump(child, cancel, sink, execution_id).await
}

fn spawn_direct(plan: &DirectRunPlan) -> SandboxResult<Child> {
    let Some((program, args)) = plan.argv.split_first() else {
        return Err(SandboxError::Spawn("empty argv".to_string()));
    };
    Command::new(program)
        .args(args)
        .current_dir(&plan.working_dir)
        .envs(&plan.env)
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .spawn()
        .map_err(|e| SandboxError::Spawn(e.to_string()))
}

async fn pump(
    mut child: Child,
    cancel: &CancelHandle,
    sink: Option<Arc<dyn StreamSink>>,
    execution_id: &str,
) -> SandboxResult<SandboxOutcome> {
    let (sampler, sampler_task) = PeakMemorySampler::spawn(child.id());

    let stdout = child.stdout.take().expect("stdout was piped");
    let stderr = child.stderr.take().expect("stderr was piped");

    let (tx, mut rx) = mpsc::unbounded_channel::<Line>();
    let stdout_tx = tx.clone();
    let stdout_task = tokio::spawn(async move {
        let mut lines = BufReader::new(stdout).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if stdout_tx.send(Line::Stdout(line)).is_err() {
                break;
            }
        }
    });
    let stderr_task = tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if tx.send(Line::Stderr(line)).is_err() {
                break;
            }
        }
    });

    let started = Instant::now();
    let mut stdout_buf = String::new();
    let mut stderr_buf = String::new();
    let mut cancelled = false;
    let mut exit_code;

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                match child.try_wait() {
                    Ok(Some(status)) => {
                        // the child had already exited naturally before the kill
                        // attempt; its own exit code wins, not a cancellation
                        exit_code = status.code().unwrap_or(-1);
                    }
                    _ => {
                        cancelled = true;
                        if let Err(e) = child.kill().await {
                            warn!(execution_id, error = %e, "failed to kill cancelled child");
                        }
                        exit_code = -1;
                    }
                }
                break;
            }

            maybe_line = rx.recv() => {
                match maybe_line {
                    Some(Line::Stdout(line)) => {
                        stdout_buf.push_str(&line);
                        stdout_buf.push('\n');
                        emit_stdout(&sink, execution_id, &line).await;
                    }
                    Some(Line::Stderr(line)) => {
                        stderr_buf.push_str(&line);
                        stderr_buf.push('\n');
                        if line.to_lowercase().contains("error") {
                            emit_stderr(&sink, execution_id, &line).await;
                        } else {
                            emit_stdout(&sink, execution_id, &line).await;
                        }
                    }
                    None => {
                        let status = child.wait().await?;
                        exit_code = status.code().unwrap_or(-1);
                        break;
                    }
                }
            }
        }
    }

    let _ = stdout_task.await;
    let _ = stderr_task.await;
    sampler_task.abort();
    let peak_memory_bytes = sampler.peak_bytes();

    // the reader tasks may have buffered a few more lines before their pipes
    // closed; drain them now that both tasks (and their senders) are done
    while let Ok(line) = rx.try_recv() {
        match line {
            Line::Stdout(l) => {
                stdout_buf.push_str(&l);
                stdout_buf.push('\n');
            }
            Line::Stderr(l) => {
                stderr_buf.push_str(&l);
                stderr_buf.push('\n');
            }
        }
    }

    debug!(execution_id, exit_code, cancelled, "child process finished");

    Ok(SandboxOutcome {
        exit_code,
        stdout: stdout_buf,
        stderr: stderr_buf,
        duration: chrono::Duration::from_std(started.elapsed()).unwrap_or_default(),
        cancelled,
        peak_memory_bytes,
    })
}

async fn emit_stdout(sink: &Option<Arc<dyn StreamSink>>, execution_id: &str, line: &str) {
    if let Some(sink) = sink {
        sink.stream_stdout(execution_id, line, Utc::now()).await;
    }
}

async fn emit_stderr(sink: &Option<Arc<dyn StreamSink>>, execution_id: &str, line: &str) {
    if let Some(sink) = sink {
        sink.stream_stderr(execution_id, line, Utc::now()).await;
    }
}
