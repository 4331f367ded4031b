// ABOUTME: Best-effort peak resident-set-size sampling for a running child, polling
// ABOUTME: /proc/<pid>/status the way a container runtime's stats call would report usage

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Tracks the highest `VmHWM` observed for a pid while it runs. Reading the
/// peak is always safe, including before the background task has sampled
/// anything (it reports 0) or after the process has already exited.
pub struct PeakMemorySampler {
    peak_bytes: Arc<AtomicU64>,
}

impl PeakMemorySampler {
    /// Spawns the sampling task. `pid` is `None` for sandboxed runs where the
    /// child is managed by a container runtime outside this process tree;
    /// the sampler then reports 0 rather than guessing.
    pub fn spawn(pid: Option<u32>) -> (Self, tokio::task::JoinHandle<()>) {
        let peak_bytes = Arc::new(AtomicU64::new(0));
        let handle = tokio::spawn({
            let peak_bytes = peak_bytes.clone();
            async move {
                let Some(pid) = pid else { return };
                let mut interval = tokio::time::interval(POLL_INTERVAL);
                loop {
                    interval.tick().await;
                    let Some(bytes) = read_vm_hwm(pid).await else {
                        break;
                    };
                    let mut current = peak_bytes.load(Ordering::Relaxed);
                    while bytes > current {
                        match peak_bytes.compare_exchange_weak(current, bytes, Ordering::Relaxed, Ordering::Relaxed) {
                            Ok(_) => break,
                            Err(observed) => current = observed,
                        }
                    }
                }
            }
        });
        (Self { peak_bytes }, handle)
    }

    pub fn peak_bytes(&self) -> u64 {
        self.peak_bytes.load(Ordering::Relaxed)
    }
}

#[cfg(target_os = "linux")]
async fn read_vm_hwm(pid: u32) -> Option<u64> {
    let contents = tokio::fs::read_to_string(format!("/proc/{pid}/status")).await.ok()?;
    for line in contents.lines() {
        if let Some(rest) = line.strip_prefix("VmHWM:") {
            let kb: u64 = rest.trim().trim_end_matches("kB").trim().parse().ok()?;
            return Some(kb * 1024);
        }
    }
    None
}

#[cfg(not(target_os = "linux"))]
async fn read_vm_hwm(_pid: u32) -> Option<u64> {
    None
}

#[cfg(all(test, target_os = "linux"))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn samples_this_process_own_memory() {
        let pid = std::process::id();
        let sample = read_vm_hwm(pid).await;
        assert!(sample.is_some());
        assert!(sample.unwrap() > 0);
    }

    #[tokio::test]
    async fn an_unknown_pid_yields_no_sample() {
        assert!(read_vm_hwm(u32::MAX).await.is_none());
    }
}
