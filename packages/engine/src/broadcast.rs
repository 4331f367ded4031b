// ABOUTME: Fans a single execution's stream events out to both a caller-supplied sink and
// ABOUTME: any number of Engine::subscribe listeners, on top of the single-slot StreamSink port

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use runsafe_ports::{CompletedEvent, StreamSink};
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 1024;

/// One stream event, as delivered to `Engine::subscribe` listeners.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    Stdout {
        execution_id: String,
        line: String,
        timestamp: DateTime<Utc>,
    },
    Stderr {
        execution_id: String,
        line: String,
        timestamp: DateTime<Utc>,
    },
    Completed {
        execution_id: String,
        event: CompletedEvent,
    },
}

/// The `StreamSink` every execution is given. Forwards to an optional
/// external sink (best-effort, per the port's own contract) and broadcasts
/// the same events to live subscribers. A lagging or absent subscriber
/// never affects delivery to the external sink.
pub struct CombinedSink {
    external: Option<Arc<dyn StreamSink>>,
    tx: broadcast::Sender<StreamEvent>,
}

impl CombinedSink {
    pub fn new(external: Option<Arc<dyn StreamSink>>) -> Self {
        let (tx, _rx) = broadcast::channel(CHANNEL_CAPACITY);
        Self { external, tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StreamEvent> {
        self.tx.subscribe()
    }
}

#[async_trait]
impl StreamSink for CombinedSink {
    async fn stream_stdout(&self, execution_id: &str, line: &str, timestamp: DateTime<Utc>) {
        if let Some(external) = &self.external {
            external.stream_stdout(execution_id, line, timestamp).await;
        }
        let _ = self.tx.send(StreamEvent::Stdout {
            execution_id: execution_id.to_string(),
            line: line.to_string(),
            timestamp,
        });
    }

    async fn stream_stderr(&self, execution_id: &str, line: &str, timestamp: DateTime<Utc>) {
        if let Some(external) = &self.external {
            external.stream_stderr(execution_id, line, timestamp).await;
        }
        let _ = self.tx.send(StreamEvent::Stderr {
            execution_id: execution_id.to_string(),
            line: line.to_string(),
            timestamp,
        });
    }

    async fn stream_completed(&self, execution_id: &str, event: CompletedEvent) {
        if let Some(external) = &self.external {
            external.stream_completed(execution_id, event.clone()).await;
        }
        let _ = self.tx.send(StreamEvent::Completed {
            execution_id: execution_id.to_string(),
            event,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runsafe_ports::fakes::RecordingStreamSink;
    use runsafe_ports::StreamStatus;
    use std::sync::Arc;

    #[tokio::test]
    async fn forwards_to_the_external_sink_and_broadcasts() {
        let recording = Arc::new(RecordingStreamSink::new());
        let combined = CombinedSink::new(Some(recording.clone() as Arc<dyn StreamSink>));
        let mut subscriber = combined.subscribe();

        combined.stream_stdout("exec-1", "hello", Utc::now()).await;

        assert_eq!(recording.stdout_lines.lock().unwrap().as_slice(), ["hello"]);
        match subscriber.recv().await.unwrap() {
            StreamEvent::Stdout { line, .. } => assert_eq!(line, "hello"),
            other => panic!("expected a Stdout event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn works_with_no_external_sink_and_no_subscribers() {
        let combined = CombinedSink::new(None);
        combined
            .stream_completed(
                "exec-1",
                CompletedEvent {
                    status: StreamStatus::Completed,
                    exit_code: 0,
                    error_message: None,
                    completed_at: Utc::now(),
                    duration_seconds: 1.0,
                    success: true,
                    output_files: Vec::new(),
                },
            )
            .await;
    }
}
