//! Progress notification for running jobs.
//!
//! The orchestrator reports each state transition through a [`ProgressSink`].
//! The default sink, [`EventEmitter`], publishes onto a bounded
//! [`tokio::sync::broadcast`] channel so observers (log writers, CLI progress
//! printers) can follow a run without coupling to the orchestrator. Sending
//! never blocks; a lagging observer loses the oldest events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use seoforge_types::{JobId, JobStatus};

/// One state transition of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub job_id: JobId,
    pub status: JobStatus,
    pub progress: f64,
    pub step: String,
    pub at: DateTime<Utc>,
}

impl ProgressEvent {
    pub fn new(job_id: JobId, status: JobStatus, progress: f64, step: impl Into<String>) -> Self {
        Self {
            job_id,
            status,
            progress,
            step: step.into(),
            at: Utc::now(),
        }
    }
}

/// Receiver of progress notifications. Must not block and cannot fail.
pub trait ProgressSink: Send + Sync {
    fn notify(&self, event: ProgressEvent);
}

/// Discards every event.
pub struct NoopSink;

impl ProgressSink for NoopSink {
    fn notify(&self, _event: ProgressEvent) {}
}

/// Event emitter wrapping a broadcast sender.
#[derive(Clone)]
pub struct EventEmitter {
    sender: broadcast::Sender<ProgressEvent>,
}

impl EventEmitter {
    /// Create a new emitter with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Emit an event to all current subscribers.
    ///
    /// If there are no active receivers the event is silently dropped.
    pub fn emit(&self, event: ProgressEvent) {
        let _ = self.sender.send(event);
    }

    /// Subscribe to events. Returns a broadcast receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.sender.subscribe()
    }

    /// Spawn a task calling `f` for every event received.
    ///
    /// The task ends when every emitter clone has been dropped.
    pub fn spawn_observer<F>(&self, mut f: F) -> JoinHandle<()>
    where
        F: FnMut(ProgressEvent) + Send + 'static,
    {
        let mut rx = self.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => f(event),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "Progress observer lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new(256)
    }
}

impl ProgressSink for EventEmitter {
    fn notify(&self, event: ProgressEvent) {
        self.emit(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use uuid::Uuid;

    #[tokio::test]
    async fn emitter_sends_and_receives() {
        let emitter = EventEmitter::new(16);
        let mut rx = emitter.subscribe();
        let id = Uuid::new_v4();

        emitter.notify(ProgressEvent::new(id, JobStatus::Researching, 10.0, "Fetching search results"));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.job_id, id);
        assert_eq!(event.status, JobStatus::Researching);
        assert_eq!(event.progress, 10.0);
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let emitter = EventEmitter::new(16);
        let mut rx1 = emitter.subscribe();
        let mut rx2 = emitter.subscribe();

        emitter.emit(ProgressEvent::new(Uuid::new_v4(), JobStatus::Outlining, 35.0, "x"));

        assert_eq!(rx1.recv().await.unwrap().progress, 35.0);
        assert_eq!(rx2.recv().await.unwrap().progress, 35.0);
    }

    #[test]
    fn emit_without_subscribers_does_not_panic() {
        let emitter = EventEmitter::default();
        emitter.emit(ProgressEvent::new(Uuid::new_v4(), JobStatus::Pending, 0.0, "queued"));
    }

    #[tokio::test]
    async fn full_channel_never_blocks_sender() {
        let emitter = EventEmitter::new(2);
        let mut rx = emitter.subscribe();
        let id = Uuid::new_v4();
        for i in 0..10 {
            emitter.emit(ProgressEvent::new(id, JobStatus::Generating, i as f64, "tick"));
        }
        // The slow receiver lags and then sees the two newest events.
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(8))
        ));
        assert_eq!(rx.recv().await.unwrap().progress, 8.0);
        assert_eq!(rx.recv().await.unwrap().progress, 9.0);
    }

    #[tokio::test]
    async fn observer_task_ends_when_emitter_dropped() {
        let emitter = EventEmitter::new(16);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let handle = emitter.spawn_observer(move |e| sink.lock().unwrap().push(e.step));

        emitter.emit(ProgressEvent::new(Uuid::new_v4(), JobStatus::Validating, 80.0, "a"));
        emitter.emit(ProgressEvent::new(Uuid::new_v4(), JobStatus::Validating, 90.0, "b"));
        drop(emitter);

        handle.await.unwrap();
        assert_eq!(*seen.lock().unwrap(), vec!["a".to_string(), "b".to_string()]);
    }
}
