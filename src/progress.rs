/*!
 * Progress events and the publisher boundary.
 *
 * The orchestrator is the only writer. Events flow through an `EventSink`,
 * which is either a channel drained by the host UI (`ChannelSink`) or a
 * `publish(event_name, payload)` callback (`NamedEventSink`).
 */

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use crate::segment_store::Segment;

/// Pipeline stage a status update belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Transcribing,
    Translating,
    Saving,
}

/// Informational status update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub stage: Stage,
    pub message: String,
    /// End-to-end progress, 0..=100
    pub progress: u8,
}

/// Everything published for a task. Exactly one terminal event per task.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskEvent {
    StatusUpdate(ProgressEvent),
    TaskCompleted {
        segments: Vec<Segment>,
        srt_path: PathBuf,
        subtitle_written: bool,
    },
    TaskFailed {
        message: String,
        cancelled: bool,
    },
}

impl TaskEvent {
    pub fn event_name(&self) -> &'static str {
        match self {
            TaskEvent::StatusUpdate(_) => "status_update",
            TaskEvent::TaskCompleted { .. } => "task_completed",
            TaskEvent::TaskFailed { .. } => "task_failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskEvent::StatusUpdate(_))
    }

    /// JSON payload handed to named-event hosts
    pub fn payload(&self) -> Value {
        match self {
            TaskEvent::StatusUpdate(event) => json!({
                "message": event.message,
                "progress": event.progress,
                "stage": event.stage,
            }),
            TaskEvent::TaskCompleted { segments, srt_path, subtitle_written } => json!({
                "segments": segments,
                "srt_path": srt_path.to_string_lossy(),
                "subtitle_written": subtitle_written,
            }),
            TaskEvent::TaskFailed { message, cancelled } => json!({
                "message": message,
                "cancelled": cancelled,
            }),
        }
    }
}

/// Receiver side of the event boundary
pub trait EventSink: Send + Sync {
    fn publish(&self, event: TaskEvent);
}

/// Sink forwarding events into an unbounded tokio channel
pub struct ChannelSink {
    sender: UnboundedSender<TaskEvent>,
}

impl ChannelSink {
    pub fn new(sender: UnboundedSender<TaskEvent>) -> Self {
        Self { sender }
    }

    /// Create a sink together with the receiver the UI drains
    pub fn channel() -> (Self, UnboundedReceiver<TaskEvent>) {
        let (sender, receiver) = unbounded_channel();
        (Self::new(sender), receiver)
    }
}

impl EventSink for ChannelSink {
    fn publish(&self, event: TaskEvent) {
        if self.sender.send(event).is_err() {
            debug!("Event receiver dropped, discarding event");
        }
    }
}

/// Sink calling `publish(event_name, payload)` on the host
pub struct NamedEventSink<F>
where
    F: Fn(&str, Value) + Send + Sync,
{
    callback: F,
}

impl<F> NamedEventSink<F>
where
    F: Fn(&str, Value) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> EventSink for NamedEventSink<F>
where
    F: Fn(&str, Value) + Send + Sync,
{
    fn publish(&self, event: TaskEvent) {
        (self.callback)(event.event_name(), event.payload());
    }
}

/// Cloneable handle the pipeline stages publish through
#[derive(Clone)]
pub struct ProgressPublisher {
    sink: Arc<dyn EventSink>,
}

impl std::fmt::Debug for ProgressPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressPublisher").finish_non_exhaustive()
    }
}

impl ProgressPublisher {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink }
    }

    pub fn status(&self, stage: Stage, message: impl Into<String>, progress: u8) {
        let event = ProgressEvent {
            stage,
            message: message.into(),
            progress: progress.min(100),
        };
        debug!("[{:?} {}%] {}", event.stage, event.progress, event.message);
        self.sink.publish(TaskEvent::StatusUpdate(event));
    }

    pub fn completed(&self, segments: Vec<Segment>, srt_path: PathBuf, subtitle_written: bool) {
        self.sink.publish(TaskEvent::TaskCompleted {
            segments,
            srt_path,
            subtitle_written,
        });
    }

    pub fn failed(&self, message: impl Into<String>) {
        self.sink.publish(TaskEvent::TaskFailed {
            message: message.into(),
            cancelled: false,
        });
    }

    pub fn cancelled(&self, message: impl Into<String>) {
        self.sink.publish(TaskEvent::TaskFailed {
            message: message.into(),
            cancelled: true,
        });
    }
}
