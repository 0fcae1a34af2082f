/*!
 * Task orchestrator.
 *
 * Owns the single-flight guard, the per-task cancellation token and the
 * progress publisher, and drives one task at a time through
 * `Transcribing -> Translating -> Saving`.
 *
 * Every submitted task runs on its own tokio task, wrapped by a supervisor
 * that publishes exactly one terminal event (even if the worker panics) and
 * then releases the guard back to `Idle`.
 */

use log::{error, info, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::app_config::{SharedConfig, TaskSettings};
use crate::cancellation::{CancellationCheck, CancellationToken};
use crate::errors::{SubmitError, TaskError};
use crate::progress::{ProgressPublisher, Stage};
use crate::providers::ChatProvider;
use crate::segment_store::{self, CheckpointPaths, ResumePoint, Segment};
use crate::subtitle_writer::{srt_output_path, write_srt};
use crate::transcription::{TranscriptionProvider, TranscriptionStage, select_input_path};
use crate::translation::batch::translation_progress;
use crate::translation::{PromptSet, TranslationService, TranslationStage};

/// Where a task picks up its work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResumeMode {
    /// Transcribe the original media
    #[default]
    Fresh,
    /// Transcribe the cached audio side-car when present
    UseAudio,
    /// Load the transcript checkpoint when present
    UseTranscript,
}

/// A request to turn one media file into subtitles
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRequest {
    pub media_path: PathBuf,
    /// Language name handed to the prompts, e.g. "Chinese"
    pub target_language: String,
    pub resume_mode: ResumeMode,
}

impl TaskRequest {
    pub fn new(media_path: impl Into<PathBuf>, target_language: impl Into<String>) -> Self {
        Self {
            media_path: media_path.into(),
            target_language: target_language.into(),
            resume_mode: ResumeMode::Fresh,
        }
    }

    pub fn with_resume_mode(mut self, resume_mode: ResumeMode) -> Self {
        self.resume_mode = resume_mode;
        self
    }
}

/// Orchestrator state; anything but `Idle` holds the single-flight guard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Idle,
    Transcribing,
    Translating,
    Saving,
}

/// Terminal value of a task
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    Completed {
        segments: Vec<Segment>,
        output_path: PathBuf,
        /// False when the subtitle file could not be written
        subtitle_written: bool,
    },
    Failed {
        reason: TaskError,
        message: String,
    },
    Cancelled,
}

impl TaskOutcome {
    fn from_error(reason: TaskError) -> Self {
        match reason {
            TaskError::UserCancelled => TaskOutcome::Cancelled,
            reason => TaskOutcome::Failed {
                message: reason.to_string(),
                reason,
            },
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, TaskOutcome::Completed { .. })
    }
}

/// How the pipeline obtains its segments
#[derive(Debug, Clone, PartialEq)]
pub enum EntryPoint {
    /// Run the transcription stage against `input_path`
    Transcribe { input_path: PathBuf },
    /// Segments loaded from the transcript checkpoint
    Loaded(Vec<Segment>),
}

/// Pick the entry point for `resume_mode`.
///
/// A transcript checkpoint that cannot be read is treated as absent.
pub fn select_entry_point(
    media_path: &Path,
    resume_mode: ResumeMode,
    paths: &CheckpointPaths,
) -> Result<EntryPoint, TaskError> {
    if resume_mode == ResumeMode::UseTranscript && paths.transcript.is_file() {
        match segment_store::load_checkpoint(&paths.transcript) {
            Ok(segments) if segments.is_empty() => return Err(TaskError::NoSpeechDetected),
            Ok(segments) => return Ok(EntryPoint::Loaded(segments)),
            Err(e) => warn!("{}; transcribing from scratch", e),
        }
    }

    Ok(EntryPoint::Transcribe {
        input_path: select_input_path(media_path, resume_mode, paths),
    })
}

/// Collaborators the pipeline runs against
#[derive(Debug, Clone)]
pub struct PipelineContext {
    pub transcriber: Arc<dyn TranscriptionProvider>,
    pub translator: Arc<dyn ChatProvider>,
    pub config: SharedConfig,
}

/// State and cancellation token of the current task, guarded together
struct RunSlot {
    state: TaskState,
    cancel: CancellationToken,
}

struct Shared {
    slot: Mutex<RunSlot>,
    publisher: ProgressPublisher,
    context: PipelineContext,
}

impl Shared {
    fn enter(&self, state: TaskState) {
        let mut slot = self.slot.lock();
        if slot.state != TaskState::Idle {
            slot.state = state;
        }
    }
}

/// Returns the orchestrator to `Idle` when the supervisor finishes or is dropped
struct RunGuard {
    shared: Arc<Shared>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.shared.slot.lock().state = TaskState::Idle;
    }
}

/// Handle to a submitted task
#[derive(Debug)]
pub struct TaskHandle {
    id: Uuid,
    join: JoinHandle<TaskOutcome>,
}

impl TaskHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Wait for the terminal outcome; the guard is released by the time this returns
    pub async fn wait(self) -> TaskOutcome {
        match self.join.await {
            Ok(outcome) => outcome,
            Err(e) => TaskOutcome::from_error(TaskError::Internal(format!("Supervisor ended abnormally: {}", e))),
        }
    }
}

/// Single-flight pipeline driver
#[derive(Clone)]
pub struct TaskOrchestrator {
    inner: Arc<Shared>,
}

impl TaskOrchestrator {
    pub fn new(context: PipelineContext, publisher: ProgressPublisher) -> Self {
        Self {
            inner: Arc::new(Shared {
                slot: Mutex::new(RunSlot {
                    state: TaskState::Idle,
                    cancel: CancellationToken::new(),
                }),
                publisher,
                context,
            }),
        }
    }

    pub fn state(&self) -> TaskState {
        self.inner.slot.lock().state
    }

    pub fn is_running(&self) -> bool {
        self.state() != TaskState::Idle
    }

    /// Side-cars available for `media_path`
    pub fn check_resume_point<P: AsRef<Path>>(&self, media_path: P) -> ResumePoint {
        segment_store::check_resume_point(media_path)
    }

    /// Request cancellation of the running task. Returns false when idle.
    pub fn cancel(&self) -> bool {
        let slot = self.inner.slot.lock();
        if slot.state == TaskState::Idle {
            return false;
        }
        slot.cancel.cancel();
        info!("Cancellation requested");
        true
    }

    /// Start a task in the background.
    ///
    /// Must be called from within a tokio runtime. Returns immediately; progress
    /// and the terminal event arrive through the publisher.
    pub fn submit(&self, request: TaskRequest) -> Result<TaskHandle, SubmitError> {
        let cancel = {
            let mut slot = self.inner.slot.lock();
            if slot.state != TaskState::Idle {
                return Err(SubmitError::AlreadyRunning);
            }
            if !request.media_path.exists() {
                return Err(SubmitError::NotFound(request.media_path.clone()));
            }
            slot.state = TaskState::Transcribing;
            slot.cancel = CancellationToken::new();
            slot.cancel.clone()
        };

        let id = Uuid::new_v4();
        let settings = self.inner.context.config.task_settings();
        info!(
            "Task {} started for {} ({:?}, target {})",
            id,
            request.media_path.display(),
            request.resume_mode,
            request.target_language
        );

        let guard = RunGuard {
            shared: Arc::clone(&self.inner),
        };
        let worker = tokio::spawn(run_pipeline(Arc::clone(&self.inner), request, settings, cancel));
        let publisher = self.inner.publisher.clone();

        let join = tokio::spawn(async move {
            let _guard = guard;
            let outcome = match worker.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("Task {} worker ended abnormally: {}", id, e);
                    TaskOutcome::from_error(TaskError::Internal(e.to_string()))
                }
            };
            publish_terminal(&publisher, &outcome);
            info!("Task {} finished: {}", id, outcome_label(&outcome));
            outcome
        });

        Ok(TaskHandle { id, join })
    }
}

fn outcome_label(outcome: &TaskOutcome) -> &'static str {
    match outcome {
        TaskOutcome::Completed { .. } => "completed",
        TaskOutcome::Failed { .. } => "failed",
        TaskOutcome::Cancelled => "cancelled",
    }
}

fn publish_terminal(publisher: &ProgressPublisher, outcome: &TaskOutcome) {
    match outcome {
        TaskOutcome::Completed {
            segments,
            output_path,
            subtitle_written,
        } => publisher.completed(segments.clone(), output_path.clone(), *subtitle_written),
        TaskOutcome::Failed { message, .. } => publisher.failed(message.clone()),
        TaskOutcome::Cancelled => publisher.cancelled(TaskError::UserCancelled.to_string()),
    }
}

async fn run_pipeline(
    shared: Arc<Shared>,
    request: TaskRequest,
    settings: TaskSettings,
    cancel: CancellationToken,
) -> TaskOutcome {
    match execute(&shared, &request, &settings, &cancel).await {
        Ok(outcome) => outcome,
        Err(reason) => TaskOutcome::from_error(reason),
    }
}

async fn execute(
    shared: &Shared,
    request: &TaskRequest,
    settings: &TaskSettings,
    cancel: &CancellationToken,
) -> Result<TaskOutcome, TaskError> {
    let publisher = &shared.publisher;
    let paths = CheckpointPaths::for_media(&request.media_path);

    // Transcribing
    cancel.check()?;
    shared.enter(TaskState::Transcribing);
    let segments = match select_entry_point(&request.media_path, request.resume_mode, &paths)? {
        EntryPoint::Loaded(segments) => {
            publisher.status(
                Stage::Transcribing,
                format!("Loaded {} segments from saved transcript", segments.len()),
                25,
            );
            segments
        }
        EntryPoint::Transcribe { input_path } => {
            publisher.status(Stage::Transcribing, "Starting transcription", 10);
            TranscriptionStage::new(Arc::clone(&shared.context.transcriber), publisher.clone())
                .run(&input_path, &paths.transcript, cancel)
                .await?
        }
    };

    // Translating
    cancel.check()?;
    shared.enter(TaskState::Translating);
    publisher.status(
        Stage::Translating,
        format!("Translating {} segments into {}", segments.len(), request.target_language),
        70,
    );
    let service = TranslationService::new(
        Arc::clone(&shared.context.translator),
        PromptSet::from_settings(settings),
    );
    let translated = TranslationStage::new(service, settings.batch_size)
        .run(segments, &request.target_language, cancel, |done, total| {
            publisher.status(
                Stage::Translating,
                format!("Translated {}/{} segments", done, total),
                translation_progress(done, total),
            );
        })
        .await?;

    // Saving
    cancel.check()?;
    shared.enter(TaskState::Saving);
    publisher.status(Stage::Saving, "Writing subtitle file", 95);
    let output_path = srt_output_path(&request.media_path);
    let subtitle_written = match write_srt(&translated, &output_path) {
        Ok(()) => true,
        Err(e) => {
            error!("{}", e);
            false
        }
    };
    publisher.status(Stage::Saving, "Done", 100);

    Ok(TaskOutcome::Completed {
        segments: translated,
        output_path,
        subtitle_written,
    })
}
