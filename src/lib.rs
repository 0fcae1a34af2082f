/*!
 * # universalsub
 *
 * A resumable media-to-subtitle pipeline: transcribe a media file, translate
 * the transcript in marker-tagged batches, and write an SRT file.
 *
 * ## Features
 *
 * - Single-flight task orchestration with cooperative cancellation
 * - Transcript checkpoints (`<media>.temp.json`) and cached audio
 *   (`<media>.temp.wav`) for resuming interrupted runs
 * - Batched translation with per-line fallback when markers go missing
 * - Progress events over a channel or a `publish(name, payload)` callback
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `orchestrator`: state machine, single-flight guard, resume selection
 * - `transcription`: provider trait, transcription stage, whisper.cpp CLI client
 * - `translation`: markers, per-batch translation with fallback, translation stage
 * - `subtitle_writer`: SRT rendering
 * - `segment_store`: segment model and checkpoint I/O
 * - `progress` / `cancellation`: event plumbing and the cancellation token
 * - `providers`: chat completion clients (OpenAI-compatible, mock)
 * - `media`: ffmpeg audio extraction
 * - `app_config` / `app_controller`: configuration and CLI wiring
 * - `errors`: custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod cancellation;
pub mod errors;
pub mod file_utils;
pub mod media;
pub mod orchestrator;
pub mod progress;
pub mod providers;
pub mod segment_store;
pub mod subtitle_writer;
pub mod transcription;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::{Config, SharedConfig, TaskSettings};
pub use cancellation::{CancellationCheck, CancellationToken};
pub use errors::{AppError, ArtifactError, ProviderError, SubmitError, TaskError};
pub use orchestrator::{PipelineContext, ResumeMode, TaskHandle, TaskOrchestrator, TaskOutcome, TaskRequest, TaskState};
pub use progress::{ChannelSink, EventSink, NamedEventSink, ProgressEvent, ProgressPublisher, Stage, TaskEvent};
pub use segment_store::{CheckpointPaths, ResumePoint, Segment};
pub use subtitle_writer::format_timestamp;
pub use transcription::{TranscriptionProvider, TranscriptionStage};
pub use translation::{TranslationService, TranslationStage};
