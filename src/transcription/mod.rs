/*!
 * Transcription stage.
 *
 * A `TranscriptionProvider` yields segments lazily as a stream. The stage
 * drains it, publishing progress per segment and checking for cancellation
 * before each one, then persists the full list as the transcript checkpoint.
 */

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use log::{error, info};
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cancellation::{CancellationCheck, CancellationToken};
use crate::errors::{ProviderError, TaskError};
use crate::file_utils::FileManager;
use crate::orchestrator::ResumeMode;
use crate::progress::{ProgressPublisher, Stage};
use crate::segment_store::{self, CheckpointPaths, Segment};

pub mod whisper_cli;

pub use self::whisper_cli::WhisperCliTranscriber;

/// Progress published when the provider reports model loading
pub const LOADING_PROGRESS: u8 = 15;
/// Progress published once the transcript is being saved
pub const TRANSCRIBED_PROGRESS: u8 = 65;

/// One piece of speech as reported by a provider
#[derive(Debug, Clone, PartialEq)]
pub struct TranscribedSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl From<TranscribedSegment> for Segment {
    fn from(value: TranscribedSegment) -> Self {
        Segment::new(value.start, value.end, value.text.trim())
    }
}

/// Lazy, finite sequence of segments
pub type SegmentStream = BoxStream<'static, Result<TranscribedSegment, ProviderError>>;

/// Callback for one-off status messages such as model loading
pub type StatusCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Speech-to-text backend
#[async_trait]
pub trait TranscriptionProvider: Send + Sync + Debug {
    /// Start transcribing `media_path`.
    ///
    /// Any one-time initialization is reported through `status` before the
    /// first segment. Each call reprocesses the whole file.
    async fn transcribe(&self, media_path: &Path, status: StatusCallback) -> Result<SegmentStream, ProviderError>;
}

/// Per-segment progress inside the transcription band
pub fn segment_progress(segment_count: usize) -> u8 {
    (20 + segment_count).min(60) as u8
}

/// Actual transcription input for a resume mode
pub fn select_input_path(media_path: &Path, resume_mode: ResumeMode, paths: &CheckpointPaths) -> PathBuf {
    if resume_mode == ResumeMode::UseAudio && FileManager::file_exists(&paths.audio) {
        info!("Transcribing from cached audio {}", paths.audio.display());
        return paths.audio.clone();
    }
    media_path.to_path_buf()
}

/// Transcription stage of the pipeline
#[derive(Debug, Clone)]
pub struct TranscriptionStage {
    provider: Arc<dyn TranscriptionProvider>,
    publisher: ProgressPublisher,
}

impl TranscriptionStage {
    pub fn new(provider: Arc<dyn TranscriptionProvider>, publisher: ProgressPublisher) -> Self {
        Self { provider, publisher }
    }

    /// Transcribe `input_path` and save the result to `transcript_path`.
    ///
    /// A failed checkpoint write is logged and does not fail the stage.
    pub async fn run(
        &self,
        input_path: &Path,
        transcript_path: &Path,
        cancel: &CancellationToken,
    ) -> Result<Vec<Segment>, TaskError> {
        let publisher = self.publisher.clone();
        let status: StatusCallback = Arc::new(move |message: &str| {
            publisher.status(Stage::Transcribing, message, LOADING_PROGRESS);
        });

        let mut stream = self
            .provider
            .transcribe(input_path, status)
            .await
            .map_err(|e| TaskError::TranscriptionFailure(e.to_string()))?;

        let mut segments: Vec<Segment> = Vec::new();
        while let Some(item) = stream.next().await {
            cancel.check()?;

            let segment: Segment = item.map_err(|e| TaskError::TranscriptionFailure(e.to_string()))?.into();
            segments.push(segment);

            let count = segments.len();
            self.publisher.status(
                Stage::Transcribing,
                format!("Transcribed {} segment{}", count, if count == 1 { "" } else { "s" }),
                segment_progress(count),
            );
        }

        if segments.is_empty() {
            return Err(TaskError::NoSpeechDetected);
        }

        self.publisher
            .status(Stage::Transcribing, "Saving transcript", TRANSCRIBED_PROGRESS);
        if let Err(e) = segment_store::save_checkpoint(transcript_path, &segments) {
            error!("{}", e);
        }

        info!("Transcription finished with {} segments", segments.len());
        Ok(segments)
    }
}
