use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::app_config::{Config, SharedConfig};
use crate::errors::AppError;
use crate::orchestrator::{PipelineContext, TaskOrchestrator, TaskOutcome, TaskRequest};
use crate::progress::{ChannelSink, ProgressPublisher, TaskEvent};
use crate::providers::ChatProvider;
use crate::providers::openai::OpenAICompatible;
use crate::segment_store::ResumePoint;
use crate::transcription::{TranscriptionProvider, WhisperCliTranscriber};

// @module: Application controller for the command-line host

/// Wires configuration, providers and the orchestrator for one CLI run
pub struct Controller {
    // @field: App configuration
    config: SharedConfig,

    // @field: Speech-to-text backend
    transcriber: Arc<dyn TranscriptionProvider>,

    // @field: Chat backend used for translation
    translator: Arc<dyn ChatProvider>,
}

impl Controller {
    // @method: Create a controller with the providers described by `config`
    pub fn with_config(config: Config) -> Result<Self, AppError> {
        let transcriber = WhisperCliTranscriber::from_config(&config.transcription, &config.media);
        let translator = OpenAICompatible::from_config(&config.translation)?;

        Ok(Self::with_providers(config, Arc::new(transcriber), Arc::new(translator)))
    }

    /// Create a controller around explicit providers
    pub fn with_providers(
        config: Config,
        transcriber: Arc<dyn TranscriptionProvider>,
        translator: Arc<dyn ChatProvider>,
    ) -> Self {
        Self {
            config: SharedConfig::new(config),
            transcriber,
            translator,
        }
    }

    pub fn config(&self) -> &SharedConfig {
        &self.config
    }

    /// Side-cars available for `media_path`
    pub fn resume_point(&self, media_path: &Path) -> ResumePoint {
        crate::segment_store::check_resume_point(media_path)
    }

    /// Check that the translation endpoint answers
    pub async fn test_translation_connection(&self) -> Result<(), AppError> {
        self.translator.test_connection().await?;
        Ok(())
    }

    /// Run one task to completion, rendering progress and cancelling on Ctrl+C
    ///
    /// A rejected submit is returned as `AppError::Rejected`; every task
    /// outcome, including failures, comes back as `Ok`.
    pub async fn run(&self, request: TaskRequest) -> Result<TaskOutcome, AppError> {
        let start_time = Instant::now();
        let (sink, mut events) = ChannelSink::channel();
        let orchestrator = TaskOrchestrator::new(
            PipelineContext {
                transcriber: Arc::clone(&self.transcriber),
                translator: Arc::clone(&self.translator),
                config: self.config.clone(),
            },
            ProgressPublisher::new(Arc::new(sink)),
        );

        let handle = orchestrator.submit(request)?;
        info!("Task {} submitted", handle.id());

        let interrupt = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupt received, cancelling after the current step...");
                    orchestrator.cancel();
                }
            })
        };

        let progress_bar = Self::create_progress_bar();
        while let Some(event) = events.recv().await {
            match event {
                TaskEvent::StatusUpdate(update) => {
                    progress_bar.set_position(u64::from(update.progress));
                    progress_bar.set_message(update.message);
                }
                _ => break,
            }
        }
        progress_bar.finish_and_clear();
        interrupt.abort();

        let outcome = handle.wait().await;
        match &outcome {
            TaskOutcome::Completed {
                segments,
                output_path,
                subtitle_written,
            } => {
                if *subtitle_written {
                    info!("Success: {} ({} segments)", output_path.display(), segments.len());
                } else {
                    error!("Translation finished but {} could not be written", output_path.display());
                }
            }
            TaskOutcome::Failed { message, .. } => error!("Task failed: {}", message),
            TaskOutcome::Cancelled => warn!("Task cancelled"),
        }
        info!("Elapsed: {}", Self::format_duration(start_time.elapsed()));

        Ok(outcome)
    }

    fn create_progress_bar() -> ProgressBar {
        let progress_bar = ProgressBar::new(100);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}% {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(style.progress_chars("█▓▒░"));
        progress_bar.enable_steady_tick(Duration::from_millis(120));
        progress_bar
    }

    // Format duration in a human-readable format
    pub fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}
