use async_trait::async_trait;
use futures::stream;
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout, Command};
use tokio::task::JoinHandle;

use crate::app_config::{MediaConfig, TranscriptionConfig};
use crate::errors::ProviderError;
use crate::file_utils::FileManager;
use crate::media::AudioExtractor;
use crate::segment_store::AUDIO_SUFFIX;

use super::{SegmentStream, StatusCallback, TranscribedSegment, TranscriptionProvider};

// @const: whisper.cpp segment line, e.g. `[00:00:01.000 --> 00:00:03.500]  Hello`
static SEGMENT_LINE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\[(\d+):(\d{2}):(\d{2})[.,](\d{3}) --> (\d+):(\d{2}):(\d{2})[.,](\d{3})\]\s*(.*)$").unwrap()
});

/// Parse one stdout line of the transcriber; lines without text yield `None`
pub fn parse_segment_line(line: &str) -> Option<TranscribedSegment> {
    let caps = SEGMENT_LINE_REGEX.captures(line.trim())?;
    let seconds_at = |idx: usize| -> Option<f64> {
        let part = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<f64>().ok());
        Some(part(idx)? * 3600.0 + part(idx + 1)? * 60.0 + part(idx + 2)? + part(idx + 3)? / 1000.0)
    };

    let text = caps.get(9).map(|m| m.as_str().trim()).unwrap_or_default();
    if text.is_empty() {
        return None;
    }

    Some(TranscribedSegment {
        start: seconds_at(1)?,
        end: seconds_at(5)?,
        text: text.to_string(),
    })
}

/// Transcriber driving a whisper.cpp-compatible command-line binary
#[derive(Debug, Clone)]
pub struct WhisperCliTranscriber {
    config: TranscriptionConfig,
    extractor: AudioExtractor,
}

impl WhisperCliTranscriber {
    pub fn new(config: TranscriptionConfig, extractor: AudioExtractor) -> Self {
        Self { config, extractor }
    }

    pub fn from_config(transcription: &TranscriptionConfig, media: &MediaConfig) -> Self {
        Self::new(transcription.clone(), AudioExtractor::from_config(media))
    }

    /// Arguments passed to the binary for `wav_path`
    pub fn command_args(&self, wav_path: &Path) -> Vec<String> {
        let language = self
            .config
            .language
            .clone()
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| "auto".to_string());

        vec![
            "-m".to_string(),
            self.config.model_path.clone(),
            "-f".to_string(),
            wav_path.to_string_lossy().into_owned(),
            "-l".to_string(),
            language,
            "-bs".to_string(),
            self.config.beam_size.to_string(),
            "-t".to_string(),
            self.config.threads.to_string(),
            "-np".to_string(),
        ]
    }

    fn model_name(&self) -> String {
        Path::new(&self.config.model_path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.config.model_path.clone())
    }

    /// WAV input for the binary, extracting it first when needed.
    /// Returns the path and whether it was extracted by this call.
    async fn prepare_audio(&self, media_path: &Path) -> Result<(PathBuf, bool), ProviderError> {
        if FileManager::has_extension(media_path, "wav") {
            return Ok((media_path.to_path_buf(), false));
        }

        let wav_path = FileManager::sidecar_path(media_path, AUDIO_SUFFIX);
        debug!("Extracting audio with {}", self.extractor.ffmpeg().display());
        self.extractor.extract_audio(media_path, &wav_path).await?;
        Ok((wav_path, true))
    }

    fn process_error(&self, message: impl Into<String>) -> ProviderError {
        ProviderError::ProcessFailed {
            program: self.config.binary.clone(),
            message: message.into(),
        }
    }
}

/// State carried between stream items
struct OutputState {
    lines: Lines<BufReader<ChildStdout>>,
    child: Child,
    stderr_task: Option<JoinHandle<String>>,
    program: String,
    /// Extracted audio to delete after a successful run
    cleanup: Option<PathBuf>,
    finished: bool,
}

impl OutputState {
    async fn next_item(mut self) -> Option<(Result<TranscribedSegment, ProviderError>, Self)> {
        if self.finished {
            return None;
        }

        loop {
            match self.lines.next_line().await {
                Ok(Some(line)) => {
                    if let Some(segment) = parse_segment_line(&line) {
                        return Some((Ok(segment), self));
                    }
                }
                Ok(None) => return self.finish().await,
                Err(e) => {
                    self.finished = true;
                    let error = ProviderError::ProcessFailed {
                        program: self.program.clone(),
                        message: format!("Failed to read output: {}", e),
                    };
                    return Some((Err(error), self));
                }
            }
        }
    }

    /// Reap the process once stdout is exhausted
    async fn finish(mut self) -> Option<(Result<TranscribedSegment, ProviderError>, Self)> {
        self.finished = true;

        let status = match self.child.wait().await {
            Ok(status) => status,
            Err(e) => {
                let error = ProviderError::ProcessFailed {
                    program: self.program.clone(),
                    message: format!("Failed to wait for process: {}", e),
                };
                return Some((Err(error), self));
            }
        };

        let stderr = match self.stderr_task.take() {
            Some(handle) => handle.await.unwrap_or_default(),
            None => String::new(),
        };

        if !status.success() {
            let detail = stderr
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .last()
                .unwrap_or("no error output")
                .to_string();
            let error = ProviderError::ProcessFailed {
                program: self.program.clone(),
                message: format!("exited with {}: {}", status, detail),
            };
            return Some((Err(error), self));
        }

        if let Some(path) = self.cleanup.take() {
            if let Err(e) = FileManager::remove_if_exists(&path) {
                warn!("Could not remove extracted audio {}: {:#}", path.display(), e);
            }
        }

        None
    }
}

#[async_trait]
impl TranscriptionProvider for WhisperCliTranscriber {
    async fn transcribe(&self, media_path: &Path, status: StatusCallback) -> Result<SegmentStream, ProviderError> {
        status(&format!("Loading model {}...", self.model_name()));

        let (wav_path, extracted) = self.prepare_audio(media_path).await?;
        let args = self.command_args(&wav_path);
        debug!("Running {} {}", self.config.binary, args.join(" "));

        let mut child = Command::new(&self.config.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.process_error(format!("Failed to start: {}", e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| self.process_error("stdout was not captured"))?;

        // Drain stderr concurrently so a chatty process never blocks on a full pipe
        let stderr_task = child.stderr.take().map(|mut stderr| {
            tokio::spawn(async move {
                let mut buffer = String::new();
                let _ = stderr.read_to_string(&mut buffer).await;
                buffer
            })
        });

        let state = OutputState {
            lines: BufReader::new(stdout).lines(),
            child,
            stderr_task,
            program: self.config.binary.clone(),
            cleanup: (extracted && !self.config.keep_audio).then_some(wav_path),
            finished: false,
        };

        Ok(Box::pin(stream::unfold(state, OutputState::next_item)))
    }
}
