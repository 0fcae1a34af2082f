/*!
 * ffmpeg helpers.
 *
 * Resolves which ffmpeg binary to run and extracts 16 kHz mono PCM audio for
 * the transcriber.
 */

use log::{debug, error};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::app_config::MediaConfig;
use crate::errors::ProviderError;

/// Executable file name for the current platform
fn ffmpeg_file_name() -> &'static str {
    if cfg!(windows) { "ffmpeg.exe" } else { "ffmpeg" }
}

/// Pick the ffmpeg binary.
///
/// Order: the configured path when it exists, then `./bin/<os>/ffmpeg`, then
/// `ffmpeg` from `PATH`.
pub fn resolve_ffmpeg(config: &MediaConfig) -> PathBuf {
    if let Some(configured) = config.ffmpeg_path.as_deref().filter(|p| !p.trim().is_empty()) {
        let path = PathBuf::from(configured);
        if path.exists() {
            return path;
        }
        debug!("Configured ffmpeg path {} does not exist, ignoring", path.display());
    }

    let bundled = PathBuf::from("bin").join(std::env::consts::OS).join(ffmpeg_file_name());
    if bundled.exists() {
        return bundled;
    }

    PathBuf::from(ffmpeg_file_name())
}

/// Audio extraction with a bounded runtime
#[derive(Debug, Clone)]
pub struct AudioExtractor {
    ffmpeg: PathBuf,
    timeout: Duration,
}

impl AudioExtractor {
    pub fn new(ffmpeg: PathBuf, timeout: Duration) -> Self {
        Self { ffmpeg, timeout }
    }

    pub fn from_config(config: &MediaConfig) -> Self {
        Self::new(resolve_ffmpeg(config), Duration::from_secs(config.extract_timeout_secs.max(1)))
    }

    pub fn ffmpeg(&self) -> &Path {
        &self.ffmpeg
    }

    /// Extract the first audio track of `input` to a 16 kHz mono WAV at `output`
    pub async fn extract_audio(&self, input: &Path, output: &Path) -> Result<(), ProviderError> {
        debug!("Extracting audio from {} to {}", input.display(), output.display());

        let mut command = Command::new(&self.ffmpeg);
        command
            .args(["-hide_banner", "-nostdin", "-y", "-i"])
            .arg(input)
            .args(["-vn", "-ac", "1", "-ar", "16000", "-c:a", "pcm_s16le"])
            .arg(output)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        let ffmpeg_future = command.output();

        let result = tokio::select! {
            result = ffmpeg_future => {
                result.map_err(|e| ProviderError::ProcessFailed {
                    program: "ffmpeg".to_string(),
                    message: format!("Failed to execute {}: {}", self.ffmpeg.display(), e),
                })?
            }
            _ = tokio::time::sleep(self.timeout) => {
                return Err(ProviderError::ProcessFailed {
                    program: "ffmpeg".to_string(),
                    message: format!("timed out after {} seconds", self.timeout.as_secs()),
                });
            }
        };

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let filtered = filter_ffmpeg_stderr(&stderr);
            error!("ffmpeg audio extraction failed: {}", filtered);
            return Err(ProviderError::ProcessFailed {
                program: "ffmpeg".to_string(),
                message: filtered,
            });
        }

        Ok(())
    }
}

/// Filter ffmpeg stderr to only show meaningful error lines, stripping the
/// version banner, build configuration, and stream metadata noise.
pub fn filter_ffmpeg_stderr(stderr: &str) -> String {
    let noise_prefixes = [
        "ffmpeg version",
        "built with",
        "configuration:",
        "lib",
        "Input #",
        "Metadata:",
        "Duration:",
        "Chapter",
        "Stream #",
        "title",
        "encoder",
        "handler_name",
        "Output #",
        "Stream mapping:",
        "Press [q]",
        "size=",
    ];

    let meaningful: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !noise_prefixes.iter().any(|p| line.starts_with(p)))
        .collect();

    if meaningful.is_empty() {
        "unknown ffmpeg error (stderr was empty after filtering)".to_string()
    } else {
        meaningful.join("\n")
    }
}
