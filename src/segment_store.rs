/*!
 * Segment data model and transcript checkpoints.
 *
 * A checkpoint is a pretty-printed JSON array of segments stored next to the
 * media file as `<media>.temp.json`. Extracted audio may be kept alongside as
 * `<media>.temp.wav`. Both are optimistic caches: a missing file is never an
 * error, and nothing in the pipeline deletes the transcript.
 */

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::ArtifactError;
use crate::file_utils::FileManager;

/// Suffix of the transcript checkpoint side-car
pub const TRANSCRIPT_SUFFIX: &str = ".temp.json";

/// Suffix of the extracted audio side-car
pub const AUDIO_SUFFIX: &str = ".temp.wav";

/// One timed piece of speech
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Start time in seconds
    pub start: f64,

    /// End time in seconds, never before `start`
    pub end: f64,

    /// Source text as transcribed
    pub text: String,

    /// Translation, absent until the translation stage ran
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translated_text: Option<String>,
}

impl Segment {
    /// Create an untranslated segment; an inverted range is clamped so `end >= start`
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Segment {
            start,
            end: end.max(start),
            text: text.into(),
            translated_text: None,
        }
    }

    /// Text to display: the translation when present, the source otherwise
    pub fn display_text(&self) -> &str {
        self.translated_text.as_deref().unwrap_or(&self.text)
    }
}

/// Side-car locations derived from a media path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointPaths {
    pub transcript: PathBuf,
    pub audio: PathBuf,
}

impl CheckpointPaths {
    pub fn for_media<P: AsRef<Path>>(media_path: P) -> Self {
        let media_path = media_path.as_ref();
        CheckpointPaths {
            transcript: FileManager::sidecar_path(media_path, TRANSCRIPT_SUFFIX),
            audio: FileManager::sidecar_path(media_path, AUDIO_SUFFIX),
        }
    }
}

/// Which side-cars exist for a media file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumePoint {
    pub has_audio: bool,
    pub has_transcript: bool,
}

/// Report the side-cars present next to `media_path`
pub fn check_resume_point<P: AsRef<Path>>(media_path: P) -> ResumePoint {
    let paths = CheckpointPaths::for_media(media_path);
    ResumePoint {
        has_audio: FileManager::file_exists(&paths.audio),
        has_transcript: FileManager::file_exists(&paths.transcript),
    }
}

/// Persist `segments` as a pretty-printed JSON checkpoint
pub fn save_checkpoint<P: AsRef<Path>>(path: P, segments: &[Segment]) -> Result<(), ArtifactError> {
    let path = path.as_ref();
    let persist_failure = |reason: String| ArtifactError::CheckpointPersistFailure {
        path: path.to_path_buf(),
        reason,
    };

    let json = serde_json::to_string_pretty(segments).map_err(|e| persist_failure(e.to_string()))?;
    FileManager::write_to_file(path, &json).map_err(|e| persist_failure(format!("{:#}", e)))?;

    debug!("Saved {} segments to checkpoint {}", segments.len(), path.display());
    Ok(())
}

/// Load a checkpoint written by `save_checkpoint`.
///
/// Hand-edited files may carry `end < start`; such ranges are clamped the same
/// way `Segment::new` clamps them.
pub fn load_checkpoint<P: AsRef<Path>>(path: P) -> Result<Vec<Segment>, ArtifactError> {
    let path = path.as_ref();
    let load_failure = |reason: String| ArtifactError::CheckpointLoadFailure {
        path: path.to_path_buf(),
        reason,
    };

    let content = FileManager::read_to_string(path).map_err(|e| load_failure(format!("{:#}", e)))?;
    let mut segments: Vec<Segment> = serde_json::from_str(&content).map_err(|e| load_failure(e.to_string()))?;

    for (i, segment) in segments.iter_mut().enumerate() {
        if segment.end < segment.start {
            warn!(
                "Segment {} in {} ends before it starts ({} < {}), clamping",
                i + 1,
                path.display(),
                segment.end,
                segment.start
            );
            segment.end = segment.start;
        }
    }

    debug!("Loaded {} segments from checkpoint {}", segments.len(), path.display());
    Ok(segments)
}
