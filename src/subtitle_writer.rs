use log::debug;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::errors::ArtifactError;
use crate::file_utils::FileManager;
use crate::segment_store::Segment;

// @module: SRT rendering and output

/// Distance from a whole millisecond still treated as float error
const MS_SNAP_TOLERANCE: f64 = 1e-7;

/// Format seconds as an SRT timestamp (HH:MM:SS,mmm).
///
/// Milliseconds are truncated. Negative input is clamped to zero. Values
/// within float noise of a whole millisecond snap to it, so 1.001 stays 1,001
/// while 0.9999999995 still truncates to 999.
pub fn format_timestamp(seconds: f64) -> String {
    let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
    let ms = seconds * 1000.0;
    let nearest = ms.round();
    let total_ms = (if (ms - nearest).abs() < MS_SNAP_TOLERANCE { nearest } else { ms.floor() }) as u64;

    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1_000;
    let millis = total_ms % 1_000;

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}

// @struct: Single rendered subtitle entry
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleEntry<'a> {
    // @field: 1-based sequence number
    pub seq_num: usize,

    // @field: Source segment
    pub segment: &'a Segment,
}

impl fmt::Display for SubtitleEntry<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.seq_num)?;
        writeln!(
            f,
            "{} --> {}",
            format_timestamp(self.segment.start),
            format_timestamp(self.segment.end)
        )?;
        writeln!(f, "{}", self.segment.display_text().trim())?;
        writeln!(f)
    }
}

/// Render segments as SRT text, numbered from 1
pub fn render_srt(segments: &[Segment]) -> String {
    segments
        .iter()
        .enumerate()
        .map(|(i, segment)| SubtitleEntry { seq_num: i + 1, segment }.to_string())
        .collect()
}

/// Output location for a media file: `<path-without-extension>.srt`
pub fn srt_output_path<P: AsRef<Path>>(media_path: P) -> PathBuf {
    FileManager::replace_extension(media_path, "srt")
}

/// Write `segments` to `output_path` as SRT
pub fn write_srt<P: AsRef<Path>>(segments: &[Segment], output_path: P) -> Result<(), ArtifactError> {
    let output_path = output_path.as_ref();
    let content = render_srt(segments);

    FileManager::write_to_file(output_path, &content).map_err(|e| ArtifactError::SubtitleWriteFailure {
        path: output_path.to_path_buf(),
        reason: format!("{:#}", e),
    })?;

    debug!("Wrote {} subtitle entries to {}", segments.len(), output_path.display());
    Ok(())
}
