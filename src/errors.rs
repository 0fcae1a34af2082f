/*!
 * Error types for the universalsub pipeline.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 *
 * The pipeline distinguishes three families:
 * - rejections of `submit` (`SubmitError`), returned synchronously to the caller
 * - fatal task errors (`TaskError`), which end a running task
 * - artifact errors (`ArtifactError`), which are logged and never change the outcome
 */

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when working with transcription or translation providers
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// An external process (transcriber, ffmpeg) exited unsuccessfully
    #[error("{program} failed: {message}")]
    ProcessFailed {
        /// Program that failed
        program: String,
        /// Filtered stderr or spawn error
        message: String,
    },
}

/// Reasons a `submit` call is rejected without starting a task
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    /// Another task is still running
    #[error("A task is already running.")]
    AlreadyRunning,

    /// The media file does not exist
    #[error("File not found: {0}")]
    NotFound(PathBuf),
}

/// Errors that end a running task
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// Transcription produced zero segments
    #[error("No speech detected in this media file.")]
    NoSpeechDetected,

    /// The transcription provider failed; the message is the provider's
    #[error("{0}")]
    TranscriptionFailure(String),

    /// A batch-level translation request failed
    #[error("{0}")]
    TranslationFailure(String),

    /// The cancellation signal was observed at a check point
    #[error("Task cancelled by user")]
    UserCancelled,

    /// The worker ended without producing an outcome (e.g. it panicked)
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors writing or reading side-car artifacts; non-fatal to a task
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("Failed to save transcript checkpoint {path}: {reason}")]
    CheckpointPersistFailure { path: PathBuf, reason: String },

    #[error("Failed to load transcript checkpoint {path}: {reason}")]
    CheckpointLoadFailure { path: PathBuf, reason: String },

    #[error("Failed to write subtitle file {path}: {reason}")]
    SubtitleWriteFailure { path: PathBuf, reason: String },
}

/// Error type returned by the command-line controller
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Submission was rejected
    #[error("Task rejected: {0}")]
    Rejected(#[from] SubmitError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
