//! Error types for the sync subsystem.

use thiserror::Error;

pub type SyncResult<T> = Result<T, SyncError>;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Unknown timestamp strategy '{name}' (registered: {})", .registered.join(", "))]
    UnknownStrategy {
        name: String,
        registered: Vec<&'static str>,
    },

    #[error("ASR transcriber is not available: {0}")]
    AsrUnavailable(String),

    #[error("Forced aligner is not available: {0}")]
    AlignerUnavailable(String),

    #[error("Transcription failed: {0}")]
    TranscriptionFailed(String),

    #[error("Forced alignment failed: {0}")]
    AlignmentFailed(String),

    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("Caption sampling failed: {0}")]
    CaptionSamplingFailed(String),

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("Invalid word timing: {0}")]
    Word(#[from] vgen_models::WordError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl SyncError {
    pub fn transcription_failed(msg: impl Into<String>) -> Self {
        Self::TranscriptionFailed(msg.into())
    }

    pub fn alignment_failed(msg: impl Into<String>) -> Self {
        Self::AlignmentFailed(msg.into())
    }

    /// True when the error means the backing tool is absent, as opposed to a
    /// run that was attempted and failed.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            SyncError::AsrUnavailable(_)
                | SyncError::AlignerUnavailable(_)
                | SyncError::FfmpegNotFound
                | SyncError::FfprobeNotFound
        )
    }
}
