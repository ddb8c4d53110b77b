//! Pipeline error taxonomy.
//!
//! Stage-level failures are always wrapped with the originating stage before
//! they leave the engine, so callers can recover the failing stage name from
//! the returned error. Retryability is a property of the error type and is
//! only consulted by collaborators that perform network calls; the engine
//! itself never retries a stage.

use std::time::Duration;

use thiserror::Error;

use vgen_models::StageKind;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limited: {message}")]
    RateLimit {
        message: String,
        /// Hint from the provider on when to retry.
        retry_after: Option<Duration>,
    },

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Stage '{stage}' failed: {source}")]
    Stage {
        stage: StageKind,
        #[source]
        source: Box<PipelineError>,
    },

    #[error("Sync error: {0}")]
    Sync(#[from] vgen_sync::SyncError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn rate_limit(msg: impl Into<String>, retry_after: Option<Duration>) -> Self {
        Self::RateLimit {
            message: msg.into(),
            retry_after,
        }
    }

    pub fn api(status: u16, msg: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: msg.into(),
        }
    }

    /// Wrap an error with the stage it originated from. An error that is
    /// already stage-tagged is returned unchanged.
    pub fn for_stage(stage: StageKind, err: PipelineError) -> Self {
        match err {
            already @ PipelineError::Stage { .. } => already,
            other => PipelineError::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// The stage this error was tagged with, if any.
    pub fn stage_name(&self) -> Option<StageKind> {
        match self {
            PipelineError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Whether a network-calling collaborator may retry this error.
    ///
    /// Rate limits are always retryable; API errors only for 429 and
    /// 5xx-equivalent statuses. Everything else is not.
    pub fn is_retryable(&self) -> bool {
        match self {
            PipelineError::RateLimit { .. } => true,
            PipelineError::Api { status, .. } => *status == 429 || *status >= 500,
            PipelineError::Stage { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}
