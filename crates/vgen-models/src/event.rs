//! Pipeline lifecycle event types.
//!
//! Every event of a run carries the same pipeline identifier and a UTC
//! timestamp. Progress values are clamped to [0, 1] at construction so
//! observers never see an out-of-range figure, whatever a collaborator
//! reported upstream.

use std::fmt;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Number of stages in the canonical pipeline ordering.
pub const STAGE_COUNT: u8 = 4;

/// Unique identifier for a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct PipelineId(pub String);

impl PipelineId {
    /// Generate a new random pipeline ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for PipelineId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PipelineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One of the four ordered content-generation stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Script,
    Audio,
    Visuals,
    Render,
}

impl StageKind {
    /// The stage label used in events and logging.
    pub fn label(&self) -> &'static str {
        match self {
            StageKind::Script => "script",
            StageKind::Audio => "audio",
            StageKind::Visuals => "visuals",
            StageKind::Render => "render",
        }
    }

    /// Zero-based position in the canonical ordering.
    pub fn index(&self) -> u8 {
        match self {
            StageKind::Script => 0,
            StageKind::Audio => 1,
            StageKind::Visuals => 2,
            StageKind::Render => 3,
        }
    }

    /// All stages in canonical execution order.
    pub fn all() -> [StageKind; STAGE_COUNT as usize] {
        [
            StageKind::Script,
            StageKind::Audio,
            StageKind::Visuals,
            StageKind::Render,
        ]
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Variant-specific payload of a pipeline event.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEventKind {
    /// Pipeline run accepted and starting.
    PipelineStarted { topic: String },

    /// Pipeline run finished successfully.
    PipelineCompleted {
        duration_secs: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        total_cost_usd: Option<f64>,
    },

    /// Pipeline run aborted on a stage failure.
    PipelineFailed { error: String },

    /// A stage began executing (or adopting an external artifact).
    StageStarted { stage: StageKind, index: u8, total: u8 },

    /// A stage finished successfully.
    StageCompleted {
        stage: StageKind,
        index: u8,
        total: u8,
        duration_secs: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        cost_usd: Option<f64>,
    },

    /// A stage failed; a `PipelineFailed` event follows immediately.
    StageFailed {
        stage: StageKind,
        index: u8,
        total: u8,
        error: String,
    },

    /// Incremental progress within a long-running stage.
    StageProgress {
        stage: StageKind,
        /// Progress within the stage, clamped to [0, 1].
        progress: f64,
        /// Progress across the whole pipeline, clamped to [0, 1].
        overall: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
}

/// A lifecycle or progress notification for one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PipelineEvent {
    /// Identifier shared by every event of the run.
    pub pipeline_id: PipelineId,
    /// Emission time.
    pub timestamp: DateTime<Utc>,
    /// Event payload.
    #[serde(flatten)]
    pub kind: PipelineEventKind,
}

impl PipelineEvent {
    fn new(pipeline_id: &PipelineId, kind: PipelineEventKind) -> Self {
        Self {
            pipeline_id: pipeline_id.clone(),
            timestamp: Utc::now(),
            kind,
        }
    }

    /// Create a pipeline-started event.
    pub fn pipeline_started(id: &PipelineId, topic: impl Into<String>) -> Self {
        Self::new(id, PipelineEventKind::PipelineStarted { topic: topic.into() })
    }

    /// Create a pipeline-completed event.
    pub fn pipeline_completed(id: &PipelineId, duration_secs: f64, total_cost_usd: Option<f64>) -> Self {
        Self::new(
            id,
            PipelineEventKind::PipelineCompleted {
                duration_secs,
                total_cost_usd,
            },
        )
    }

    /// Create a pipeline-failed event.
    pub fn pipeline_failed(id: &PipelineId, error: impl Into<String>) -> Self {
        Self::new(id, PipelineEventKind::PipelineFailed { error: error.into() })
    }

    /// Create a stage-started event.
    pub fn stage_started(id: &PipelineId, stage: StageKind) -> Self {
        Self::new(
            id,
            PipelineEventKind::StageStarted {
                stage,
                index: stage.index(),
                total: STAGE_COUNT,
            },
        )
    }

    /// Create a stage-completed event.
    pub fn stage_completed(
        id: &PipelineId,
        stage: StageKind,
        duration_secs: f64,
        cost_usd: Option<f64>,
    ) -> Self {
        Self::new(
            id,
            PipelineEventKind::StageCompleted {
                stage,
                index: stage.index(),
                total: STAGE_COUNT,
                duration_secs,
                cost_usd,
            },
        )
    }

    /// Create a stage-failed event.
    pub fn stage_failed(id: &PipelineId, stage: StageKind, error: impl Into<String>) -> Self {
        Self::new(
            id,
            PipelineEventKind::StageFailed {
                stage,
                index: stage.index(),
                total: STAGE_COUNT,
                error: error.into(),
            },
        )
    }

    /// Create a stage-progress event. Both progress values are clamped to [0, 1].
    pub fn stage_progress(
        id: &PipelineId,
        stage: StageKind,
        progress: f64,
        overall: f64,
        message: Option<String>,
    ) -> Self {
        Self::new(
            id,
            PipelineEventKind::StageProgress {
                stage,
                progress: progress.clamp(0.0, 1.0),
                overall: overall.clamp(0.0, 1.0),
                message,
            },
        )
    }

    /// The stage this event concerns, if it is a stage-level event.
    pub fn stage(&self) -> Option<StageKind> {
        match &self.kind {
            PipelineEventKind::StageStarted { stage, .. }
            | PipelineEventKind::StageCompleted { stage, .. }
            | PipelineEventKind::StageFailed { stage, .. }
            | PipelineEventKind::StageProgress { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Whether this is a terminal event for the run.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.kind,
            PipelineEventKind::PipelineCompleted { .. } | PipelineEventKind::PipelineFailed { .. }
        )
    }
}
