//! Shared data models for the vgen generation core.
//!
//! This crate provides Serde-serializable types for:
//! - Stage artifacts (script, audio, visuals, render output)
//! - Pipeline lifecycle events
//! - Word-level timestamps and timelines
//! - Audio-sync quality ratings
//! - Generation settings and escalation tiers

pub mod artifact;
pub mod event;
pub mod rating;
pub mod settings;
pub mod word;

// Re-export common types
pub use artifact::{
    AudioArtifact, NarrationBundle, RenderArtifact, ScenePlan, ScriptArtifact, VisualAsset,
    VisualsArtifact,
};
pub use event::{PipelineEvent, PipelineEventKind, PipelineId, StageKind, STAGE_COUNT};
pub use rating::{SyncLabel, SyncMetrics, SyncRating};
pub use settings::{AsrModel, GenerationSettings, Orientation, PipelineMode};
pub use word::{normalize_word, TimestampSource, WordError, WordTimeline, WordTimestamp};
