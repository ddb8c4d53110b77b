//! Stage function contracts and the stage-bypass input union.
//!
//! The four stage functions are external collaborators invoked through
//! narrow async traits. Each stage's input is resolved once, before the
//! stage executes, into either "produce via the stage function" or "adopt
//! this externally supplied artifact".

use std::path::Path;

use async_trait::async_trait;

use vgen_models::{
    AudioArtifact, NarrationBundle, Orientation, RenderArtifact, ScriptArtifact, VisualsArtifact,
    WordTimeline,
};

use crate::error::PipelineResult;
use crate::request::SyncOptions;

/// Progress callback for the visuals stage, with stage-local progress in
/// [0, 1].
pub type ProgressFn = dyn Fn(f64) + Send + Sync;

/// Progress callback for the render stage, reporting a phase and the
/// progress within it.
pub type RenderProgressFn = dyn Fn(RenderPhase, f64) + Send + Sync;

/// Phases of the render stage, with fixed weight fractions summing to 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderPhase {
    /// Asset bundling and layout.
    Bundle,
    /// Visual selection and arrangement on the timeline.
    Selection,
    /// Media encoding of the final output.
    Encode,
}

impl RenderPhase {
    pub fn label(&self) -> &'static str {
        match self {
            RenderPhase::Bundle => "bundle",
            RenderPhase::Selection => "selection",
            RenderPhase::Encode => "encode",
        }
    }

    /// Weight of this phase within the render stage.
    pub fn weight(&self) -> f64 {
        match self {
            RenderPhase::Bundle => 0.1,
            RenderPhase::Selection => 0.2,
            RenderPhase::Encode => 0.7,
        }
    }

    /// Cumulative progress at the start of this phase.
    pub fn offset(&self) -> f64 {
        match self {
            RenderPhase::Bundle => 0.0,
            RenderPhase::Selection => 0.1,
            RenderPhase::Encode => 0.3,
        }
    }

    /// Stage-local progress for phase-local progress `p` (clamped).
    pub fn stage_progress(&self, p: f64) -> f64 {
        self.offset() + self.weight() * p.clamp(0.0, 1.0)
    }
}

/// Options for the render stage.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Where the final video is written.
    pub output_path: std::path::PathBuf,
    /// Output orientation.
    pub orientation: Orientation,
    /// Whether captions are burned into the frames.
    pub burn_captions: bool,
}

/// Writes a script for a topic.
#[async_trait]
pub trait ScriptGenerator: Send + Sync {
    async fn generate(
        &self,
        topic: &str,
        archetype: &str,
        target_duration_secs: u32,
        research_context: Option<&str>,
    ) -> PipelineResult<ScriptArtifact>;
}

/// Synthesizes narration audio and its word timeline.
///
/// The implementation writes the audio to `audio_path` and the timeline
/// document to `timestamps_path`; both become tracked side-effect paths of
/// the run.
#[async_trait]
pub trait AudioSynthesizer: Send + Sync {
    async fn synthesize(
        &self,
        script: &ScriptArtifact,
        voice: &str,
        audio_path: &Path,
        timestamps_path: &Path,
        options: &SyncOptions,
    ) -> PipelineResult<(AudioArtifact, WordTimeline)>;
}

/// Finds visual assets covering the narration timeline.
#[async_trait]
pub trait VisualMatcher: Send + Sync {
    async fn match_visuals(
        &self,
        timeline: &WordTimeline,
        provider_preferences: &[String],
        orientation: Orientation,
        progress: Option<&ProgressFn>,
    ) -> PipelineResult<VisualsArtifact>;
}

/// Composites visuals, narration and captions into the final video.
#[async_trait]
pub trait VideoRenderer: Send + Sync {
    async fn render(
        &self,
        visuals: &VisualsArtifact,
        narration: &NarrationBundle,
        options: &RenderOptions,
        progress: Option<&RenderProgressFn>,
    ) -> PipelineResult<RenderArtifact>;
}

/// The four stage functions a pipeline engine orchestrates.
#[derive(Clone)]
pub struct StageSet {
    pub script: std::sync::Arc<dyn ScriptGenerator>,
    pub audio: std::sync::Arc<dyn AudioSynthesizer>,
    pub visuals: std::sync::Arc<dyn VisualMatcher>,
    pub renderer: std::sync::Arc<dyn VideoRenderer>,
}

/// Resolved input for one stage: produce it, or adopt an external artifact.
#[derive(Debug, Clone)]
pub enum StageInput<T> {
    /// Invoke the stage function with accumulated upstream artifacts.
    Produce,
    /// Use the supplied artifact directly, bypassing the stage function.
    UseExternal(T),
}

impl<T> StageInput<T> {
    /// Resolve from an optional external artifact.
    pub fn from_option(external: Option<T>) -> Self {
        match external {
            Some(artifact) => StageInput::UseExternal(artifact),
            None => StageInput::Produce,
        }
    }

    pub fn is_external(&self) -> bool {
        matches!(self, StageInput::UseExternal(_))
    }
}
