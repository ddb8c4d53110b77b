//! Stage artifact payloads.
//!
//! The pipeline engine treats these as opaque beyond the cost fields and the
//! file paths it tracks for cleanup. Each artifact is produced by a stage
//! function or supplied externally to bypass that stage.

use std::path::PathBuf;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::word::WordTimeline;
use crate::Orientation;

/// One narrated scene of a generated script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ScenePlan {
    /// Narration text for this scene.
    pub text: String,
    /// Search terms used to find matching visuals.
    pub search_terms: Vec<String>,
}

/// Output of the script stage.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ScriptArtifact {
    /// Video title.
    pub title: String,
    /// Ordered scenes making up the narration.
    pub scenes: Vec<ScenePlan>,
    /// LLM token cost in USD, if the producer reported one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_usd: Option<f64>,
}

impl ScriptArtifact {
    /// Full narration text, scene texts joined with single spaces.
    pub fn full_text(&self) -> String {
        self.scenes
            .iter()
            .map(|s| s.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Total word count across all scenes.
    pub fn word_count(&self) -> usize {
        self.scenes
            .iter()
            .map(|s| s.text.split_whitespace().count())
            .sum()
    }
}

/// Output of the audio stage.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AudioArtifact {
    /// Path to the synthesized narration audio file.
    pub audio_path: PathBuf,
    /// Audio duration in seconds.
    pub duration_secs: f64,
    /// Voice identifier used for synthesis.
    pub voice: String,
    /// TTS cost in USD, if the producer reported one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_usd: Option<f64>,
}

/// One visual asset matched to a span of the narration.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VisualAsset {
    /// Provider that supplied the asset (e.g. "pexels", "generated").
    pub provider: String,
    /// Source URL or local path of the asset.
    pub url: String,
    /// Start of the narration span this asset covers, in seconds.
    pub start_secs: f64,
    /// End of the narration span this asset covers, in seconds.
    pub end_secs: f64,
}

/// Output of the visuals stage.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VisualsArtifact {
    /// Assets covering the narration timeline, in order.
    pub assets: Vec<VisualAsset>,
    /// Orientation the assets were selected for.
    pub orientation: Orientation,
}

/// Output of the render stage.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RenderArtifact {
    /// Path to the rendered video file.
    pub video_path: PathBuf,
    /// Video duration in seconds.
    pub duration_secs: f64,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
}

/// Audio artifact paired with its word timeline, persisted as one document.
///
/// An externally supplied audio artifact must always arrive with a matching
/// timeline; the pair is the unit the render stage and the quality rater
/// consume.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NarrationBundle {
    pub audio: AudioArtifact,
    pub timeline: WordTimeline,
}
