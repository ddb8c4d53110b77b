//! Pipeline run requests.

use std::path::PathBuf;

use tokio::sync::mpsc;

use vgen_models::{
    AudioArtifact, GenerationSettings, PipelineEvent, ScriptArtifact, VisualsArtifact, WordTimeline,
};

use crate::error::{PipelineError, PipelineResult};

/// Sync-related options handed to the audio stage.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Timestamp strategy name (matches the sync registry).
    pub strategy: String,
    /// ASR model tier.
    pub asr_model: vgen_models::AsrModel,
    /// Reconciliation similarity threshold.
    pub similarity_threshold: f64,
    /// Reconciliation candidate window.
    pub window: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            strategy: "standard".to_string(),
            asr_model: vgen_models::AsrModel::Base,
            similarity_threshold: 0.7,
            window: 5,
        }
    }
}

/// Immutable input bundle for one pipeline run.
///
/// Externally supplied artifacts bypass the corresponding stage. An external
/// audio artifact is only valid together with a matching timeline; supplying
/// one without the other makes the request invalid.
#[derive(Clone)]
pub struct PipelineRequest {
    /// Topic the video is about.
    pub topic: String,
    /// Content archetype (e.g. "listicle", "explainer").
    pub archetype: String,
    /// Settings for this run; the quality gate escalates these on retry.
    pub settings: GenerationSettings,
    /// Preferred stock-footage/image providers, in order.
    pub provider_preferences: Vec<String>,
    /// Optional research context handed to the script stage.
    pub research_context: Option<String>,
    /// Keep per-run artifacts on disk instead of deleting them at the end.
    pub keep_artifacts: bool,
    /// Per-run sync option overrides; defaults derive from configuration.
    pub sync_options: Option<SyncOptions>,
    /// Externally supplied script, bypassing the script stage.
    pub external_script: Option<ScriptArtifact>,
    /// Externally supplied audio, bypassing the audio stage.
    pub external_audio: Option<AudioArtifact>,
    /// Timeline accompanying `external_audio`.
    pub external_timeline: Option<WordTimeline>,
    /// Externally supplied visuals, bypassing the visuals stage.
    pub external_visuals: Option<VisualsArtifact>,
    /// Extra event subscriber attached for this run only.
    pub subscriber: Option<mpsc::UnboundedSender<PipelineEvent>>,
}

impl PipelineRequest {
    /// Create a request with defaults for everything but the topic.
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            archetype: "explainer".to_string(),
            settings: GenerationSettings::default(),
            provider_preferences: Vec::new(),
            research_context: None,
            keep_artifacts: false,
            sync_options: None,
            external_script: None,
            external_audio: None,
            external_timeline: None,
            external_visuals: None,
            subscriber: None,
        }
    }

    pub fn with_settings(mut self, settings: GenerationSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_archetype(mut self, archetype: impl Into<String>) -> Self {
        self.archetype = archetype.into();
        self
    }

    pub fn with_keep_artifacts(mut self, keep: bool) -> Self {
        self.keep_artifacts = keep;
        self
    }

    pub fn with_external_script(mut self, script: ScriptArtifact) -> Self {
        self.external_script = Some(script);
        self
    }

    pub fn with_external_audio(mut self, audio: AudioArtifact, timeline: WordTimeline) -> Self {
        self.external_audio = Some(audio);
        self.external_timeline = Some(timeline);
        self
    }

    pub fn with_external_visuals(mut self, visuals: VisualsArtifact) -> Self {
        self.external_visuals = Some(visuals);
        self
    }

    pub fn with_subscriber(mut self, sender: mpsc::UnboundedSender<PipelineEvent>) -> Self {
        self.subscriber = Some(sender);
        self
    }

    /// Whether this run adopts externally supplied audio.
    pub fn uses_external_audio(&self) -> bool {
        self.external_audio.is_some()
    }

    /// Validate cross-field invariants.
    pub fn validate(&self) -> PipelineResult<()> {
        if self.topic.trim().is_empty() && self.external_script.is_none() {
            return Err(PipelineError::validation(
                "topic must not be empty unless a script is supplied",
            ));
        }
        if self.settings.target_duration_secs == 0 || self.settings.target_duration_secs > 600 {
            return Err(PipelineError::validation(format!(
                "target duration must be within 1-600 seconds, got {}",
                self.settings.target_duration_secs
            )));
        }
        match (&self.external_audio, &self.external_timeline) {
            (Some(_), None) => {
                return Err(PipelineError::validation(
                    "external audio requires a matching timestamps artifact",
                ));
            }
            (None, Some(_)) => {
                return Err(PipelineError::validation(
                    "external timestamps require a matching audio artifact",
                ));
            }
            _ => {}
        }
        if let Some(timeline) = &self.external_timeline {
            timeline
                .validate()
                .map_err(|e| PipelineError::validation(e.to_string()))?;
        }
        Ok(())
    }

    /// Effective sync options for this run.
    pub fn effective_sync_options(&self, defaults: &SyncOptions) -> SyncOptions {
        let mut options = self.sync_options.clone().unwrap_or_else(|| defaults.clone());
        // The run's mode always decides the strategy; escalation would be
        // meaningless if an override pinned it.
        options.strategy = self.settings.mode.strategy_name().to_string();
        options.asr_model = self.settings.asr_model;
        options
    }
}

/// External audio output file name inside the run directory.
pub(crate) const NARRATION_FILE: &str = "narration.wav";

/// Timestamps document file name inside the run directory.
pub(crate) const TIMESTAMPS_FILE: &str = "timestamps.json";

/// Final video file name inside the run directory.
pub(crate) const OUTPUT_FILE: &str = "output.mp4";

pub(crate) fn narration_path(work_dir: &std::path::Path) -> PathBuf {
    work_dir.join(NARRATION_FILE)
}

pub(crate) fn timestamps_path(work_dir: &std::path::Path) -> PathBuf {
    work_dir.join(TIMESTAMPS_FILE)
}

pub(crate) fn output_path(work_dir: &std::path::Path) -> PathBuf {
    work_dir.join(OUTPUT_FILE)
}
