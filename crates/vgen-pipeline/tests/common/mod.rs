//! Shared stub stage functions for integration tests.
#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use vgen_models::{
    AudioArtifact, NarrationBundle, Orientation, RenderArtifact, ScenePlan, ScriptArtifact,
    SyncMetrics, SyncRating, TimestampSource, VisualAsset, VisualsArtifact, WordTimeline,
    WordTimestamp,
};
use vgen_pipeline::{
    AudioSynthesizer, OutputRater, PipelineEngine, PipelineError, PipelineResult, RenderOptions,
    RenderPhase, ResolvedConfig, ScriptGenerator, StageSet, SyncOptions, VideoRenderer,
    VisualMatcher,
};

pub fn test_timeline() -> WordTimeline {
    WordTimeline::new(
        vec![
            WordTimestamp::new("every", 0.0, 0.3).unwrap(),
            WordTimestamp::new("10x", 0.4, 0.8).unwrap(),
            WordTimestamp::new("engineer", 0.9, 1.5).unwrap(),
        ],
        TimestampSource::Whisper,
        0.9,
    )
}

pub struct StubScript {
    pub cost_usd: Option<f64>,
}

impl Default for StubScript {
    fn default() -> Self {
        Self {
            cost_usd: Some(0.002),
        }
    }
}

#[async_trait]
impl ScriptGenerator for StubScript {
    async fn generate(
        &self,
        topic: &str,
        _archetype: &str,
        _target_duration_secs: u32,
        _research_context: Option<&str>,
    ) -> PipelineResult<ScriptArtifact> {
        Ok(ScriptArtifact {
            title: topic.to_string(),
            scenes: vec![ScenePlan {
                text: "Every 10x engineer ships daily".to_string(),
                search_terms: vec!["office".to_string()],
            }],
            cost_usd: self.cost_usd,
        })
    }
}

pub struct FailingScript;

#[async_trait]
impl ScriptGenerator for FailingScript {
    async fn generate(
        &self,
        _topic: &str,
        _archetype: &str,
        _target_duration_secs: u32,
        _research_context: Option<&str>,
    ) -> PipelineResult<ScriptArtifact> {
        Err(PipelineError::config("model name is not configured"))
    }
}

pub struct StubAudio {
    pub cost_usd: Option<f64>,
    pub called: Arc<AtomicBool>,
}

impl Default for StubAudio {
    fn default() -> Self {
        Self {
            cost_usd: Some(0.01),
            called: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[async_trait]
impl AudioSynthesizer for StubAudio {
    async fn synthesize(
        &self,
        _script: &ScriptArtifact,
        voice: &str,
        audio_path: &Path,
        timestamps_path: &Path,
        _options: &SyncOptions,
    ) -> PipelineResult<(AudioArtifact, WordTimeline)> {
        self.called.store(true, Ordering::SeqCst);
        let timeline = test_timeline();
        tokio::fs::write(audio_path, b"RIFF-stub-wav").await?;
        tokio::fs::write(timestamps_path, serde_json::to_vec(&timeline)?).await?;
        Ok((
            AudioArtifact {
                audio_path: audio_path.to_path_buf(),
                duration_secs: timeline.duration_secs(),
                voice: voice.to_string(),
                cost_usd: self.cost_usd,
            },
            timeline,
        ))
    }
}

pub struct StubVisuals {
    /// Report progress values outside [0, 1] to exercise clamping.
    pub bogus_progress: bool,
    pub fail: bool,
}

impl Default for StubVisuals {
    fn default() -> Self {
        Self {
            bogus_progress: false,
            fail: false,
        }
    }
}

#[async_trait]
impl VisualMatcher for StubVisuals {
    async fn match_visuals(
        &self,
        timeline: &WordTimeline,
        _provider_preferences: &[String],
        orientation: Orientation,
        progress: Option<&vgen_pipeline::stage::ProgressFn>,
    ) -> PipelineResult<VisualsArtifact> {
        if self.fail {
            return Err(PipelineError::api(503, "stock provider down"));
        }
        if let Some(cb) = progress {
            if self.bogus_progress {
                cb(-0.3);
                cb(1.7);
            } else {
                cb(0.5);
                cb(1.0);
            }
        }
        Ok(VisualsArtifact {
            assets: vec![VisualAsset {
                provider: "pexels".to_string(),
                url: "https://example.com/clip.mp4".to_string(),
                start_secs: 0.0,
                end_secs: timeline.duration_secs(),
            }],
            orientation,
        })
    }
}

pub struct StubRenderer;

#[async_trait]
impl VideoRenderer for StubRenderer {
    async fn render(
        &self,
        _visuals: &VisualsArtifact,
        narration: &NarrationBundle,
        options: &RenderOptions,
        progress: Option<&vgen_pipeline::stage::RenderProgressFn>,
    ) -> PipelineResult<RenderArtifact> {
        if let Some(cb) = progress {
            cb(RenderPhase::Bundle, 1.0);
            cb(RenderPhase::Selection, 1.0);
            cb(RenderPhase::Encode, 0.5);
            cb(RenderPhase::Encode, 1.0);
        }
        tokio::fs::write(&options.output_path, b"stub-mp4").await?;
        Ok(RenderArtifact {
            video_path: options.output_path.clone(),
            duration_secs: narration.audio.duration_secs,
            width: 1080,
            height: 1920,
        })
    }
}

/// Engine wired with default stubs and a work dir under `root`.
pub fn make_engine(root: &Path) -> PipelineEngine {
    make_engine_with(root, StageSet {
        script: Arc::new(StubScript::default()),
        audio: Arc::new(StubAudio::default()),
        visuals: Arc::new(StubVisuals::default()),
        renderer: Arc::new(StubRenderer),
    })
}

pub fn make_engine_with(root: &Path, stages: StageSet) -> PipelineEngine {
    let config = ResolvedConfig {
        work_dir: root.to_path_buf(),
        ..Default::default()
    };
    PipelineEngine::new(stages, config)
}

/// Drain everything currently buffered on an event receiver.
pub fn drain(
    rx: &mut tokio::sync::mpsc::UnboundedReceiver<vgen_models::PipelineEvent>,
) -> Vec<vgen_models::PipelineEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Rater stub returning queued ratings in order.
pub struct QueuedRater {
    ratings: Mutex<std::collections::VecDeque<SyncRating>>,
}

impl QueuedRater {
    pub fn new(ratings: Vec<SyncRating>) -> Self {
        Self {
            ratings: Mutex::new(ratings.into()),
        }
    }
}

#[async_trait]
impl OutputRater for QueuedRater {
    async fn rate(
        &self,
        _video_path: &Path,
        _expected: &WordTimeline,
    ) -> PipelineResult<SyncRating> {
        self.ratings
            .lock()
            .expect("rater queue lock")
            .pop_front()
            .ok_or_else(|| PipelineError::config("rater queue exhausted"))
    }
}

pub fn rating(score: u8, passed: bool) -> SyncRating {
    SyncRating::new(
        score,
        passed,
        SyncMetrics {
            mean_drift_ms: if passed { 80.0 } else { 320.0 },
            max_drift_ms: if passed { 200.0 } else { 700.0 },
            match_ratio: if passed { 0.95 } else { 0.55 },
            error_count: if passed { 1 } else { 9 },
        },
    )
}
