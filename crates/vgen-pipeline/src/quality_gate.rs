//! Quality-gate retry loop.
//!
//! Runs "attempt pipeline → rate output → escalate settings" up to a bounded
//! number of times, driven purely by the computed sync rating. Pipeline
//! errors abort the loop; a failed attempt is never treated as a failed
//! rating. The loop is generic over the attempt and rate operations so it
//! can be exercised without a real pipeline.

use std::future::Future;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use vgen_models::{GenerationSettings, PipelineMode, SyncRating};

use crate::error::PipelineResult;

/// Quality-gate policy.
#[derive(Debug, Clone)]
pub struct QualityGateConfig {
    /// When false, a single attempt runs and no rating is computed.
    pub enabled: bool,
    /// When false, a failing rating terminates after one attempt.
    pub auto_retry: bool,
    /// Maximum retries after the first attempt.
    pub max_retries: u32,
}

impl Default for QualityGateConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            auto_retry: true,
            max_retries: 1,
        }
    }
}

/// Terminal state of a quality-gated run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateVerdict {
    /// The rating met every threshold.
    Passed,
    /// Retries ran out (or retrying was not allowed) without passing.
    ExhaustedRetries,
    /// Quality checking was turned off; no rating was computed.
    Disabled,
}

/// Anything the gate can rate: exposes the produced artifact's path.
pub trait RatedArtifact {
    fn artifact_path(&self) -> &Path;
}

/// Rates a rendered artifact against its expected timeline.
///
/// The sync subsystem's rater is the production implementation; tests
/// substitute stubs.
#[async_trait::async_trait]
pub trait OutputRater: Send + Sync {
    async fn rate(
        &self,
        video_path: &Path,
        expected: &vgen_models::WordTimeline,
    ) -> PipelineResult<SyncRating>;
}

#[async_trait::async_trait]
impl OutputRater for vgen_sync::SyncQualityRater {
    async fn rate(
        &self,
        video_path: &Path,
        expected: &vgen_models::WordTimeline,
    ) -> PipelineResult<SyncRating> {
        vgen_sync::SyncQualityRater::rate(self, video_path, expected)
            .await
            .map_err(crate::error::PipelineError::from)
    }
}

/// One row of the quality-gate audit trail.
#[derive(Debug, Clone)]
pub struct AttemptRecord {
    /// 1-based attempt number.
    pub attempt: u32,
    /// Settings the attempt ran with.
    pub settings: GenerationSettings,
    /// The attempt's produced artifact.
    pub output_path: PathBuf,
    /// Rating, absent when quality checking is disabled.
    pub rating: Option<SyncRating>,
}

/// Final outcome of a quality-gated run.
#[derive(Debug)]
pub struct GateOutcome<R> {
    pub verdict: GateVerdict,
    /// Result of the last attempt, whatever the verdict.
    pub result: R,
    /// Rating of the last attempt, absent when checking was disabled.
    pub rating: Option<SyncRating>,
    /// Every attempt in order, passed or not.
    pub attempts: Vec<AttemptRecord>,
}

impl<R> GateOutcome<R> {
    /// Whether the run is acceptable: rated as passing, or never rated.
    pub fn accepted(&self) -> bool {
        matches!(self.verdict, GateVerdict::Passed | GateVerdict::Disabled)
    }
}

/// Deterministically strengthen settings for the next attempt.
///
/// Pure function: `standard` mode upgrades to `audio-first`, and the ASR
/// model steps up one tier. Saturates, so escalating past the ceiling is a
/// no-op.
pub fn escalate(settings: &GenerationSettings) -> GenerationSettings {
    let mut next = settings.clone();
    if next.mode == PipelineMode::Standard {
        next.mode = PipelineMode::AudioFirst;
    }
    next.asr_model = next.asr_model.next_tier();
    next
}

/// Run the quality-gate state machine.
///
/// `run_attempt` is called with the attempt's settings and 1-based number;
/// `rate` receives the produced result. Auto-retry is forcibly disabled when
/// the run adopted externally supplied audio, since there is nothing to
/// regenerate.
pub async fn run_with_quality_gate<R, F, FR, G, FG>(
    initial_settings: GenerationSettings,
    config: &QualityGateConfig,
    used_external_audio: bool,
    mut run_attempt: F,
    mut rate: G,
) -> PipelineResult<GateOutcome<R>>
where
    R: RatedArtifact + Clone,
    F: FnMut(GenerationSettings, u32) -> FR,
    FR: Future<Output = PipelineResult<R>>,
    G: FnMut(R, u32) -> FG,
    FG: Future<Output = PipelineResult<SyncRating>>,
{
    let auto_retry = if config.auto_retry && used_external_audio {
        warn!("Auto-retry disabled: audio was supplied externally, nothing to regenerate");
        false
    } else {
        config.auto_retry
    };

    let mut attempts: Vec<AttemptRecord> = Vec::new();
    let mut settings = initial_settings;
    let mut attempt_no = 1u32;

    loop {
        info!(attempt = attempt_no, mode = %settings.mode, asr_model = %settings.asr_model, "Running pipeline attempt");
        let result = run_attempt(settings.clone(), attempt_no).await?;

        if !config.enabled {
            attempts.push(AttemptRecord {
                attempt: attempt_no,
                settings,
                output_path: result.artifact_path().to_path_buf(),
                rating: None,
            });
            return Ok(GateOutcome {
                verdict: GateVerdict::Disabled,
                result,
                rating: None,
                attempts,
            });
        }

        let rating = rate(result.clone(), attempt_no).await?;
        attempts.push(AttemptRecord {
            attempt: attempt_no,
            settings: settings.clone(),
            output_path: result.artifact_path().to_path_buf(),
            rating: Some(rating.clone()),
        });

        if rating.passed {
            info!(attempt = attempt_no, rating = rating.rating, "Quality gate passed");
            return Ok(GateOutcome {
                verdict: GateVerdict::Passed,
                result,
                rating: Some(rating),
                attempts,
            });
        }

        if !auto_retry || attempt_no > config.max_retries {
            warn!(
                attempt = attempt_no,
                rating = rating.rating,
                "Quality gate failed with no retries left"
            );
            return Ok(GateOutcome {
                verdict: GateVerdict::ExhaustedRetries,
                result,
                rating: Some(rating),
                attempts,
            });
        }

        settings = escalate(&settings);
        attempt_no += 1;
    }
}
