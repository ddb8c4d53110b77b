//! Sync quality rating of rendered output.
//!
//! The rater re-analyzes a rendered artifact independently of the pipeline
//! that produced it: the audio track is extracted and re-transcribed, the
//! observed word stream is compared against the expected timeline, and the
//! result is a 0-100 composite with drift/match metrics. `passed` requires
//! every configured threshold to hold simultaneously.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use vgen_models::{AsrModel, SyncMetrics, SyncRating, WordTimeline, WordTimestamp};

use crate::error::SyncResult;
use crate::media;
use crate::reconcile::similarity;
use crate::transcribe::Transcriber;

/// Weights of the rating composite. Normalized by their sum when applied.
#[derive(Debug, Clone)]
pub struct RatingWeights {
    pub match_ratio: f64,
    pub mean_drift: f64,
    pub max_drift: f64,
}

impl Default for RatingWeights {
    fn default() -> Self {
        Self {
            match_ratio: 0.5,
            mean_drift: 0.3,
            max_drift: 0.2,
        }
    }
}

/// Rater configuration. Every threshold is tunable; the defaults mirror the
/// pipeline's quality-gate defaults.
#[derive(Debug, Clone)]
pub struct RaterConfig {
    /// Minimum composite rating to pass.
    pub min_rating: u8,
    /// Maximum acceptable mean drift in milliseconds.
    pub max_mean_drift_ms: f64,
    /// Maximum acceptable worst-case drift in milliseconds.
    pub max_max_drift_ms: f64,
    /// Minimum fraction of expected words that must be found.
    pub min_match_ratio: f64,
    /// Window around an expected word's start inside which an observed word
    /// counts as found.
    pub drift_tolerance_ms: f64,
    /// Word similarity required to pair an observed word with an expected one.
    pub similarity_threshold: f64,
    /// Frame sampling rate for the burned-in caption OCR cross-check.
    pub frame_sample_fps: f64,
    /// ASR model tier used for re-transcription.
    pub asr_model: AsrModel,
    /// Composite weights.
    pub weights: RatingWeights,
}

impl Default for RaterConfig {
    fn default() -> Self {
        Self {
            min_rating: 75,
            max_mean_drift_ms: 180.0,
            max_max_drift_ms: 500.0,
            min_match_ratio: 0.7,
            drift_tolerance_ms: 500.0,
            similarity_threshold: 0.7,
            frame_sample_fps: 2.0,
            asr_model: AsrModel::Base,
            weights: RatingWeights::default(),
        }
    }
}

/// A sampled video frame's recognized caption text.
#[derive(Debug, Clone)]
pub struct CaptionFrame {
    pub time_secs: f64,
    pub text: String,
}

/// Samples frames from a rendered video and OCRs any burned-in captions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CaptionSampler: Send + Sync {
    async fn sample(&self, video_path: &Path, fps: f64) -> SyncResult<Vec<CaptionFrame>>;
}

/// Rates the audio/caption synchronization of a rendered artifact.
pub struct SyncQualityRater {
    transcriber: Arc<dyn Transcriber>,
    caption_sampler: Option<Arc<dyn CaptionSampler>>,
    config: RaterConfig,
}

impl SyncQualityRater {
    pub fn new(transcriber: Arc<dyn Transcriber>, config: RaterConfig) -> Self {
        Self {
            transcriber,
            caption_sampler: None,
            config,
        }
    }

    /// Attach an OCR sampler for the caption cross-check.
    pub fn with_caption_sampler(mut self, sampler: Arc<dyn CaptionSampler>) -> Self {
        self.caption_sampler = Some(sampler);
        self
    }

    /// Rate a rendered video against the timeline it was rendered with.
    ///
    /// The audio track is extracted and re-transcribed from scratch; nothing
    /// from the producing run is trusted.
    pub async fn rate(&self, video_path: &Path, expected: &WordTimeline) -> SyncResult<SyncRating> {
        let work = tempfile::tempdir()?;
        let wav = work.path().join("audio.wav");
        media::extract_audio_track(video_path, &wav).await?;

        let observed = self
            .transcriber
            .transcribe(&wav, self.config.asr_model)
            .await?;
        debug!(
            expected = expected.len(),
            observed = observed.len(),
            "Re-transcribed rendered audio"
        );

        let caption_agreement = match &self.caption_sampler {
            Some(sampler) => {
                let frames = sampler
                    .sample(video_path, self.config.frame_sample_fps)
                    .await?;
                Some(caption_agreement(&frames, expected))
            }
            None => None,
        };

        let rating = score(expected, &observed, caption_agreement, &self.config);
        info!(
            rating = rating.rating,
            passed = rating.passed,
            mean_drift_ms = rating.metrics.mean_drift_ms,
            max_drift_ms = rating.metrics.max_drift_ms,
            match_ratio = rating.metrics.match_ratio,
            "Rated sync quality"
        );
        Ok(rating)
    }
}

/// Compute a rating from an expected timeline and an observed word stream.
///
/// Matching is greedy and in time order: each expected word pairs with the
/// closest sufficiently similar observed word whose start lies within the
/// drift tolerance.
pub fn score(
    expected: &WordTimeline,
    observed: &[WordTimestamp],
    caption_agreement: Option<f64>,
    config: &RaterConfig,
) -> SyncRating {
    if expected.is_empty() {
        let metrics = SyncMetrics {
            mean_drift_ms: 0.0,
            max_drift_ms: 0.0,
            match_ratio: 0.0,
            error_count: 0,
        };
        return SyncRating::new(0, false, metrics);
    }

    let tolerance_secs = config.drift_tolerance_ms / 1000.0;
    let mut drifts_ms: Vec<f64> = Vec::new();
    let mut cursor = 0usize;

    for exp in &expected.words {
        // Observed words that ended up too early can never match this or any
        // later expected word; both streams are in time order.
        while cursor < observed.len()
            && observed[cursor].start_secs < exp.start_secs - tolerance_secs
        {
            cursor += 1;
        }

        let mut best: Option<(usize, f64)> = None;
        let mut j = cursor;
        while j < observed.len() && observed[j].start_secs <= exp.start_secs + tolerance_secs {
            if similarity(&exp.normalized, &observed[j].normalized) >= config.similarity_threshold {
                let drift = (observed[j].start_secs - exp.start_secs).abs() * 1000.0;
                if best.map_or(true, |(_, d)| drift < d) {
                    best = Some((j, drift));
                }
            }
            j += 1;
        }

        if let Some((idx, drift)) = best {
            drifts_ms.push(drift);
            cursor = idx + 1;
        }
    }

    let matched = drifts_ms.len();
    let total = expected.len();
    let match_ratio = matched as f64 / total as f64;
    let mean_drift_ms = if matched > 0 {
        drifts_ms.iter().sum::<f64>() / matched as f64
    } else {
        0.0
    };
    let max_drift_ms = drifts_ms.iter().cloned().fold(0.0, f64::max);

    let w = &config.weights;
    let weight_sum = w.match_ratio + w.mean_drift + w.max_drift;
    let mean_component = 1.0 - (mean_drift_ms / config.max_mean_drift_ms).min(1.0);
    let max_component = 1.0 - (max_drift_ms / config.max_max_drift_ms).min(1.0);
    let mut composite = 100.0
        * (w.match_ratio * match_ratio + w.mean_drift * mean_component + w.max_drift * max_component)
        / weight_sum;

    // Caption disagreement shaves up to 10 points off the composite.
    if let Some(agreement) = caption_agreement {
        composite -= (1.0 - agreement.clamp(0.0, 1.0)) * 10.0;
    }

    let rating = composite.round().clamp(0.0, 100.0) as u8;
    let passed = rating >= config.min_rating
        && mean_drift_ms <= config.max_mean_drift_ms
        && max_drift_ms <= config.max_max_drift_ms
        && match_ratio >= config.min_match_ratio;

    SyncRating::new(
        rating,
        passed,
        SyncMetrics {
            mean_drift_ms,
            max_drift_ms,
            match_ratio,
            error_count: total - matched,
        },
    )
}

/// Fraction of caption frames whose text agrees with the words expected to
/// be on screen at that moment. Frames with no recognized text are ignored;
/// no frames at all counts as full agreement.
pub fn caption_agreement(frames: &[CaptionFrame], expected: &WordTimeline) -> f64 {
    const SLACK_SECS: f64 = 0.5;

    let mut considered = 0usize;
    let mut agreeing = 0usize;

    for frame in frames {
        let normalized_text: Vec<String> = frame
            .text
            .split_whitespace()
            .map(vgen_models::normalize_word)
            .filter(|w| !w.is_empty())
            .collect();
        if normalized_text.is_empty() {
            continue;
        }
        considered += 1;

        let active_words = expected.words.iter().filter(|w| {
            w.start_secs - SLACK_SECS <= frame.time_secs && frame.time_secs <= w.end_secs + SLACK_SECS
        });
        let mut hit = false;
        for word in active_words {
            if normalized_text.iter().any(|t| t == &word.normalized) {
                hit = true;
                break;
            }
        }
        if hit {
            agreeing += 1;
        }
    }

    if considered == 0 {
        1.0
    } else {
        agreeing as f64 / considered as f64
    }
}
