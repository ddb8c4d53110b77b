//! Pluggable timestamp-generation strategies.
//!
//! A strategy determines how word timing is derived for an audio+script
//! pair; it never alters the script text or the audio itself. Strategies are
//! created by name through [`StrategyFactory`], which holds the external
//! transcriber and aligner collaborators.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use vgen_models::{TimestampSource, WordTimeline};

use crate::align::ForcedAligner;
use crate::error::{SyncError, SyncResult};
use crate::estimate::estimate_timeline;
use crate::media;
use crate::reconcile::{reconcile, ReconcileConfig};
use crate::transcribe::Transcriber;

/// All registered strategy names, lowercase, hyphens preserved.
pub const REGISTERED_STRATEGIES: [&str; 3] = ["standard", "audio-first", "forced-align"];

/// Confidence reported for ASR-derived timelines.
const ASR_CONFIDENCE: f64 = 0.9;

/// Confidence reported for forced-aligned timelines. The aligner emits no
/// usable per-word confidence, so this is a constant.
const ALIGN_CONFIDENCE: f64 = 0.95;

/// Options passed to a strategy invocation.
#[derive(Debug, Clone, Default)]
pub struct StrategyOptions {
    /// ASR model tier for transcription-backed strategies.
    pub asr_model: vgen_models::AsrModel,
    /// Reconciliation parameters for repairing ASR output.
    pub reconcile: ReconcileConfig,
}

/// A timestamp-generation strategy.
#[async_trait]
pub trait TimestampStrategy: Send + Sync + std::fmt::Debug {
    /// The registered name of this strategy.
    fn name(&self) -> &'static str;

    /// Produce word-level timestamps for an audio+script pair.
    async fn generate(
        &self,
        audio_path: &Path,
        script: &str,
        options: &StrategyOptions,
    ) -> SyncResult<WordTimeline>;
}

/// Factory creating strategies by name.
///
/// Names match case-insensitively and are normalized to lowercase; an
/// unregistered name fails with an error listing every registered strategy.
#[derive(Clone)]
pub struct StrategyFactory {
    transcriber: Arc<dyn Transcriber>,
    aligner: Arc<dyn ForcedAligner>,
}

impl StrategyFactory {
    /// Create a factory around the external collaborators.
    pub fn new(transcriber: Arc<dyn Transcriber>, aligner: Arc<dyn ForcedAligner>) -> Self {
        Self { transcriber, aligner }
    }

    /// Create the strategy registered under `name`.
    pub fn create(&self, name: &str) -> SyncResult<Box<dyn TimestampStrategy>> {
        match name.trim().to_lowercase().as_str() {
            "standard" => Ok(Box::new(StandardStrategy {
                transcriber: Arc::clone(&self.transcriber),
            })),
            "audio-first" => Ok(Box::new(AudioFirstStrategy {
                transcriber: Arc::clone(&self.transcriber),
            })),
            "forced-align" => Ok(Box::new(ForcedAlignStrategy {
                aligner: Arc::clone(&self.aligner),
            })),
            other => Err(SyncError::UnknownStrategy {
                name: other.to_string(),
                registered: REGISTERED_STRATEGIES.to_vec(),
            }),
        }
    }
}

/// ASR when available, rule-based estimation otherwise.
struct StandardStrategy {
    transcriber: Arc<dyn Transcriber>,
}

impl std::fmt::Debug for StandardStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StandardStrategy").finish_non_exhaustive()
    }
}

#[async_trait]
impl TimestampStrategy for StandardStrategy {
    fn name(&self) -> &'static str {
        "standard"
    }

    async fn generate(
        &self,
        audio_path: &Path,
        script: &str,
        options: &StrategyOptions,
    ) -> SyncResult<WordTimeline> {
        if self.transcriber.is_available() {
            match self.transcriber.transcribe(audio_path, options.asr_model).await {
                Ok(words) => {
                    let words = reconcile(&words, script, &options.reconcile);
                    return Ok(WordTimeline::new(
                        words,
                        TimestampSource::Whisper,
                        ASR_CONFIDENCE,
                    ));
                }
                Err(e) if e.is_unavailable() => {
                    warn!(error = %e, "ASR unavailable, falling back to estimation");
                }
                Err(e) => return Err(e),
            }
        } else {
            info!("No ASR transcriber installed, estimating word timing");
        }

        let duration = media::probe_duration(audio_path).await.ok();
        Ok(estimate_timeline(script, duration))
    }
}

/// ASR required; fails hard when unavailable.
struct AudioFirstStrategy {
    transcriber: Arc<dyn Transcriber>,
}

impl std::fmt::Debug for AudioFirstStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioFirstStrategy").finish_non_exhaustive()
    }
}

#[async_trait]
impl TimestampStrategy for AudioFirstStrategy {
    fn name(&self) -> &'static str {
        "audio-first"
    }

    async fn generate(
        &self,
        audio_path: &Path,
        script: &str,
        options: &StrategyOptions,
    ) -> SyncResult<WordTimeline> {
        if !self.transcriber.is_available() {
            return Err(SyncError::AsrUnavailable(
                "the audio-first strategy requires an ASR transcriber".to_string(),
            ));
        }
        let words = self.transcriber.transcribe(audio_path, options.asr_model).await?;
        let words = reconcile(&words, script, &options.reconcile);
        Ok(WordTimeline::new(words, TimestampSource::Whisper, ASR_CONFIDENCE))
    }
}

/// Phoneme-level forced alignment; highest precision, needs the aligner
/// installed.
struct ForcedAlignStrategy {
    aligner: Arc<dyn ForcedAligner>,
}

impl std::fmt::Debug for ForcedAlignStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForcedAlignStrategy").finish_non_exhaustive()
    }
}

#[async_trait]
impl TimestampStrategy for ForcedAlignStrategy {
    fn name(&self) -> &'static str {
        "forced-align"
    }

    async fn generate(
        &self,
        audio_path: &Path,
        script: &str,
        _options: &StrategyOptions,
    ) -> SyncResult<WordTimeline> {
        if !self.aligner.is_available() {
            return Err(SyncError::AlignerUnavailable(
                "the forced-align strategy requires aeneas to be installed".to_string(),
            ));
        }
        // Fragments are aligned script words, so spellings are already
        // canonical and no reconciliation pass is needed.
        let words = self.aligner.align(audio_path, script).await?;
        Ok(WordTimeline::new(words, TimestampSource::Aeneas, ALIGN_CONFIDENCE))
    }
}
