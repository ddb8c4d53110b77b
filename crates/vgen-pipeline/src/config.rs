//! Layered configuration.
//!
//! Resolution precedence, strongest first: explicit overrides, environment
//! (`VGEN__*`, after loading `.env`), project file (`vgen.toml`), user file
//! (`~/.config/vgen/config.toml`), compiled defaults. Configuration is
//! resolved once into an immutable [`ResolvedConfig`] that is handed to the
//! engine by value; there is no global cached state, so tests get isolation
//! by simply calling [`load_config`] (or constructing a config) again.

use std::path::PathBuf;

use config::{Config, Environment, File};
use serde::Deserialize;

use vgen_models::AsrModel;

use crate::error::{PipelineError, PipelineResult};
use crate::quality_gate::QualityGateConfig;
use crate::request::SyncOptions;

/// Sync subsystem defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncSettings {
    /// Reconciliation similarity threshold.
    pub similarity_threshold: f64,
    /// Reconciliation candidate window.
    pub window: usize,
    /// Default ASR model tier.
    pub asr_model: AsrModel,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.7,
            window: 5,
            asr_model: AsrModel::Base,
        }
    }
}

/// Quality-gate thresholds and retry policy.
#[derive(Debug, Clone, Deserialize)]
pub struct QualitySettings {
    /// Whether rendered output is rated at all.
    pub enabled: bool,
    /// Whether a failing rating triggers escalated retries.
    pub auto_retry: bool,
    /// Maximum retries after the first attempt.
    pub max_retries: u32,
    /// Minimum composite rating to pass.
    pub min_rating: u8,
    /// Maximum acceptable mean drift in milliseconds.
    pub max_mean_drift_ms: f64,
    /// Maximum acceptable worst-case drift in milliseconds.
    pub max_max_drift_ms: f64,
    /// Minimum fraction of expected words that must be found.
    pub min_match_ratio: f64,
    /// Match window around an expected word's start, in milliseconds.
    pub drift_tolerance_ms: f64,
    /// Frame sampling rate for the caption OCR cross-check.
    pub frame_sample_fps: f64,
}

impl Default for QualitySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            auto_retry: true,
            max_retries: 1,
            min_rating: 75,
            max_mean_drift_ms: 180.0,
            max_max_drift_ms: 500.0,
            min_match_ratio: 0.7,
            drift_tolerance_ms: 500.0,
            frame_sample_fps: 2.0,
        }
    }
}

/// Fully resolved, immutable configuration for the engine.
#[derive(Debug, Clone, Deserialize)]
pub struct ResolvedConfig {
    /// Root directory for per-run working directories.
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,
    /// Keep per-run artifacts by default (requests can also ask for it).
    #[serde(default)]
    pub keep_artifacts: bool,
    #[serde(default)]
    pub sync: SyncSettings,
    #[serde(default)]
    pub quality: QualitySettings,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            work_dir: default_work_dir(),
            keep_artifacts: false,
            sync: SyncSettings::default(),
            quality: QualitySettings::default(),
        }
    }
}

fn default_work_dir() -> PathBuf {
    PathBuf::from("/tmp/vgen")
}

impl ResolvedConfig {
    /// Sync options derived from configuration defaults.
    pub fn sync_defaults(&self) -> SyncOptions {
        SyncOptions {
            strategy: "standard".to_string(),
            asr_model: self.sync.asr_model,
            similarity_threshold: self.sync.similarity_threshold,
            window: self.sync.window,
        }
    }

    /// Quality-gate policy derived from configuration.
    pub fn gate_config(&self) -> QualityGateConfig {
        QualityGateConfig {
            enabled: self.quality.enabled,
            auto_retry: self.quality.auto_retry,
            max_retries: self.quality.max_retries,
        }
    }

    /// Rater configuration for a given ASR model tier.
    pub fn rater_config(&self, asr_model: AsrModel) -> vgen_sync::RaterConfig {
        vgen_sync::RaterConfig {
            min_rating: self.quality.min_rating,
            max_mean_drift_ms: self.quality.max_mean_drift_ms,
            max_max_drift_ms: self.quality.max_max_drift_ms,
            min_match_ratio: self.quality.min_match_ratio,
            drift_tolerance_ms: self.quality.drift_tolerance_ms,
            similarity_threshold: self.sync.similarity_threshold,
            frame_sample_fps: self.quality.frame_sample_fps,
            asr_model,
            weights: vgen_sync::RatingWeights::default(),
        }
    }
}

/// Explicit configuration overrides, the strongest layer.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub work_dir: Option<PathBuf>,
    pub keep_artifacts: Option<bool>,
    pub quality_enabled: Option<bool>,
    pub auto_retry: Option<bool>,
    pub max_retries: Option<u32>,
    pub min_rating: Option<u8>,
}

/// Resolve configuration from all layers.
pub fn load_config(overrides: &ConfigOverrides) -> PipelineResult<ResolvedConfig> {
    dotenvy::dotenv().ok();

    let mut builder = Config::builder()
        .set_default("work_dir", default_work_dir().to_string_lossy().to_string())
        .and_then(|b| b.set_default("keep_artifacts", false))
        .and_then(|b| b.set_default("sync.similarity_threshold", 0.7))
        .and_then(|b| b.set_default("sync.window", 5))
        .and_then(|b| b.set_default("sync.asr_model", "base"))
        .and_then(|b| b.set_default("quality.enabled", true))
        .and_then(|b| b.set_default("quality.auto_retry", true))
        .and_then(|b| b.set_default("quality.max_retries", 1))
        .and_then(|b| b.set_default("quality.min_rating", 75))
        .and_then(|b| b.set_default("quality.max_mean_drift_ms", 180.0))
        .and_then(|b| b.set_default("quality.max_max_drift_ms", 500.0))
        .and_then(|b| b.set_default("quality.min_match_ratio", 0.7))
        .and_then(|b| b.set_default("quality.drift_tolerance_ms", 500.0))
        .and_then(|b| b.set_default("quality.frame_sample_fps", 2.0))
        .map_err(|e| PipelineError::config(e.to_string()))?;

    if let Some(home) = std::env::var_os("HOME") {
        let user_file = PathBuf::from(home).join(".config/vgen/config.toml");
        builder = builder.add_source(File::from(user_file).required(false));
    }
    builder = builder
        .add_source(File::with_name("vgen").required(false))
        .add_source(
            Environment::with_prefix("VGEN")
                .prefix_separator("__")
                .separator("__"),
        );

    if let Some(dir) = &overrides.work_dir {
        builder = builder
            .set_override("work_dir", dir.to_string_lossy().to_string())
            .map_err(|e| PipelineError::config(e.to_string()))?;
    }
    if let Some(keep) = overrides.keep_artifacts {
        builder = builder
            .set_override("keep_artifacts", keep)
            .map_err(|e| PipelineError::config(e.to_string()))?;
    }
    if let Some(enabled) = overrides.quality_enabled {
        builder = builder
            .set_override("quality.enabled", enabled)
            .map_err(|e| PipelineError::config(e.to_string()))?;
    }
    if let Some(auto_retry) = overrides.auto_retry {
        builder = builder
            .set_override("quality.auto_retry", auto_retry)
            .map_err(|e| PipelineError::config(e.to_string()))?;
    }
    if let Some(max_retries) = overrides.max_retries {
        builder = builder
            .set_override("quality.max_retries", max_retries)
            .map_err(|e| PipelineError::config(e.to_string()))?;
    }
    if let Some(min_rating) = overrides.min_rating {
        builder = builder
            .set_override("quality.min_rating", u32::from(min_rating))
            .map_err(|e| PipelineError::config(e.to_string()))?;
    }

    builder
        .build()
        .and_then(|resolved| resolved.try_deserialize())
        .map_err(|e| PipelineError::config(e.to_string()))
}
