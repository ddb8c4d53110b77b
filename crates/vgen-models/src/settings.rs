//! Generation settings and escalation tiers.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
#[error("Unknown {kind}: '{value}'")]
pub struct ParseSettingError {
    pub kind: &'static str,
    pub value: String,
}

/// Output orientation of the rendered video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

impl Orientation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Portrait => "portrait",
            Orientation::Landscape => "landscape",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How word timestamps are derived for a run.
///
/// Maps 1:1 onto the timestamp strategy names registered by the sync
/// subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PipelineMode {
    /// ASR when available, rule-based estimation otherwise.
    #[default]
    Standard,
    /// ASR required; no estimation fallback.
    AudioFirst,
    /// Phoneme-level forced alignment.
    ForcedAlign,
}

impl PipelineMode {
    /// The registered strategy name for this mode.
    pub fn strategy_name(&self) -> &'static str {
        match self {
            PipelineMode::Standard => "standard",
            PipelineMode::AudioFirst => "audio-first",
            PipelineMode::ForcedAlign => "forced-align",
        }
    }
}

impl fmt::Display for PipelineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.strategy_name())
    }
}

impl FromStr for PipelineMode {
    type Err = ParseSettingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "standard" => Ok(PipelineMode::Standard),
            "audio-first" => Ok(PipelineMode::AudioFirst),
            "forced-align" => Ok(PipelineMode::ForcedAlign),
            other => Err(ParseSettingError {
                kind: "pipeline mode",
                value: other.to_string(),
            }),
        }
    }
}

/// ASR model size tier, smallest to largest.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum AsrModel {
    Tiny,
    #[default]
    Base,
    Small,
    Medium,
    Large,
}

impl AsrModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AsrModel::Tiny => "tiny",
            AsrModel::Base => "base",
            AsrModel::Small => "small",
            AsrModel::Medium => "medium",
            AsrModel::Large => "large",
        }
    }

    /// The next larger tier, saturating at the largest.
    pub fn next_tier(&self) -> AsrModel {
        match self {
            AsrModel::Tiny => AsrModel::Base,
            AsrModel::Base => AsrModel::Small,
            AsrModel::Small => AsrModel::Medium,
            AsrModel::Medium | AsrModel::Large => AsrModel::Large,
        }
    }
}

impl fmt::Display for AsrModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The settings a pipeline attempt runs with.
///
/// The quality-gate loop escalates these between attempts; everything else
/// treats them as immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GenerationSettings {
    /// Timestamp derivation mode.
    pub mode: PipelineMode,
    /// ASR model tier used for transcription and re-transcription.
    pub asr_model: AsrModel,
    /// Voice identifier for synthesis.
    pub voice: String,
    /// Output orientation.
    pub orientation: Orientation,
    /// Target narration duration in seconds.
    pub target_duration_secs: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            mode: PipelineMode::Standard,
            asr_model: AsrModel::Base,
            voice: "af_heart".to_string(),
            orientation: Orientation::Portrait,
            target_duration_secs: 45,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_strategy_names_round_trip() {
        for mode in [PipelineMode::Standard, PipelineMode::AudioFirst, PipelineMode::ForcedAlign] {
            assert_eq!(mode.strategy_name().parse::<PipelineMode>().unwrap(), mode);
        }
    }

    #[test]
    fn test_mode_parse_is_case_insensitive() {
        assert_eq!("Audio-First".parse::<PipelineMode>().unwrap(), PipelineMode::AudioFirst);
        assert!("phoneme".parse::<PipelineMode>().is_err());
    }

    #[test]
    fn test_asr_tiers_are_ordered() {
        assert!(AsrModel::Tiny < AsrModel::Large);
        assert_eq!(AsrModel::Base.next_tier(), AsrModel::Small);
        assert_eq!(AsrModel::Large.next_tier(), AsrModel::Large);
    }

    #[test]
    fn test_mode_serializes_kebab_case() {
        let json = serde_json::to_string(&PipelineMode::AudioFirst).unwrap();
        assert_eq!(json, "\"audio-first\"");
    }
}
