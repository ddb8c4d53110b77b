//! Audio-sync subsystem: timestamp strategies, reconciliation and quality rating.
//!
//! This crate derives word-level timestamps for an audio+script pair through
//! pluggable strategies, repairs ASR transcription errors by realigning
//! recognized words to the canonical script, and re-analyzes rendered output
//! to rate how well audio and captions stay in sync.

pub mod align;
pub mod error;
pub mod estimate;
pub mod media;
pub mod rater;
pub mod reconcile;
pub mod strategy;
pub mod transcribe;

pub use align::{AeneasAligner, ForcedAligner};
pub use error::{SyncError, SyncResult};
pub use estimate::estimate_timeline;
pub use rater::{CaptionFrame, CaptionSampler, RaterConfig, RatingWeights, SyncQualityRater};
pub use reconcile::{reconcile, similarity, ReconcileConfig};
pub use strategy::{StrategyFactory, StrategyOptions, TimestampStrategy, REGISTERED_STRATEGIES};
pub use transcribe::{Transcriber, WhisperCli};
