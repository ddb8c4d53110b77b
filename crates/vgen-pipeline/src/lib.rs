//! Pipeline orchestration engine for short-form video generation.
//!
//! The engine sequences four content-generation stages (script, audio,
//! visuals, render), lets any stage be bypassed by an externally supplied
//! artifact, publishes typed lifecycle events to observers, tracks generated
//! paths for best-effort cleanup, and hosts a bounded escalating-retry loop
//! gated on a recomputed audio-sync quality score.

pub mod cleanup;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod logging;
pub mod persist;
pub mod quality_gate;
pub mod request;
pub mod stage;

pub use cleanup::GeneratedPathSet;
pub use config::{load_config, ConfigOverrides, QualitySettings, ResolvedConfig, SyncSettings};
pub use engine::{PipelineEngine, PipelineOutput, StageTiming};
pub use error::{PipelineError, PipelineResult};
pub use events::EventBus;
pub use logging::init_logging;
pub use persist::SyncReport;
pub use quality_gate::{
    escalate, run_with_quality_gate, AttemptRecord, GateOutcome, GateVerdict, OutputRater,
    QualityGateConfig, RatedArtifact,
};
pub use request::{PipelineRequest, SyncOptions};
pub use stage::{
    AudioSynthesizer, RenderOptions, RenderPhase, ScriptGenerator, StageInput, StageSet,
    VideoRenderer, VisualMatcher,
};
