//! Integration tests for the quality-gated engine entry point.

mod common;

use std::sync::Arc;

use tempfile::TempDir;

use common::*;
use vgen_models::{AsrModel, AudioArtifact, PipelineMode};
use vgen_pipeline::{GateVerdict, PipelineRequest, ResolvedConfig, StageSet};

fn gated_engine(root: &std::path::Path, mutate: impl FnOnce(&mut ResolvedConfig)) -> vgen_pipeline::PipelineEngine {
    let mut config = ResolvedConfig {
        work_dir: root.to_path_buf(),
        ..Default::default()
    };
    mutate(&mut config);
    vgen_pipeline::PipelineEngine::new(
        StageSet {
            script: Arc::new(StubScript::default()),
            audio: Arc::new(StubAudio::default()),
            visuals: Arc::new(StubVisuals::default()),
            renderer: Arc::new(StubRenderer),
        },
        config,
    )
}

#[tokio::test]
async fn test_failing_rating_retries_with_escalated_settings() {
    let root = TempDir::new().unwrap();
    let engine = gated_engine(root.path(), |c| c.quality.max_retries = 1);
    let rater = QueuedRater::new(vec![rating(60, false), rating(82, true)]);

    let outcome = engine
        .run_with_quality_gate(PipelineRequest::new("escalation"), &rater)
        .await
        .unwrap();

    assert_eq!(outcome.verdict, GateVerdict::Passed);
    assert_eq!(outcome.attempts.len(), 2);

    // First attempt on default settings, second escalated.
    assert_eq!(outcome.attempts[0].settings.mode, PipelineMode::Standard);
    assert_eq!(outcome.attempts[1].settings.mode, PipelineMode::AudioFirst);
    assert_eq!(
        outcome.attempts[1].settings.asr_model,
        outcome.attempts[0].settings.asr_model.next_tier()
    );

    // The final result reflects attempt 2.
    assert_eq!(outcome.result.settings.mode, PipelineMode::AudioFirst);
    assert_eq!(outcome.rating.as_ref().unwrap().rating, 82);
}

#[tokio::test]
async fn test_exhausted_retries_returns_full_history() {
    let root = TempDir::new().unwrap();
    let engine = gated_engine(root.path(), |c| c.quality.max_retries = 2);
    let rater = QueuedRater::new(vec![rating(40, false), rating(45, false), rating(50, false)]);

    let outcome = engine
        .run_with_quality_gate(PipelineRequest::new("exhausted"), &rater)
        .await
        .unwrap();

    assert_eq!(outcome.verdict, GateVerdict::ExhaustedRetries);
    assert_eq!(outcome.attempts.len(), 3);
    assert!(!outcome.accepted());
    assert!(outcome.attempts.iter().all(|a| a.rating.is_some()));
    // The final result is still attempt 3's output.
    assert_eq!(outcome.rating.as_ref().unwrap().rating, 50);
}

#[tokio::test]
async fn test_disabled_gate_runs_once_without_rating() {
    let root = TempDir::new().unwrap();
    let engine = gated_engine(root.path(), |c| c.quality.enabled = false);
    // An empty queue proves the rater is never consulted.
    let rater = QueuedRater::new(vec![]);

    let outcome = engine
        .run_with_quality_gate(PipelineRequest::new("disabled"), &rater)
        .await
        .unwrap();

    assert_eq!(outcome.verdict, GateVerdict::Disabled);
    assert!(outcome.rating.is_none());
    assert_eq!(outcome.attempts.len(), 1);
    assert!(outcome.accepted());
}

#[tokio::test]
async fn test_external_audio_suppresses_retry() {
    let root = TempDir::new().unwrap();
    let engine = gated_engine(root.path(), |c| c.quality.max_retries = 5);

    let source_dir = TempDir::new().unwrap();
    let source_audio = source_dir.path().join("supplied.wav");
    tokio::fs::write(&source_audio, b"external").await.unwrap();

    let request = PipelineRequest::new("supplied narration").with_external_audio(
        AudioArtifact {
            audio_path: source_audio,
            duration_secs: 1.5,
            voice: "af_heart".to_string(),
            cost_usd: None,
        },
        test_timeline(),
    );

    let rater = QueuedRater::new(vec![rating(10, false)]);
    let outcome = engine.run_with_quality_gate(request, &rater).await.unwrap();

    // Even though auto_retry is on and retries remain, nothing can be
    // regenerated for supplied audio.
    assert_eq!(outcome.attempts.len(), 1);
    assert_eq!(outcome.verdict, GateVerdict::ExhaustedRetries);
}

#[tokio::test]
async fn test_sync_reports_persisted_per_attempt() {
    let root = TempDir::new().unwrap();
    let engine = gated_engine(root.path(), |c| c.quality.max_retries = 1);
    let rater = QueuedRater::new(vec![rating(60, false), rating(82, true)]);

    let outcome = engine
        .run_with_quality_gate(
            PipelineRequest::new("reports").with_keep_artifacts(true),
            &rater,
        )
        .await
        .unwrap();

    // Each attempt ran in its own working directory with its own report.
    assert!(outcome.attempts[0].output_path.parent().unwrap().join("sync_report_attempt_1.json").exists());
    assert!(outcome.result.work_dir.join("sync_report_attempt_2.json").exists());
    // The accepted attempt also carries the final report.
    assert!(outcome.result.work_dir.join("sync_report.json").exists());

    let content = tokio::fs::read_to_string(outcome.result.work_dir.join("sync_report.json"))
        .await
        .unwrap();
    let report: vgen_pipeline::SyncReport = serde_json::from_str(&content).unwrap();
    assert_eq!(report.strategy, "audio-first");
    assert_eq!(report.rating.rating, 82);
}

#[tokio::test]
async fn test_pipeline_failure_aborts_gate() {
    let root = TempDir::new().unwrap();
    let config = ResolvedConfig {
        work_dir: root.path().to_path_buf(),
        ..Default::default()
    };
    let engine = vgen_pipeline::PipelineEngine::new(
        StageSet {
            script: Arc::new(FailingScript),
            audio: Arc::new(StubAudio::default()),
            visuals: Arc::new(StubVisuals::default()),
            renderer: Arc::new(StubRenderer),
        },
        config,
    );

    let rater = QueuedRater::new(vec![rating(90, true)]);
    let err = engine
        .run_with_quality_gate(PipelineRequest::new("fails"), &rater)
        .await
        .unwrap_err();

    // A failed attempt is a pipeline error, not a failed rating.
    assert_eq!(err.stage_name(), Some(vgen_models::StageKind::Script));
}

#[tokio::test]
async fn test_gate_defaults_respect_asr_tiering() {
    // Escalating from the default Base tier lands on Small, not Large.
    let next = vgen_pipeline::escalate(&vgen_models::GenerationSettings::default());
    assert_eq!(next.asr_model, AsrModel::Small);
}
