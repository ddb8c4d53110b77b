//! Integration tests for the pipeline engine: event sequences, stage
//! bypass, cleanup and cost aggregation.

mod common;

use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use tempfile::TempDir;

use common::*;
use vgen_models::{AudioArtifact, PipelineEventKind, StageKind};
use vgen_pipeline::{PipelineRequest, StageSet};

fn count_kind(events: &[vgen_models::PipelineEvent], pred: impl Fn(&PipelineEventKind) -> bool) -> usize {
    events.iter().filter(|e| pred(&e.kind)).count()
}

#[tokio::test]
async fn test_successful_run_event_sequence() {
    let root = TempDir::new().unwrap();
    let engine = make_engine(root.path());
    let mut rx = engine.subscribe();

    let output = engine.run(PipelineRequest::new("rust traits")).await.unwrap();
    let events = drain(&mut rx);

    assert_eq!(count_kind(&events, |k| matches!(k, PipelineEventKind::PipelineStarted { .. })), 1);
    assert_eq!(count_kind(&events, |k| matches!(k, PipelineEventKind::PipelineCompleted { .. })), 1);
    assert_eq!(count_kind(&events, |k| matches!(k, PipelineEventKind::PipelineFailed { .. })), 0);
    assert_eq!(count_kind(&events, |k| matches!(k, PipelineEventKind::StageStarted { .. })), 4);
    assert_eq!(count_kind(&events, |k| matches!(k, PipelineEventKind::StageCompleted { .. })), 4);
    assert_eq!(count_kind(&events, |k| matches!(k, PipelineEventKind::StageFailed { .. })), 0);

    // Every event of the run shares the pipeline id.
    for event in &events {
        assert_eq!(event.pipeline_id, output.pipeline_id);
    }

    // Each stage's started event precedes its completed event, in canonical
    // stage order.
    let started: Vec<StageKind> = events
        .iter()
        .filter_map(|e| match e.kind {
            PipelineEventKind::StageStarted { stage, .. } => Some(stage),
            _ => None,
        })
        .collect();
    assert_eq!(started, StageKind::all().to_vec());

    // The final event is terminal.
    assert!(events.last().unwrap().is_terminal());
}

#[tokio::test]
async fn test_script_failure_short_circuits() {
    let root = TempDir::new().unwrap();
    let engine = make_engine_with(
        root.path(),
        StageSet {
            script: Arc::new(FailingScript),
            audio: Arc::new(StubAudio::default()),
            visuals: Arc::new(StubVisuals::default()),
            renderer: Arc::new(StubRenderer),
        },
    );
    let mut rx = engine.subscribe();

    let err = engine.run(PipelineRequest::new("doomed")).await.unwrap_err();
    assert_eq!(err.stage_name(), Some(StageKind::Script));

    let events = drain(&mut rx);
    // Only the script stage was attempted.
    assert_eq!(count_kind(&events, |k| matches!(k, PipelineEventKind::StageStarted { .. })), 1);
    assert_eq!(
        count_kind(&events, |k| matches!(k, PipelineEventKind::StageFailed { stage: StageKind::Script, .. })),
        1
    );
    assert_eq!(count_kind(&events, |k| matches!(k, PipelineEventKind::PipelineFailed { .. })), 1);
    assert_eq!(count_kind(&events, |k| matches!(k, PipelineEventKind::PipelineCompleted { .. })), 0);

    // No cost was accumulated for a run that never produced artifacts.
    assert!(!events.iter().any(|e| matches!(
        e.kind,
        PipelineEventKind::StageCompleted { cost_usd: Some(_), .. }
    )));
}

#[tokio::test]
async fn test_progress_values_clamped() {
    let root = TempDir::new().unwrap();
    let engine = make_engine_with(
        root.path(),
        StageSet {
            script: Arc::new(StubScript::default()),
            audio: Arc::new(StubAudio::default()),
            visuals: Arc::new(StubVisuals { bogus_progress: true, fail: false }),
            renderer: Arc::new(StubRenderer),
        },
    );
    let mut rx = engine.subscribe();

    engine.run(PipelineRequest::new("progress")).await.unwrap();

    let events = drain(&mut rx);
    let mut saw_progress = false;
    for event in events {
        if let PipelineEventKind::StageProgress { progress, overall, .. } = event.kind {
            saw_progress = true;
            assert!((0.0..=1.0).contains(&progress), "progress {progress} out of range");
            assert!((0.0..=1.0).contains(&overall), "overall {overall} out of range");
        }
    }
    assert!(saw_progress);
}

#[tokio::test]
async fn test_render_progress_subdivided_by_phase() {
    let root = TempDir::new().unwrap();
    let engine = make_engine(root.path());
    let mut rx = engine.subscribe();

    engine.run(PipelineRequest::new("phases")).await.unwrap();

    let render_progress: Vec<f64> = drain(&mut rx)
        .into_iter()
        .filter_map(|e| match e.kind {
            PipelineEventKind::StageProgress { stage: StageKind::Render, progress, .. } => Some(progress),
            _ => None,
        })
        .collect();

    // Bundle end, selection end, encode midpoint, encode end.
    let expected = [0.1, 0.3, 0.65, 1.0];
    assert_eq!(render_progress.len(), expected.len());
    for (got, want) in render_progress.iter().zip(expected) {
        assert!((got - want).abs() < 1e-9, "got {got}, want {want}");
    }
}

#[tokio::test]
async fn test_cleanup_after_failure_removes_generated_paths() {
    let root = TempDir::new().unwrap();
    let engine = make_engine_with(
        root.path(),
        StageSet {
            script: Arc::new(StubScript::default()),
            audio: Arc::new(StubAudio::default()),
            visuals: Arc::new(StubVisuals { bogus_progress: false, fail: true }),
            renderer: Arc::new(StubRenderer),
        },
    );

    let err = engine.run(PipelineRequest::new("cleanup")).await.unwrap_err();
    assert_eq!(err.stage_name(), Some(StageKind::Visuals));

    // The audio stage ran and wrote narration + timestamps; both must be
    // gone after the failed run.
    let mut leftovers = Vec::new();
    let mut dirs = tokio::fs::read_dir(root.path()).await.unwrap();
    while let Some(entry) = dirs.next_entry().await.unwrap() {
        let mut files = tokio::fs::read_dir(entry.path()).await.unwrap();
        while let Some(file) = files.next_entry().await.unwrap() {
            leftovers.push(file.path());
        }
    }
    assert!(leftovers.is_empty(), "leftover files after cleanup: {leftovers:?}");
}

#[tokio::test]
async fn test_retention_keeps_all_artifact_documents() {
    let root = TempDir::new().unwrap();
    let engine = make_engine(root.path());

    let output = engine
        .run(PipelineRequest::new("keep me").with_keep_artifacts(true))
        .await
        .unwrap();

    for file in ["script.json", "audio.json", "visuals.json", "render.json", "narration.wav", "timestamps.json", "output.mp4"] {
        assert!(output.work_dir.join(file).exists(), "missing {file}");
    }
}

#[tokio::test]
async fn test_external_audio_bypasses_synthesis_but_script_still_runs() {
    let root = TempDir::new().unwrap();
    let audio_stub = StubAudio::default();
    let called = Arc::clone(&audio_stub.called);
    let engine = make_engine_with(
        root.path(),
        StageSet {
            script: Arc::new(StubScript::default()),
            audio: Arc::new(audio_stub),
            visuals: Arc::new(StubVisuals::default()),
            renderer: Arc::new(StubRenderer),
        },
    );

    // The externally produced narration lives outside the run directory.
    let source_dir = TempDir::new().unwrap();
    let source_audio = source_dir.path().join("narration.wav");
    tokio::fs::write(&source_audio, b"external-wav").await.unwrap();

    let request = PipelineRequest::new("external narration")
        .with_external_audio(
            AudioArtifact {
                audio_path: source_audio.clone(),
                duration_secs: 1.5,
                voice: "af_heart".to_string(),
                cost_usd: None,
            },
            test_timeline(),
        )
        .with_keep_artifacts(true);

    let output = engine.run(request).await.unwrap();

    assert!(!called.load(Ordering::SeqCst), "synthesis must be skipped");
    assert!(output.used_external_audio);
    // The supplied file was copied into the run directory.
    assert!(output.work_dir.join("narration.wav").exists());
    assert_eq!(output.narration.audio.audio_path, output.work_dir.join("narration.wav"));
    // The script stage still ran to provide narrative metadata.
    assert_eq!(output.script.title, "external narration");
}

#[tokio::test]
async fn test_external_audio_without_timeline_is_invalid() {
    let root = TempDir::new().unwrap();
    let engine = make_engine(root.path());

    let mut request = PipelineRequest::new("invalid");
    request.external_audio = Some(AudioArtifact {
        audio_path: PathBuf::from("/tmp/somewhere.wav"),
        duration_secs: 1.0,
        voice: "af_heart".to_string(),
        cost_usd: None,
    });

    let err = engine.run(request).await.unwrap_err();
    assert!(err.to_string().contains("matching timestamps"));
}

#[tokio::test]
async fn test_cost_aggregation() {
    let root = TempDir::new().unwrap();
    let engine = make_engine(root.path());
    let output = engine.run(PipelineRequest::new("costs")).await.unwrap();
    // Script 0.002 + audio 0.01.
    assert!((output.total_cost_usd.unwrap() - 0.012).abs() < 1e-9);

    // With no reported stage costs the total is absent, not zero.
    let engine = make_engine_with(
        root.path(),
        StageSet {
            script: Arc::new(StubScript { cost_usd: None }),
            audio: Arc::new(StubAudio { cost_usd: None, ..Default::default() }),
            visuals: Arc::new(StubVisuals::default()),
            renderer: Arc::new(StubRenderer),
        },
    );
    let output = engine.run(PipelineRequest::new("free")).await.unwrap();
    assert!(output.total_cost_usd.is_none());
}

#[tokio::test]
async fn test_concurrent_runs_have_distinct_ids() {
    let root = TempDir::new().unwrap();
    let engine = make_engine(root.path());

    let (a, b) = tokio::join!(
        engine.run(PipelineRequest::new("run a")),
        engine.run(PipelineRequest::new("run b")),
    );
    let (a, b) = (a.unwrap(), b.unwrap());
    assert_ne!(a.pipeline_id, b.pipeline_id);
    assert_ne!(a.work_dir, b.work_dir);
}

#[tokio::test]
async fn test_request_subscriber_receives_run_events() {
    let root = TempDir::new().unwrap();
    let engine = make_engine(root.path());

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let request = PipelineRequest::new("subscriber").with_subscriber(tx);
    engine.run(request).await.unwrap();

    let events = drain(&mut rx);
    assert!(events.iter().any(|e| matches!(e.kind, PipelineEventKind::PipelineCompleted { .. })));
}

#[tokio::test]
async fn test_stage_timings_cover_all_stages() {
    let root = TempDir::new().unwrap();
    let engine = make_engine(root.path());
    let output = engine.run(PipelineRequest::new("timings")).await.unwrap();

    let stages: Vec<StageKind> = output.stage_timings.iter().map(|t| t.stage).collect();
    assert_eq!(stages, StageKind::all().to_vec());
}
