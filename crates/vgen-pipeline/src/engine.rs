//! Pipeline orchestration engine.
//!
//! Coordinates the four content-generation stages in fixed order, resolves
//! per-stage external-artifact bypasses, publishes lifecycle events, tracks
//! generated side-effect paths for cleanup, aggregates stage costs, and
//! wraps stage failures with the originating stage name.

use std::path::{Path, PathBuf};
use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use vgen_models::{
    GenerationSettings, NarrationBundle, PipelineEvent, PipelineId, RenderArtifact, ScriptArtifact,
    StageKind, VisualsArtifact,
};
use crate::cleanup::GeneratedPathSet;
use crate::config::ResolvedConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::events::EventBus;
use crate::persist::{self, SyncReport};
use crate::quality_gate::{self, GateOutcome, OutputRater, RatedArtifact};
use crate::request::{self, PipelineRequest};
use crate::stage::{ProgressFn, RenderOptions, RenderPhase, RenderProgressFn, StageInput, StageSet};

/// Elapsed wall-clock time of one stage.
#[derive(Debug, Clone)]
pub struct StageTiming {
    pub stage: StageKind,
    pub duration_secs: f64,
}

/// Result of a successful pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Identifier shared by every event of the run.
    pub pipeline_id: PipelineId,
    /// The run's working directory.
    pub work_dir: PathBuf,
    /// Settings the run executed with.
    pub settings: GenerationSettings,
    pub script: ScriptArtifact,
    pub narration: NarrationBundle,
    pub visuals: VisualsArtifact,
    pub render: RenderArtifact,
    /// Summed script + audio cost, present only when non-zero.
    pub total_cost_usd: Option<f64>,
    /// Wall-clock duration of the whole run in seconds.
    pub duration_secs: f64,
    /// Per-stage elapsed durations, mirroring the event stream.
    pub stage_timings: Vec<StageTiming>,
    /// Whether the narration was adopted from an external artifact.
    pub used_external_audio: bool,
}

impl RatedArtifact for PipelineOutput {
    fn artifact_path(&self) -> &Path {
        &self.render.video_path
    }
}

/// Per-run event emitter: the engine's shared bus plus the request's own
/// subscriber, if any.
#[derive(Clone)]
struct RunEmitter {
    bus: EventBus,
    extra: Option<mpsc::UnboundedSender<PipelineEvent>>,
}

impl RunEmitter {
    fn emit(&self, event: PipelineEvent) {
        if let Some(tx) = &self.extra {
            tx.send(event.clone()).ok();
        }
        self.bus.emit(event);
    }
}

/// The orchestration engine.
///
/// Holds no per-run state: every invocation owns its pipeline id, working
/// directory and path set, so independent runs may execute concurrently.
pub struct PipelineEngine {
    stages: StageSet,
    config: ResolvedConfig,
    events: EventBus,
}

impl PipelineEngine {
    /// Create an engine around the stage functions and a resolved
    /// configuration.
    pub fn new(stages: StageSet, config: ResolvedConfig) -> Self {
        Self {
            stages,
            config,
            events: EventBus::new(),
        }
    }

    /// Subscribe an observer to every run's events.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<PipelineEvent> {
        self.events.subscribe()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    /// Run the pipeline once.
    ///
    /// Stages execute strictly sequentially in the fixed order script →
    /// audio → visuals → render. On failure the wrapped stage error is the
    /// sole failure signal; ephemeral artifacts are cleaned up best-effort
    /// on both success and failure.
    pub async fn run(&self, request: PipelineRequest) -> PipelineResult<PipelineOutput> {
        request.validate()?;

        let id = PipelineId::new();
        let emitter = RunEmitter {
            bus: self.events.clone(),
            extra: request.subscriber.clone(),
        };
        let keep = request.keep_artifacts || self.config.keep_artifacts;
        let work_dir = self.config.work_dir.join(id.as_str());
        tokio::fs::create_dir_all(&work_dir).await?;

        let mut paths = GeneratedPathSet::new();
        let started = Instant::now();

        info!(pipeline_id = %id, topic = %request.topic, keep_artifacts = keep, "Starting pipeline run");
        emitter.emit(PipelineEvent::pipeline_started(&id, &request.topic));

        match self
            .run_stages(&id, &request, &work_dir, keep, &mut paths, &emitter)
            .await
        {
            Ok(mut output) => {
                output.duration_secs = started.elapsed().as_secs_f64();
                if !keep {
                    paths.remove_all().await;
                }
                emitter.emit(PipelineEvent::pipeline_completed(
                    &id,
                    output.duration_secs,
                    output.total_cost_usd,
                ));
                info!(
                    pipeline_id = %id,
                    duration_secs = output.duration_secs,
                    "Pipeline run completed"
                );
                Ok(output)
            }
            Err(e) => {
                emitter.emit(PipelineEvent::pipeline_failed(&id, e.to_string()));
                if !keep {
                    paths.remove_all().await;
                    // A failed run must not leave a partially written final
                    // output behind.
                    let partial = request::output_path(&work_dir);
                    if tokio::fs::remove_file(&partial).await.is_ok() {
                        debug!(path = ?partial, "Removed partial render output");
                    }
                }
                warn!(pipeline_id = %id, error = %e, "Pipeline run failed");
                Err(e)
            }
        }
    }

    async fn run_stages(
        &self,
        id: &PipelineId,
        request: &PipelineRequest,
        work_dir: &Path,
        keep: bool,
        paths: &mut GeneratedPathSet,
        emitter: &RunEmitter,
    ) -> PipelineResult<PipelineOutput> {
        let mut timings = Vec::new();

        let script = self
            .stage_script(id, request, work_dir, keep, emitter, &mut timings)
            .await?;
        let narration = self
            .stage_audio(id, request, &script, work_dir, keep, paths, emitter, &mut timings)
            .await?;
        let visuals = self
            .stage_visuals(id, request, &narration, work_dir, keep, emitter, &mut timings)
            .await?;
        let render = self
            .stage_render(id, request, &visuals, &narration, work_dir, keep, emitter, &mut timings)
            .await?;

        let cost = script.cost_usd.unwrap_or(0.0) + narration.audio.cost_usd.unwrap_or(0.0);
        let total_cost_usd = (cost > 0.0).then_some(cost);

        Ok(PipelineOutput {
            pipeline_id: id.clone(),
            work_dir: work_dir.to_path_buf(),
            settings: request.settings.clone(),
            script,
            narration,
            visuals,
            render,
            total_cost_usd,
            duration_secs: 0.0,
            stage_timings: timings,
            used_external_audio: request.uses_external_audio(),
        })
    }

    /// Shared stage epilogue: timing, events and stage-tagged wrapping.
    fn finish_stage<T>(
        &self,
        id: &PipelineId,
        stage: StageKind,
        started: Instant,
        cost_usd: Option<f64>,
        emitter: &RunEmitter,
        timings: &mut Vec<StageTiming>,
        result: PipelineResult<T>,
    ) -> PipelineResult<T> {
        let elapsed = started.elapsed().as_secs_f64();
        match result {
            Ok(value) => {
                timings.push(StageTiming {
                    stage,
                    duration_secs: elapsed,
                });
                emitter.emit(PipelineEvent::stage_completed(id, stage, elapsed, cost_usd));
                Ok(value)
            }
            Err(e) => {
                let wrapped = PipelineError::for_stage(stage, e);
                emitter.emit(PipelineEvent::stage_failed(id, stage, wrapped.to_string()));
                Err(wrapped)
            }
        }
    }

    async fn stage_script(
        &self,
        id: &PipelineId,
        request: &PipelineRequest,
        work_dir: &Path,
        keep: bool,
        emitter: &RunEmitter,
        timings: &mut Vec<StageTiming>,
    ) -> PipelineResult<ScriptArtifact> {
        const STAGE: StageKind = StageKind::Script;
        emitter.emit(PipelineEvent::stage_started(id, STAGE));
        let started = Instant::now();

        let result = match StageInput::from_option(request.external_script.clone()) {
            StageInput::UseExternal(artifact) => {
                debug!(pipeline_id = %id, "Adopting external script artifact");
                Ok(artifact)
            }
            StageInput::Produce => {
                self.stages
                    .script
                    .generate(
                        &request.topic,
                        &request.archetype,
                        request.settings.target_duration_secs,
                        request.research_context.as_deref(),
                    )
                    .await
            }
        };
        let result = match result {
            Ok(artifact) if keep => persist::write_json(work_dir, persist::SCRIPT_FILE, &artifact)
                .await
                .map(|_| artifact),
            other => other,
        };

        let cost_usd = result.as_ref().ok().and_then(|a| a.cost_usd);
        self.finish_stage(id, STAGE, started, cost_usd, emitter, timings, result)
    }

    #[allow(clippy::too_many_arguments)]
    async fn stage_audio(
        &self,
        id: &PipelineId,
        request: &PipelineRequest,
        script: &ScriptArtifact,
        work_dir: &Path,
        keep: bool,
        paths: &mut GeneratedPathSet,
        emitter: &RunEmitter,
        timings: &mut Vec<StageTiming>,
    ) -> PipelineResult<NarrationBundle> {
        const STAGE: StageKind = StageKind::Audio;
        emitter.emit(PipelineEvent::stage_started(id, STAGE));
        let started = Instant::now();

        let audio_path = request::narration_path(work_dir);
        let timestamps_path = request::timestamps_path(work_dir);

        let external = match (request.external_audio.clone(), request.external_timeline.clone()) {
            (Some(audio), Some(timeline)) => StageInput::UseExternal(NarrationBundle { audio, timeline }),
            _ => StageInput::Produce,
        };

        let result = match external {
            StageInput::UseExternal(mut bundle) => {
                debug!(pipeline_id = %id, "Adopting external audio artifact, skipping synthesis");
                if keep {
                    // Copy the supplied narration into the run directory so a
                    // retained run is self-contained.
                    match tokio::fs::copy(&bundle.audio.audio_path, &audio_path).await {
                        Ok(_) => {
                            bundle.audio.audio_path = audio_path.clone();
                            Ok(bundle)
                        }
                        Err(e) => Err(PipelineError::not_found(format!(
                            "external audio {} could not be copied: {e}",
                            bundle.audio.audio_path.display()
                        ))),
                    }
                } else {
                    Ok(bundle)
                }
            }
            StageInput::Produce => {
                let options = request.effective_sync_options(&self.config.sync_defaults());
                let produced = self
                    .stages
                    .audio
                    .synthesize(
                        script,
                        &request.settings.voice,
                        &audio_path,
                        &timestamps_path,
                        &options,
                    )
                    .await;
                if produced.is_ok() {
                    paths.insert(&audio_path);
                    paths.insert(&timestamps_path);
                }
                produced.map(|(audio, timeline)| NarrationBundle { audio, timeline })
            }
        };
        let result = match result {
            Ok(bundle) if keep => persist::write_json(work_dir, persist::AUDIO_FILE, &bundle)
                .await
                .map(|_| bundle),
            other => other,
        };

        let cost_usd = result.as_ref().ok().and_then(|b| b.audio.cost_usd);
        self.finish_stage(id, STAGE, started, cost_usd, emitter, timings, result)
    }

    async fn stage_visuals(
        &self,
        id: &PipelineId,
        request: &PipelineRequest,
        narration: &NarrationBundle,
        work_dir: &Path,
        keep: bool,
        emitter: &RunEmitter,
        timings: &mut Vec<StageTiming>,
    ) -> PipelineResult<VisualsArtifact> {
        const STAGE: StageKind = StageKind::Visuals;
        emitter.emit(PipelineEvent::stage_started(id, STAGE));
        let started = Instant::now();

        let result = match StageInput::from_option(request.external_visuals.clone()) {
            StageInput::UseExternal(artifact) => {
                debug!(pipeline_id = %id, "Adopting external visuals artifact");
                Ok(artifact)
            }
            StageInput::Produce => {
                let progress_emitter = emitter.clone();
                let progress_id = id.clone();
                let on_progress = move |p: f64| {
                    let stage_p = p.clamp(0.0, 1.0);
                    progress_emitter.emit(PipelineEvent::stage_progress(
                        &progress_id,
                        STAGE,
                        stage_p,
                        (STAGE.index() as f64 + stage_p) / f64::from(vgen_models::STAGE_COUNT),
                        None,
                    ));
                };
                let on_progress: &ProgressFn = &on_progress;
                self.stages
                    .visuals
                    .match_visuals(
                        &narration.timeline,
                        &request.provider_preferences,
                        request.settings.orientation,
                        Some(on_progress),
                    )
                    .await
            }
        };
        let result = match result {
            Ok(artifact) if keep => persist::write_json(work_dir, persist::VISUALS_FILE, &artifact)
                .await
                .map(|_| artifact),
            other => other,
        };

        self.finish_stage(id, STAGE, started, None, emitter, timings, result)
    }

    #[allow(clippy::too_many_arguments)]
    async fn stage_render(
        &self,
        id: &PipelineId,
        request: &PipelineRequest,
        visuals: &VisualsArtifact,
        narration: &NarrationBundle,
        work_dir: &Path,
        keep: bool,
        emitter: &RunEmitter,
        timings: &mut Vec<StageTiming>,
    ) -> PipelineResult<RenderArtifact> {
        const STAGE: StageKind = StageKind::Render;
        emitter.emit(PipelineEvent::stage_started(id, STAGE));
        let started = Instant::now();

        let options = RenderOptions {
            output_path: request::output_path(work_dir),
            orientation: request.settings.orientation,
            burn_captions: true,
        };

        let progress_emitter = emitter.clone();
        let progress_id = id.clone();
        let on_progress = move |phase: RenderPhase, p: f64| {
            let stage_p = phase.stage_progress(p);
            progress_emitter.emit(PipelineEvent::stage_progress(
                &progress_id,
                STAGE,
                stage_p,
                (STAGE.index() as f64 + stage_p) / f64::from(vgen_models::STAGE_COUNT),
                Some(phase.label().to_string()),
            ));
        };
        let on_progress: &RenderProgressFn = &on_progress;

        let result = self
            .stages
            .renderer
            .render(visuals, narration, &options, Some(on_progress))
            .await;
        let result = match result {
            Ok(artifact) if keep => persist::write_json(work_dir, persist::RENDER_FILE, &artifact)
                .await
                .map(|_| artifact),
            other => other,
        };

        self.finish_stage(id, STAGE, started, None, emitter, timings, result)
    }

    /// Run the pipeline under the configured quality gate.
    ///
    /// Attempts the pipeline, rates the rendered output with `rater`, and
    /// retries with escalated settings while the gate allows it. When
    /// retention is on, a sync report is written per attempt plus a final
    /// `sync_report.json` for the accepted attempt.
    pub async fn run_with_quality_gate(
        &self,
        request: PipelineRequest,
        rater: &dyn OutputRater,
    ) -> PipelineResult<GateOutcome<PipelineOutput>> {
        let gate = self.config.gate_config();
        let used_external_audio = request.uses_external_audio();
        let keep = request.keep_artifacts || self.config.keep_artifacts;
        let initial_settings = request.settings.clone();

        let outcome = quality_gate::run_with_quality_gate(
            initial_settings,
            &gate,
            used_external_audio,
            |settings, _attempt| {
                let mut attempt_request = request.clone();
                attempt_request.settings = settings;
                self.run(attempt_request)
            },
            |output: PipelineOutput, attempt| async move {
                let rating = rater
                    .rate(&output.render.video_path, &output.narration.timeline)
                    .await?;
                if keep {
                    let report = SyncReport {
                        attempt,
                        strategy: output.settings.mode.strategy_name().to_string(),
                        source: output.narration.timeline.source,
                        rating: rating.clone(),
                    };
                    persist::write_json(
                        &output.work_dir,
                        &persist::sync_report_file(Some(attempt)),
                        &report,
                    )
                    .await?;
                }
                Ok(rating)
            },
        )
        .await?;

        if keep {
            if let Some(rating) = &outcome.rating {
                let report = SyncReport {
                    attempt: outcome.attempts.len() as u32,
                    strategy: outcome.result.settings.mode.strategy_name().to_string(),
                    source: outcome.result.narration.timeline.source,
                    rating: rating.clone(),
                };
                persist::write_json(
                    &outcome.result.work_dir,
                    &persist::sync_report_file(None),
                    &report,
                )
                .await?;
            }
        }

        Ok(outcome)
    }
}
