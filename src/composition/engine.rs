//! End-to-end orchestration: audio -> beats -> plan -> durations -> images
//! -> filter graph -> overlay events -> plan document -> encoder.
//!
//! Replaces a probabilistic cut-selection heuristic entirely with the
//! deterministic pipeline above; the `info!`/`debug!`/`warn!` cadence at
//! each stage boundary follows a step-numbered logging style.

use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::audio::{AnalyzerBeatSource, AudioAnalyzer, AudioLoader, BeatSource};
use crate::beats::BeatPreparer;
use crate::config::Config;
use crate::duration::DurationBuilder;
use crate::encoder::{self, Encoder};
use crate::error::{ImageError, Result};
use crate::graph::render_spec::RenderSpec;
use crate::graph::GraphBuilder;
use crate::images::{DirectoryImageEnumerator, ImageBinder, ImageEnumerator};
use crate::overlay::OverlayComposer;
use crate::plan_io::{CutRecord, EffectiveParamsSnapshot, PlanDocument, PlanIo, SCHEMA_VERSION};
use crate::planner::{Planner, PlannerParams, PeriodWindow};
use crate::workdir::Workdir;

/// Coordinates a single render from source audio + image directory to
/// encoded output. `--plan-in` reuse and `--no-audio` output are controlled
/// by the fields of [`RenderRequest`] rather than extra `compose()` args,
/// following a single `Config` + flattened CLI-group style.
pub struct CompositionEngine {
    config: Config,
    beat_source: Box<dyn BeatSource>,
}

/// Per-invocation knobs that vary across runs of the same `Config` (paths,
/// plan reuse, audio muting) — kept separate from `Config` because they are
/// positional/one-shot CLI arguments, not persisted settings.
pub struct RenderRequest {
    pub audio_path: PathBuf,
    pub images_dir: PathBuf,
    pub output_path: PathBuf,
    pub plan_in: Option<PathBuf>,
    pub plan_out: Option<PathBuf>,
    pub no_audio: bool,
    /// Overrides the detected audio duration (`--audio-end`).
    pub audio_end_override: Option<f64>,
    /// Caps the render to this many seconds (`--max-seconds`).
    pub max_seconds: Option<f64>,
}

impl CompositionEngine {
    pub fn new(config: Config) -> Self {
        let analyzer = AudioAnalyzer::with_config(config.audio.to_analysis_config());
        Self {
            beat_source: Box::new(AnalyzerBeatSource::new(analyzer)),
            config,
        }
    }

    /// Overrides the beat-detection collaborator; used by tests and by
    /// callers re-rendering from a frozen `--plan-in` plan.
    pub fn with_beat_source(mut self, beat_source: Box<dyn BeatSource>) -> Self {
        self.beat_source = beat_source;
        self
    }

    pub async fn compose(&self, request: &RenderRequest) -> Result<()> {
        info!(
            audio = ?request.audio_path,
            images = ?request.images_dir,
            output = ?request.output_path,
            "starting composition"
        );

        let workdir = Workdir::create(self.config.io.workdir.clone(), self.config.io.keep_workdir_on_failure)?;

        let result = self.compose_inner(request, &workdir).await;
        let cancelled = matches!(
            result,
            Err(crate::error::CompositorError::Encoder(crate::error::EncoderError::Cancelled))
        );
        if cancelled {
            workdir.finish_cancelled();
        } else {
            workdir.finish(result.is_ok());
        }
        result
    }

    async fn compose_inner(&self, request: &RenderRequest, workdir: &Workdir) -> Result<()> {
        let plan_doc = if let Some(plan_in) = &request.plan_in {
            info!(path = ?plan_in, "reusing frozen plan");
            let mut doc = PlanIo::load(plan_in)?;
            let enumerator = DirectoryImageEnumerator;
            let current_images = enumerator.enumerate(&request.images_dir)?;
            PlanIo::rebind_missing_images(&mut doc, &current_images);
            doc
        } else {
            self.plan(request, workdir).await?
        };

        if let Some(plan_out) = &request.plan_out {
            PlanIo::save(&plan_doc, plan_out)?;
            info!(path = ?plan_out, "plan document written");
        }
        PlanIo::save(&plan_doc, &workdir.plan_path())?;

        let render_spec = RenderSpec {
            mode: self.config.render.mode,
            transition: self.config.render.transition,
            xfade_s: self.config.render.xfade_s,
            xfade_min_s: self.config.render.xfade_min_s,
            align: self.config.render.align,
            overlay_events: Vec::new(),
            fps: plan_doc.fps,
            width: plan_doc.width,
            height: plan_doc.height,
            cut_marker: self
                .config
                .overlay
                .cut_markers
                .then_some(crate::graph::transitions::FallbackMarker::WhitePop),
        };

        let transition_landings: Vec<f64> = if render_spec.mode == crate::graph::render_spec::RenderMode::Crossfade {
            render_spec
                .plan_boundaries(&plan_doc.durations_s)
                .unwrap_or_default()
                .into_iter()
                .filter(|b| b.safe)
                .map(|b| b.offset_s + self.config.render.xfade_s)
                .collect()
        } else {
            Vec::new()
        };

        let beats = BeatPreparer::prepare(&plan_doc.beats, 0.0, None, None);
        let overlay_events = OverlayComposer::compose(
            &beats,
            plan_doc.durations_s.iter().sum(),
            &transition_landings,
            &self.config.overlay,
        );

        let mut render_spec = render_spec;
        render_spec.overlay_events = overlay_events;

        let render_images = if self.config.io.preprocess_images {
            encoder::preprocess_images(&plan_doc.images, workdir, render_spec.width, render_spec.height)?
        } else {
            plan_doc.images.clone()
        };

        let graph = GraphBuilder::build(&render_images, &plan_doc.durations_s, &render_spec)?;
        workdir.write_graph(&graph.filter_complex)?;

        if request.no_audio {
            info!("--no-audio set, skipping encode step");
            return Ok(());
        }

        let encoder = Encoder::new(self.config.io.encoder_timeout_s);
        let encoded = encoder
            .encode(&graph, &request.audio_path, &request.output_path, render_spec.fps)
            .await?;

        info!(
            bytes = encoded.file_size,
            duration_s = encoded.duration_s,
            path = ?encoded.path,
            "composition complete"
        );

        Ok(())
    }

    async fn plan(&self, request: &RenderRequest, workdir: &Workdir) -> Result<PlanDocument> {
        debug!(path = ?request.audio_path, "loading audio");
        let audio = AudioLoader::load(&request.audio_path).await?;

        let raw_beats = self.beat_source.detect(&audio).await?;
        let beats = BeatPreparer::prepare(
            &raw_beats.times,
            self.config.planner.phase_s,
            Some(&raw_beats.onset_strength),
            Some(&raw_beats.is_downbeat),
        );
        workdir.write_beats(beats.times())?;

        let planner_cfg = &self.config.planner;
        let window = PeriodWindow::new(
            planner_cfg.period_min_s,
            planner_cfg.period_max_s,
            planner_cfg.target_s,
            planner_cfg.grace_s,
        )?;

        let min_cut_gap_s = planner_cfg
            .min_cut_gap_s
            .max(2.0 * self.config.render.xfade_s + 0.05);

        let mut audio_end_s = request.audio_end_override.unwrap_or(audio.duration);
        if let Some(max_seconds) = request.max_seconds {
            audio_end_s = audio_end_s.min(max_seconds);
        }

        let params = PlannerParams {
            window,
            strategy: planner_cfg.strategy,
            strict: planner_cfg.strict,
            min_cut_gap_s,
            audio_end_s,
        };

        let plan = Planner::plan(&beats, &params)?;
        info!(cuts = plan.cuts.len(), "planner produced cuts");

        let mut durations = plan.durations();
        durations = DurationBuilder::build(&durations, self.config.render.fps, self.config.render.frame_quantize);

        let enumerator = DirectoryImageEnumerator;
        let images = enumerator.enumerate(&request.images_dir)?;

        let outcome = ImageBinder::bind(
            &images,
            durations.len(),
            self.config.image.shuffle,
            self.config.image.seed,
            self.config.image.loop_images,
        );

        let mut cuts = plan.cuts;
        if outcome.segments_used < durations.len() {
            warn!(
                requested = durations.len(),
                usable = outcome.segments_used,
                "image supply shorter than plan, truncating trailing segments"
            );
            cuts.truncate(outcome.segments_used);
            durations.truncate(outcome.segments_used);
            if let (Some(last_duration), Some(last_cut)) = (durations.last_mut(), cuts.last()) {
                *last_duration = audio_end_s - last_cut.time_s;
            }
        }
        if outcome.images.is_empty() {
            return Err(ImageError::NoImagesFound {
                path: request.images_dir.display().to_string(),
            }
            .into());
        }

        let cut_records: Vec<CutRecord> = cuts
            .iter()
            .map(|c| CutRecord {
                time_s: c.time_s,
                beat_index: c.beat_index,
                window_used: c.window_used,
                strategy_used: c.strategy_used,
            })
            .collect();

        Ok(PlanDocument {
            schema_version: SCHEMA_VERSION,
            params: EffectiveParamsSnapshot {
                period_min_s: planner_cfg.period_min_s,
                period_max_s: planner_cfg.period_max_s,
                target_s: planner_cfg.target_s,
                grace_s: planner_cfg.grace_s,
                min_cut_gap_s,
                phase_s: self.config.planner.phase_s,
                strict: planner_cfg.strict,
                strategy: planner_cfg.strategy,
                hardcuts: matches!(
                    self.config.render.mode,
                    crate::graph::render_spec::RenderMode::Hardcut
                ),
                transition: format!("{:?}", self.config.render.transition),
                xfade_s: self.config.render.xfade_s,
                xfade_min_s: self.config.render.xfade_min_s,
                align: format!("{:?}", self.config.render.align),
                frame_quantize: format!("{:?}", self.config.render.frame_quantize),
                seed: self.config.image.seed,
                shuffle: self.config.image.shuffle,
                image_loop: self.config.image.loop_images,
            },
            beats: beats.times().to_vec(),
            cuts: cut_records,
            durations_s: durations,
            images: outcome.images,
            fps: self.config.render.fps,
            width: self.config.render.width,
            height: self.config.render.height,
        })
    }
}

