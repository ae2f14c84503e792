//! Debug utility: runs the planning stages (beats -> cuts -> durations ->
//! image binding) and prints the result, without invoking ffmpeg. Useful
//! for tuning `--period`/`--strategy`/`--xfade` against a track before
//! committing to a full render.

use std::path::PathBuf;

use clap::Parser;

use retro_compositor::audio::{AnalyzerBeatSource, AudioAnalyzer, AudioLoader, BeatSource};
use retro_compositor::beats::BeatPreparer;
use retro_compositor::config::Config;
use retro_compositor::duration::DurationBuilder;
use retro_compositor::images::{DirectoryImageEnumerator, ImageBinder, ImageEnumerator};
use retro_compositor::planner::{Planner, PlannerParams, PeriodWindow};

#[derive(Parser)]
#[command(name = "plan-preview", about = "Preview a beat-aligned cut plan without encoding")]
struct Cli {
    audio_file: PathBuf,
    images_dir: PathBuf,

    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> retro_compositor::Result<()> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

    let cli = Cli::parse();
    let config = match cli.config {
        Some(path) => Config::from_file(&path)?,
        None => Config::default(),
    };

    let audio = AudioLoader::load(&cli.audio_file).await?;
    let beat_source = AnalyzerBeatSource::new(AudioAnalyzer::with_config(config.audio.to_analysis_config()));
    let raw_beats = beat_source.detect(&audio).await?;
    let beats = BeatPreparer::prepare(
        &raw_beats.times,
        config.planner.phase_s,
        Some(&raw_beats.onset_strength),
        Some(&raw_beats.is_downbeat),
    );

    let window = PeriodWindow::new(
        config.planner.period_min_s,
        config.planner.period_max_s,
        config.planner.target_s,
        config.planner.grace_s,
    )?;

    let params = PlannerParams {
        window,
        strategy: config.planner.strategy,
        strict: config.planner.strict,
        min_cut_gap_s: config.planner.min_cut_gap_s.max(2.0 * config.render.xfade_s + 0.05),
        audio_end_s: audio.duration,
    };

    let plan = Planner::plan(&beats, &params)?;
    let durations = DurationBuilder::build(&plan.durations(), config.render.fps, config.render.frame_quantize);

    let images = DirectoryImageEnumerator.enumerate(&cli.images_dir)?;
    let outcome = ImageBinder::bind(
        &images,
        durations.len(),
        config.image.shuffle,
        config.image.seed,
        config.image.loop_images,
    );

    println!("audio duration: {:.2}s", audio.duration);
    println!("beats prepared: {}", beats.len());
    println!("cuts planned:   {}", plan.cuts.len());
    println!("images bound:   {} (requested {})", outcome.segments_used, durations.len());
    println!();
    for (i, (cut, dur)) in plan.cuts.iter().zip(durations.iter()).enumerate() {
        let image = outcome.images.get(i).map(|p| p.display().to_string()).unwrap_or_default();
        println!(
            "  [{i:03}] t={:>8.3}s  dur={:>6.3}s  window={:?}  strategy={:?}  {image}",
            cut.time_s, dur, cut.window_used, cut.strategy_used
        );
    }

    Ok(())
}
