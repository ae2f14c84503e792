use std::collections::HashSet;
use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use retro_compositor::composition::{CompositionEngine, RenderRequest};
use retro_compositor::config::{Config, Preset};
use retro_compositor::duration::FrameQuantizeMode;
use retro_compositor::graph::render_spec::Alignment;
use retro_compositor::graph::transitions::Transition;
use retro_compositor::overlay::{CounterPosition, MaskScope};
use retro_compositor::planner::Strategy;

#[derive(Parser)]
#[command(
    name = "retro-compositor",
    version,
    about = "Cuts a still-image slideshow to the beat of a music track",
    long_about = "Retro-Compositor analyzes a music track for beats, plans a \
beat-aligned sequence of image cuts, and renders the result with ffmpeg \
crossfades and beat-synchronized overlays."
)]
struct Cli {
    /// Audio file path (WAV, MP3, FLAC)
    audio_file: PathBuf,

    /// Directory of source images
    images_dir: PathBuf,

    #[command(flatten)]
    planning: PlanningArgs,

    #[command(flatten)]
    rendering: RenderingArgs,

    #[command(flatten)]
    overlays: OverlayArgs,

    #[command(flatten)]
    images: ImageArgs,

    #[command(flatten)]
    io: IoArgs,

    /// Apply a named preset; only fills values left at their default
    #[arg(long, value_enum)]
    preset: Option<Preset>,

    /// Configuration file (optional, layered under CLI flags)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable verbose (debug-level) logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(clap::Args)]
struct PlanningArgs {
    /// Admissible cut window [min, max] seconds after the previous cut
    #[arg(long, num_args = 2, value_names = ["MIN", "MAX"])]
    period: Option<Vec<f64>>,

    /// Preferred target time within the window
    #[arg(long)]
    target: Option<f64>,

    /// One-time symmetric window expansion when strict selection fails
    #[arg(long)]
    grace: Option<f64>,

    /// Minimum spacing enforced between consecutive cuts
    #[arg(long)]
    min_gap: Option<f64>,

    /// Phase shift applied to all beats before planning
    #[arg(long, default_value_t = 0.0)]
    phase: f64,

    /// Beat-selection strategy
    #[arg(long, value_enum)]
    strategy: Option<Strategy>,

    /// Fail instead of falling back outside the window when strict+grace miss
    #[arg(long)]
    strict: bool,

    /// Bypass windowing: every beat above the gap floor becomes a cut
    #[arg(long)]
    all_beats: bool,

    /// Override the detected audio duration
    #[arg(long)]
    audio_end: Option<f64>,

    /// Cap the render to this many seconds
    #[arg(long)]
    max_seconds: Option<f64>,
}

#[derive(clap::Args)]
struct RenderingArgs {
    /// Use hard cuts instead of crossfades
    #[arg(long)]
    hardcuts: bool,

    /// Named transition (ignored when --hardcuts is set)
    #[arg(long, value_enum)]
    transition: Option<Transition>,

    /// Crossfade duration in seconds
    #[arg(long)]
    xfade: Option<f64>,

    /// Minimum segment duration for a boundary to stay safe to crossfade
    #[arg(long)]
    xfade_min: Option<f64>,

    /// Where the transition sits relative to the beat it lands on
    #[arg(long, value_enum)]
    align: Option<Alignment>,

    /// Frame-boundary rounding mode for segment durations
    #[arg(long, value_enum)]
    frame_quantize: Option<FrameQuantizeMode>,

    #[arg(long, default_value_t = 1920)]
    width: u32,

    #[arg(long, default_value_t = 1080)]
    height: u32,

    #[arg(long, default_value_t = 30.0)]
    fps: f64,
}

#[derive(clap::Args)]
struct OverlayArgs {
    /// Draw a tick mark at each beat (thinned by --beat-mult)
    #[arg(long)]
    mark_beats: bool,

    #[arg(long)]
    pulse: bool,
    #[arg(long)]
    pulse_sat: Option<f32>,
    #[arg(long)]
    pulse_bright: Option<f32>,
    #[arg(long)]
    pulse_dur: Option<f64>,

    #[arg(long)]
    bloom: bool,
    #[arg(long)]
    bloom_sigma: Option<f32>,
    #[arg(long)]
    bloom_dur: Option<f64>,

    #[arg(long)]
    counter: bool,
    #[arg(long)]
    counter_size: Option<u32>,
    /// Screen corner the beat counter is drawn in
    #[arg(long, value_enum)]
    counter_pos: Option<CounterPosition>,

    /// Only mark every Nth beat
    #[arg(long, default_value_t = 1)]
    beat_mult: u32,

    /// Shift overlay timing independently of the planner's own beat phase
    #[arg(long, default_value_t = 0.0)]
    overlay_phase: f64,

    /// Suppress beat ticks within this many seconds of a transition landing
    #[arg(long, default_value_t = 0.05)]
    overlay_guard: f64,

    /// Draw a one-frame marker at each hard-cut fallback boundary
    #[arg(long)]
    cut_markers: bool,

    /// Restrict overlays to a foreground/background mask region
    #[arg(long, value_enum, default_value = "none")]
    mask_scope: MaskScope,
}

#[derive(clap::Args)]
struct ImageArgs {
    /// Shuffle the image order (seeded, deterministic)
    #[arg(long)]
    shuffle: bool,

    #[arg(long, default_value_t = 1337)]
    seed: u64,

    /// Loop the image list instead of truncating the plan when images run short
    #[arg(long)]
    image_loop: bool,
}

#[derive(clap::Args)]
struct IoArgs {
    #[arg(long)]
    workdir: Option<PathBuf>,

    /// Keep the workdir even after a successful render
    #[arg(long)]
    keep_workdir: bool,

    #[arg(long, default_value = "output.mp4")]
    out: PathBuf,

    /// Freeze the computed plan to this path
    #[arg(long)]
    plan_out: Option<PathBuf>,

    /// Re-render from a previously frozen plan instead of re-planning
    #[arg(long)]
    plan_in: Option<PathBuf>,

    /// Render video only, without muxing in the audio track
    #[arg(long)]
    no_audio: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(log_level).init();

    match run(cli).await {
        Ok(()) => std::process::exit(0),
        Err(err) => {
            eprintln!("error: {}", err.user_message());
            std::process::exit(err.exit_code());
        }
    }
}

async fn run(cli: Cli) -> retro_compositor::Result<()> {
    info!("Starting Retro-Compositor v{}", env!("CARGO_PKG_VERSION"));

    let mut config = match &cli.config {
        Some(path) => {
            info!(?path, "loading configuration file");
            Config::from_file(path)?
        }
        None => Config::default(),
    };

    let defaulted = apply_cli_overrides(&mut config, &cli);

    if let Some(preset) = cli.preset {
        config.apply_preset(preset, &defaulted);
    }

    // Non-clobbering: min-gap is auto-raised after preset+user merge
    // regardless of which path set xfade.
    config.planner.min_cut_gap_s = config
        .planner
        .min_cut_gap_s
        .max(2.0 * config.render.xfade_s + 0.05);

    if cli.planning.all_beats {
        config.planner.strategy = Strategy::All;
    }
    if let Some(workdir) = cli.io.workdir {
        config.io.workdir = workdir;
    }
    config.io.keep_workdir_on_failure = cli.io.keep_workdir || config.io.keep_workdir_on_failure;

    config.validate()?;

    let engine = CompositionEngine::new(config);
    let request = RenderRequest {
        audio_path: cli.audio_file,
        images_dir: cli.images_dir,
        output_path: cli.io.out,
        plan_in: cli.io.plan_in,
        plan_out: cli.io.plan_out,
        no_audio: cli.io.no_audio,
        audio_end_override: cli.planning.audio_end,
        max_seconds: cli.planning.max_seconds,
    };

    engine.compose(&request).await
}

/// Applies every explicitly-set CLI flag onto `config`, returning the set of
/// field names the user left untouched (and therefore still eligible for a
/// `--preset` overlay).
fn apply_cli_overrides(config: &mut Config, cli: &Cli) -> HashSet<&'static str> {
    let mut defaulted: HashSet<&'static str> = HashSet::new();

    if let Some(period) = &cli.planning.period {
        config.planner.period_min_s = period[0];
        config.planner.period_max_s = period[1];
    } else {
        defaulted.insert("period_range");
    }
    if let Some(target) = cli.planning.target {
        config.planner.target_s = target;
    } else {
        defaulted.insert("period_range");
    }
    if let Some(grace) = cli.planning.grace {
        config.planner.grace_s = grace;
    }
    config.planner.phase_s = cli.planning.phase;
    if let Some(min_gap) = cli.planning.min_gap {
        config.planner.min_cut_gap_s = min_gap;
    }
    if let Some(strategy) = cli.planning.strategy {
        config.planner.strategy = strategy;
    } else {
        defaulted.insert("strategy");
    }
    config.planner.strict = config.planner.strict || cli.planning.strict;

    config.render.mode = if cli.rendering.hardcuts {
        retro_compositor::graph::render_spec::RenderMode::Hardcut
    } else {
        defaulted.insert("mode");
        config.render.mode
    };
    if let Some(transition) = cli.rendering.transition {
        config.render.transition = transition;
    } else {
        defaulted.insert("transition");
    }
    if let Some(xfade) = cli.rendering.xfade {
        config.render.xfade_s = xfade;
    } else {
        defaulted.insert("xfade_s");
    }
    if let Some(xfade_min) = cli.rendering.xfade_min {
        config.render.xfade_min_s = xfade_min;
    }
    if let Some(align) = cli.rendering.align {
        config.render.align = align;
    }
    if let Some(fq) = cli.rendering.frame_quantize {
        config.render.frame_quantize = fq;
    }
    config.render.width = cli.rendering.width;
    config.render.height = cli.rendering.height;
    config.render.fps = cli.rendering.fps;

    config.overlay.mark_beats = config.overlay.mark_beats || cli.overlays.mark_beats;
    if !cli.overlays.mark_beats {
        defaulted.insert("mark_beats");
    }
    config.overlay.pulse = config.overlay.pulse || cli.overlays.pulse;
    if !cli.overlays.pulse {
        defaulted.insert("pulse");
    }
    if let Some(v) = cli.overlays.pulse_sat {
        config.overlay.pulse_saturation = v;
    }
    if let Some(v) = cli.overlays.pulse_bright {
        config.overlay.pulse_brightness = v;
    }
    if let Some(v) = cli.overlays.pulse_dur {
        config.overlay.pulse_dur = v;
    }
    config.overlay.bloom = config.overlay.bloom || cli.overlays.bloom;
    if !cli.overlays.bloom {
        defaulted.insert("bloom");
    }
    if let Some(v) = cli.overlays.bloom_sigma {
        config.overlay.bloom_sigma = v;
    }
    if let Some(v) = cli.overlays.bloom_dur {
        config.overlay.bloom_dur = v;
    }
    config.overlay.counter = config.overlay.counter || cli.overlays.counter;
    if let Some(v) = cli.overlays.counter_size {
        config.overlay.counter_size = v;
    }
    if let Some(v) = cli.overlays.counter_pos {
        config.overlay.counter_pos = v;
    }
    config.overlay.beat_mult = cli.overlays.beat_mult;
    config.overlay.overlay_phase = cli.overlays.overlay_phase;
    config.overlay.overlay_guard = cli.overlays.overlay_guard;
    config.overlay.mask_scope = cli.overlays.mask_scope;
    config.overlay.cut_markers = config.overlay.cut_markers || cli.overlays.cut_markers;

    config.image.shuffle = config.image.shuffle || cli.images.shuffle;
    config.image.seed = cli.images.seed;
    config.image.loop_images = config.image.loop_images || cli.images.image_loop;
    config.image.directory = cli.images_dir.clone();

    defaulted
}
