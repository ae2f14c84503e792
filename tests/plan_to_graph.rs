//! End-to-end integration tests wiring beat preparation, planning, duration
//! quantization, image binding, and graph compilation together -- the
//! colocated `#[cfg(test)]` modules each exercise one stage in isolation,
//! this file checks the seams between them.

use std::path::PathBuf;

use retro_compositor::beats::BeatPreparer;
use retro_compositor::duration::{DurationBuilder, FrameQuantizeMode};
use retro_compositor::graph::render_spec::{Alignment, RenderMode, RenderSpec};
use retro_compositor::graph::transitions::Transition;
use retro_compositor::graph::GraphBuilder;
use retro_compositor::planner::{PeriodWindow, Planner, PlannerParams, Strategy};

fn synthetic_beats(duration_s: f64, step: f64) -> Vec<f64> {
    let mut t = 0.0;
    let mut beats = Vec::new();
    while t < duration_s {
        beats.push(t);
        t += step;
    }
    beats
}

fn images_for(n: usize) -> Vec<PathBuf> {
    (0..n).map(|i| PathBuf::from(format!("img_{i:04}.png"))).collect()
}

fn spec(fps: f64) -> RenderSpec {
    RenderSpec {
        mode: RenderMode::Crossfade,
        transition: Transition::Crossfade,
        xfade_s: 0.5,
        xfade_min_s: 0.1,
        align: Alignment::End,
        overlay_events: Vec::new(),
        fps,
        width: 640,
        height: 360,
        cut_marker: None,
    }
}

#[test]
fn plan_to_graph_is_deterministic_for_same_seed() {
    let raw = synthetic_beats(60.0, 0.5);
    let beats = BeatPreparer::prepare(&raw, 0.0, None, None);
    let window = PeriodWindow::new(1.5, 3.5, 2.5, 0.5).expect("valid window");
    let params = PlannerParams {
        window,
        strategy: Strategy::Nearest,
        strict: false,
        min_cut_gap_s: 1.0,
        audio_end_s: 60.0,
    };

    let plan_a = Planner::plan(&beats, &params).expect("plan succeeds");
    let plan_b = Planner::plan(&beats, &params).expect("plan succeeds");

    assert_eq!(plan_a.cuts.len(), plan_b.cuts.len());
    for (a, b) in plan_a.cuts.iter().zip(plan_b.cuts.iter()) {
        assert_eq!(a.time_s, b.time_s);
        assert_eq!(a.beat_index, b.beat_index);
    }
}

#[test]
fn duration_sum_matches_audio_end_within_one_frame() {
    let raw = synthetic_beats(45.0, 0.5);
    let beats = BeatPreparer::prepare(&raw, 0.0, None, None);
    let window = PeriodWindow::new(1.5, 3.5, 2.5, 0.5).expect("valid window");
    let params = PlannerParams {
        window,
        strategy: Strategy::Nearest,
        strict: false,
        min_cut_gap_s: 1.0,
        audio_end_s: 45.0,
    };

    let plan = Planner::plan(&beats, &params).expect("plan succeeds");
    let fps = 30.0;
    let durations = DurationBuilder::build(&plan.durations(), fps, FrameQuantizeMode::Nearest);

    let total: f64 = durations.iter().sum();
    assert!(
        (total - 45.0).abs() <= 1.0 / fps + 1e-6,
        "duration sum {total} drifted more than one frame from audio end 45.0"
    );
}

#[test]
fn graph_text_contains_one_crossfade_per_safe_boundary() {
    let raw = synthetic_beats(30.0, 0.5);
    let beats = BeatPreparer::prepare(&raw, 0.0, None, None);
    let window = PeriodWindow::new(1.5, 3.5, 2.5, 0.5).expect("valid window");
    let params = PlannerParams {
        window,
        strategy: Strategy::Nearest,
        strict: false,
        min_cut_gap_s: 1.0,
        audio_end_s: 30.0,
    };

    let plan = Planner::plan(&beats, &params).expect("plan succeeds");
    let fps = 30.0;
    let durations = DurationBuilder::build(&plan.durations(), fps, FrameQuantizeMode::Nearest);
    let images = images_for(durations.len());

    let render_spec = spec(fps);
    let boundaries = render_spec
        .plan_boundaries(&durations)
        .expect("at least one safe boundary in a uniform 2.5s-period plan");
    let safe_count = boundaries.iter().filter(|b| b.safe).count();

    let graph = GraphBuilder::build(&images, &durations, &render_spec).expect("graph compiles");

    let xfade_occurrences = graph.filter_complex.matches("xfade=transition=fade").count();
    assert_eq!(xfade_occurrences, safe_count);
}
