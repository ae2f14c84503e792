use criterion::{black_box, criterion_group, criterion_main, Criterion};

use retro_compositor::beats::BeatPreparer;
use retro_compositor::planner::{PeriodWindow, Planner, PlannerParams, Strategy};

/// A synthetic 20-minute, uniform 120bpm beat grid -- representative of a
/// full-length track without needing to decode an audio fixture.
fn synthetic_beats(duration_s: f64) -> Vec<f64> {
    let step = 0.5; // 120bpm
    let mut t = 0.0;
    let mut beats = Vec::new();
    while t < duration_s {
        beats.push(t);
        t += step;
    }
    beats
}

fn plan_twenty_minutes(c: &mut Criterion) {
    let raw = synthetic_beats(20.0 * 60.0);
    let beats = BeatPreparer::prepare(&raw, 0.0, None, None);
    let window = PeriodWindow::new(1.5, 3.5, 2.5, 0.5).expect("valid window");
    let params = PlannerParams {
        window,
        strategy: Strategy::Nearest,
        strict: false,
        min_cut_gap_s: 1.0,
        audio_end_s: 20.0 * 60.0,
    };

    c.bench_function("plan_20min_nearest", |b| {
        b.iter(|| Planner::plan(black_box(&beats), black_box(&params)).expect("plan succeeds"))
    });
}

fn plan_twenty_minutes_hybrid(c: &mut Criterion) {
    let raw = synthetic_beats(20.0 * 60.0);
    let beats = BeatPreparer::prepare(&raw, 0.0, None, None);
    let window = PeriodWindow::new(1.5, 3.5, 2.5, 0.5).expect("valid window");
    let params = PlannerParams {
        window,
        strategy: Strategy::Hybrid,
        strict: false,
        min_cut_gap_s: 1.0,
        audio_end_s: 20.0 * 60.0,
    };

    c.bench_function("plan_20min_hybrid", |b| {
        b.iter(|| Planner::plan(black_box(&beats), black_box(&params)).expect("plan succeeds"))
    });
}

criterion_group!(benches, plan_twenty_minutes, plan_twenty_minutes_hybrid);
criterion_main!(benches);
