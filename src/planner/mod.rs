//! Beat-aligned cut planner: consumes a prepared `BeatSet` and emits an
//! ordered, window-constrained sequence of cuts.
//!
//! Single-threaded, synchronous, side-effect free — a pure function of its
//! inputs, no PRNG.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::beats::BeatSet;
use crate::error::{PlannerError, Result};

/// `[p + period.min, p + period.max]` — the admissible region for the next cut.
#[derive(Debug, Clone, Copy)]
pub struct PeriodWindow {
    pub min_s: f64,
    pub max_s: f64,
    pub target_s: f64,
    pub grace_s: f64,
}

impl PeriodWindow {
    pub fn new(min_s: f64, max_s: f64, target_s: f64, grace_s: f64) -> Result<Self> {
        if !(min_s > 0.0 && min_s <= target_s && target_s <= max_s) {
            return Err(PlannerError::InvalidParameter {
                details: format!(
                    "period window requires 0 < min <= target <= max, got min={min_s}, target={target_s}, max={max_s}"
                ),
            }
            .into());
        }
        if grace_s < 0.0 {
            return Err(PlannerError::InvalidParameter {
                details: format!("grace must be >= 0, got {grace_s}"),
            }
            .into());
        }
        Ok(Self {
            min_s,
            max_s,
            target_s,
            grace_s,
        })
    }

    fn window_from(&self, p: f64) -> (f64, f64, f64) {
        (p + self.min_s, p + self.max_s, p + self.target_s)
    }

    fn expanded_from(&self, p: f64) -> (f64, f64) {
        (p + self.min_s - self.grace_s, p + self.max_s + self.grace_s)
    }
}

/// Which window a cut was ultimately selected under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindowUsed {
    Normal,
    Grace,
    Fallback,
}

/// Beat-selection strategy: a closed tagged variant, explicit degradation in
/// a match arm, never a dynamic lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    Nearest,
    Energy,
    Downbeat,
    Hybrid,
    /// Bypasses the window: every beat above the min-gap floor becomes a cut.
    All,
}

/// A single selected cut.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cut {
    pub time_s: f64,
    pub beat_index: usize,
    pub window_used: WindowUsed,
    pub strategy_used: Strategy,
}

/// The planner's full output: an ordered sequence of cuts plus bookkeeping
/// needed by downstream stages.
#[derive(Debug, Clone)]
pub struct Plan {
    pub cuts: Vec<Cut>,
    pub audio_end_s: f64,
}

impl Plan {
    /// Per-segment nominal durations, `durations[i] = cuts[i+1] - cuts[i]`,
    /// with the final segment trimmed to `audio_end_s`.
    pub fn durations(&self) -> Vec<f64> {
        if self.cuts.is_empty() {
            return Vec::new();
        }
        let mut out = Vec::with_capacity(self.cuts.len());
        for w in self.cuts.windows(2) {
            out.push(w[1].time_s - w[0].time_s);
        }
        let last = self.cuts.last().expect("checked non-empty above");
        out.push(self.audio_end_s - last.time_s);
        out
    }
}

/// Planner configuration: the full parameter set a single planning run needs.
#[derive(Debug, Clone)]
pub struct PlannerParams {
    pub window: PeriodWindow,
    pub strategy: Strategy,
    pub strict: bool,
    pub min_cut_gap_s: f64,
    pub audio_end_s: f64,
}

/// Produces a [`Plan`] from a prepared [`BeatSet`] via a windowed
/// subsequence-selection state machine.
pub struct Planner;

impl Planner {
    pub fn plan(beats: &BeatSet, params: &PlannerParams) -> Result<Plan> {
        if params.strategy == Strategy::All {
            return Self::plan_all_beats(beats, params);
        }

        let mut cuts = Vec::new();
        let mut p = 0.0_f64;
        let mut first = true;

        loop {
            let (win_min, win_max) = if first {
                let w = params.window.window_from(0.0);
                (w.0, w.1)
            } else {
                let w = params.window.window_from(p);
                (w.0, w.1)
            };

            if win_min > params.audio_end_s {
                break;
            }

            let target = if first {
                params.window.window_from(0.0).2
            } else {
                params.window.window_from(p).2
            }
            .clamp(win_min, win_max);

            let candidates: Vec<(usize, f64)> = beats
                .in_range(win_min, win_max)
                .filter(|&(_, b)| first || b - p >= params.min_cut_gap_s)
                .collect();

            let half_span = (win_max - win_min) / 2.0;

            let (chosen_idx, chosen_time, window_used) = if !candidates.is_empty() {
                let (idx, time) = Self::select(beats, &candidates, target, half_span, params.strategy);
                (idx, time, WindowUsed::Normal)
            } else if params.strict {
                let (exp_min, exp_max) = params.window.expanded_from(p);
                let grace_candidates: Vec<(usize, f64)> = beats
                    .in_range(exp_min, exp_max)
                    .filter(|&(_, b)| first || b - p >= params.min_cut_gap_s)
                    .collect();
                if grace_candidates.is_empty() {
                    return Err(PlannerError::NoBeatInWindow {
                        prev_cut: p,
                        window_start: exp_min,
                        window_end: exp_max,
                    }
                    .into());
                }
                let clamped_target = target.clamp(exp_min, exp_max);
                let (idx, time) = Self::select(
                    beats,
                    &grace_candidates,
                    clamped_target,
                    half_span,
                    params.strategy,
                );
                (idx, time, WindowUsed::Grace)
            } else {
                // Non-strict: nearest beat above the gap floor to the clamped target,
                // unconstrained by the window.
                let floor = if first { 0.0 } else { p + params.min_cut_gap_s };
                match Self::nearest_beat_above(beats, floor, target) {
                    Some((idx, time)) => (idx, time, WindowUsed::Fallback),
                    None => break,
                }
            };

            debug!(
                cut_index = cuts.len(),
                time_s = chosen_time,
                strategy = ?params.strategy,
                window_used = ?window_used,
                "planner emitted cut"
            );

            cuts.push(Cut {
                time_s: chosen_time,
                beat_index: chosen_idx,
                window_used,
                strategy_used: params.strategy,
            });
            p = chosen_time;
            first = false;
        }

        Ok(Plan {
            cuts,
            audio_end_s: params.audio_end_s,
        })
    }

    fn plan_all_beats(beats: &BeatSet, params: &PlannerParams) -> Result<Plan> {
        let mut cuts = Vec::new();
        let mut p = f64::NEG_INFINITY;
        for (idx, t) in beats.times().iter().enumerate() {
            if p.is_finite() && *t - p < params.min_cut_gap_s {
                continue;
            }
            cuts.push(Cut {
                time_s: *t,
                beat_index: idx,
                window_used: WindowUsed::Normal,
                strategy_used: Strategy::All,
            });
            p = *t;
        }
        debug!(cut_count = cuts.len(), "planner emitted all-beats cuts");
        Ok(Plan {
            cuts,
            audio_end_s: params.audio_end_s,
        })
    }

    /// Apply the tie-break rule to find the nearest beat (by index, above a
    /// floor time) to `target`, unconstrained by any window. Used only by
    /// the non-strict out-of-window fallback.
    fn nearest_beat_above(beats: &BeatSet, floor: f64, target: f64) -> Option<(usize, f64)> {
        let candidates: Vec<(usize, f64)> = beats
            .times()
            .iter()
            .enumerate()
            .filter(|(_, &t)| t > floor)
            .map(|(i, &t)| (i, t))
            .collect();
        if candidates.is_empty() {
            return None;
        }
        Some(Self::tie_break_nearest(&candidates, target))
    }

    fn select(
        beats: &BeatSet,
        candidates: &[(usize, f64)],
        target: f64,
        half_span: f64,
        strategy: Strategy,
    ) -> (usize, f64) {
        match strategy {
            Strategy::Nearest => Self::tie_break_nearest(candidates, target),
            Strategy::Energy => {
                if beats.onset_strength().is_some() {
                    Self::pick_max_strength(beats, candidates)
                } else {
                    Self::tie_break_nearest(candidates, target)
                }
            }
            Strategy::Downbeat => {
                let downbeats: Vec<(usize, f64)> = candidates
                    .iter()
                    .copied()
                    .filter(|&(idx, b)| beats.is_downbeat_at(idx) && (b - target).abs() <= half_span)
                    .collect();
                if downbeats.is_empty() {
                    Self::tie_break_nearest(candidates, target)
                } else {
                    Self::tie_break_nearest(&downbeats, target)
                }
            }
            Strategy::Hybrid => {
                let downbeats: Vec<(usize, f64)> = candidates
                    .iter()
                    .copied()
                    .filter(|&(idx, b)| beats.is_downbeat_at(idx) && (b - target).abs() <= half_span)
                    .collect();
                if !downbeats.is_empty() {
                    Self::tie_break_nearest(&downbeats, target)
                } else if beats.onset_strength().is_some() {
                    Self::pick_max_strength(beats, candidates)
                } else {
                    Self::tie_break_nearest(candidates, target)
                }
            }
            Strategy::All => unreachable!("handled by plan_all_beats"),
        }
    }

    fn tie_break_nearest(candidates: &[(usize, f64)], target: f64) -> (usize, f64) {
        candidates
            .iter()
            .copied()
            .min_by(|a, b| {
                let da = (a.1 - target).abs();
                let db = (b.1 - target).abs();
                da.partial_cmp(&db)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            })
            .expect("candidates non-empty")
    }

    fn pick_max_strength(beats: &BeatSet, candidates: &[(usize, f64)]) -> (usize, f64) {
        candidates
            .iter()
            .copied()
            .max_by(|a, b| {
                let sa = beats.strength_at(a.0).unwrap_or(0.0);
                let sb = beats.strength_at(b.0).unwrap_or(0.0);
                sa.partial_cmp(&sb)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal))
            })
            .expect("candidates non-empty")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn beats_from(times: &[f64]) -> BeatSet {
        crate::beats::BeatPreparer::prepare(times, 0.0, None, None)
    }

    #[test]
    fn uniform_120_bpm_grid_yields_sixteen_cuts() {
        let times: Vec<f64> = (1..=240).map(|k| 0.5 * k as f64).collect();
        let beats = beats_from(&times);
        let params = PlannerParams {
            window: PeriodWindow::new(5.0, 10.0, 7.5, 0.0).unwrap(),
            strategy: Strategy::Nearest,
            strict: false,
            min_cut_gap_s: 0.12,
            audio_end_s: 120.0,
        };
        let plan = Planner::plan(&beats, &params).unwrap();
        assert_eq!(plan.cuts.len(), 16);
        for w in plan.cuts.windows(2) {
            let delta = w[1].time_s - w[0].time_s;
            assert!(
                (7.0..=8.0).contains(&delta) || (delta - 7.5).abs() < 1e-9,
                "delta {delta} out of expected {{7.0,7.5,8.0}}"
            );
        }
    }

    #[test]
    fn sparse_gap_fails_strict_with_small_grace() {
        let beats = beats_from(&[1.0, 2.0, 3.0, 4.0, 15.0, 16.0, 17.0]);
        let params = PlannerParams {
            window: PeriodWindow::new(5.0, 10.0, 7.0, 0.25).unwrap(),
            strategy: Strategy::Nearest,
            strict: true,
            min_cut_gap_s: 0.12,
            audio_end_s: 20.0,
        };
        let err = Planner::plan(&beats, &params);
        assert!(err.is_err());
    }

    #[test]
    fn sparse_gap_succeeds_with_large_grace() {
        let beats = beats_from(&[1.0, 2.0, 3.0, 4.0, 15.0, 16.0, 17.0]);
        let params = PlannerParams {
            window: PeriodWindow::new(5.0, 10.0, 7.0, 5.0).unwrap(),
            strategy: Strategy::Nearest,
            strict: true,
            min_cut_gap_s: 0.12,
            audio_end_s: 20.0,
        };
        let plan = Planner::plan(&beats, &params).unwrap();
        let first = &plan.cuts[0];
        assert_eq!(first.time_s, 4.0);
        let second = &plan.cuts[1];
        assert_eq!(second.time_s, 15.0);
        assert_eq!(second.window_used, WindowUsed::Grace);
    }

    #[test]
    fn all_beats_mode_honours_min_gap() {
        let beats = beats_from(&[0.1, 0.18, 0.3]);
        let params = PlannerParams {
            window: PeriodWindow::new(0.1, 10.0, 1.0, 0.0).unwrap(),
            strategy: Strategy::All,
            strict: false,
            min_cut_gap_s: 0.12,
            audio_end_s: 1.0,
        };
        let plan = Planner::plan(&beats, &params).unwrap();
        let times: Vec<f64> = plan.cuts.iter().map(|c| c.time_s).collect();
        // 0.18 is within 0.12 of 0.1 via the preparer collapse already; whichever
        // of the remaining beats survive the gap filter must be >= 0.12 apart.
        for w in times.windows(2) {
            assert!(w[1] - w[0] >= 0.12 - 1e-9);
        }
    }

    #[test]
    fn durations_sum_trims_to_audio_end() {
        let beats = beats_from(&[1.0, 2.0, 3.0]);
        let plan = Plan {
            cuts: vec![
                Cut {
                    time_s: 1.0,
                    beat_index: 0,
                    window_used: WindowUsed::Normal,
                    strategy_used: Strategy::Nearest,
                },
                Cut {
                    time_s: 2.0,
                    beat_index: 1,
                    window_used: WindowUsed::Normal,
                    strategy_used: Strategy::Nearest,
                },
            ],
            audio_end_s: 5.0,
        };
        let _ = &beats;
        let durations = plan.durations();
        assert_eq!(durations, vec![1.0, 3.0]);
        assert!((durations.iter().sum::<f64>() - 4.0).abs() < 1e-9);
    }
}
