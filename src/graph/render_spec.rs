use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::graph::transitions::{FallbackMarker, Transition};
use crate::overlay::OverlayEvent;

/// Which backend the graph builder targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum RenderMode {
    Hardcut,
    Crossfade,
}

/// Where the boundary transition sits relative to the beat it lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Alignment {
    /// Transition ends on the beat.
    End,
    /// Transition's centre sits on the beat.
    Midpoint,
}

/// Parameters controlling one graph emission. Ephemeral: built from a `Plan`
/// plus CLI parameters just before emission.
#[derive(Debug, Clone)]
pub struct RenderSpec {
    pub mode: RenderMode,
    pub transition: Transition,
    pub xfade_s: f64,
    pub xfade_min_s: f64,
    pub align: Alignment,
    pub overlay_events: Vec<OverlayEvent>,
    pub fps: f64,
    pub width: u32,
    pub height: u32,
    /// One-frame marker style drawn at hard-cut fallback boundaries;
    /// `None` when `--cut-markers` is off.
    pub cut_marker: Option<FallbackMarker>,
}

/// Disposition of a single boundary between segment `i` and `i+1`.
#[derive(Debug, Clone, Copy)]
pub struct BoundaryPlan {
    pub safe: bool,
    pub offset_s: f64,
    /// The boundary's actual hard-cut instant (cumulative duration through
    /// segment `i`), independent of the crossfade offset formula -- used to
    /// place the fallback marker regardless of alignment mode.
    pub cut_time_s: f64,
}

impl RenderSpec {
    /// Per-boundary safety + offset computation for the crossfade backend.
    /// Returns `None` (global fallback) if every boundary is unsafe -- the
    /// caller should then emit the hard-cut backend entirely.
    pub fn plan_boundaries(&self, durations: &[f64]) -> Option<Vec<BoundaryPlan>> {
        if durations.len() < 2 {
            return None;
        }

        let x = self.xfade_s;
        let mut running = vec![0.0_f64; durations.len() + 1];
        for (i, d) in durations.iter().enumerate() {
            running[i + 1] = running[i] + d;
        }

        let mut boundaries = Vec::with_capacity(durations.len() - 1);
        let mut any_safe = false;

        for i in 0..durations.len() - 1 {
            let d_i = durations[i];
            let d_next = durations[i + 1];
            let safe = d_i >= 2.0 * x + 0.05 && d_next >= 2.0 * x + 0.05 && x >= self.xfade_min_s;
            if safe {
                any_safe = true;
            } else {
                warn!(
                    boundary = i,
                    d_i, d_next, xfade_s = x, "unsafe crossfade boundary, falling back to hard cut"
                );
            }

            let sum_through_i = running[i + 1];
            let offset_s = match self.align {
                Alignment::End => sum_through_i - x,
                Alignment::Midpoint => sum_through_i - x / 2.0,
            };

            boundaries.push(BoundaryPlan {
                safe,
                offset_s,
                cut_time_s: sum_through_i,
            });
        }

        if !any_safe {
            warn!("all boundaries unsafe, falling back to hard-cut backend globally");
            return None;
        }

        Some(boundaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(xfade_s: f64, align: Alignment) -> RenderSpec {
        RenderSpec {
            mode: RenderMode::Crossfade,
            transition: Transition::Crossfade,
            xfade_s,
            xfade_min_s: 0.1,
            align,
            overlay_events: Vec::new(),
            fps: 30.0,
            width: 1920,
            height: 1080,
            cut_marker: None,
        }
    }

    #[test]
    fn unsafe_boundary_falls_back_individually() {
        // Boundary 0 (3.0,0.8) and boundary 1 (0.8,3.0) both touch the
        // under-threshold 0.8s segment; boundary 2 (3.0,3.0) is unaffected.
        let durations = vec![3.0, 0.8, 3.0, 3.0];
        let boundaries = spec(0.5, Alignment::End).plan_boundaries(&durations).unwrap();
        assert_eq!(boundaries.len(), 3);
        assert!(!boundaries[0].safe); // 0.8 < 2*0.5+0.05 = 1.05
        assert!(!boundaries[1].safe);
        assert!(boundaries[2].safe);
    }

    #[test]
    fn all_unsafe_triggers_global_fallback() {
        let durations = vec![0.5, 0.5, 0.5];
        let result = spec(0.5, Alignment::End).plan_boundaries(&durations);
        assert!(result.is_none());
    }

    #[test]
    fn end_alignment_offset_formula() {
        let durations = vec![4.0, 4.0];
        let boundaries = spec(0.5, Alignment::End).plan_boundaries(&durations).unwrap();
        assert!((boundaries[0].offset_s - (4.0 - 0.5)).abs() < 1e-9);
    }

    #[test]
    fn midpoint_alignment_offset_formula() {
        let durations = vec![4.0, 4.0];
        let boundaries = spec(0.5, Alignment::Midpoint)
            .plan_boundaries(&durations)
            .unwrap();
        assert!((boundaries[0].offset_s - (4.0 - 0.25)).abs() < 1e-9);
    }

    #[test]
    fn cut_time_is_the_raw_boundary_instant_regardless_of_alignment() {
        let durations = vec![4.0, 4.0];
        let end = spec(0.5, Alignment::End).plan_boundaries(&durations).unwrap();
        let midpoint = spec(0.5, Alignment::Midpoint)
            .plan_boundaries(&durations)
            .unwrap();
        assert!((end[0].cut_time_s - 4.0).abs() < 1e-9);
        assert!((midpoint[0].cut_time_s - 4.0).abs() < 1e-9);
    }
}
