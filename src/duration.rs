//! Converts planner cut times into per-segment durations, with optional
//! frame quantization and drift correction.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Rounding mode applied when quantizing a duration to a frame boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum FrameQuantizeMode {
    Nearest,
    Floor,
    Ceil,
}

impl FrameQuantizeMode {
    fn round(&self, frames: f64) -> f64 {
        match self {
            Self::Nearest => frames.round(),
            Self::Floor => frames.floor(),
            Self::Ceil => frames.ceil(),
        }
    }
}

/// Builds final, frame-quantized, drift-corrected segment durations from the
/// planner's nominal durations.
pub struct DurationBuilder;

impl DurationBuilder {
    /// `nominal`: raw `di = c_{i+1} - c_i` (last already trimmed to audio end
    /// by `Plan::durations`). Returns quantized durations whose sum matches
    /// `audio_end_s` to within one frame, with any sub-frame segment merged
    /// into a neighbour and a warning logged.
    pub fn build(nominal: &[f64], fps: f64, mode: FrameQuantizeMode) -> Vec<f64> {
        if nominal.is_empty() {
            return Vec::new();
        }

        let frame = 1.0 / fps;
        let mut quantized: Vec<f64> = nominal
            .iter()
            .map(|d| mode.round(d * fps) * frame)
            .collect();

        let target_total: f64 = nominal.iter().sum();
        let drift = target_total - quantized.iter().sum::<f64>();
        if let Some(last) = quantized.last_mut() {
            *last += drift;
        }

        Self::merge_short_segments(&mut quantized, frame);
        quantized
    }

    /// Any segment under one frame is merged into a neighbour (the shorter
    /// of the two adjoining segments, preferring the following one when
    /// tied) and the build warns once per merge.
    fn merge_short_segments(durations: &mut Vec<f64>, frame: f64) {
        let mut i = 0;
        while i < durations.len() {
            if durations[i] + 1e-9 >= frame || durations.len() == 1 {
                i += 1;
                continue;
            }
            let merge_into_next = if i + 1 < durations.len() {
                i == 0 || durations[i + 1] <= durations[i - 1]
            } else {
                false
            };

            if merge_into_next {
                warn!(
                    segment = i,
                    duration_s = durations[i],
                    frame_s = frame,
                    "segment shorter than one frame, merging into following segment"
                );
                let merged = durations.remove(i);
                durations[i] += merged;
            } else {
                warn!(
                    segment = i,
                    duration_s = durations[i],
                    frame_s = frame,
                    "segment shorter than one frame, merging into preceding segment"
                );
                let merged = durations.remove(i);
                durations[i - 1] += merged;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_quantization_with_drift_correction() {
        let nominal = vec![7.10, 7.55, 7.00];
        let durations = DurationBuilder::build(&nominal, 30.0, FrameQuantizeMode::Floor);
        // floor(7.10*30)/30 = 7.0, floor(7.55*30)/30 = 7.5(ish), floor(7.00*30)/30 = 7.0
        assert!((durations[0] - 7.0).abs() < 1e-9);
        assert!((durations[1] - 7.5).abs() < 1e-9);
        let sum: f64 = durations.iter().sum();
        let nominal_sum: f64 = nominal.iter().sum();
        assert!((sum - nominal_sum).abs() < 1e-9);
    }

    #[test]
    fn sum_matches_audio_end_after_correction() {
        let nominal = vec![3.333, 3.333, 3.334];
        let durations = DurationBuilder::build(&nominal, 24.0, FrameQuantizeMode::Nearest);
        let sum: f64 = durations.iter().sum();
        assert!((sum - 10.0).abs() < 1e-6);
    }

    #[test]
    fn sub_frame_segment_merges_into_shorter_neighbour() {
        // 0.01s at 30fps quantizes to 0 frames; must merge.
        let nominal = vec![5.0, 0.01, 5.0];
        let durations = DurationBuilder::build(&nominal, 30.0, FrameQuantizeMode::Nearest);
        assert_eq!(durations.len(), 2);
        let frame = 1.0 / 30.0;
        assert!(durations.iter().all(|d| *d >= frame - 1e-9));
    }
}
