//! Beat-synchronized overlay events: ticks, pulses, bloom flashes, and a
//! sticky beat counter, each optionally scoped to a foreground/background
//! mask region.
//!
//! Time-windowed `enable='between(t,a,b)'` framing follows the idiom shown
//! in the instantOS render pipeline's `apply_overlays`.

use serde::{Deserialize, Serialize};

use crate::beats::BeatSet;

/// Scope an overlay is restricted to, via a precomputed or lazily-generated
/// alpha mask. Degrades silently to `None` when no mask is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum MaskScope {
    None,
    Foreground,
    Background,
}

/// Screen corner the beat counter overlay is drawn in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum CounterPosition {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl CounterPosition {
    fn ffmpeg_xy(&self) -> (&'static str, &'static str) {
        match self {
            Self::TopLeft => ("20", "20"),
            Self::TopRight => ("w-tw-20", "20"),
            Self::BottomLeft => ("20", "h-th-20"),
            Self::BottomRight => ("w-tw-20", "h-th-20"),
        }
    }
}

/// The overlay kinds the composer can emit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum OverlayKind {
    BeatTick,
    Pulse { saturation: f32, brightness: f32 },
    Bloom { sigma: f32 },
    Counter { value: u32, size: u32, position: CounterPosition },
}

impl OverlayKind {
    /// ffmpeg filter fragment for this event (without the trailing
    /// `enable=` clause, appended separately so every kind shares one
    /// time-windowing code path).
    pub fn ffmpeg_fragment(&self, _event: &OverlayEvent) -> String {
        match self {
            Self::BeatTick => "drawbox=x=0:y=0:w=4:h=ih:color=white@0.8:t=fill".to_string(),
            Self::Pulse {
                saturation,
                brightness,
            } => format!("eq=saturation={saturation:.2}:brightness={brightness:.2}"),
            Self::Bloom { sigma } => format!("gblur=sigma={sigma:.2}"),
            Self::Counter { value, size, position } => {
                let (x, y) = position.ffmpeg_xy();
                format!("drawtext=text='{value}':fontcolor=white:fontsize={size}:x={x}:y={y}")
            }
        }
    }
}

/// A single overlay occurrence, windowed to the portion of the timeline it
/// is visible in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayEvent {
    pub time_s: f64,
    pub window_start_s: f64,
    pub window_end_s: f64,
    pub kind: OverlayKind,
}

/// Parameters for one overlay composition pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayConfig {
    pub mark_beats: bool,
    pub beat_mult: u32,
    pub overlay_phase: f64,
    pub overlay_guard: f64,
    pub pulse: bool,
    pub pulse_saturation: f32,
    pub pulse_brightness: f32,
    pub pulse_dur: f64,
    pub bloom: bool,
    pub bloom_sigma: f32,
    pub bloom_dur: f64,
    pub counter: bool,
    pub counter_size: u32,
    pub counter_pos: CounterPosition,
    pub mask_scope: MaskScope,
    /// Draws a one-frame marker at each hard-cut fallback boundary
    /// (`--cut-markers`), styled per [`crate::graph::transitions::FallbackMarker`].
    pub cut_markers: bool,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            mark_beats: false,
            beat_mult: 1,
            overlay_phase: 0.0,
            overlay_guard: 0.05,
            pulse: false,
            pulse_saturation: 1.5,
            pulse_brightness: 0.1,
            pulse_dur: 0.15,
            bloom: false,
            bloom_sigma: 8.0,
            bloom_dur: 0.2,
            counter: false,
            counter_size: 48,
            counter_pos: CounterPosition::TopRight,
            mask_scope: MaskScope::None,
            cut_markers: false,
        }
    }
}

/// Builds the sorted overlay event list for a render.
pub struct OverlayComposer;

impl OverlayComposer {
    /// `transition_landings`: times (seconds) where a crossfade boundary
    /// lands (per the active alignment), used to suppress beat ticks inside
    /// `overlay_guard` of a transition. Crossfade boundaries themselves are
    /// never masked or otherwise altered by this pass.
    pub fn compose(
        beats: &BeatSet,
        audio_end_s: f64,
        transition_landings: &[f64],
        config: &OverlayConfig,
    ) -> Vec<OverlayEvent> {
        let mut events = Vec::new();
        let times = beats.times();

        if config.mark_beats {
            for (i, &t) in times.iter().enumerate() {
                if config.beat_mult > 1 && i % config.beat_mult as usize != 0 {
                    continue;
                }
                let shifted = t + config.overlay_phase;
                if Self::within_guard(shifted, transition_landings, config.overlay_guard) {
                    continue;
                }
                events.push(OverlayEvent {
                    time_s: shifted,
                    window_start_s: shifted,
                    window_end_s: shifted + 1.0 / 30.0,
                    kind: OverlayKind::BeatTick,
                });
            }
        }

        if config.pulse {
            for &t in times {
                events.push(OverlayEvent {
                    time_s: t,
                    window_start_s: t,
                    window_end_s: t + config.pulse_dur,
                    kind: OverlayKind::Pulse {
                        saturation: config.pulse_saturation,
                        brightness: config.pulse_brightness,
                    },
                });
            }
        }

        if config.bloom {
            for &t in times {
                events.push(OverlayEvent {
                    time_s: t,
                    window_start_s: t,
                    window_end_s: t + config.bloom_dur,
                    kind: OverlayKind::Bloom {
                        sigma: config.bloom_sigma,
                    },
                });
            }
        }

        if config.counter {
            for (i, &t) in times.iter().enumerate() {
                let next = times.get(i + 1).copied().unwrap_or(audio_end_s);
                events.push(OverlayEvent {
                    time_s: t,
                    window_start_s: t,
                    window_end_s: next,
                    kind: OverlayKind::Counter {
                        value: (i + 1) as u32,
                        size: config.counter_size,
                        position: config.counter_pos,
                    },
                });
            }
        }

        events.sort_by(|a, b| a.time_s.partial_cmp(&b.time_s).unwrap());
        events
    }

    fn within_guard(time: f64, landings: &[f64], guard: f64) -> bool {
        landings.iter().any(|&landing| (time - landing).abs() <= guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beats::BeatPreparer;

    #[test]
    fn beat_ticks_suppressed_near_transition_landing() {
        let beats = BeatPreparer::prepare(&[1.0, 2.0, 3.0], 0.0, None, None);
        let config = OverlayConfig {
            mark_beats: true,
            ..OverlayConfig::default()
        };
        let events = OverlayComposer::compose(&beats, 4.0, &[2.0], &config);
        let times: Vec<f64> = events.iter().map(|e| e.time_s).collect();
        assert!(!times.contains(&2.0));
        assert!(times.contains(&1.0));
        assert!(times.contains(&3.0));
    }

    #[test]
    fn beat_mult_thins_ticks() {
        let beats = BeatPreparer::prepare(&[1.0, 2.0, 3.0, 4.0], 0.0, None, None);
        let config = OverlayConfig {
            mark_beats: true,
            beat_mult: 2,
            ..OverlayConfig::default()
        };
        let events = OverlayComposer::compose(&beats, 5.0, &[], &config);
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn counter_persists_until_next_beat() {
        let beats = BeatPreparer::prepare(&[1.0, 3.0], 0.0, None, None);
        let config = OverlayConfig {
            counter: true,
            ..OverlayConfig::default()
        };
        let events = OverlayComposer::compose(&beats, 6.0, &[], &config);
        assert_eq!(events[0].window_start_s, 1.0);
        assert_eq!(events[0].window_end_s, 3.0);
        assert_eq!(events[1].window_end_s, 6.0);
    }

    #[test]
    fn counter_position_selects_drawtext_corner() {
        let beats = BeatPreparer::prepare(&[1.0], 0.0, None, None);
        let config = OverlayConfig {
            counter: true,
            counter_pos: CounterPosition::BottomLeft,
            ..OverlayConfig::default()
        };
        let events = OverlayComposer::compose(&beats, 2.0, &[], &config);
        let fragment = events[0].kind.ffmpeg_fragment(&events[0]);
        assert!(fragment.contains("x=20:y=h-th-20"));
    }
}
