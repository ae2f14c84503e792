//! `BeatSource`: the pluggable interface boundary between audio analysis
//! and the rest of the pipeline (any component producing ascending instants
//! in seconds will do). `AudioAnalyzer` is shipped as the default
//! implementation, wrapping the spectral-flux onset detector.

use std::future::Future;
use std::pin::Pin;

use crate::audio::analyzer::AudioAnalyzer;
use crate::audio::types::{AudioData, BeatType};
use crate::error::{AudioError, Result};

/// Raw beat data as the planner's `BeatPreparer` expects it: ascending
/// times plus optional aligned onset-strength and downbeat arrays.
#[derive(Debug, Clone, Default)]
pub struct RawBeats {
    pub times: Vec<f64>,
    pub onset_strength: Vec<f32>,
    pub is_downbeat: Vec<bool>,
}

/// Anything that can turn loaded audio into raw beat instants. Hand-desugared
/// to a boxed future (rather than pulling in an `async-trait` dependency)
/// since this is the crate's only dyn-dispatched async trait.
pub trait BeatSource: Send + Sync {
    fn detect<'a>(
        &'a self,
        audio: &'a AudioData,
    ) -> Pin<Box<dyn Future<Output = Result<RawBeats>> + Send + 'a>>;
}

/// Default `BeatSource`: an FFT-based spectral-flux detector, generalized to
/// report beat instants instead of a video-clip-oriented `AudioAnalysis`.
pub struct AnalyzerBeatSource {
    analyzer: AudioAnalyzer,
}

impl AnalyzerBeatSource {
    pub fn new(analyzer: AudioAnalyzer) -> Self {
        Self { analyzer }
    }
}

impl Default for AnalyzerBeatSource {
    fn default() -> Self {
        Self::new(AudioAnalyzer::default())
    }
}

impl BeatSource for AnalyzerBeatSource {
    fn detect<'a>(
        &'a self,
        audio: &'a AudioData,
    ) -> Pin<Box<dyn Future<Output = Result<RawBeats>> + Send + 'a>> {
        Box::pin(async move {
            let analysis = self.analyzer.analyze(audio).await?;

            if analysis.beats.is_empty() {
                return Err(AudioError::NoBeats.into());
            }

            let mut times = Vec::with_capacity(analysis.beats.len());
            let mut onset_strength = Vec::with_capacity(analysis.beats.len());
            let mut is_downbeat = Vec::with_capacity(analysis.beats.len());

            for beat in &analysis.beats {
                times.push(beat.time);
                onset_strength.push(beat.onset_value);
                is_downbeat.push(beat.beat_type == BeatType::Downbeat);
            }

            Ok(RawBeats {
                times,
                onset_strength,
                is_downbeat,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::types::AudioFormat;
    use std::path::PathBuf;

    fn sine_wave(duration_s: f64) -> AudioData {
        let sample_rate = 44100;
        let samples: Vec<f32> = (0..(sample_rate as f64 * duration_s) as usize)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                (2.0 * std::f32::consts::PI * 440.0 * t).sin() * 0.5
            })
            .collect();
        AudioData {
            samples,
            sample_rate,
            channels: 1,
            duration: duration_s,
            file_path: PathBuf::from("test.wav"),
            format: AudioFormat {
                extension: "wav".to_string(),
                bit_depth: Some(16),
                compression: None,
                bitrate: None,
            },
        }
    }

    #[tokio::test]
    async fn wraps_analyzer_output_into_raw_beats() {
        let source = AnalyzerBeatSource::default();
        let audio = sine_wave(2.0);
        // A continuous sine tone may or may not cross the onset threshold;
        // either a populated RawBeats or a NoBeats error is acceptable here,
        // the important property is that it never panics and the arrays
        // stay aligned when beats are found.
        match source.detect(&audio).await {
            Ok(raw) => {
                assert_eq!(raw.times.len(), raw.onset_strength.len());
                assert_eq!(raw.times.len(), raw.is_downbeat.len());
            }
            Err(e) => assert!(matches!(e, crate::error::CompositorError::Audio(AudioError::NoBeats))),
        }
    }
}
