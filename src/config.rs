use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::duration::FrameQuantizeMode;
use crate::error::{ConfigError, Result};
use crate::graph::render_spec::{Alignment, RenderMode};
use crate::graph::transitions::Transition;
use crate::overlay::MaskScope;
use crate::planner::Strategy;

/// Top-level configuration, layered the way the planner/graph/overlay
/// stages themselves are: one section per stage plus I/O.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub audio: AudioConfig,
    pub planner: PlannerConfig,
    pub render: RenderConfig,
    pub overlay: OverlayConfig,
    pub image: ImageConfig,
    pub io: IoConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            audio: AudioConfig::default(),
            planner: PlannerConfig::default(),
            render: RenderConfig::default(),
            overlay: OverlayConfig::default(),
            image: ImageConfig::default(),
            io: IoConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound { path: path.display().to_string() })?;

        let config: Config = toml::from_str(&content)
            .map_err(|_| ConfigError::ParseFailed { path: path.display().to_string() })?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::InvalidValue {
                key: "config".to_string(),
                value: e.to_string(),
            })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.audio.validate()?;
        self.planner.validate()?;
        self.render.validate()?;
        self.image.validate()?;
        Ok(())
    }

    /// Apply a named preset, but only to fields the user left at their
    /// built-in default: a pure `(user_params, preset) -> effective_params`
    /// merge with a per-field "was-defaulted" bitmap, never a mutable global
    /// parameter object.
    pub fn apply_preset(&mut self, preset: Preset, defaulted: &HashSet<&'static str>) {
        let values = preset.values();
        for (field, value) in values {
            if defaulted.contains(field) {
                value.apply(self);
            }
        }
    }
}

/// Audio analysis configuration: the knobs the default `BeatSource`
/// implementation (`audio::AnalyzerBeatSource`) is tuned with. `sample_rate`
/// is informational (the loader always uses the file's own rate; it is
/// surfaced here for operators who want to record/compare it alongside the
/// other analysis settings).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub window_size: usize,
    pub hop_size: usize,
    pub min_bpm: f32,
    pub max_bpm: f32,
    pub beat_sensitivity: f32,
}

impl AudioConfig {
    /// Maps onto `audio::types::AnalysisConfig`, the shape
    /// `AudioAnalyzer::with_config` actually consumes. Phrase/spectral-feature
    /// computation is left off: nothing downstream of `BeatSource` uses
    /// either, and skipping them keeps analysis to onset/beat detection only.
    pub fn to_analysis_config(&self) -> crate::audio::types::AnalysisConfig {
        crate::audio::types::AnalysisConfig {
            window_size: self.window_size,
            hop_size: self.hop_size,
            min_bpm: self.min_bpm,
            max_bpm: self.max_bpm,
            beat_sensitivity: self.beat_sensitivity,
            energy_window_size: 0.1,
            detect_phrases: false,
            calculate_spectral_features: false,
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            window_size: 1024,
            hop_size: 512,
            min_bpm: 60.0,
            max_bpm: 200.0,
            beat_sensitivity: 0.7,
        }
    }
}

impl AudioConfig {
    fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(ConfigError::InvalidValue {
                key: "audio.sample_rate".to_string(),
                value: self.sample_rate.to_string(),
            }
            .into());
        }

        if self.window_size == 0 || !self.window_size.is_power_of_two() {
            return Err(ConfigError::InvalidValue {
                key: "audio.window_size".to_string(),
                value: self.window_size.to_string(),
            }
            .into());
        }

        if self.min_bpm >= self.max_bpm {
            return Err(ConfigError::InvalidValue {
                key: "audio.bpm_range".to_string(),
                value: format!("{}-{}", self.min_bpm, self.max_bpm),
            }
            .into());
        }

        Ok(())
    }
}

/// Planner configuration: period window, strategy, gap floor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    pub period_min_s: f64,
    pub period_max_s: f64,
    pub target_s: f64,
    pub grace_s: f64,
    pub min_cut_gap_s: f64,
    /// Phase shift applied to beats before planning, distinct from
    /// `overlay.overlay_phase` which only shifts overlay timing.
    pub phase_s: f64,
    pub strict: bool,
    pub strategy: Strategy,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            period_min_s: 5.0,
            period_max_s: 10.0,
            target_s: 7.5,
            grace_s: 0.0,
            min_cut_gap_s: 0.12,
            phase_s: 0.0,
            strict: false,
            strategy: Strategy::Nearest,
        }
    }
}

impl PlannerConfig {
    fn validate(&self) -> Result<()> {
        if !(self.period_min_s > 0.0
            && self.period_min_s <= self.target_s
            && self.target_s <= self.period_max_s)
        {
            return Err(ConfigError::InvalidValue {
                key: "planner.period_range".to_string(),
                value: format!(
                    "{}-{}-{}",
                    self.period_min_s, self.target_s, self.period_max_s
                ),
            }
            .into());
        }

        if self.grace_s < 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "planner.grace_s".to_string(),
                value: self.grace_s.to_string(),
            }
            .into());
        }

        if self.min_cut_gap_s < 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "planner.min_cut_gap_s".to_string(),
                value: self.min_cut_gap_s.to_string(),
            }
            .into());
        }

        Ok(())
    }
}

/// Render/graph-emission configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub mode: RenderMode,
    pub transition: Transition,
    pub xfade_s: f64,
    pub xfade_min_s: f64,
    pub align: Alignment,
    pub frame_quantize: FrameQuantizeMode,
    pub fps: f64,
    pub width: u32,
    pub height: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            mode: RenderMode::Crossfade,
            transition: Transition::Crossfade,
            xfade_s: 0.6,
            xfade_min_s: 0.1,
            align: Alignment::End,
            frame_quantize: FrameQuantizeMode::Nearest,
            fps: 30.0,
            width: 1920,
            height: 1080,
        }
    }
}

impl RenderConfig {
    fn validate(&self) -> Result<()> {
        if self.xfade_s <= 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "render.xfade_s".to_string(),
                value: self.xfade_s.to_string(),
            }
            .into());
        }

        if self.fps <= 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "render.fps".to_string(),
                value: self.fps.to_string(),
            }
            .into());
        }

        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::InvalidValue {
                key: "render.resolution".to_string(),
                value: format!("{}x{}", self.width, self.height),
            }
            .into());
        }

        Ok(())
    }
}

pub use crate::overlay::OverlayConfig;

/// Image enumeration/binding configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    pub directory: std::path::PathBuf,
    pub shuffle: bool,
    pub seed: u64,
    pub loop_images: bool,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            directory: std::path::PathBuf::from("./images"),
            shuffle: true,
            seed: 1337,
            loop_images: false,
        }
    }
}

impl ImageConfig {
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// Plan I/O and workdir configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IoConfig {
    pub workdir: std::path::PathBuf,
    pub keep_workdir_on_failure: bool,
    pub encoder_timeout_s: u64,
    /// Run the bounded-parallel scale/pad pre-stage (spec.md §5) before
    /// handing images to the encoder, writing normalised intermediates
    /// under the workdir's `clips/` directory.
    pub preprocess_images: bool,
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            workdir: std::path::PathBuf::from("./.retro-compositor-work"),
            keep_workdir_on_failure: true,
            encoder_timeout_s: 600,
            preprocess_images: true,
        }
    }
}

/// Named bundles of planner/render/overlay defaults. Each variant maps to a
/// fixed list of (field-name, value) overlays; `Config::apply_preset`
/// applies an overlay only where the user left the corresponding field at
/// its built-in default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Preset {
    MusicVideo,
    Hypercut,
    SlowCinematic,
    Documentary,
    EdmStrobe,
}

/// One field/value overlay contributed by a preset.
enum PresetValue {
    PeriodRange(f64, f64, f64),
    Strategy(Strategy),
    Transition(Transition),
    XfadeS(f64),
    MarkBeats(bool),
    Pulse(bool),
    Bloom(bool),
    Mode(RenderMode),
}

impl PresetValue {
    fn apply(&self, config: &mut Config) {
        match self {
            Self::PeriodRange(min, target, max) => {
                config.planner.period_min_s = *min;
                config.planner.target_s = *target;
                config.planner.period_max_s = *max;
            }
            Self::Strategy(s) => config.planner.strategy = *s,
            Self::Transition(t) => config.render.transition = *t,
            Self::XfadeS(x) => config.render.xfade_s = *x,
            Self::MarkBeats(b) => config.overlay.mark_beats = *b,
            Self::Pulse(b) => config.overlay.pulse = *b,
            Self::Bloom(b) => config.overlay.bloom = *b,
            Self::Mode(m) => config.render.mode = *m,
        }
    }
}

impl Preset {
    /// `field` strings match the CLI long-flag names; `Config::apply_preset`
    /// only consults the (name, value) pairs whose name is in the
    /// was-defaulted bitmap passed in by the caller.
    fn values(self) -> Vec<(&'static str, PresetValue)> {
        match self {
            Self::MusicVideo => vec![
                ("period_range", PresetValue::PeriodRange(5.0, 7.5, 10.0)),
                ("strategy", PresetValue::Strategy(Strategy::Hybrid)),
                ("transition", PresetValue::Transition(Transition::Crossfade)),
                ("xfade_s", PresetValue::XfadeS(0.6)),
                ("mark_beats", PresetValue::MarkBeats(true)),
            ],
            Self::Hypercut => vec![
                ("period_range", PresetValue::PeriodRange(0.5, 1.0, 2.0)),
                ("strategy", PresetValue::Strategy(Strategy::Nearest)),
                ("mode", PresetValue::Mode(RenderMode::Hardcut)),
                ("mark_beats", PresetValue::MarkBeats(true)),
            ],
            Self::SlowCinematic => vec![
                ("period_range", PresetValue::PeriodRange(8.0, 10.0, 14.0)),
                ("strategy", PresetValue::Strategy(Strategy::Downbeat)),
                ("transition", PresetValue::Transition(Transition::Dissolve)),
                ("xfade_s", PresetValue::XfadeS(1.2)),
            ],
            Self::Documentary => vec![
                ("period_range", PresetValue::PeriodRange(6.0, 9.0, 12.0)),
                ("strategy", PresetValue::Strategy(Strategy::Nearest)),
                ("transition", PresetValue::Transition(Transition::Dissolve)),
                ("xfade_s", PresetValue::XfadeS(0.8)),
            ],
            Self::EdmStrobe => vec![
                ("period_range", PresetValue::PeriodRange(0.25, 0.5, 1.0)),
                ("strategy", PresetValue::Strategy(Strategy::Energy)),
                ("mode", PresetValue::Mode(RenderMode::Hardcut)),
                ("mark_beats", PresetValue::MarkBeats(true)),
                ("pulse", PresetValue::Pulse(true)),
                ("bloom", PresetValue::Bloom(true)),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test_config.toml");

        let original_config = Config::default();

        original_config.save_to_file(&file_path).unwrap();
        let loaded_config = Config::from_file(&file_path).unwrap();

        assert_eq!(original_config.audio.sample_rate, loaded_config.audio.sample_rate);
        assert_eq!(original_config.render.fps, loaded_config.render.fps);
    }

    #[test]
    fn invalid_audio_config() {
        let mut config = Config::default();
        config.audio.sample_rate = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn invalid_period_range() {
        let mut config = Config::default();
        config.planner.period_min_s = 12.0;
        config.planner.period_max_s = 10.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn preset_only_overrides_defaulted_fields() {
        let mut config = Config::default();
        config.render.xfade_s = 0.9; // user explicitly set this
        let defaulted: HashSet<&'static str> = ["period_range", "strategy", "xfade_s", "mark_beats"]
            .into_iter()
            .filter(|f| *f != "xfade_s")
            .collect();

        config.apply_preset(Preset::MusicVideo, &defaulted);

        assert_eq!(config.planner.strategy, Strategy::Hybrid);
        assert_eq!(config.render.xfade_s, 0.9, "user override must survive preset merge");
    }

    #[test]
    fn edm_strobe_preset_enables_pulse_and_bloom() {
        let mut config = Config::default();
        let defaulted: HashSet<&'static str> =
            ["period_range", "strategy", "mode", "mark_beats", "pulse", "bloom"]
                .into_iter()
                .collect();
        config.apply_preset(Preset::EdmStrobe, &defaulted);
        assert!(config.overlay.pulse);
        assert!(config.overlay.bloom);
        assert_eq!(config.render.mode, RenderMode::Hardcut);
    }
}
