use thiserror::Error;

/// Top-level error type for the beat-aligned slideshow pipeline
#[derive(Error, Debug)]
pub enum CompositorError {
    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("Planner error: {0}")]
    Planner(#[from] PlannerError),

    #[error("Graph builder error: {0}")]
    Graph(#[from] GraphError),

    #[error("Image error: {0}")]
    Image(#[from] ImageError),

    #[error("Encoder error: {0}")]
    Encoder(#[from] EncoderError),

    #[error("Plan I/O error: {0}")]
    PlanIo(#[from] PlanIoError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Generic(String),
}

/// Audio loading and beat-detection errors
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Failed to load audio file: {path}")]
    LoadFailed { path: String },

    #[error("Unsupported audio format: {format}")]
    UnsupportedFormat { format: String },

    #[error("Beat detection failed: {reason}")]
    BeatDetectionFailed { reason: String },

    #[error("Audio analysis failed: {reason}")]
    AnalysisFailed { reason: String },

    #[error("Invalid audio parameters: {details}")]
    InvalidParameters { details: String },

    #[error("No beats detected in audio track")]
    NoBeats,
}

/// Planner state-machine errors (strict mode with no usable beat)
#[derive(Error, Debug)]
pub enum PlannerError {
    #[error("no beat found in window after grace expansion (previous cut at {prev_cut:.3}s, window [{window_start:.3}, {window_end:.3}])")]
    NoBeatInWindow {
        prev_cut: f64,
        window_start: f64,
        window_end: f64,
    },

    #[error("invalid planner parameter: {details}")]
    InvalidParameter { details: String },
}

/// Filter-graph construction errors
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("unknown transition: {name}")]
    UnknownTransition { name: String },

    #[error("invalid render parameter: {details}")]
    InvalidParameter { details: String },

    #[error("graph emission failed: {reason}")]
    EmissionFailed { reason: String },
}

/// Image enumeration / binding errors
#[derive(Error, Debug)]
pub enum ImageError {
    #[error("no images found in directory: {path}")]
    NoImagesFound { path: String },

    #[error("failed to read image directory: {path}")]
    DirectoryReadFailed { path: String },

    #[error("image preprocessing failed: {reason}")]
    PreprocessingFailed { reason: String },
}

/// External encoder (ffmpeg) invocation errors
#[derive(Error, Debug)]
pub enum EncoderError {
    #[error("encoder not found on PATH: {program}")]
    NotFound { program: String },

    #[error("encoder invocation failed: {reason}")]
    EncodingFailed { reason: String },

    #[error("encoder timed out after {seconds:.1}s")]
    TimedOut { seconds: f64 },

    #[error("encoder was cancelled")]
    Cancelled,
}

/// Plan-document serialisation errors
#[derive(Error, Debug)]
pub enum PlanIoError {
    #[error("failed to parse plan file: {path}")]
    ParseFailed { path: String },

    #[error("plan schema mismatch: file is schema v{found}, expected v{expected}")]
    SchemaMismatch { found: u32, expected: u32 },

    #[error("plan file not found: {path}")]
    FileNotFound { path: String },

    #[error("failed to write plan file: {path}")]
    WriteFailed { path: String },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to parse configuration file: {path}")]
    ParseFailed { path: String },

    #[error("invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("missing required configuration: {key}")]
    MissingKey { key: String },

    #[error("configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("unknown preset: {name}")]
    UnknownPreset { name: String },
}

/// Convenience alias used throughout the crate
pub type Result<T> = std::result::Result<T, CompositorError>;

impl CompositorError {
    /// Build a generic error from any displayable message
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic(message.into())
    }

    /// Process exit code this error should surface as.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::Planner(PlannerError::InvalidParameter { .. }) => 2,
            Self::Graph(GraphError::InvalidParameter { .. } | GraphError::UnknownTransition { .. }) => 2,
            Self::Audio(AudioError::NoBeats) => 3,
            Self::Planner(PlannerError::NoBeatInWindow { .. }) => 4,
            Self::Encoder(_) => 5,
            Self::Io(_) | Self::PlanIo(_) => 6,
            _ => 1,
        }
    }

    /// Whether retrying the operation unchanged has a chance of succeeding.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::Audio(AudioError::LoadFailed { .. })
        )
    }

    /// A message suitable for printing to the end user (no backtraces, no internals).
    pub fn user_message(&self) -> String {
        match self {
            Self::Audio(AudioError::LoadFailed { path }) => {
                format!("Could not load audio file '{path}'. Check that it exists and is a supported format.")
            }
            Self::Image(ImageError::NoImagesFound { path }) => {
                format!("No images found in '{path}'.")
            }
            Self::Planner(PlannerError::NoBeatInWindow {
                prev_cut,
                window_start,
                window_end,
            }) => format!(
                "No beat found in window [{window_start:.3}, {window_end:.3}]s after cut at {prev_cut:.3}s, even after grace expansion. Try --on-miss fallback or a wider --grace."
            ),
            Self::Config(ConfigError::FileNotFound { path }) => {
                format!("Configuration file '{path}' not found.")
            }
            Self::Config(ConfigError::UnknownPreset { name }) => {
                format!("Unknown preset '{name}'.")
            }
            other => other.to_string(),
        }
    }
}
