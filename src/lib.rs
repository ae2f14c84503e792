//! # Retro-Compositor
//!
//! Cuts a still-image slideshow to the beat of a music track: detects beats
//! in an audio file, plans a window-constrained sequence of cuts locked to
//! those beats, binds images to the resulting segments, and compiles the
//! whole thing into an ffmpeg filter-graph (hard cuts or crossfades with
//! per-boundary fallback).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use retro_compositor::{
//!     composition::{CompositionEngine, RenderRequest},
//!     config::Config,
//! };
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let config = Config::default();
//! let engine = CompositionEngine::new(config);
//! engine.compose(&RenderRequest {
//!     audio_path: "song.wav".into(),
//!     images_dir: "images/".into(),
//!     output_path: "output.mp4".into(),
//!     plan_in: None,
//!     plan_out: None,
//!     no_audio: false,
//!     audio_end_override: None,
//!     max_seconds: None,
//! }).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! The library is organized into several key modules:
//!
//! - [`audio`] - Audio loading and beat detection
//! - [`beats`] - Beat-set preparation (phase shift, collapse, reindex)
//! - [`planner`] - Beat-aligned cut selection state machine
//! - [`duration`] - Frame quantization and drift correction
//! - [`images`] - Image enumeration and segment binding
//! - [`graph`] - Filter-graph AST and transition palette
//! - [`overlay`] - Beat-synchronized overlay event composition
//! - [`plan_io`] - Plan document serialization
//! - [`encoder`] - ffmpeg subprocess invocation and image preprocessing
//! - [`workdir`] - Scoped render workdir lifecycle
//! - [`composition`] - End-to-end pipeline orchestration
//! - [`config`] - Layered configuration and presets

pub mod audio;
pub mod beats;
pub mod composition;
pub mod config;
pub mod duration;
pub mod encoder;
pub mod error;
pub mod graph;
pub mod images;
pub mod overlay;
pub mod plan_io;
pub mod planner;
pub mod workdir;

// Re-export commonly used types for convenience
pub use crate::{
    composition::CompositionEngine,
    config::Config,
    error::{CompositorError, Result},
};