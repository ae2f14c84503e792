//! # Composition Engine
//!
//! Coordinates audio loading, beat detection, planning, duration
//! quantization, image binding, graph emission, and ffmpeg encoding into a
//! single end-to-end render.

pub mod engine;

// Re-exports for convenience
pub use engine::{CompositionEngine, RenderRequest};