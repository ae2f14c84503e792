//! Plan serialisation: a stable, human-readable round-trip document for the
//! planner's output plus every scalar parameter needed to re-render
//! byte-identically.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{PlanIoError, Result};
use crate::planner::{Strategy, WindowUsed};

/// Current plan-document schema version. Bump on any breaking field change;
/// readers reject a file whose major version doesn't match.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CutRecord {
    pub time_s: f64,
    pub beat_index: usize,
    pub window_used: WindowUsed,
    pub strategy_used: Strategy,
}

/// Snapshot of every scalar parameter that affects graph emission, captured
/// at plan time so a later `--plan-in` re-render is reproducible without
/// re-specifying every flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveParamsSnapshot {
    pub period_min_s: f64,
    pub period_max_s: f64,
    pub target_s: f64,
    pub grace_s: f64,
    pub min_cut_gap_s: f64,
    pub phase_s: f64,
    pub strict: bool,
    pub strategy: Strategy,
    pub hardcuts: bool,
    pub transition: String,
    pub xfade_s: f64,
    pub xfade_min_s: f64,
    pub align: String,
    pub frame_quantize: String,
    pub seed: u64,
    pub shuffle: bool,
    pub image_loop: bool,
}

/// The full round-trippable plan document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanDocument {
    pub schema_version: u32,
    pub params: EffectiveParamsSnapshot,
    pub beats: Vec<f64>,
    pub cuts: Vec<CutRecord>,
    pub durations_s: Vec<f64>,
    pub images: Vec<PathBuf>,
    pub fps: f64,
    pub width: u32,
    pub height: u32,
}

pub struct PlanIo;

impl PlanIo {
    pub fn save(doc: &PlanDocument, path: &Path) -> Result<()> {
        let text = toml::to_string_pretty(doc).map_err(|_| PlanIoError::WriteFailed {
            path: path.display().to_string(),
        })?;
        std::fs::write(path, text).map_err(|_| {
            PlanIoError::WriteFailed {
                path: path.display().to_string(),
            }
            .into()
        })
    }

    pub fn load(path: &Path) -> Result<PlanDocument> {
        let text = std::fs::read_to_string(path).map_err(|_| PlanIoError::FileNotFound {
            path: path.display().to_string(),
        })?;
        let doc: PlanDocument = toml::from_str(&text).map_err(|_| PlanIoError::ParseFailed {
            path: path.display().to_string(),
        })?;

        if doc.schema_version != SCHEMA_VERSION {
            return Err(PlanIoError::SchemaMismatch {
                found: doc.schema_version,
                expected: SCHEMA_VERSION,
            }
            .into());
        }

        Ok(doc)
    }

    /// Re-binds any missing image path by position from `current_images`,
    /// preserving the original count.
    pub fn rebind_missing_images(doc: &mut PlanDocument, current_images: &[PathBuf]) {
        for (i, image) in doc.images.iter_mut().enumerate() {
            if image.exists() {
                continue;
            }
            if let Some(replacement) = current_images.get(i) {
                warn!(
                    index = i,
                    missing = %image.display(),
                    replacement = %replacement.display(),
                    "plan image missing, re-binding from current image directory"
                );
                *image = replacement.clone();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_doc() -> PlanDocument {
        PlanDocument {
            schema_version: SCHEMA_VERSION,
            params: EffectiveParamsSnapshot {
                period_min_s: 5.0,
                period_max_s: 10.0,
                target_s: 7.5,
                grace_s: 0.0,
                min_cut_gap_s: 0.12,
                phase_s: 0.0,
                strict: false,
                strategy: Strategy::Nearest,
                hardcuts: false,
                transition: "crossfade".to_string(),
                xfade_s: 0.6,
                xfade_min_s: 0.1,
                align: "end".to_string(),
                frame_quantize: "nearest".to_string(),
                seed: 1337,
                shuffle: true,
                image_loop: false,
            },
            beats: vec![1.0, 2.0, 3.0],
            cuts: vec![CutRecord {
                time_s: 1.0,
                beat_index: 0,
                window_used: WindowUsed::Normal,
                strategy_used: Strategy::Nearest,
            }],
            durations_s: vec![4.0],
            images: vec![PathBuf::from("a.png")],
            fps: 30.0,
            width: 1920,
            height: 1080,
        }
    }

    #[test]
    fn round_trips_byte_identically_through_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plan.toml");
        let doc = sample_doc();
        PlanIo::save(&doc, &path).unwrap();
        let first_bytes = std::fs::read(&path).unwrap();
        let loaded = PlanIo::load(&path).unwrap();
        PlanIo::save(&loaded, &path).unwrap();
        let second_bytes = std::fs::read(&path).unwrap();
        assert_eq!(first_bytes, second_bytes);
    }

    #[test]
    fn schema_mismatch_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plan.toml");
        let mut doc = sample_doc();
        doc.schema_version = SCHEMA_VERSION + 1;
        PlanIo::save(&doc, &path).unwrap();
        let result = PlanIo::load(&path);
        assert!(result.is_err());
    }

    #[test]
    fn rebinds_missing_image_by_position() {
        let mut doc = sample_doc();
        doc.images = vec![PathBuf::from("/nonexistent/missing.png")];
        let current = vec![PathBuf::from("/nonexistent/replacement.png")];
        PlanIo::rebind_missing_images(&mut doc, &current);
        assert_eq!(doc.images[0], PathBuf::from("/nonexistent/replacement.png"));
    }
}
