//! Scoped workdir lifecycle: a render's intermediate artifacts live under
//! one directory, removed on success unless `--keep-workdir`, preserved on
//! failure for inspection.
//!
//! Grounded on a `VideoCompositor::ensure_temp_dir` / `cleanup` pair,
//! generalized from a single frame-dump directory to the full `beats.txt` /
//! `plan.toml` / `graph.txt` / `clips/NNNN.*` layout.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::Result;

/// A single render's scoped intermediate directory.
pub struct Workdir {
    root: PathBuf,
    keep: bool,
}

impl Workdir {
    /// Creates (or reuses) the workdir root and its `clips/` subdirectory.
    pub fn create(root: PathBuf, keep: bool) -> Result<Self> {
        std::fs::create_dir_all(root.join("clips"))?;
        debug!(?root, "workdir created");
        Ok(Self { root, keep })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn beats_path(&self) -> PathBuf {
        self.root.join("beats.txt")
    }

    pub fn plan_path(&self) -> PathBuf {
        self.root.join("plan.toml")
    }

    pub fn graph_path(&self) -> PathBuf {
        self.root.join("graph.txt")
    }

    /// Path for the `i`-th preprocessed image intermediate, content-addressed
    /// by segment index so repeated renders never collide mid-run.
    pub fn clip_path(&self, index: usize, extension: &str) -> PathBuf {
        self.root.join("clips").join(format!("{index:04}.{extension}"))
    }

    /// One beat time per line, seconds, post-phase-shift.
    pub fn write_beats(&self, times: &[f64]) -> Result<()> {
        let text: String = times.iter().map(|t| format!("{t:.6}\n")).collect();
        std::fs::write(self.beats_path(), text)?;
        Ok(())
    }

    pub fn write_graph(&self, filter_complex: &str) -> Result<()> {
        std::fs::write(self.graph_path(), filter_complex)?;
        Ok(())
    }

    /// Removes the workdir on success, unless the caller asked to keep it.
    pub fn finish(self, succeeded: bool) {
        if succeeded && !self.keep {
            if let Err(e) = std::fs::remove_dir_all(&self.root) {
                warn!(error = %e, root = ?self.root, "failed to remove workdir");
            } else {
                debug!(root = ?self.root, "workdir cleaned up");
            }
        } else if !succeeded {
            warn!(root = ?self.root, "render failed, preserving workdir for inspection");
        }
    }

    /// Unconditionally removes the workdir, ignoring `--keep-workdir`. Used
    /// on cooperative SIGINT cancellation: a deliberate abort isn't a
    /// failure worth preserving for inspection.
    pub fn finish_cancelled(self) {
        if let Err(e) = std::fs::remove_dir_all(&self.root) {
            warn!(error = %e, root = ?self.root, "failed to remove workdir after cancellation");
        } else {
            debug!(root = ?self.root, "workdir cleaned up after cancellation");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn create_lays_out_clips_subdirectory() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("run1");
        let workdir = Workdir::create(root.clone(), false).unwrap();
        assert!(workdir.root().join("clips").is_dir());
    }

    #[test]
    fn finish_removes_directory_on_success_unless_kept() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("run2");
        let workdir = Workdir::create(root.clone(), false).unwrap();
        workdir.finish(true);
        assert!(!root.exists());
    }

    #[test]
    fn finish_preserves_directory_on_failure() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("run3");
        let workdir = Workdir::create(root.clone(), false).unwrap();
        workdir.finish(false);
        assert!(root.exists());
    }

    #[test]
    fn finish_cancelled_removes_directory_even_when_keep_requested() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("run5");
        let workdir = Workdir::create(root.clone(), true).unwrap();
        workdir.finish_cancelled();
        assert!(!root.exists());
    }

    #[test]
    fn write_beats_formats_one_per_line() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("run4");
        let workdir = Workdir::create(root, false).unwrap();
        workdir.write_beats(&[1.0, 2.5]).unwrap();
        let text = std::fs::read_to_string(workdir.beats_path()).unwrap();
        assert_eq!(text, "1.000000\n2.500000\n");
    }
}
