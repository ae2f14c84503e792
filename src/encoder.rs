//! ffmpeg subprocess wrapper and the bounded-parallel image preprocessing
//! pool.
//!
//! The subprocess lifecycle (check-availability, spawn, wait with timeout,
//! cancel, inspect output) follows the same shape as a frame-sequence
//! compositor's child-process handling, generalized from frame-sequence +
//! raw-audio-mux to filter-graph invocation with the compiled
//! `CompiledGraph` as input.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use image::{GenericImageView, Rgba, RgbaImage};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::error::{EncoderError, ImageError, Result};
use crate::graph::CompiledGraph;
use crate::workdir::Workdir;

/// Result of a successful encode.
#[derive(Debug, Clone)]
pub struct EncodedVideo {
    pub path: PathBuf,
    pub duration_s: f64,
    pub file_size: u64,
}

/// Default grace period between a cooperative shutdown request and a
/// force-kill.
const DEFAULT_SIGINT_GRACE: Duration = Duration::from_secs(5);

/// Invokes ffmpeg against a compiled filter graph, writing it to the
/// workdir's `graph.txt` first so it can be inspected or replayed by hand.
pub struct Encoder {
    timeout: Duration,
    sigint_grace: Duration,
}

impl Encoder {
    pub fn new(timeout_s: u64) -> Self {
        Self {
            timeout: Duration::from_secs(timeout_s),
            sigint_grace: DEFAULT_SIGINT_GRACE,
        }
    }

    /// Overrides the SIGINT-to-force-kill grace period (tests only need a
    /// shorter one than the 5s default).
    pub fn with_sigint_grace(mut self, grace: Duration) -> Self {
        self.sigint_grace = grace;
        self
    }

    pub fn check_ffmpeg_available() -> bool {
        std::process::Command::new("ffmpeg")
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    /// Runs ffmpeg with the compiled graph's inputs and filter-complex text,
    /// muxing in `audio_path`, writing `output_path`. Cancels the child
    /// process (rather than leaking it) if `timeout_s` elapses.
    pub async fn encode(
        &self,
        graph: &CompiledGraph,
        audio_path: &Path,
        output_path: &Path,
        fps: f64,
    ) -> Result<EncodedVideo> {
        if !Self::check_ffmpeg_available() {
            return Err(EncoderError::NotFound {
                program: "ffmpeg".to_string(),
            }
            .into());
        }

        let mut cmd = Command::new("ffmpeg");
        cmd.arg("-y");
        for input in &graph.inputs {
            cmd.args(["-loop", "1", "-t", &format!("{:.6}", input.duration_s)]);
            cmd.args(["-i", &input.image.display().to_string()]);
        }
        cmd.args(["-i", &audio_path.display().to_string()]);
        cmd.args(["-filter_complex", &graph.filter_complex]);
        cmd.args(["-map", &format!("[{}]", graph.output_label)]);
        cmd.args(["-map", &format!("{}:a", graph.inputs.len())]);
        cmd.args(["-r", &fps.to_string(), "-pix_fmt", "yuv420p", "-shortest"]);
        cmd.arg(output_path);
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        debug!(inputs = graph.inputs.len(), ?output_path, "spawning ffmpeg");

        let mut child = cmd.spawn().map_err(|e| EncoderError::EncodingFailed {
            reason: format!("failed to spawn ffmpeg: {e}"),
        })?;

        let status = tokio::select! {
            biased;

            result = child.wait() => {
                result.map_err(|e| EncoderError::EncodingFailed {
                    reason: format!("ffmpeg execution failed: {e}"),
                })?
            }

            _ = tokio::time::sleep(self.timeout) => {
                warn!("ffmpeg exceeded timeout, killing child process");
                let _ = child.start_kill();
                let _ = child.wait().await;
                return Err(EncoderError::TimedOut {
                    seconds: self.timeout.as_secs_f64(),
                }
                .into());
            }

            _ = tokio::signal::ctrl_c() => {
                warn!("received interrupt, requesting graceful ffmpeg shutdown");
                // ffmpeg treats 'q' on stdin as a request to stop encoding
                // and finalize the output, rather than a hard kill.
                if let Some(stdin) = child.stdin.as_mut() {
                    let _ = stdin.write_all(b"q").await;
                }
                match timeout(self.sigint_grace, child.wait()).await {
                    Ok(Ok(status)) => status,
                    _ => {
                        warn!(
                            grace_s = self.sigint_grace.as_secs_f64(),
                            "graceful shutdown grace period elapsed, force-terminating"
                        );
                        let _ = child.start_kill();
                        let _ = child.wait().await;
                        return Err(EncoderError::Cancelled.into());
                    }
                }
            }
        };

        if !status.success() {
            let mut stderr_buf = Vec::new();
            if let Some(mut stderr) = child.stderr.take() {
                use tokio::io::AsyncReadExt;
                let _ = stderr.read_to_end(&mut stderr_buf).await;
            }
            let stderr = String::from_utf8_lossy(&stderr_buf);
            return Err(EncoderError::EncodingFailed {
                reason: stderr.trim().to_string(),
            }
            .into());
        }

        let metadata = std::fs::metadata(output_path)?;
        let duration_s = graph.inputs.iter().map(|i| i.duration_s).sum();

        info!(
            bytes = metadata.len(),
            duration_s, "ffmpeg encode complete"
        );

        Ok(EncodedVideo {
            path: output_path.to_path_buf(),
            duration_s,
            file_size: metadata.len(),
        })
    }

    /// Cancels a still-running child by sending it a termination request and
    /// awaiting exit, rather than letting it leak past the caller's scope.
    pub async fn cancel(mut child: tokio::process::Child) -> Result<()> {
        if let Some(mut stdin) = child.stdin.take() {
            let _ = stdin.shutdown().await;
        }
        child.start_kill().map_err(|e| EncoderError::EncodingFailed {
            reason: format!("failed to cancel encoder: {e}"),
        })?;
        let _ = child.wait().await;
        warn!("encoder cancelled");
        Err(EncoderError::Cancelled.into())
    }
}

/// Preprocesses a batch of source images across a bounded worker pool, sized
/// to leave headroom for ffmpeg itself: decodes each still, scales it to fit
/// within `width`x`height` preserving aspect ratio, pads the remainder with
/// black, and writes the result to the workdir's `clips/NNNN.png`, keyed by
/// the image's position in the (already segment-bound) input slice. No
/// shared mutability beyond the append-only result vector, keyed by index.
/// A single decode/encode failure is fatal to the whole render.
pub fn preprocess_images(
    paths: &[PathBuf],
    workdir: &Workdir,
    width: u32,
    height: u32,
) -> Result<Vec<PathBuf>> {
    use rayon::prelude::*;

    let pool_size = ((num_cpus::get() as f64) * 0.75).ceil().max(1.0) as usize;
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(pool_size)
        .build()
        .map_err(|e| ImageError::PreprocessingFailed {
            reason: e.to_string(),
        })?;

    debug!(pool_size, count = paths.len(), width, height, "preprocessing images");

    let results: Vec<Result<PathBuf>> = pool.install(|| {
        paths
            .par_iter()
            .enumerate()
            .map(|(index, path)| scale_and_pad(path, workdir, index, width, height))
            .collect()
    });

    results.into_iter().collect()
}

/// Scales `path` to fit within `width`x`height` (preserving aspect ratio,
/// matching the ffmpeg `force_original_aspect_ratio=decrease` idiom the
/// graph builder's own `Format` node uses), pads the remainder with black,
/// and writes the result as a PNG to `workdir.clip_path(index, "png")`.
fn scale_and_pad(path: &Path, workdir: &Workdir, index: usize, width: u32, height: u32) -> Result<PathBuf> {
    let img = image::open(path).map_err(|e| ImageError::PreprocessingFailed {
        reason: format!("{}: {e}", path.display()),
    })?;

    let (src_w, src_h) = img.dimensions();
    let scale = (width as f64 / src_w as f64).min(height as f64 / src_h as f64);
    let new_w = ((src_w as f64 * scale).round() as u32).clamp(1, width);
    let new_h = ((src_h as f64 * scale).round() as u32).clamp(1, height);
    let resized = img
        .resize_exact(new_w, new_h, image::imageops::FilterType::Lanczos3)
        .to_rgba8();

    let mut canvas = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255]));
    let x = ((width - new_w) / 2) as i64;
    let y = ((height - new_h) / 2) as i64;
    image::imageops::overlay(&mut canvas, &resized, x, y);

    let out_path = workdir.clip_path(index, "png");
    canvas.save(&out_path).map_err(|e| ImageError::PreprocessingFailed {
        reason: format!("{}: {e}", out_path.display()),
    })?;

    Ok(out_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn pool_size_is_three_quarters_of_cores_rounded_up() {
        let cores = num_cpus::get();
        let expected = ((cores as f64) * 0.75).ceil().max(1.0) as usize;
        assert!(expected >= 1 && expected <= cores.max(1));
    }

    #[tokio::test]
    async fn encode_without_ffmpeg_available_is_handled_gracefully() {
        // This just exercises the availability probe; it must never panic
        // regardless of whether ffmpeg happens to be on PATH in CI.
        let _ = Encoder::check_ffmpeg_available();
    }

    fn write_source_image(dir: &Path, name: &str, w: u32, h: u32) -> PathBuf {
        let img = RgbaImage::from_pixel(w, h, Rgba([10, 20, 30, 255]));
        let path = dir.join(name);
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn scale_and_pad_produces_exact_target_dimensions() {
        let dir = tempdir().unwrap();
        let src = write_source_image(dir.path(), "wide.png", 400, 100);
        let workdir = Workdir::create(dir.path().join("work"), false).unwrap();

        let out = scale_and_pad(&src, &workdir, 0, 200, 150).unwrap();
        let produced = image::open(&out).unwrap();
        assert_eq!(produced.dimensions(), (200, 150));
        assert_eq!(out, workdir.clip_path(0, "png"));
    }

    #[test]
    fn preprocess_images_keys_outputs_by_segment_index() {
        let dir = tempdir().unwrap();
        let a = write_source_image(dir.path(), "a.png", 100, 100);
        let b = write_source_image(dir.path(), "b.png", 300, 100);
        let workdir = Workdir::create(dir.path().join("work"), false).unwrap();

        let out = preprocess_images(&[a, b], &workdir, 160, 90).unwrap();
        assert_eq!(out, vec![workdir.clip_path(0, "png"), workdir.clip_path(1, "png")]);
        for path in &out {
            assert_eq!(image::open(path).unwrap().dimensions(), (160, 90));
        }
    }
}
