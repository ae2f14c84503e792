//! Filter-graph compiler: turns (images, cuts, render parameters) into a
//! side-effect-free ffmpeg `-filter_complex` instruction stream.
//!
//! Grounded on the string-built filter-graph idiom (per-segment
//! `trim`/`setpts` labels, `concat`, offset-based `xfade` chain) shown in
//! the instantOS render pipeline's `build_filter_complex`/`apply_overlays`,
//! but restructured as a small AST with a single printer instead of ad hoc
//! string concatenation.

pub mod render_spec;
pub mod transitions;

use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::Result;
use crate::overlay::{MaskScope, OverlayEvent};
use render_spec::{Alignment, RenderMode, RenderSpec};
use transitions::{FallbackMarker, Transition};

/// A single ffmpeg input: an image shown (via `-loop 1`) for `duration_s`.
#[derive(Debug, Clone)]
pub struct InputSpec {
    pub image: PathBuf,
    pub duration_s: f64,
}

/// Small graph-emission AST. The printer is the only component that knows
/// ffmpeg filter syntax; everything upstream only ever builds this tree.
#[derive(Debug, Clone)]
pub enum GraphNode {
    /// A single formatted input stream (leaf).
    Source(usize),
    /// Plain concatenation of two or more children, in order.
    Concat(Vec<GraphNode>),
    /// A crossfade transition between exactly two children.
    Xfade {
        lhs: Box<GraphNode>,
        rhs: Box<GraphNode>,
        transition: Transition,
        duration_s: f64,
        offset_s: f64,
    },
    /// Applies scale/pad/fps/pixel-format normalisation.
    Format {
        child: Box<GraphNode>,
        width: u32,
        height: u32,
        fps: f64,
    },
    /// Applies a sorted set of overlay events atop the child stream.
    Overlay {
        child: Box<GraphNode>,
        events: Vec<OverlayEvent>,
    },
    /// Scopes the child's overlay to a foreground/background mask region.
    WithMask {
        child: Box<GraphNode>,
        scope: MaskScope,
        mask_source: Option<PathBuf>,
    },
    /// A one-frame marker drawn at a hard-cut fallback boundary's landing
    /// time (`--cut-markers`).
    CutMarker {
        child: Box<GraphNode>,
        marker: FallbackMarker,
        at_s: f64,
        fps: f64,
    },
}

/// The compiled output: ffmpeg inputs plus the filter-graph text that
/// references them by index, ready to be written to the workdir's
/// `graph.txt` side-file.
#[derive(Debug, Clone)]
pub struct CompiledGraph {
    pub inputs: Vec<InputSpec>,
    pub filter_complex: String,
    pub output_label: String,
}

/// Builds and prints the graph for a plan's segments.
pub struct GraphBuilder;

impl GraphBuilder {
    pub fn build(
        images: &[PathBuf],
        durations: &[f64],
        spec: &RenderSpec,
    ) -> Result<CompiledGraph> {
        assert_eq!(images.len(), durations.len(), "one image per segment required");

        let inputs: Vec<InputSpec> = images
            .iter()
            .zip(durations.iter())
            .map(|(img, d)| InputSpec {
                image: img.clone(),
                duration_s: *d,
            })
            .collect();

        let formatted: Vec<GraphNode> = (0..inputs.len())
            .map(|i| GraphNode::Format {
                child: Box::new(GraphNode::Source(i)),
                width: spec.width,
                height: spec.height,
                fps: spec.fps,
            })
            .collect();

        let tree = match spec.mode {
            RenderMode::Hardcut => GraphNode::Concat(formatted),
            RenderMode::Crossfade => Self::build_crossfade_chain(formatted, durations, spec)?,
        };

        let overlaid = if spec.overlay_events.is_empty() {
            tree
        } else {
            let mut events = spec.overlay_events.clone();
            events.sort_by(|a, b| a.time_s.partial_cmp(&b.time_s).unwrap());
            GraphNode::Overlay {
                child: Box::new(tree),
                events,
            }
        };

        let mut printer = Printer::new(inputs.clone());
        let output_label = printer.print(&overlaid);

        Ok(CompiledGraph {
            inputs,
            filter_complex: printer.finish(),
            output_label,
        })
    }

    fn build_crossfade_chain(
        formatted: Vec<GraphNode>,
        durations: &[f64],
        spec: &RenderSpec,
    ) -> Result<GraphNode> {
        let boundaries = match spec.plan_boundaries(durations) {
            Some(b) => b,
            None => return Ok(GraphNode::Concat(formatted)),
        };

        let mut iter = formatted.into_iter();
        let mut chain = iter.next().expect("at least one segment");

        for (boundary, next) in boundaries.into_iter().zip(iter) {
            chain = if boundary.safe {
                GraphNode::Xfade {
                    lhs: Box::new(chain),
                    rhs: Box::new(next),
                    transition: spec.transition,
                    duration_s: spec.xfade_s,
                    offset_s: boundary.offset_s,
                }
            } else {
                let concatenated = GraphNode::Concat(vec![chain, next]);
                match spec.cut_marker {
                    Some(marker) => GraphNode::CutMarker {
                        child: Box::new(concatenated),
                        marker,
                        at_s: boundary.cut_time_s,
                        fps: spec.fps,
                    },
                    None => concatenated,
                }
            };
        }

        Ok(chain)
    }
}

/// Flattens the AST into an ffmpeg `-filter_complex` string, tracking
/// per-node output labels as it goes (grounded on the
/// `source_map: HashMap<PathBuf, usize>` / labeled-filter-string idiom from
/// the instantOS render pipeline).
struct Printer {
    inputs: Vec<InputSpec>,
    lines: Vec<String>,
    next_label: usize,
}

impl Printer {
    fn new(inputs: Vec<InputSpec>) -> Self {
        Self {
            inputs,
            lines: Vec::new(),
            next_label: 0,
        }
    }

    fn fresh_label(&mut self) -> String {
        let label = format!("v{}", self.next_label);
        self.next_label += 1;
        label
    }

    fn print(&mut self, node: &GraphNode) -> String {
        match node {
            GraphNode::Source(idx) => format!("{idx}:v"),
            GraphNode::Format { child, width, height, fps } => {
                let src = self.print(child);
                let out = self.fresh_label();
                self.lines.push(format!(
                    "[{src}]scale={width}:{height}:force_original_aspect_ratio=decrease,\
pad={width}:{height}:(ow-iw)/2:(oh-ih)/2,setsar=1,fps={fps}[{out}]"
                ));
                out
            }
            GraphNode::Concat(children) => {
                let labels = self.flatten_concat(children);
                let out = self.fresh_label();
                let refs: String = labels.iter().map(|l| format!("[{l}]")).collect();
                self.lines
                    .push(format!("{refs}concat=n={}:v=1:a=0[{out}]", labels.len()));
                out
            }
            GraphNode::Xfade {
                lhs,
                rhs,
                transition,
                duration_s,
                offset_s,
            } => {
                let l = self.print(lhs);
                let r = self.print(rhs);
                let out = self.fresh_label();
                self.lines.push(format!(
                    "[{l}][{r}]xfade=transition={}:duration={duration_s:.3}:offset={offset_s:.3}[{out}]",
                    transition.ffmpeg_id()
                ));
                out
            }
            GraphNode::Overlay { child, events } => {
                let mut current = self.print(child);
                for event in events {
                    current = self.print_overlay_event(&current, event);
                }
                current
            }
            GraphNode::CutMarker {
                child,
                marker,
                at_s,
                fps,
            } => {
                let src = self.print(child);
                let out = self.fresh_label();
                let end_s = *at_s + 1.0 / *fps;
                self.lines.push(format!(
                    "[{src}]{}:enable='between(t,{:.3},{:.3})'[{out}]",
                    marker.ffmpeg_fragment(),
                    at_s,
                    end_s
                ));
                out
            }
            GraphNode::WithMask {
                child,
                scope,
                mask_source,
            } => {
                // Silently degrades to `none` when no mask is available:
                // print the child unscoped.
                match (scope, mask_source) {
                    (MaskScope::None, _) | (_, None) => self.print(child),
                    (scope, Some(mask)) => {
                        let src = self.print(child);
                        let out = self.fresh_label();
                        self.lines.push(format!(
                            "[{src}]alphamerge=mask={}:scope={:?}[{out}]",
                            mask.display(),
                            scope
                        ));
                        out
                    }
                }
            }
        }
    }

    fn flatten_concat(&mut self, children: &[GraphNode]) -> Vec<String> {
        let mut labels = Vec::with_capacity(children.len());
        for child in children {
            if let GraphNode::Concat(inner) = child {
                labels.extend(self.flatten_concat(inner));
            } else {
                labels.push(self.print(child));
            }
        }
        labels
    }

    fn print_overlay_event(&mut self, base: &str, event: &OverlayEvent) -> String {
        let out = self.fresh_label();
        let window = format!("between(t,{:.3},{:.3})", event.window_start_s, event.window_end_s);
        let fragment = event.kind.ffmpeg_fragment(event);
        self.lines
            .push(format!("[{base}]{fragment}:enable='{window}'[{out}]"));
        out
    }

    fn finish(self) -> String {
        self.lines.join(";\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::OverlayKind;

    fn spec(mode: RenderMode) -> RenderSpec {
        RenderSpec {
            mode,
            transition: Transition::Crossfade,
            xfade_s: 0.5,
            xfade_min_s: 0.1,
            align: Alignment::End,
            overlay_events: Vec::new(),
            fps: 30.0,
            width: 1920,
            height: 1080,
            cut_marker: None,
        }
    }

    #[test]
    fn hardcut_backend_emits_single_concat() {
        let images = vec![PathBuf::from("a.png"), PathBuf::from("b.png")];
        let durations = vec![3.0, 4.0];
        let graph = GraphBuilder::build(&images, &durations, &spec(RenderMode::Hardcut)).unwrap();
        assert!(graph.filter_complex.contains("concat=n=2"));
    }

    #[test]
    fn crossfade_backend_emits_xfade_with_offset() {
        let images = vec![PathBuf::from("a.png"), PathBuf::from("b.png")];
        let durations = vec![4.0, 4.0];
        let graph = GraphBuilder::build(&images, &durations, &spec(RenderMode::Crossfade)).unwrap();
        assert!(graph.filter_complex.contains("xfade=transition=fade:duration=0.500:offset=3.500"));
    }

    #[test]
    fn unsafe_crossfade_boundary_falls_back_to_concat() {
        let images = vec![PathBuf::from("a.png"), PathBuf::from("b.png")];
        let durations = vec![0.5, 0.5];
        let graph = GraphBuilder::build(&images, &durations, &spec(RenderMode::Crossfade)).unwrap();
        // all boundaries unsafe at xfade=0.5 (needs >= 1.05s segments) -> global fallback to hardcut
        assert!(graph.filter_complex.contains("concat=n=2"));
        assert!(!graph.filter_complex.contains("xfade"));
    }

    #[test]
    fn overlay_events_wrap_the_base_stream() {
        let images = vec![PathBuf::from("a.png")];
        let durations = vec![5.0];
        let mut s = spec(RenderMode::Hardcut);
        s.overlay_events.push(OverlayEvent {
            time_s: 1.0,
            window_start_s: 1.0,
            window_end_s: 1.1,
            kind: OverlayKind::BeatTick,
        });
        let graph = GraphBuilder::build(&images, &durations, &s).unwrap();
        assert!(graph.filter_complex.contains("enable='between(t,1.000,1.100)'"));
    }

    #[test]
    fn unsafe_boundary_with_cut_markers_emits_one_frame_marker() {
        let images = vec![
            PathBuf::from("a.png"),
            PathBuf::from("b.png"),
            PathBuf::from("c.png"),
            PathBuf::from("d.png"),
        ];
        // Boundaries 0 and 1 touch the under-threshold 0.5s segment and fall
        // back to a hard cut; boundary 2 (3.0, 3.0) stays a safe crossfade,
        // so the chain isn't globally demoted to the hard-cut backend.
        let durations = vec![3.0, 0.5, 3.0, 3.0];
        let mut s = spec(RenderMode::Crossfade);
        s.cut_marker = Some(FallbackMarker::WhitePop);
        let graph = GraphBuilder::build(&images, &durations, &s).unwrap();
        assert!(graph.filter_complex.contains("drawbox=x=0:y=0:w=iw:h=ih:color=white@0.9:t=fill"));
        // boundary 0's hard cut lands at t=3.0, marked for one frame at 30fps.
        assert!(graph.filter_complex.contains("enable='between(t,3.000,3.033)'"));
        assert!(graph.filter_complex.contains("xfade"));
    }
}
