use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result};

/// Closed set of named transitions. Each variant maps to ffmpeg's native
/// `xfade` `transition=` identifier; unknown names are rejected at
/// parameter parse time, not at graph-emission time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Transition {
    Crossfade,
    WipeLeft,
    WipeRight,
    WipeUp,
    WipeDown,
    SlideLeft,
    SlideRight,
    SlideUp,
    SlideDown,
    SmoothLeft,
    SmoothRight,
    CircleOpen,
    CircleClose,
    DiagTopLeft,
    DiagTopRight,
    HorzSlice,
    VertSlice,
    SqueezeHorizontal,
    SqueezeVertical,
    Dissolve,
    Pixelize,
    Radial,
    Blur,
    Distance,
}

impl Transition {
    /// The `xfade` filter's `transition=` value for this name.
    pub fn ffmpeg_id(&self) -> &'static str {
        match self {
            Self::Crossfade => "fade",
            Self::WipeLeft => "wipeleft",
            Self::WipeRight => "wiperight",
            Self::WipeUp => "wipeup",
            Self::WipeDown => "wipedown",
            Self::SlideLeft => "slideleft",
            Self::SlideRight => "slideright",
            Self::SlideUp => "slideup",
            Self::SlideDown => "slidedown",
            Self::SmoothLeft => "smoothleft",
            Self::SmoothRight => "smoothright",
            Self::CircleOpen => "circleopen",
            Self::CircleClose => "circleclose",
            Self::DiagTopLeft => "diagtl",
            Self::DiagTopRight => "diagtr",
            Self::HorzSlice => "hlslice",
            Self::VertSlice => "vuslice",
            Self::SqueezeHorizontal => "squeezeh",
            Self::SqueezeVertical => "squeezev",
            Self::Dissolve => "dissolve",
            Self::Pixelize => "pixelize",
            Self::Radial => "radial",
            Self::Blur => "hblur",
            Self::Distance => "distance",
        }
    }

    pub fn by_name(name: &str) -> Result<Self> {
        use Transition::*;
        Ok(match name {
            "crossfade" => Crossfade,
            "wipe-left" => WipeLeft,
            "wipe-right" => WipeRight,
            "wipe-up" => WipeUp,
            "wipe-down" => WipeDown,
            "slide-left" => SlideLeft,
            "slide-right" => SlideRight,
            "slide-up" => SlideUp,
            "slide-down" => SlideDown,
            "smooth-left" => SmoothLeft,
            "smooth-right" => SmoothRight,
            "circle-open" => CircleOpen,
            "circle-close" => CircleClose,
            "diag-top-left" => DiagTopLeft,
            "diag-top-right" => DiagTopRight,
            "horz-slice" => HorzSlice,
            "vert-slice" => VertSlice,
            "squeeze-horizontal" => SqueezeHorizontal,
            "squeeze-vertical" => SqueezeVertical,
            "dissolve" => Dissolve,
            "pixelize" => Pixelize,
            "radial" => Radial,
            "blur" => Blur,
            "distance" => Distance,
            other => {
                return Err(GraphError::UnknownTransition {
                    name: other.to_string(),
                }
                .into())
            }
        })
    }

}

/// One-frame marker style drawn at a hard-cut fallback boundary, enabled via
/// `--cut-markers`. A closed set, like [`Transition`]: the boundary printer
/// maps each variant to an ffmpeg filter fragment rather than a dynamic
/// lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum FallbackMarker {
    WhitePop,
    BlackFlash,
    Pulse,
    Bloom,
}

impl FallbackMarker {
    /// ffmpeg filter fragment for a single frame of this marker style
    /// (without the trailing `enable=` clause).
    pub fn ffmpeg_fragment(&self) -> &'static str {
        match self {
            Self::WhitePop => "drawbox=x=0:y=0:w=iw:h=ih:color=white@0.9:t=fill",
            Self::BlackFlash => "drawbox=x=0:y=0:w=iw:h=ih:color=black@0.9:t=fill",
            Self::Pulse => "eq=brightness=0.35:saturation=1.8",
            Self::Bloom => "gblur=sigma=10",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_transition_name_is_rejected() {
        assert!(Transition::by_name("not-a-real-transition").is_err());
    }

    #[test]
    fn known_names_round_trip_to_ffmpeg_ids() {
        assert_eq!(Transition::by_name("crossfade").unwrap().ffmpeg_id(), "fade");
        assert_eq!(Transition::by_name("pixelize").unwrap().ffmpeg_id(), "pixelize");
    }

    #[test]
    fn fallback_marker_styles_have_distinct_fragments() {
        let fragments: std::collections::HashSet<&str> = [
            FallbackMarker::WhitePop,
            FallbackMarker::BlackFlash,
            FallbackMarker::Pulse,
            FallbackMarker::Bloom,
        ]
        .iter()
        .map(|m| m.ffmpeg_fragment())
        .collect();
        assert_eq!(fragments.len(), 4);
    }
}
