use std::path::PathBuf;

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Result of binding an image list to `N` requested segments.
#[derive(Debug, Clone)]
pub struct BindOutcome {
    /// One path per usable segment.
    pub images: Vec<PathBuf>,
    /// Number of segments actually usable. Equal to the requested count
    /// unless images ran out and `loop_images` was false, in which case
    /// the caller must re-trim its cut sequence (and final duration) to
    /// this count.
    pub segments_used: usize,
}

/// Maps an (ordered) image list onto `N` segments.
pub struct ImageBinder;

impl ImageBinder {
    pub fn bind(
        images: &[PathBuf],
        n_segments: usize,
        shuffle: bool,
        seed: u64,
        loop_images: bool,
    ) -> BindOutcome {
        if images.is_empty() || n_segments == 0 {
            return BindOutcome {
                images: Vec::new(),
                segments_used: 0,
            };
        }

        let ordered: Vec<PathBuf> = if shuffle {
            let mut shuffled = images.to_vec();
            let mut rng = SmallRng::seed_from_u64(seed);
            shuffled.shuffle(&mut rng);
            shuffled
        } else {
            images.to_vec()
        };

        if ordered.len() >= n_segments {
            return BindOutcome {
                images: ordered.into_iter().take(n_segments).collect(),
                segments_used: n_segments,
            };
        }

        if loop_images {
            let bound: Vec<PathBuf> = (0..n_segments)
                .map(|i| ordered[i % ordered.len()].clone())
                .collect();
            BindOutcome {
                images: bound,
                segments_used: n_segments,
            }
        } else {
            // Truncate: caller must drop the tail cuts and re-trim the
            // final segment's duration to the (new) audio end.
            BindOutcome {
                segments_used: ordered.len(),
                images: ordered,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn images(n: usize) -> Vec<PathBuf> {
        (0..n).map(|i| PathBuf::from(format!("img_{i}.png"))).collect()
    }

    #[test]
    fn deterministic_shuffle_same_seed_same_result() {
        let imgs = images(17);
        let a = ImageBinder::bind(&imgs, 17, true, 1337, false);
        let b = ImageBinder::bind(&imgs, 17, true, 1337, false);
        assert_eq!(a.images, b.images);
    }

    #[test]
    fn different_seeds_usually_differ() {
        let imgs = images(17);
        let a = ImageBinder::bind(&imgs, 17, true, 1337, false);
        let b = ImageBinder::bind(&imgs, 17, true, 42, false);
        assert_ne!(a.images, b.images);
    }

    #[test]
    fn loop_wraps_modulo_image_count() {
        let imgs = images(3);
        let outcome = ImageBinder::bind(&imgs, 7, false, 0, true);
        assert_eq!(outcome.segments_used, 7);
        assert_eq!(
            outcome.images,
            vec![
                PathBuf::from("img_0.png"),
                PathBuf::from("img_1.png"),
                PathBuf::from("img_2.png"),
                PathBuf::from("img_0.png"),
                PathBuf::from("img_1.png"),
                PathBuf::from("img_2.png"),
                PathBuf::from("img_0.png"),
            ]
        );
    }

    #[test]
    fn truncates_when_not_looping_and_short_on_images() {
        let imgs = images(3);
        let outcome = ImageBinder::bind(&imgs, 7, false, 0, false);
        assert_eq!(outcome.segments_used, 3);
        assert_eq!(outcome.images.len(), 3);
    }

    #[test]
    fn exact_count_needs_no_loop_or_truncate() {
        let imgs = images(5);
        let outcome = ImageBinder::bind(&imgs, 5, false, 0, false);
        assert_eq!(outcome.segments_used, 5);
    }
}
