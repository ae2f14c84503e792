use std::path::{Path, PathBuf};

use crate::error::{ImageError, Result};

const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "gif", "tiff", "webp"];

/// Enumerates the image files to slideshow, in a stable declared order.
///
/// This is a pluggable collaborator behind a trait rather than a fixed
/// function; the default implementation here is a natural-sort directory
/// scan, analogous to a leading-sequence-number clip loader but relaxed to
/// accept any image extension and to fall back to plain alphanumeric sort
/// when filenames carry no numeric prefix.
pub trait ImageEnumerator {
    fn enumerate(&self, dir: &Path) -> Result<Vec<PathBuf>>;
}

/// Default, filesystem-backed enumerator.
pub struct DirectoryImageEnumerator;

impl ImageEnumerator for DirectoryImageEnumerator {
    fn enumerate(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let entries = std::fs::read_dir(dir).map_err(|_| ImageError::DirectoryReadFailed {
            path: dir.display().to_string(),
        })?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .collect();

        if paths.is_empty() {
            return Err(ImageError::NoImagesFound {
                path: dir.display().to_string(),
            }
            .into());
        }

        paths.sort_by(|a, b| natural_cmp(a, b));
        Ok(paths)
    }
}

/// Orders by leading numeric sequence if present (an `NN_name.ext`
/// convention), else falls back to plain lexicographic order.
fn natural_cmp(a: &Path, b: &Path) -> std::cmp::Ordering {
    let (seq_a, name_a) = leading_sequence(a);
    let (seq_b, name_b) = leading_sequence(b);
    match (seq_a, seq_b) {
        (Some(sa), Some(sb)) => sa.cmp(&sb).then_with(|| name_a.cmp(&name_b)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => name_a.cmp(&name_b),
    }
}

fn leading_sequence(path: &Path) -> (Option<u64>, String) {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();
    let digits: String = stem.chars().take_while(|c| c.is_ascii_digit()).collect();
    let seq = digits.parse::<u64>().ok();
    (seq, stem)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::tempdir;

    #[test]
    fn enumerates_and_sorts_by_leading_sequence() {
        let dir = tempdir().unwrap();
        for name in ["02_b.png", "01_a.png", "10_c.jpg"] {
            File::create(dir.path().join(name)).unwrap();
        }
        let paths = DirectoryImageEnumerator.enumerate(dir.path()).unwrap();
        let names: Vec<String> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["01_a.png", "02_b.png", "10_c.jpg"]);
    }

    #[test]
    fn falls_back_to_lexicographic_without_sequence_numbers() {
        let dir = tempdir().unwrap();
        for name in ["zebra.png", "alpha.png"] {
            File::create(dir.path().join(name)).unwrap();
        }
        let paths = DirectoryImageEnumerator.enumerate(dir.path()).unwrap();
        let names: Vec<String> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["alpha.png", "zebra.png"]);
    }

    #[test]
    fn empty_directory_errors() {
        let dir = tempdir().unwrap();
        let result = DirectoryImageEnumerator.enumerate(dir.path());
        assert!(result.is_err());
    }
}
