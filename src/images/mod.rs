//! Image enumeration and beat-segment binding.

mod binder;
mod enumerator;

pub use binder::{BindOutcome, ImageBinder};
pub use enumerator::{DirectoryImageEnumerator, ImageEnumerator};
