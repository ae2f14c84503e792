//! Beat preparation: turns raw detector output into a monotone, de-duplicated
//! `BeatSet` with consistent auxiliary arrays.

mod prepare;

pub use prepare::{BeatPreparer, BeatSet};
