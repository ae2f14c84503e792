use tracing::debug;

/// Minimum spacing enforced between any two beats after preparation (seconded).
pub const MIN_BEAT_GAP: f64 = 0.12;

/// A prepared, monotone sequence of beat instants with optional aligned
/// auxiliary arrays. Immutable once built; shared read-only by the planner
/// and the overlay composer.
#[derive(Debug, Clone, Default)]
pub struct BeatSet {
    times: Vec<f64>,
    onset_strength: Option<Vec<f32>>,
    is_downbeat: Option<Vec<bool>>,
}

impl BeatSet {
    /// Number of beats.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// All beat times, ascending.
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn onset_strength(&self) -> Option<&[f32]> {
        self.onset_strength.as_deref()
    }

    pub fn is_downbeat(&self) -> Option<&[bool]> {
        self.is_downbeat.as_deref()
    }

    pub fn strength_at(&self, index: usize) -> Option<f32> {
        self.onset_strength.as_ref().and_then(|s| s.get(index).copied())
    }

    pub fn is_downbeat_at(&self, index: usize) -> bool {
        self.is_downbeat
            .as_ref()
            .and_then(|d| d.get(index).copied())
            .unwrap_or(false)
    }

    /// Beats whose time lies in `[start, end]`, as `(index, time)` pairs.
    pub fn in_range(&self, start: f64, end: f64) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.times
            .iter()
            .enumerate()
            .filter(move |(_, &t)| t >= start && t <= end)
            .map(|(i, &t)| (i, t))
    }
}

/// Turns raw, possibly unsorted beat times (plus optional aligned onset
/// strength / downbeat flags) into a `BeatSet`.
pub struct BeatPreparer;

impl BeatPreparer {
    /// Apply phase shift, drop negatives, collapse beats closer than
    /// [`MIN_BEAT_GAP`], and reindex auxiliary arrays consistently.
    ///
    /// Ordering of these steps is a contract, not an implementation detail
    /// (spec order: shift, discard, sort, collapse).
    pub fn prepare(
        raw: &[f64],
        phase_s: f64,
        onset_strength: Option<&[f32]>,
        is_downbeat: Option<&[bool]>,
    ) -> BeatSet {
        let mut entries: Vec<(f64, Option<f32>, Option<bool>)> = raw
            .iter()
            .enumerate()
            .map(|(i, &b)| {
                let shifted = b + phase_s;
                let strength = onset_strength.and_then(|s| s.get(i).copied());
                let downbeat = is_downbeat.and_then(|d| d.get(i).copied());
                (shifted, strength, downbeat)
            })
            .filter(|(t, _, _)| *t >= 0.0)
            .collect();

        entries.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        let mut times = Vec::with_capacity(entries.len());
        let mut strengths: Vec<f32> = Vec::with_capacity(entries.len());
        let mut downbeats: Vec<bool> = Vec::with_capacity(entries.len());
        let mut have_strength = false;
        let mut have_downbeat = false;

        for (t, s, d) in entries {
            let collapse = times
                .last()
                .map(|&last: &f64| t - last < MIN_BEAT_GAP)
                .unwrap_or(false);
            if collapse {
                // Keep the representative (first of the run): discard this one entirely.
                continue;
            }
            times.push(t);
            if let Some(s) = s {
                have_strength = true;
                strengths.push(s);
            } else {
                strengths.push(0.0);
            }
            if let Some(d) = d {
                have_downbeat = true;
                downbeats.push(d);
            } else {
                downbeats.push(false);
            }
        }

        debug!(
            raw_count = raw.len(),
            prepared_count = times.len(),
            phase_s,
            "prepared beat set"
        );

        BeatSet {
            times,
            onset_strength: have_strength.then_some(strengths),
            is_downbeat: have_downbeat.then_some(downbeats),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_negative_after_phase_shift() {
        let raw = vec![0.0, 0.5, 1.0];
        let beats = BeatPreparer::prepare(&raw, -0.2, None, None);
        assert_eq!(beats.times(), &[0.3, 0.8]);
    }

    #[test]
    fn collapses_runs_within_min_gap_keeping_first() {
        let raw = vec![1.0, 1.05, 1.10, 2.0];
        let beats = BeatPreparer::prepare(&raw, 0.0, None, None);
        // 1.05 and 1.10 collapse into the run started by 1.0 (within 0.12s of the running first).
        assert_eq!(beats.times(), &[1.0, 2.0]);
    }

    #[test]
    fn sorts_unsorted_input() {
        let raw = vec![3.0, 1.0, 2.0];
        let beats = BeatPreparer::prepare(&raw, 0.0, None, None);
        assert_eq!(beats.times(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn reindexes_auxiliary_arrays_consistently() {
        let raw = vec![1.0, 1.05, 2.0];
        let strengths = vec![0.2, 0.9, 0.5];
        let downbeats = vec![true, false, false];
        let beats = BeatPreparer::prepare(&raw, 0.0, Some(&strengths), Some(&downbeats));
        assert_eq!(beats.times(), &[1.0, 2.0]);
        // representative beat (1.0) keeps its own strength/downbeat, not the discarded 1.05's.
        assert_eq!(beats.strength_at(0), Some(0.2));
        assert!(beats.is_downbeat_at(0));
        assert_eq!(beats.strength_at(1), Some(0.5));
    }

    #[test]
    fn empty_input_is_permitted() {
        let beats = BeatPreparer::prepare(&[], 0.0, None, None);
        assert!(beats.is_empty());
    }
}
