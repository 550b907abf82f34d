pub mod batch;
pub mod merge;
pub mod srt;

use std::collections::HashMap;
use std::time::Duration;

/// One timed subtitle cue. Indices are 1-based and dense within a sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cue {
    pub index: usize,
    pub start: Duration,
    pub end: Duration,
    pub text: String,
}

impl Cue {
    pub fn duration(&self) -> Duration {
        self.end.saturating_sub(self.start)
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Original cue timings captured before any merge, keyed by 1-based index.
///
/// Immutable for the lifetime of one processing run; later sequences of the
/// same track are re-indexed back onto it during restore.
#[derive(Debug, Clone)]
pub struct TimingTable {
    timings: HashMap<usize, (Duration, Duration)>,
}

impl TimingTable {
    pub fn capture(cues: &[Cue]) -> Self {
        let timings = cues.iter().map(|c| (c.index, (c.start, c.end))).collect();
        Self { timings }
    }

    pub fn get(&self, index: usize) -> Option<(Duration, Duration)> {
        self.timings.get(&index).copied()
    }

    pub fn len(&self) -> usize {
        self.timings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timings.is_empty()
    }
}

/// Re-number cues sequentially starting from 1.
pub fn renumber(cues: Vec<Cue>) -> Vec<Cue> {
    cues.into_iter()
        .enumerate()
        .map(|(i, mut cue)| {
            cue.index = i + 1;
            cue
        })
        .collect()
}

/// Order cues by start time. Derived sequences must not be assumed sorted.
pub fn sort_by_start(mut cues: Vec<Cue>) -> Vec<Cue> {
    cues.sort_by_key(|c| c.start);
    cues
}
