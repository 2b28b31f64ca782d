//! Folding per-tick execution records into Gantt intervals.
//!
//! Policies report which job held the CPU for each tick (an [`Attribution`]).
//! [`TimelineBuilder`] merges a run of ticks into one [`Interval`] only while
//! the same job keeps the CPU with no gap; a context switch or an idle tick
//! always starts a new interval, even if the same job comes back right after.

use serde::Serialize;

use super::Ticks;
use crate::sim::JobId;

/// `job` held the CPU during `[at, at + 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attribution {
    pub job: JobId,
    pub at: Ticks,
}

/// `job` held the CPU during `[start, end)`; `end > start` always.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Interval {
    pub job: JobId,
    pub start: Ticks,
    pub end: Ticks,
}

impl Interval {
    pub fn len(&self) -> Ticks {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }
}

#[derive(Debug, Default)]
pub struct TimelineBuilder {
    intervals: Vec<Interval>,
}

impl TimelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a burst of `len` ticks starting at `start`. Bursts must be
    /// pushed in time order and must not overlap.
    pub fn push_burst(&mut self, job: JobId, start: Ticks, len: Ticks) {
        if len == 0 {
            return;
        }
        let end = start + len;

        if let Some(last) = self.intervals.last_mut() {
            assert!(
                start >= last.end,
                "Burst of job {job} at {start} overlaps interval {last:?}"
            );
            if last.job == job && last.end == start {
                last.end = end;
                return;
            }
        }

        self.intervals.push(Interval { job, start, end });
    }

    pub fn push(&mut self, attribution: Attribution) {
        self.push_burst(attribution.job, attribution.at, 1);
    }

    pub fn finish(self) -> Vec<Interval> {
        self.intervals
    }
}

impl Extend<Attribution> for TimelineBuilder {
    fn extend<I: IntoIterator<Item = Attribution>>(&mut self, iter: I) {
        for attribution in iter {
            self.push(attribution);
        }
    }
}

pub fn build_timeline(attributions: &[Attribution]) -> Vec<Interval> {
    let mut builder = TimelineBuilder::new();
    builder.extend(attributions.iter().copied());
    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticks(job: JobId, range: std::ops::Range<Ticks>) -> impl Iterator<Item = Attribution> {
        range.map(move |at| Attribution { job, at })
    }

    #[test]
    fn contiguous_ticks_merge() {
        let attributions: Vec<_> = ticks(1, 0..3).chain(ticks(2, 3..5)).collect();
        assert_eq!(
            build_timeline(&attributions),
            vec![
                Interval { job: 1, start: 0, end: 3 },
                Interval { job: 2, start: 3, end: 5 },
            ]
        );
    }

    #[test]
    fn idle_gap_splits_same_job() {
        let attributions: Vec<_> = ticks(1, 0..2).chain(ticks(1, 4..6)).collect();
        let intervals = build_timeline(&attributions);
        assert_eq!(intervals.len(), 2);
        assert_eq!(intervals[1], Interval { job: 1, start: 4, end: 6 });
    }

    #[test]
    fn resumed_job_after_switch_gets_new_interval() {
        let attributions: Vec<_> = ticks(1, 0..1)
            .chain(ticks(2, 1..2))
            .chain(ticks(1, 2..3))
            .collect();
        assert_eq!(build_timeline(&attributions).len(), 3);
    }

    #[test]
    fn bursts_merge_like_ticks() {
        let mut builder = TimelineBuilder::new();
        builder.push_burst(3, 0, 2);
        builder.push_burst(3, 2, 4);
        builder.push_burst(4, 6, 0);
        builder.push_burst(4, 7, 1);
        assert_eq!(
            builder.finish(),
            vec![
                Interval { job: 3, start: 0, end: 6 },
                Interval { job: 4, start: 7, end: 8 },
            ]
        );
    }

    #[test]
    fn empty_input_yields_no_intervals() {
        assert!(build_timeline(&[]).is_empty());
    }

    #[test]
    #[should_panic(expected = "overlaps")]
    fn overlapping_bursts_panic() {
        let mut builder = TimelineBuilder::new();
        builder.push_burst(1, 0, 3);
        builder.push_burst(2, 2, 1);
    }
}
