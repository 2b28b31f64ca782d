use crate::{
    core::{Interval, Task, Ticks},
    metrics::{self, PerTaskStats, Summary},
    scheduler::Policy,
    sim::JobId,
};

/// The outcome of running one policy over one workload.
#[derive(Debug, Clone)]
pub struct Schedule {
    pub policy: Policy,
    /// Gantt chart, ordered by start time, idle ticks omitted.
    pub intervals: Vec<Interval>,
    pub stats: PerTaskStats,
    /// Finished task records, in arrival order.
    pub tasks: Vec<Task>,
    pub busy_ticks: Ticks,
    pub total_ticks: Ticks,
    pub context_switches: u64,
}

impl Schedule {
    pub fn summary(&self) -> Summary {
        metrics::summarize(&self.stats, self.busy_ticks, self.total_ticks)
    }

    pub fn task(&self, job: JobId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.job == job)
    }

    pub fn intervals_of(&self, job: JobId) -> impl Iterator<Item = &Interval> {
        self.intervals.iter().filter(move |interval| interval.job == job)
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
