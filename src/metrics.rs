//! Waiting, turnaround, response and utilization figures derived from
//! finished task records.
//!
//! For a task that arrived at `a`, first ran at `f`, finished at `c` and
//! needed `d` ticks:
//!
//! - turnaround = `c - a`
//! - waiting    = `c - a - d`
//! - response   = `f - a`
//!
//! Averages over an empty set of tasks are 0, as is the utilization of a run
//! that lasted 0 ticks.

use std::collections::BTreeMap;

use average::{Estimate, Mean};
use serde::Serialize;

use crate::{
    core::{Task, Ticks},
    error::SchedError,
    sim::JobId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TaskStats {
    pub waiting: Ticks,
    pub turnaround: Ticks,
    pub response: Ticks,
}

pub type PerTaskStats = BTreeMap<JobId, TaskStats>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub avg_waiting: f64,
    pub avg_turnaround: f64,
    pub avg_response: f64,
    pub cpu_utilization: f64,
}

pub fn task_stats(task: &Task) -> Result<TaskStats, SchedError> {
    let completion = task
        .completion_time
        .ok_or(SchedError::TaskNotFinished(task.job))?;

    assert!(
        completion > task.arrival_time,
        "Job {} completed at {completion}, not after its arrival at {}",
        task.job,
        task.arrival_time
    );
    let turnaround = completion - task.arrival_time;
    // Negative waiting means a policy ran a task for longer than its demand
    // or before it arrived.
    assert!(
        turnaround >= task.total_demand,
        "Job {} turnaround {turnaround} shorter than demand {}",
        task.job,
        task.total_demand
    );

    let first_run = match task.first_run {
        Some(at) if at >= task.arrival_time => at,
        other => panic!(
            "Job {} first ran at {other:?}, before its arrival at {}",
            task.job, task.arrival_time
        ),
    };
    Ok(TaskStats {
        waiting: turnaround - task.total_demand,
        turnaround,
        response: first_run - task.arrival_time,
    })
}

pub fn per_task_stats(tasks: &[Task]) -> Result<PerTaskStats, SchedError> {
    tasks
        .iter()
        .map(|task| Ok((task.job, task_stats(task)?)))
        .collect()
}

pub fn utilization(busy_ticks: Ticks, total_ticks: Ticks) -> f64 {
    if total_ticks == 0 {
        return 0.0;
    }
    busy_ticks as f64 / total_ticks as f64
}

pub fn summarize(stats: &PerTaskStats, busy_ticks: Ticks, total_ticks: Ticks) -> Summary {
    Summary {
        avg_waiting: avg(stats.values().map(|s| s.waiting as f64)),
        avg_turnaround: avg(stats.values().map(|s| s.turnaround as f64)),
        avg_response: avg(stats.values().map(|s| s.response as f64)),
        cpu_utilization: utilization(busy_ticks, total_ticks),
    }
}

fn avg(iter: impl Iterator<Item = f64>) -> f64 {
    let mean = iter.collect::<Mean>();
    if mean.is_empty() { 0.0 } else { mean.estimate() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{SchedCtx, TaskState};

    fn finished(job: JobId, arrival: Ticks, demand: Ticks, first_run: Ticks, completion: Ticks) -> Task {
        let mut ctx = SchedCtx::new();
        let id = ctx.create_task(job, arrival, demand, 0);
        let task = ctx.task_mut(id);
        task.state = TaskState::Terminated;
        task.remaining_demand = 0;
        task.first_run = Some(first_run);
        task.completion_time = Some(completion);
        task.clone()
    }

    #[test]
    fn single_task_without_contention() {
        let stats = task_stats(&finished(1, 0, 5, 0, 5)).unwrap();
        assert_eq!(
            stats,
            TaskStats {
                waiting: 0,
                turnaround: 5,
                response: 0
            }
        );
    }

    #[test]
    fn averages_over_several_tasks() {
        let tasks = [finished(1, 0, 5, 0, 5), finished(2, 1, 3, 5, 8)];
        let stats = per_task_stats(&tasks).unwrap();
        assert_eq!(stats[&2].waiting, 4);
        assert_eq!(stats[&2].response, 4);

        let summary = summarize(&stats, 8, 10);
        assert_eq!(summary.avg_waiting, 2.0);
        assert_eq!(summary.avg_turnaround, 6.0);
        assert_eq!(summary.avg_response, 2.0);
        assert_eq!(summary.cpu_utilization, 0.8);
    }

    #[test]
    fn empty_input_averages_to_zero() {
        let summary = summarize(&PerTaskStats::new(), 0, 0);
        assert_eq!(summary.avg_waiting, 0.0);
        assert_eq!(summary.avg_turnaround, 0.0);
        assert_eq!(summary.cpu_utilization, 0.0);
    }

    #[test]
    fn unfinished_task_is_an_error() {
        let mut ctx = SchedCtx::new();
        let id = ctx.create_task(9, 0, 2, 0);
        assert_eq!(
            task_stats(ctx.task(id)),
            Err(SchedError::TaskNotFinished(9))
        );
    }

    #[test]
    #[should_panic(expected = "before its arrival")]
    fn first_run_before_arrival_is_surfaced() {
        task_stats(&finished(1, 4, 2, 3, 8)).unwrap();
    }

    #[test]
    #[should_panic(expected = "before its arrival")]
    fn finished_task_that_never_ran_is_surfaced() {
        let mut task = finished(1, 0, 2, 0, 2);
        task.first_run = None;
        task_stats(&task).unwrap();
    }

    #[test]
    #[should_panic(expected = "shorter than demand")]
    fn negative_waiting_is_surfaced() {
        task_stats(&finished(1, 0, 5, 0, 3)).unwrap();
    }
}
