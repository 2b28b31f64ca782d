use tracing::{info, warn};

use super::{
    job::{Job, validate_jobs},
    schedule::Schedule,
};
use crate::{
    config::SchedConfig,
    core::{
        driver::SchedCore,
        event::SchedCoreEvent,
        state::{TaskId, TaskState, Ticks},
        timeline::build_timeline,
    },
    error::SchedError,
    metrics,
    scheduler::{Policy, Scheduler},
};

pub struct Sim<S: Scheduler> {
    pub core: SchedCore<S>,
    // Tasks are created in (arrival_time, job id) order, so TaskId order is
    // also wake-up order
    task_cursor: TaskId,
    context_switches: u64,
}

impl<S: Scheduler> Sim<S> {
    pub fn new(jobs: &[Job], config: &SchedConfig) -> Result<Self, SchedError> {
        config.validate()?;
        let mut ordered: Vec<_> = validate_jobs(jobs)?
            .into_iter()
            .zip(jobs)
            .map(|((arrival, run_time), job)| (arrival, job.id, run_time, job.priority))
            .collect();
        ordered.sort_unstable_by_key(|&(arrival, id, ..)| (arrival, id));

        let mut core = SchedCore::<S>::new(config);
        for (arrival, id, run_time, priority) in ordered {
            core.ctx.create_task(id, arrival, run_time, priority);
        }

        Ok(Self {
            core,
            task_cursor: 0,
            context_switches: 0,
        })
    }

    pub fn step(&mut self) -> Vec<SchedCoreEvent> {
        self.handle_arrivals();
        let events = self.core.tick();
        self.context_switches += events
            .iter()
            .filter(|event| event.is_context_switch())
            .count() as u64;

        // One idle tick is reported, the rest of the gap is skipped
        if self.core.is_quiescent() {
            if let Some(next) = self.next_arrival() {
                self.core.skip_idle_until(next);
            }
        }
        events
    }

    fn next_arrival(&self) -> Option<Ticks> {
        self.core
            .ctx
            .tasks
            .get(self.task_cursor)
            .map(|task| task.arrival_time)
    }

    fn handle_arrivals(&mut self) {
        let now = self.core.now();
        // Contiguous, since tasks are sorted by arrival
        while self.task_cursor < self.core.ctx.tasks.len()
            && self.core.ctx.task(self.task_cursor).arrival_time == now
        {
            self.core.wake_task(self.task_cursor);
            self.task_cursor += 1;
        }
    }

    pub fn all_tasks_completed(&self) -> bool {
        self.core
            .ctx
            .tasks
            .iter()
            .all(|task| task.state == TaskState::Terminated)
    }

    pub fn run(self, policy: Policy) -> Result<Schedule, SchedError> {
        self.run_with(policy, |_, _| {})
    }

    /// Run to completion, handing every event to `on_event` along with the
    /// tick it happened in.
    pub fn run_with(
        mut self,
        policy: Policy,
        mut on_event: impl FnMut(Ticks, &SchedCoreEvent),
    ) -> Result<Schedule, SchedError> {
        if self.core.ctx.tasks.is_empty() {
            warn!(%policy, "empty workload, nothing to schedule");
        }

        while !self.all_tasks_completed() {
            let now = self.core.now();
            for event in self.step() {
                on_event(now, &event);
            }
        }

        let total_ticks = self.core.now();
        let busy_ticks = self.core.observer().busy_ticks();
        let tasks = std::mem::take(&mut self.core.ctx.tasks);
        let intervals = build_timeline(self.core.ctx.attributions());
        let stats = metrics::per_task_stats(&tasks)?;

        info!(
            %policy,
            tasks = tasks.len(),
            intervals = intervals.len(),
            total_ticks,
            busy_ticks,
            context_switches = self.context_switches,
            "schedule complete"
        );

        Ok(Schedule {
            policy,
            intervals,
            stats,
            tasks,
            busy_ticks,
            total_ticks,
            context_switches: self.context_switches,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{core::Interval, scheduler::FifoScheduler};

    #[test]
    fn arrivals_are_woken_at_their_tick() {
        let jobs = [Job::new(1, 2, 1), Job::new(2, 0, 1)];
        let mut sim = Sim::<FifoScheduler>::new(&jobs, &SchedConfig::default()).unwrap();

        sim.step();
        assert_eq!(sim.core.ctx.task(0).job, 2);
        assert_eq!(sim.core.ctx.task(0).state, TaskState::Terminated);
        assert_eq!(sim.core.ctx.task(1).state, TaskState::New);

        sim.step();
        sim.step();
        assert!(sim.all_tasks_completed());
        assert_eq!(sim.core.ctx.task(1).completion_time, Some(3));
    }

    #[test]
    fn idle_ticks_count_toward_total_but_not_busy() {
        let jobs = [Job::new(1, 3, 2)];
        let schedule = Sim::<FifoScheduler>::new(&jobs, &SchedConfig::default())
            .unwrap()
            .run(Policy::Fcfs)
            .unwrap();

        assert_eq!(schedule.total_ticks, 5);
        assert_eq!(schedule.busy_ticks, 2);
        assert_eq!(schedule.intervals, vec![Interval { job: 1, start: 3, end: 5 }]);
    }

    #[test]
    fn invalid_job_fails_before_any_tick() {
        let jobs = [Job::new(1, 0, 3), Job::new(2, 1, 0)];
        assert!(matches!(
            Sim::<FifoScheduler>::new(&jobs, &SchedConfig::default()),
            Err(SchedError::InvalidTask(_))
        ));
    }

    #[test]
    fn events_are_reported_per_tick() {
        let jobs = [Job::new(1, 1, 1)];
        let mut seen = Vec::new();
        Sim::<FifoScheduler>::new(&jobs, &SchedConfig::default())
            .unwrap()
            .run_with(Policy::Fcfs, |at, event| seen.push((at, event.clone())))
            .unwrap();

        assert_eq!(seen[0], (0, SchedCoreEvent::CpuIdle));
        assert!(seen.contains(&(
            1,
            SchedCoreEvent::CpuCurrentChange {
                from: None,
                to: Some(0)
            }
        )));
        assert_eq!(
            seen.last(),
            Some(&(
                1,
                SchedCoreEvent::TaskStateChange {
                    task: 0,
                    from: TaskState::Running,
                    to: TaskState::Terminated
                }
            ))
        );
    }

    #[test]
    fn idle_gap_reports_one_idle_tick_and_skips_the_rest() {
        let jobs = [Job::new(1, 0, 2), Job::new(2, 1_000, 1)];
        let mut seen = Vec::new();
        let schedule = Sim::<FifoScheduler>::new(&jobs, &SchedConfig::default())
            .unwrap()
            .run_with(Policy::Fcfs, |at, event| seen.push((at, event.clone())))
            .unwrap();

        let idle: Vec<_> = seen
            .iter()
            .filter(|(_, event)| *event == SchedCoreEvent::CpuIdle)
            .map(|&(at, _)| at)
            .collect();
        assert_eq!(idle, vec![2]);
        assert_eq!(schedule.total_ticks, 1_001);
        assert_eq!(schedule.busy_ticks, 3);
        assert_eq!(schedule.context_switches, 0);
    }
}
