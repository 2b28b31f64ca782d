use tracing::debug;

use super::{
    EnqueueFlags, SchedCtx, Scheduler, TaskId,
    priq::{PriqScheduler, Ranking},
};
use crate::{
    config::SchedConfig,
    core::{Rank, Task, Ticks},
};

/// Lowest priority value, then smallest remaining demand.
pub struct PriorityThenRemaining;

impl Ranking for PriorityThenRemaining {
    const PREEMPTIVE: bool = true;

    fn rank(task: &Task) -> Rank {
        Rank::new(
            i64::from(task.priority),
            Rank::ticks(task.remaining_demand),
            task.job,
        )
    }
}

/// Preemptive priority with aging. Every tick a queued task sits out, its
/// `wait_age` grows; each time the age hits a multiple of the aging interval
/// its priority improves by one, down to the configured floor.
pub struct PreemptivePriorityScheduler {
    inner: PriqScheduler<PriorityThenRemaining>,
    interval: Ticks,
    min_priority: i32,
}

impl Scheduler for PreemptivePriorityScheduler {
    fn init(ctx: &mut SchedCtx, config: &SchedConfig) -> Self {
        Self {
            inner: PriqScheduler::init(ctx, config),
            interval: config.aging.interval,
            min_priority: config.aging.min_priority,
        }
    }

    fn enqueue(&mut self, ctx: &mut SchedCtx, task: TaskId, flags: EnqueueFlags) {
        self.inner.enqueue(ctx, task, flags);
    }

    fn dispatch(&mut self, ctx: &mut SchedCtx) {
        self.inner.dispatch(ctx);
    }

    // Everything still queued was ready this tick but not selected.
    fn tick(&mut self, ctx: &mut SchedCtx, _running: Option<TaskId>) {
        let priq = self.inner.dsq();
        for task_id in ctx.dsq_tasks(priq) {
            let task = ctx.task_mut(task_id);
            task.wait_age += 1;
            if task.wait_age % self.interval != 0 || task.priority <= self.min_priority {
                continue;
            }

            let aged = task.priority - 1;
            debug!(task = task_id, job = task.job, priority = aged, "aged");
            ctx.set_priority(task_id, aged);
            let rank = PriorityThenRemaining::rank(ctx.task(task_id));
            ctx.dsq_rerank(priq, task_id, rank);
        }
    }
}
