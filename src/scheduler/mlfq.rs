//! Multi-level feedback queue.
//!
//! Three FIFO tiers, always served highest first:
//!
//! | tier | slice                       | on slice expiry |
//! |------|-----------------------------|-----------------|
//! | Q0   | `q0_quantum`                | demote to Q1    |
//! | Q1   | `q1_quantum`                | demote to Q2    |
//! | Q2   | remaining demand            | stays in Q2     |
//!
//! Arrivals enter Q0. Before each dispatch decision, every task queued in Q1
//! or Q2 ages by one tick; at `aging_limit` it is moved to the tail of Q0
//! with its age cleared. Q0 itself never ages.
//!
//! A slice is never cut short: a Q0 arrival during a Q2 burst waits for the
//! burst to end.

use tracing::debug;

use super::{ENQ_WAKEUP, EnqueueFlags, SchedCtx, Scheduler, TaskId, bounded_slice};
use crate::{
    config::SchedConfig,
    core::{DsqId, Ticks},
};

pub const NUM_TIERS: usize = 3;
const LOWEST_TIER: usize = NUM_TIERS - 1;

pub struct MlfqScheduler {
    tiers: [DsqId; NUM_TIERS],
    quanta: [Option<Ticks>; NUM_TIERS],
    aging_limit: Ticks,
}

impl MlfqScheduler {
    fn slice_for(&self, level: usize, remaining: Ticks) -> Ticks {
        match self.quanta[level] {
            Some(quantum) => bounded_slice(quantum, remaining),
            None => remaining,
        }
    }

    fn push(&self, ctx: &mut SchedCtx, task: TaskId, level: usize) {
        ctx.set_queue_level(task, level);
        let slice = self.slice_for(level, ctx.task(task).remaining_demand);
        ctx.dsq_push_fifo(self.tiers[level], task, slice);
    }

    pub fn tier(&self, level: usize) -> DsqId {
        self.tiers[level]
    }
}

impl Scheduler for MlfqScheduler {
    fn init(ctx: &mut SchedCtx, config: &SchedConfig) -> Self {
        Self {
            tiers: [
                ctx.create_dsq_fifo(),
                ctx.create_dsq_fifo(),
                ctx.create_dsq_fifo(),
            ],
            quanta: [
                Some(config.mlfq.q0_quantum),
                Some(config.mlfq.q1_quantum),
                None,
            ],
            aging_limit: config.mlfq.aging_limit,
        }
    }

    fn enqueue(&mut self, ctx: &mut SchedCtx, task: TaskId, flags: EnqueueFlags) {
        let level = if flags & ENQ_WAKEUP != 0 {
            0
        } else {
            (ctx.task(task).queue_level + 1).min(LOWEST_TIER)
        };
        self.push(ctx, task, level);
    }

    fn before_dispatch(&mut self, ctx: &mut SchedCtx) {
        for level in 1..NUM_TIERS {
            let tier = self.tiers[level];
            for task_id in ctx.dsq_tasks(tier) {
                let task = ctx.task_mut(task_id);
                task.wait_age += 1;
                if task.wait_age < self.aging_limit {
                    continue;
                }

                task.wait_age = 0;
                debug!(task = task_id, job = task.job, from = level, "promoted");
                let removed = ctx.dsq_remove(tier, task_id);
                debug_assert!(removed, "Aged task {task_id} vanished from tier {level}");
                self.push(ctx, task_id, 0);
            }
        }
    }

    fn dispatch(&mut self, ctx: &mut SchedCtx) {
        if let Some(&tier) = self.tiers.iter().find(|&&tier| !ctx.dsq_is_empty(tier)) {
            ctx.dsq_move_to_local(tier);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::ENQ_PREEMPT;

    fn setup() -> (SchedCtx, MlfqScheduler) {
        let mut ctx = SchedCtx::new();
        let sched = MlfqScheduler::init(&mut ctx, &SchedConfig::default());
        (ctx, sched)
    }

    #[test]
    fn preempted_task_drops_one_tier_and_bottoms_out() {
        let (mut ctx, mut sched) = setup();
        let task = ctx.create_task(1, 0, 50, 0);
        ctx.mark_ready(task);

        sched.enqueue(&mut ctx, task, ENQ_WAKEUP);
        assert_eq!(ctx.task(task).queue_level, 0);
        assert_eq!(ctx.task(task).allocated_timeslice, Some(2));

        for (expected_level, expected_slice) in [(1, 4), (2, 50), (2, 50)] {
            ctx.dsq_remove(sched.tier(ctx.task(task).queue_level), task);
            sched.enqueue(&mut ctx, task, ENQ_PREEMPT);
            assert_eq!(ctx.task(task).queue_level, expected_level);
            assert_eq!(ctx.task(task).allocated_timeslice, Some(expected_slice));
        }
    }

    #[test]
    fn starving_task_is_promoted_at_aging_limit() {
        let (mut ctx, mut sched) = setup();
        let task = ctx.create_task(1, 0, 9, 0);
        ctx.mark_ready(task);
        ctx.set_queue_level(task, 1);
        ctx.dsq_push_fifo(sched.tier(1), task, 4);

        for _ in 0..5 {
            sched.before_dispatch(&mut ctx);
        }
        assert_eq!(ctx.task(task).queue_level, 1);
        assert_eq!(ctx.task(task).wait_age, 5);

        sched.before_dispatch(&mut ctx);
        assert_eq!(ctx.task(task).queue_level, 0);
        assert_eq!(ctx.task(task).wait_age, 0);
        assert_eq!(ctx.dsq_tasks(sched.tier(0)), vec![task]);
        assert_eq!(ctx.task(task).allocated_timeslice, Some(2));
    }

    #[test]
    fn dispatch_prefers_higher_tier() {
        let (mut ctx, mut sched) = setup();
        let low = ctx.create_task(1, 0, 9, 0);
        let high = ctx.create_task(2, 0, 9, 0);
        ctx.mark_ready(low);
        ctx.mark_ready(high);
        ctx.set_queue_level(low, 2);
        ctx.dsq_push_fifo(sched.tier(2), low, 9);
        sched.enqueue(&mut ctx, high, ENQ_WAKEUP);

        sched.dispatch(&mut ctx);
        assert_eq!(ctx.dsq_pop(ctx.local_dsq()), Some(high));
    }
}
