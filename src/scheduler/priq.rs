use std::marker::PhantomData;

use super::{EnqueueFlags, SchedCtx, Scheduler, TaskId};
use crate::{
    config::SchedConfig,
    core::{DsqId, Rank, Task},
};

/// How a priority DSQ orders its tasks.
pub trait Ranking {
    /// Preemptive rankings get a one-tick slice so the queue is consulted
    /// again every tick; the others run to completion.
    const PREEMPTIVE: bool;

    fn rank(task: &Task) -> Rank;
}

/// A single priority DSQ ordered by `R`.
pub struct PriqScheduler<R: Ranking> {
    priq: DsqId,
    _ranking: PhantomData<R>,
}

impl<R: Ranking> PriqScheduler<R> {
    pub fn dsq(&self) -> DsqId {
        self.priq
    }
}

impl<R: Ranking> Scheduler for PriqScheduler<R> {
    fn init(ctx: &mut SchedCtx, _config: &SchedConfig) -> Self {
        Self {
            priq: ctx.create_dsq_priq(),
            _ranking: PhantomData,
        }
    }

    fn enqueue(&mut self, ctx: &mut SchedCtx, task: TaskId, _flags: EnqueueFlags) {
        let task_ref = ctx.task(task);
        let slice = if R::PREEMPTIVE {
            1
        } else {
            task_ref.remaining_demand
        };
        let rank = R::rank(task_ref);
        ctx.dsq_push_priq(self.priq, task, slice, rank);
    }

    fn dispatch(&mut self, ctx: &mut SchedCtx) {
        ctx.dsq_move_to_local(self.priq);
    }
}

/// Smallest total demand, then earliest arrival.
pub struct ShortestJob;

impl Ranking for ShortestJob {
    const PREEMPTIVE: bool = false;

    fn rank(task: &Task) -> Rank {
        Rank::new(
            Rank::ticks(task.total_demand),
            Rank::ticks(task.arrival_time),
            task.job,
        )
    }
}

/// Lowest priority value, then earliest arrival.
pub struct HighestPriority;

impl Ranking for HighestPriority {
    const PREEMPTIVE: bool = false;

    fn rank(task: &Task) -> Rank {
        Rank::new(
            i64::from(task.priority),
            Rank::ticks(task.arrival_time),
            task.job,
        )
    }
}

pub type SjfScheduler = PriqScheduler<ShortestJob>;
pub type PriorityScheduler = PriqScheduler<HighestPriority>;
