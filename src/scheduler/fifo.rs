use super::{EnqueueFlags, SchedCtx, Scheduler, TaskId};
use crate::config::SchedConfig;

/// First-come-first-served. Arrivals are woken in `(arrival_time, id)` order
/// and each task keeps the CPU until it finishes.
pub struct FifoScheduler;

impl Scheduler for FifoScheduler {
    fn init(_ctx: &mut SchedCtx, _config: &SchedConfig) -> Self {
        Self
    }

    fn enqueue(&mut self, ctx: &mut SchedCtx, task: TaskId, flags: EnqueueFlags) {
        let _ = flags;
        let dsq = ctx.global_dsq();
        let slice = ctx.task(task).remaining_demand;
        ctx.dsq_push_fifo(dsq, task, slice);
    }

    // The core drains the global DSQ itself.
    fn dispatch(&mut self, _ctx: &mut SchedCtx) {}
}
