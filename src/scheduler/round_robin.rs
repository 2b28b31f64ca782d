use super::{EnqueueFlags, SchedCtx, Scheduler, TaskId, bounded_slice};
use crate::{config::SchedConfig, core::Ticks};

/// Round-robin over the global FIFO with a fixed quantum. A preempted task
/// goes to the tail behind everything that arrived up to the end of its
/// slice.
pub struct RoundRobinScheduler {
    quantum: Ticks,
}

impl Scheduler for RoundRobinScheduler {
    fn init(_ctx: &mut SchedCtx, config: &SchedConfig) -> Self {
        Self {
            quantum: config.rr_quantum,
        }
    }

    fn enqueue(&mut self, ctx: &mut SchedCtx, task: TaskId, _flags: EnqueueFlags) {
        let dsq = ctx.global_dsq();
        let slice = bounded_slice(self.quantum, ctx.task(task).remaining_demand);
        ctx.dsq_push_fifo(dsq, task, slice);
    }

    fn dispatch(&mut self, _ctx: &mut SchedCtx) {}
}
