use tracing::{debug, trace};

use super::{
    event::SchedCoreEvent,
    observer::Observer,
    state::{SchedCtx, TaskId, Ticks},
};
use crate::{
    config::SchedConfig,
    scheduler::{ENQ_PREEMPT, ENQ_WAKEUP, EnqueueFlags, Scheduler},
};

pub struct SchedCore<S: Scheduler> {
    pub ctx: SchedCtx,
    pub scheduler: S,
    observer: Observer,
    last_ran: Option<TaskId>,
}

impl<S: Scheduler> SchedCore<S> {
    pub fn new(config: &SchedConfig) -> Self {
        let mut ctx = SchedCtx::new();
        let scheduler = S::init(&mut ctx, config);
        Self {
            ctx,
            scheduler,
            observer: Observer::new(),
            last_ran: None,
        }
    }

    /// Simulate one time unit `[now, now + 1)`. Arrivals for `now` must
    /// already have been woken.
    pub fn tick(&mut self) -> Vec<SchedCoreEvent> {
        // A slice that ended last tick is requeued after this tick's
        // arrivals, so new work lines up ahead of it.
        self.settle_expired_slice();

        self.scheduler.before_dispatch(&mut self.ctx);

        if self.ctx.cpu_is_idle() {
            self.try_schedule_cpu();
        }

        let ran = self.run_current();
        self.scheduler.tick(&mut self.ctx, ran);
        self.ctx.advance_time(1);

        if let Some(task_id) = ran {
            if self.ctx.task(task_id).remaining_demand == 0 {
                let now = self.ctx.now;
                self.ctx.mark_completed(task_id, now);
                debug!(task = task_id, job = self.ctx.task(task_id).job, at = now, "completed");
            }
        }

        self.observer.observe(&self.ctx, ran);
        self.ctx.take_events()
    }

    fn settle_expired_slice(&mut self) {
        let Some(task_id) = self.ctx.current else {
            return;
        };
        if !self.ctx.task(task_id).slice_expired() {
            return;
        }

        self.ctx.mark_waiting(task_id);
        let flags: EnqueueFlags = ENQ_PREEMPT;
        self.scheduler.enqueue(&mut self.ctx, task_id, flags);
    }

    fn try_schedule_cpu(&mut self) {
        // 1. Pull from the CPU's local DSQ
        // 2. Pull from the global DSQ
        // 3. Call dispatch() to fill the local DSQ
        let local = self.ctx.local_dsq();
        let global = self.ctx.global_dsq();

        let task = self
            .ctx
            .dsq_pop(local)
            .or_else(|| self.ctx.dsq_pop(global))
            .or_else(|| {
                self.scheduler.dispatch(&mut self.ctx);
                self.ctx.dsq_pop(local)
            });

        if let Some(task_id) = task {
            self.ctx.set_running(task_id);
            trace!(
                task = task_id,
                at = self.ctx.now,
                slice = ?self.ctx.task(task_id).allocated_timeslice,
                "dispatched"
            );
        }
    }

    fn run_current(&mut self) -> Option<TaskId> {
        let ran = self.ctx.current;
        if ran != self.last_ran {
            self.ctx.push_event(SchedCoreEvent::CpuCurrentChange {
                from: self.last_ran,
                to: ran,
            });
            self.last_ran = ran;
        }

        let Some(task_id) = ran else {
            self.ctx.push_event(SchedCoreEvent::CpuIdle);
            return None;
        };

        // In its own block to avoid double-mutable-borrow
        {
            let task = self.ctx.task_mut(task_id);
            assert!(
                task.remaining_demand > 0,
                "Task {task_id} scheduled with no remaining demand"
            );
            task.remaining_demand -= 1;
            task.consumed_timeslice += 1;
        }
        self.ctx.attribute(task_id);

        Some(task_id)
    }

    /// Nothing is running, nothing is queued, and the last tick was already
    /// reported idle.
    pub fn is_quiescent(&self) -> bool {
        self.last_ran.is_none() && self.ctx.cpu_is_idle() && self.ctx.task_to_dsq.is_empty()
    }

    /// Jump the clock over an idle stretch to `at`. Only valid while
    /// quiescent: no hook could observe the skipped ticks.
    pub fn skip_idle_until(&mut self, at: Ticks) {
        assert!(self.is_quiescent(), "skipping time with work pending at {}", self.ctx.now);
        if at > self.ctx.now {
            trace!(from = self.ctx.now, to = at, "idle");
            self.ctx.advance_time(at - self.ctx.now);
        }
    }

    pub fn wake_task(&mut self, task: TaskId) {
        self.ctx.mark_ready(task);
        let flags: EnqueueFlags = ENQ_WAKEUP;
        self.scheduler.enqueue(&mut self.ctx, task, flags);
    }

    pub fn now(&self) -> Ticks {
        self.ctx.now
    }

    pub fn observer(&self) -> &Observer {
        &self.observer
    }
}
