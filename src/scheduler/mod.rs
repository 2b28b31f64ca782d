pub mod fifo;
pub mod mlfq;
pub mod preemptive_priority;
pub mod priq;
pub mod round_robin;
pub mod srtf;

use std::{fmt, str::FromStr};

use serde::Serialize;

use crate::{
    config::SchedConfig,
    core::{
        Ticks,
        state::{SchedCtx, TaskId},
    },
    error::SchedError,
    sim::{Job, Schedule, Sim},
};
pub use fifo::FifoScheduler;
pub use mlfq::MlfqScheduler;
pub use preemptive_priority::PreemptivePriorityScheduler;
pub use priq::{PriorityScheduler, PriqScheduler, Ranking, SjfScheduler};
pub use round_robin::RoundRobinScheduler;
pub use srtf::SrtfScheduler;

pub type EnqueueFlags = u64;

/// Task just arrived.
pub const ENQ_WAKEUP: EnqueueFlags = 1 << 0;
/// Task's slice ran out before it finished.
pub const ENQ_PREEMPT: EnqueueFlags = 1 << 1;

/// Callbacks the per-tick core invokes. A scheduler owns its queues inside
/// the [`SchedCtx`] and decides what runs next; the core owns the clock,
/// the CPU and task completion.
pub trait Scheduler {
    fn init(ctx: &mut SchedCtx, config: &SchedConfig) -> Self;

    /// Queue a task that just arrived or whose slice expired.
    fn enqueue(&mut self, ctx: &mut SchedCtx, task: TaskId, flags: EnqueueFlags);

    /// CPU is idle and the local and global DSQs are empty: move the next
    /// task to the local DSQ, or leave the CPU idle.
    fn dispatch(&mut self, ctx: &mut SchedCtx);

    /// Once per tick, after arrivals and requeues, before dispatch.
    fn before_dispatch(&mut self, _ctx: &mut SchedCtx) {}

    /// Once per tick, after `running` (if any) executed one unit.
    fn tick(&mut self, _ctx: &mut SchedCtx, _running: Option<TaskId>) {}
}

/// The closed set of scheduling policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Policy {
    Fcfs,
    Sjf,
    Priority,
    RoundRobin,
    Srtf,
    PreemptivePriority,
    Mlfq,
}

impl Policy {
    pub const ALL: [Policy; 7] = [
        Policy::Fcfs,
        Policy::Sjf,
        Policy::Priority,
        Policy::RoundRobin,
        Policy::Srtf,
        Policy::PreemptivePriority,
        Policy::Mlfq,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Policy::Fcfs => "fcfs",
            Policy::Sjf => "sjf",
            Policy::Priority => "priority",
            Policy::RoundRobin => "rr",
            Policy::Srtf => "srtf",
            Policy::PreemptivePriority => "pprio",
            Policy::Mlfq => "mlfq",
        }
    }

    /// Whether a dispatched task can lose the CPU before it finishes.
    pub fn is_preemptive(self) -> bool {
        !matches!(self, Policy::Fcfs | Policy::Sjf | Policy::Priority)
    }

    /// Run this policy over `jobs`. `jobs` is only read: every run builds its
    /// own task records, so one workload can be scheduled any number of times.
    pub fn schedule(self, jobs: &[Job], config: &SchedConfig) -> Result<Schedule, SchedError> {
        match self {
            Policy::Fcfs => Sim::<FifoScheduler>::new(jobs, config)?.run(self),
            Policy::Sjf => Sim::<SjfScheduler>::new(jobs, config)?.run(self),
            Policy::Priority => Sim::<PriorityScheduler>::new(jobs, config)?.run(self),
            Policy::RoundRobin => Sim::<RoundRobinScheduler>::new(jobs, config)?.run(self),
            Policy::Srtf => Sim::<SrtfScheduler>::new(jobs, config)?.run(self),
            Policy::PreemptivePriority => {
                Sim::<PreemptivePriorityScheduler>::new(jobs, config)?.run(self)
            }
            Policy::Mlfq => Sim::<MlfqScheduler>::new(jobs, config)?.run(self),
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Policy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.to_ascii_lowercase();
        let policy = match lowered.as_str() {
            "fcfs" | "fifo" => Policy::Fcfs,
            "sjf" => Policy::Sjf,
            "priority" | "prio" => Policy::Priority,
            "rr" | "round_robin" | "round-robin" => Policy::RoundRobin,
            "srtf" => Policy::Srtf,
            "pprio" | "preemptive_priority" | "preemptive-priority" => {
                Policy::PreemptivePriority
            }
            "mlfq" => Policy::Mlfq,
            _ => return Err(format!("unknown policy `{s}`")),
        };
        Ok(policy)
    }
}

/// Slice for a task that may run at most `quantum` ticks per dispatch.
pub(crate) fn bounded_slice(quantum: Ticks, remaining: Ticks) -> Ticks {
    quantum.min(remaining)
}
