use crate::core::{TaskId, TaskState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedCoreEvent {
    TaskStateChange {
        task: TaskId,
        from: TaskState,
        to: TaskState,
    },
    // Executing task differs from the one that executed the previous tick
    CpuCurrentChange {
        from: Option<TaskId>,
        to: Option<TaskId>,
    },
    // CPU idle even after dispatch()
    CpuIdle,
    QueueLevelChange {
        task: TaskId,
        from: usize,
        to: usize,
    },
    PriorityChange {
        task: TaskId,
        from: i32,
        to: i32,
    },
}

impl SchedCoreEvent {
    /// A switch from one task directly to a different one.
    pub fn is_context_switch(&self) -> bool {
        matches!(
            self,
            SchedCoreEvent::CpuCurrentChange {
                from: Some(_),
                to: Some(_),
            }
        )
    }
}
