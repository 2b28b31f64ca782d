use super::state::{SchedCtx, TaskId, TaskState, Ticks};

/// Checks table-wide invariants after every tick and keeps the busy/idle
/// tick counts used for CPU utilization.
#[derive(Debug, Default)]
pub struct Observer {
    busy_ticks: Ticks,
}

impl Observer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, ctx: &SchedCtx, ran: Option<TaskId>) {
        if ran.is_some() {
            self.busy_ticks += 1;
        }

        if let Some(task_id) = ctx.current {
            let task = ctx.task(task_id);
            debug_assert_eq!(
                task.state,
                TaskState::Running,
                "cpu.current task {task_id} must be Running"
            );
            debug_assert!(
                task.remaining_demand > 0,
                "Task {task_id} on CPU with no remaining demand"
            );
        }

        for task in &ctx.tasks {
            debug_assert!(
                task.remaining_demand <= task.total_demand,
                "Task {} remaining {} exceeds total {}",
                task.id,
                task.remaining_demand,
                task.total_demand
            );
            if task.state == TaskState::Terminated {
                let completion = task.completion_time.unwrap_or_default();
                debug_assert!(
                    task.remaining_demand == 0
                        && completion > task.arrival_time
                        && completion - task.arrival_time >= task.total_demand,
                    "Terminated task {} violates completion bounds: {task:?}",
                    task.id
                );
            }
        }

        for (&task_id, &dsq_id) in &ctx.task_to_dsq {
            let task = ctx.task(task_id);
            debug_assert!(
                task.state.is_queued(),
                "Task {task_id} in DSQ {dsq_id:?} while {:?}",
                task.state
            );
            if let Some(dsq) = ctx.dsqs.get(dsq_id) {
                debug_assert!(
                    dsq.contains(task_id),
                    "task_to_dsq claims task {task_id} in DSQ {dsq_id:?}, but queue does not contain it"
                );
            } else {
                debug_assert!(false, "task_to_dsq references unknown DSQ {dsq_id:?}");
            }
        }
    }

    pub fn busy_ticks(&self) -> Ticks {
        self.busy_ticks
    }
}
