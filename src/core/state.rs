use keyed_priority_queue::KeyedPriorityQueue;
use rustc_hash::FxHashMap;
use slotmap::{SlotMap, new_key_type};
use std::{cmp::Ordering, collections::VecDeque};

use super::{event::SchedCoreEvent, timeline::Attribution};
use crate::sim::JobId;

// Index into Task Vec
pub type TaskId = usize;
pub type Ticks = u64;
new_key_type! {
    pub struct DsqId;
}

/// Ordering key for priority DSQs: `major`, then `minor`, then job id, all
/// ascending. The smallest rank is dispatched first.
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
pub struct Rank {
    pub major: i64,
    pub minor: i64,
    pub job: JobId,
}

impl Rank {
    pub fn new(major: i64, minor: i64, job: JobId) -> Self {
        Self { major, minor, job }
    }

    pub fn ticks(t: Ticks) -> i64 {
        i64::try_from(t).unwrap_or(i64::MAX)
    }
}

// KeyedPriorityQueue is a max-heap, so we need to flip-flop Rank's Ord
impl PartialOrd for Rank {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Rank {
    fn cmp(&self, other: &Self) -> Ordering {
        (other.major, other.minor, other.job).cmp(&(self.major, self.minor, self.job))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Not yet arrived.
    New,
    /// Queued, never dispatched.
    Ready,
    Running,
    /// Queued again after a slice ended without finishing.
    Waiting,
    Terminated,
}

impl TaskState {
    pub fn can_transition_to(self, next: TaskState) -> bool {
        use TaskState::*;
        matches!(
            (self, next),
            (New, Ready)
                | (Ready, Running)
                | (Running, Waiting)
                | (Waiting, Running)
                | (Running, Terminated)
        )
    }

    pub fn is_queued(self) -> bool {
        matches!(self, TaskState::Ready | TaskState::Waiting)
    }
}

#[derive(Debug, Clone)]
pub struct Task {
    pub id: TaskId,
    pub job: JobId,
    pub state: TaskState,
    pub arrival_time: Ticks,
    pub total_demand: Ticks,
    pub remaining_demand: Ticks,
    /// Lower value runs first.
    pub priority: i32,
    /// MLFQ tier, 0 is highest.
    pub queue_level: usize,
    pub wait_age: Ticks,
    pub allocated_timeslice: Option<Ticks>,
    pub consumed_timeslice: Ticks,
    pub first_run: Option<Ticks>,
    pub completion_time: Option<Ticks>,
}

impl Task {
    pub fn slice_expired(&self) -> bool {
        self.remaining_demand > 0
            && self
                .allocated_timeslice
                .is_some_and(|slice| self.consumed_timeslice >= slice)
    }
}

#[derive(Debug)]
pub enum Dsq {
    Fifo {
        tasks: VecDeque<TaskId>,
    },
    Priq {
        tasks: KeyedPriorityQueue<TaskId, Rank>,
    },
}

impl Dsq {
    pub fn new_fifo() -> Self {
        Self::Fifo {
            tasks: VecDeque::new(),
        }
    }

    pub fn new_priq() -> Self {
        Self::Priq {
            tasks: KeyedPriorityQueue::new(),
        }
    }

    pub fn contains(&self, task_id: TaskId) -> bool {
        match self {
            Self::Fifo { tasks } => tasks.contains(&task_id),
            Self::Priq { tasks } => tasks.get_priority(&task_id).is_some(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Fifo { tasks } => tasks.len(),
            Self::Priq { tasks } => tasks.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // FIFO order for Fifo queues, ascending TaskId for Priq queues
    pub fn snapshot(&self) -> Vec<TaskId> {
        match self {
            Self::Fifo { tasks } => tasks.iter().copied().collect(),
            Self::Priq { tasks } => {
                let mut ids: Vec<TaskId> = tasks.iter().map(|(id, _)| *id).collect();
                ids.sort_unstable();
                ids
            }
        }
    }
}

/// Everything a scheduler may touch during one run: the task table, the
/// dispatch queues, the single CPU and the clock.
#[derive(Debug)]
pub struct SchedCtx {
    pub now: Ticks,
    pub current: Option<TaskId>,
    pub tasks: Vec<Task>,
    pub dsqs: SlotMap<DsqId, Dsq>,
    pub task_to_dsq: FxHashMap<TaskId, DsqId>,
    pub global_dsq_id: DsqId,
    pub local_dsq_id: DsqId,
    attributions: Vec<Attribution>,
    events: Vec<SchedCoreEvent>,
}

impl Default for SchedCtx {
    fn default() -> Self {
        Self::new()
    }
}

impl SchedCtx {
    pub fn new() -> Self {
        let mut dsqs = SlotMap::with_capacity_and_key(2);
        let global_dsq_id = dsqs.insert(Dsq::new_fifo());
        let local_dsq_id = dsqs.insert(Dsq::new_fifo());

        Self {
            now: 0,
            current: None,
            tasks: Vec::new(),
            dsqs,
            task_to_dsq: FxHashMap::default(),
            global_dsq_id,
            local_dsq_id,
            attributions: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn create_task(
        &mut self,
        job: JobId,
        arrival_time: Ticks,
        total_demand: Ticks,
        priority: i32,
    ) -> TaskId {
        assert!(total_demand > 0, "Job {job} created with zero demand");
        let id = self.tasks.len();

        self.tasks.push(Task {
            id,
            job,
            state: TaskState::New,
            arrival_time,
            total_demand,
            remaining_demand: total_demand,
            priority,
            queue_level: 0,
            wait_age: 0,
            allocated_timeslice: None,
            consumed_timeslice: 0,
            first_run: None,
            completion_time: None,
        });

        id
    }

    pub fn advance_time(&mut self, delta: Ticks) {
        self.now = self.now.saturating_add(delta);
    }

    pub fn create_dsq_fifo(&mut self) -> DsqId {
        self.dsqs.insert(Dsq::new_fifo())
    }

    pub fn create_dsq_priq(&mut self) -> DsqId {
        self.dsqs.insert(Dsq::new_priq())
    }

    fn dsq_push(&mut self, dsq_id: DsqId, task_id: TaskId, slice: Ticks, rank: Option<Rank>) {
        assert!(
            !self.task_to_dsq.contains_key(&task_id),
            "Task {task_id} already present in some DSQ"
        );
        assert!(slice > 0, "Task {task_id} enqueued with an empty slice");

        let task = self.task_mut(task_id);
        debug_assert!(
            task.state.is_queued(),
            "Task {task_id} must be Ready or Waiting when enqueued, was {:?}",
            task.state
        );

        task.allocated_timeslice = Some(slice);
        let dsq = self.dsqs.get_mut(dsq_id).expect("Unknown DSQ");

        match dsq {
            Dsq::Fifo { tasks } => tasks.push_back(task_id),
            Dsq::Priq { tasks } => {
                tasks.push(
                    task_id,
                    rank.expect("Attempted to push to a PrioDsq with no rank"),
                );
            }
        };

        self.task_to_dsq.insert(task_id, dsq_id);
    }

    pub fn dsq_push_fifo(&mut self, dsq_id: DsqId, task_id: TaskId, slice: Ticks) {
        self.dsq_push(dsq_id, task_id, slice, None);
    }

    pub fn dsq_push_priq(&mut self, dsq_id: DsqId, task_id: TaskId, slice: Ticks, rank: Rank) {
        self.dsq_push(dsq_id, task_id, slice, Some(rank));
    }

    pub fn dsq_pop(&mut self, dsq_id: DsqId) -> Option<TaskId> {
        let dsq = self.dsqs.get_mut(dsq_id)?;
        let task = match dsq {
            Dsq::Fifo { tasks } => tasks.pop_front(),
            Dsq::Priq { tasks } => tasks.pop().map(|t| t.0),
        }?;

        let removed = self.task_to_dsq.remove(&task);
        debug_assert!(removed.is_some(), "Task {task} missing DSQ membership");

        Some(task)
    }

    /// Pull `task_id` out of the middle of a queue.
    pub fn dsq_remove(&mut self, dsq_id: DsqId, task_id: TaskId) -> bool {
        let Some(dsq) = self.dsqs.get_mut(dsq_id) else {
            return false;
        };
        let removed = match dsq {
            Dsq::Fifo { tasks } => match tasks.iter().position(|&t| t == task_id) {
                Some(pos) => tasks.remove(pos).is_some(),
                None => false,
            },
            Dsq::Priq { tasks } => tasks.remove(&task_id).is_some(),
        };

        if removed {
            self.task_to_dsq.remove(&task_id);
        }
        removed
    }

    pub fn dsq_rerank(&mut self, dsq_id: DsqId, task_id: TaskId, rank: Rank) {
        if let Some(Dsq::Priq { tasks }) = self.dsqs.get_mut(dsq_id) {
            let prev = tasks.set_priority(&task_id, rank);
            debug_assert!(prev.is_ok(), "Re-ranking task {task_id} not in DSQ {dsq_id:?}");
        } else {
            debug_assert!(false, "Re-ranking in non-priority DSQ {dsq_id:?}");
        }
    }

    pub fn dsq_move_to_local(&mut self, dsq_id: DsqId) {
        if let Some(task) = self.dsq_pop(dsq_id) {
            self.dsq_push_fifo(
                self.local_dsq(),
                task,
                self.task(task)
                    .allocated_timeslice
                    .expect("Task on DSQ must have slice"),
            );
        }
    }

    pub fn dsq_is_empty(&self, dsq_id: DsqId) -> bool {
        self.dsqs.get(dsq_id).is_none_or(Dsq::is_empty)
    }

    pub fn dsq_tasks(&self, dsq_id: DsqId) -> Vec<TaskId> {
        self.dsqs
            .get(dsq_id)
            .map(Dsq::snapshot)
            .unwrap_or_default()
    }

    pub fn task_in_any_dsq(&self, task_id: TaskId) -> bool {
        self.task_to_dsq.contains_key(&task_id)
    }

    pub fn task(&self, task_id: TaskId) -> &Task {
        &self.tasks[task_id]
    }

    pub fn task_mut(&mut self, task_id: TaskId) -> &mut Task {
        &mut self.tasks[task_id]
    }

    pub fn global_dsq(&self) -> DsqId {
        self.global_dsq_id
    }

    pub fn local_dsq(&self) -> DsqId {
        self.local_dsq_id
    }

    pub fn cpu_is_idle(&self) -> bool {
        self.current.is_none()
    }

    fn transition(&mut self, task_id: TaskId, to: TaskState) {
        let task = &mut self.tasks[task_id];
        let from = task.state;
        assert!(
            from.can_transition_to(to),
            "Task {task_id} (job {}) cannot go from {from:?} to {to:?}",
            task.job
        );
        task.state = to;
        self.events
            .push(SchedCoreEvent::TaskStateChange { task: task_id, from, to });
    }

    pub fn mark_ready(&mut self, task_id: TaskId) {
        debug_assert_eq!(
            self.task(task_id).arrival_time,
            self.now,
            "Task {task_id} woken before or after its arrival"
        );
        self.transition(task_id, TaskState::Ready);
    }

    /// Take the running task off the CPU with work left.
    pub fn mark_waiting(&mut self, task_id: TaskId) {
        debug_assert_eq!(self.current, Some(task_id), "Preempting task {task_id} not on CPU");
        self.transition(task_id, TaskState::Waiting);
        self.current = None;
    }

    pub fn mark_completed(&mut self, task_id: TaskId, completion_time: Ticks) {
        debug_assert!(
            !self.task_to_dsq.contains_key(&task_id),
            "Completing task {} that is still enqueued",
            task_id
        );

        self.transition(task_id, TaskState::Terminated);
        let task = &mut self.tasks[task_id];
        assert_eq!(task.remaining_demand, 0, "Task {task_id} completed with work left");
        assert!(
            task.completion_time.is_none(),
            "Task {task_id} completed twice"
        );
        task.completion_time = Some(completion_time);
        self.current = None;
    }

    // Return previous state (Ready on first dispatch, Waiting after)
    pub fn set_running(&mut self, task_id: TaskId) -> TaskState {
        debug_assert!(
            !self.task_to_dsq.contains_key(&task_id),
            "Running task {task_id} must not be enqueued"
        );
        debug_assert!(self.current.is_none(), "CPU already running a task");

        let prev_state = self.task(task_id).state;
        self.transition(task_id, TaskState::Running);
        self.current = Some(task_id);

        let now = self.now;
        let task = self.task_mut(task_id);
        task.first_run.get_or_insert(now);
        task.consumed_timeslice = 0;
        task.wait_age = 0;
        prev_state
    }

    pub fn set_queue_level(&mut self, task_id: TaskId, level: usize) {
        let task = self.task_mut(task_id);
        let from = task.queue_level;
        if from != level {
            task.queue_level = level;
            self.events.push(SchedCoreEvent::QueueLevelChange {
                task: task_id,
                from,
                to: level,
            });
        }
    }

    pub fn set_priority(&mut self, task_id: TaskId, priority: i32) {
        let task = self.task_mut(task_id);
        let from = task.priority;
        if from != priority {
            task.priority = priority;
            self.events.push(SchedCoreEvent::PriorityChange {
                task: task_id,
                from,
                to: priority,
            });
        }
    }

    pub fn push_event(&mut self, event: SchedCoreEvent) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<SchedCoreEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn attribute(&mut self, task_id: TaskId) {
        let job = self.task(task_id).job;
        self.attributions.push(Attribution { job, at: self.now });
    }

    pub fn attributions(&self) -> &[Attribution] {
        &self.attributions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx_with_tasks(n: usize) -> SchedCtx {
        let mut ctx = SchedCtx::new();
        for job in 0..n as u64 {
            let id = ctx.create_task(job + 1, 0, 3, 0);
            ctx.mark_ready(id);
        }
        ctx
    }

    #[test]
    fn state_table_rejects_skipping_ready() {
        assert!(TaskState::New.can_transition_to(TaskState::Ready));
        assert!(!TaskState::New.can_transition_to(TaskState::Running));
        assert!(!TaskState::Terminated.can_transition_to(TaskState::Ready));
        assert!(!TaskState::Waiting.can_transition_to(TaskState::Terminated));
    }

    #[test]
    #[should_panic(expected = "cannot go from New to Running")]
    fn running_a_task_that_never_arrived_panics() {
        let mut ctx = SchedCtx::new();
        let id = ctx.create_task(7, 0, 1, 0);
        ctx.set_running(id);
    }

    #[test]
    fn priq_pops_smallest_rank_first() {
        let mut ctx = ctx_with_tasks(3);
        let dsq = ctx.create_dsq_priq();
        ctx.dsq_push_priq(dsq, 0, 1, Rank::new(5, 0, 1));
        ctx.dsq_push_priq(dsq, 1, 1, Rank::new(2, 9, 2));
        ctx.dsq_push_priq(dsq, 2, 1, Rank::new(2, 1, 3));

        assert_eq!(ctx.dsq_pop(dsq), Some(2));
        assert_eq!(ctx.dsq_pop(dsq), Some(1));
        assert_eq!(ctx.dsq_pop(dsq), Some(0));
        assert_eq!(ctx.dsq_pop(dsq), None);
        assert!(!ctx.task_in_any_dsq(0));
    }

    #[test]
    fn rank_ties_fall_back_to_job_id() {
        assert!(Rank::new(1, 1, 2) > Rank::new(1, 1, 3));
    }

    #[test]
    fn rerank_moves_task_to_front() {
        let mut ctx = ctx_with_tasks(2);
        let dsq = ctx.create_dsq_priq();
        ctx.dsq_push_priq(dsq, 0, 1, Rank::new(1, 0, 1));
        ctx.dsq_push_priq(dsq, 1, 1, Rank::new(4, 0, 2));
        ctx.dsq_rerank(dsq, 1, Rank::new(0, 0, 2));

        assert_eq!(ctx.dsq_pop(dsq), Some(1));
    }

    #[test]
    fn fifo_remove_keeps_order_of_the_rest() {
        let mut ctx = ctx_with_tasks(3);
        let dsq = ctx.create_dsq_fifo();
        for task in 0..3 {
            ctx.dsq_push_fifo(dsq, task, 2);
        }

        assert!(ctx.dsq_remove(dsq, 1));
        assert!(!ctx.dsq_remove(dsq, 1));
        assert_eq!(ctx.dsq_tasks(dsq), vec![0, 2]);
        assert!(!ctx.task_in_any_dsq(1));
    }

    #[test]
    fn set_running_records_first_run_once() {
        let mut ctx = ctx_with_tasks(1);
        ctx.now = 4;
        ctx.set_running(0);
        ctx.mark_waiting(0);
        ctx.now = 9;
        ctx.set_running(0);

        assert_eq!(ctx.task(0).first_run, Some(4));
        assert_eq!(ctx.task(0).state, TaskState::Running);
    }
}
