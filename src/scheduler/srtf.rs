use super::priq::{PriqScheduler, Ranking};
use crate::core::{Rank, Task};

/// Smallest remaining demand, ties to the lower job id. The running task
/// gets no bonus: it is requeued every tick and competes on its key alone.
pub struct ShortestRemaining;

impl Ranking for ShortestRemaining {
    const PREEMPTIVE: bool = true;

    fn rank(task: &Task) -> Rank {
        Rank::new(Rank::ticks(task.remaining_demand), 0, task.job)
    }
}

pub type SrtfScheduler = PriqScheduler<ShortestRemaining>;
