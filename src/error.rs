use thiserror::Error;

use crate::sim::JobId;

/// A job that cannot be scheduled. Rejected before the first tick, so the
/// whole run fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidTaskError {
    #[error("job {id}: run time must be positive, got {run_time}")]
    NonPositiveDemand { id: JobId, run_time: i64 },

    #[error("job {id}: arrival time must not be negative, got {arrival_time}")]
    NegativeArrival { id: JobId, arrival_time: i64 },

    #[error("job id {0} appears more than once in the workload")]
    DuplicateId(JobId),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedError {
    #[error(transparent)]
    InvalidTask(#[from] InvalidTaskError),

    #[error("invalid scheduler config: {0}")]
    InvalidConfig(String),

    #[error("job {0} has no completion time")]
    TaskNotFinished(JobId),
}
