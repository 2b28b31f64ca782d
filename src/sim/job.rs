use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::{core::state::Ticks, error::InvalidTaskError};

pub type JobId = u64;

const DEFAULT_PRIORITY: i32 = 5;

/// A unit of CPU-bound work as the caller describes it. Signed fields keep
/// bad input representable so it can be rejected rather than wrapped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub arrival_time: i64,
    pub run_time: i64,
    #[serde(default = "default_priority")]
    pub priority: i32,
}

fn default_priority() -> i32 {
    DEFAULT_PRIORITY
}

impl Job {
    pub fn new(id: JobId, arrival_time: i64, run_time: i64) -> Self {
        Self {
            id,
            arrival_time,
            run_time,
            priority: DEFAULT_PRIORITY,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Returns `(arrival_time, run_time)` as ticks.
    pub fn validate(&self) -> Result<(Ticks, Ticks), InvalidTaskError> {
        let arrival = Ticks::try_from(self.arrival_time).map_err(|_| {
            InvalidTaskError::NegativeArrival {
                id: self.id,
                arrival_time: self.arrival_time,
            }
        })?;

        let run_time = match Ticks::try_from(self.run_time) {
            Ok(run_time) if run_time > 0 => run_time,
            _ => {
                return Err(InvalidTaskError::NonPositiveDemand {
                    id: self.id,
                    run_time: self.run_time,
                });
            }
        };

        Ok((arrival, run_time))
    }
}

/// Check every job and reject duplicate ids. The first offending job, in
/// input order, is reported. On success returns each job's
/// `(arrival_time, run_time)` in ticks, in input order.
pub fn validate_jobs(jobs: &[Job]) -> Result<Vec<(Ticks, Ticks)>, InvalidTaskError> {
    let mut seen = FxHashSet::default();
    let mut validated = Vec::with_capacity(jobs.len());
    for job in jobs {
        validated.push(job.validate()?);
        if !seen.insert(job.id) {
            return Err(InvalidTaskError::DuplicateId(job.id));
        }
    }
    Ok(validated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_and_negative_run_time_are_rejected() {
        for run_time in [0, -4] {
            assert_eq!(
                Job::new(3, 0, run_time).validate(),
                Err(InvalidTaskError::NonPositiveDemand { id: 3, run_time })
            );
        }
    }

    #[test]
    fn negative_arrival_is_rejected() {
        assert_eq!(
            Job::new(1, -1, 5).validate(),
            Err(InvalidTaskError::NegativeArrival {
                id: 1,
                arrival_time: -1
            })
        );
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let jobs = [Job::new(1, 0, 2), Job::new(2, 1, 2), Job::new(1, 3, 2)];
        assert_eq!(validate_jobs(&jobs), Err(InvalidTaskError::DuplicateId(1)));
    }

    #[test]
    fn valid_jobs_convert_to_ticks_in_input_order() {
        let jobs = [Job::new(7, 4, 2), Job::new(3, 0, 9)];
        assert_eq!(validate_jobs(&jobs), Ok(vec![(4, 2), (0, 9)]));
    }

    #[test]
    fn priority_defaults_when_missing_from_json() {
        let job: Job = serde_json::from_str(r#"{"id": 4, "arrival_time": 2, "run_time": 7}"#)
            .unwrap();
        assert_eq!(job, Job::new(4, 2, 7));
        assert_eq!(job.priority, 5);
    }
}
