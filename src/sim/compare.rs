use super::{job::Job, schedule::Schedule};
use crate::{config::SchedConfig, error::SchedError, scheduler::Policy};

/// Run each of `policies` over the same `jobs`. Every run starts from fresh
/// task records, so the results are independent of one another and of the
/// order of `policies`.
pub fn compare(
    jobs: &[Job],
    policies: &[Policy],
    config: &SchedConfig,
) -> Result<Vec<Schedule>, SchedError> {
    policies
        .iter()
        .map(|policy| policy.schedule(jobs, config))
        .collect()
}
