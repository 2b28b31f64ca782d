use rand::prelude::*;

use super::job::{Job, JobId};

/// Four overlapping jobs arriving one tick apart.
pub fn standard_workload() -> Vec<Job> {
    vec![
        Job::new(1, 0, 5).with_priority(3),
        Job::new(2, 1, 3).with_priority(1),
        Job::new(3, 2, 8).with_priority(4),
        Job::new(4, 3, 6).with_priority(2),
    ]
}

/// Every tick in `0..ticks` spawns a job with probability `p_arrival`; a
/// spawned job is short with probability `p_short`. Priorities are drawn
/// from `0..10`. The same seed always yields the same workload.
pub fn bernoulli_jobs(
    ticks: u64,
    p_arrival: f64,
    p_short: f64,
    short_ticks: u64,
    long_ticks: u64,
    seed: u64,
) -> Vec<Job> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut jobs = Vec::new();

    for t in 0..ticks {
        if rng.random::<f64>() < p_arrival {
            let run_time = if rng.random::<f64>() < p_short {
                short_ticks
            } else {
                long_ticks
            };

            jobs.push(
                Job::new(jobs.len() as JobId + 1, t as i64, run_time as i64)
                    .with_priority(rng.random_range(0..10)),
            );
        }
    }

    jobs
}

pub fn jobs_from_json(text: &str) -> serde_json::Result<Vec<Job>> {
    serde_json::from_str(text)
}
