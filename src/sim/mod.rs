pub mod compare;
pub mod driver;
pub mod job;
pub mod schedule;
pub mod workload;

pub use compare::compare;
pub use driver::Sim;
pub use job::{Job, JobId, validate_jobs};
pub use schedule::Schedule;
pub use workload::{bernoulli_jobs, jobs_from_json, standard_workload};
