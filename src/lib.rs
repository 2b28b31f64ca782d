pub mod config;
pub mod core;
pub mod error;
pub mod metrics;
pub mod scheduler;
pub mod sim;

pub use config::SchedConfig;
pub use crate::core::{Interval, SchedCoreEvent};
pub use error::{InvalidTaskError, SchedError};
pub use metrics::{PerTaskStats, Summary, TaskStats};
pub use scheduler::{Policy, Scheduler};
pub use sim::{Job, JobId, Schedule, Sim, compare};
