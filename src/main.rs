use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use sched_model::{
    Interval, Job, PerTaskStats, Policy, SchedConfig, Schedule, Scheduler, Sim, Summary,
    scheduler::{
        FifoScheduler, MlfqScheduler, PreemptivePriorityScheduler, PriorityScheduler,
        RoundRobinScheduler, SjfScheduler, SrtfScheduler,
    },
    sim::{bernoulli_jobs, jobs_from_json, standard_workload},
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sched_model", about = "Compare CPU scheduling policies on one workload")]
struct Args {
    /// Policy to run; repeat for several. Runs all seven when omitted.
    #[arg(short, long = "policy", value_name = "NAME")]
    policies: Vec<Policy>,

    /// JSON array of jobs: `[{"id": 1, "arrival_time": 0, "run_time": 5, "priority": 2}]`
    #[arg(short, long, value_name = "PATH", conflicts_with = "random")]
    workload: Option<PathBuf>,

    /// Generate a random workload from this seed instead.
    #[arg(long, value_name = "SEED")]
    random: Option<u64>,

    /// Ticks over which random arrivals are drawn.
    #[arg(long, default_value_t = 40, requires = "random")]
    random_ticks: u64,

    /// JSON scheduler config; unspecified fields keep their defaults.
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Round-robin quantum, overriding the config.
    #[arg(short, long)]
    quantum: Option<u64>,

    /// Print every per-tick scheduler event.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    events: bool,

    /// Emit one JSON report per policy instead of tables.
    #[arg(long, action = clap::ArgAction::SetTrue, conflicts_with = "events")]
    json: bool,
}

#[derive(Serialize)]
struct Report<'a> {
    policy: Policy,
    intervals: &'a [Interval],
    stats: &'a PerTaskStats,
    summary: Summary,
    context_switches: u64,
}

impl<'a> From<&'a Schedule> for Report<'a> {
    fn from(schedule: &'a Schedule) -> Self {
        Self {
            policy: schedule.policy,
            intervals: &schedule.intervals,
            stats: &schedule.stats,
            summary: schedule.summary(),
            context_switches: schedule.context_switches,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    let jobs = load_jobs(&args)?;
    let policies = if args.policies.is_empty() {
        Policy::ALL.to_vec()
    } else {
        args.policies.clone()
    };

    if args.json {
        let schedules = sched_model::compare(&jobs, &policies, &config)?;
        let reports: Vec<Report<'_>> = schedules.iter().map(Report::from).collect();
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    println!("{} jobs", jobs.len());
    for job in &jobs {
        println!(
            "  job {:>3}: arrival {:>3}, run time {:>3}, priority {:>2}",
            job.id, job.arrival_time, job.run_time, job.priority
        );
    }

    let mut schedules = Vec::with_capacity(policies.len());
    for policy in policies {
        let schedule = if args.events {
            run_printing_events(policy, &jobs, &config)?
        } else {
            policy
                .schedule(&jobs, &config)
                .with_context(|| format!("{policy} failed"))?
        };
        print_schedule(&schedule);
        schedules.push(schedule);
    }

    if schedules.len() > 1 {
        print_comparison(&schedules);
    }
    Ok(())
}

fn load_config(args: &Args) -> Result<SchedConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            SchedConfig::from_json(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => SchedConfig::default(),
    };

    if let Some(quantum) = args.quantum {
        config.rr_quantum = quantum;
    }
    config.validate()?;
    Ok(config)
}

fn load_jobs(args: &Args) -> Result<Vec<Job>> {
    if let Some(path) = &args.workload {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading workload {}", path.display()))?;
        return jobs_from_json(&text).with_context(|| format!("parsing {}", path.display()));
    }

    Ok(match args.random {
        Some(seed) => bernoulli_jobs(args.random_ticks, 0.3, 0.3, 2, 6, seed),
        None => standard_workload(),
    })
}

fn run_printing_events(policy: Policy, jobs: &[Job], config: &SchedConfig) -> Result<Schedule> {
    println!("\n== {policy} events");
    match policy {
        Policy::Fcfs => run_traced::<FifoScheduler>(policy, jobs, config),
        Policy::Sjf => run_traced::<SjfScheduler>(policy, jobs, config),
        Policy::Priority => run_traced::<PriorityScheduler>(policy, jobs, config),
        Policy::RoundRobin => run_traced::<RoundRobinScheduler>(policy, jobs, config),
        Policy::Srtf => run_traced::<SrtfScheduler>(policy, jobs, config),
        Policy::PreemptivePriority => run_traced::<PreemptivePriorityScheduler>(policy, jobs, config),
        Policy::Mlfq => run_traced::<MlfqScheduler>(policy, jobs, config),
    }
}

fn run_traced<S: Scheduler>(policy: Policy, jobs: &[Job], config: &SchedConfig) -> Result<Schedule> {
    let schedule = Sim::<S>::new(jobs, config)?
        .run_with(policy, |now, event| println!("t={now} {event:?}"))?;
    Ok(schedule)
}

fn print_schedule(schedule: &Schedule) {
    println!("\n== {}", schedule.policy);

    let gantt: Vec<String> = schedule
        .intervals
        .iter()
        .map(|i| format!("[{}: {}-{}]", i.job, i.start, i.end))
        .collect();
    println!("gantt: {}", gantt.join(" "));

    println!("  job  waiting  turnaround  response");
    for (job, stats) in &schedule.stats {
        println!(
            "  {job:>3}  {:>7}  {:>10}  {:>8}",
            stats.waiting, stats.turnaround, stats.response
        );
    }

    let summary = schedule.summary();
    println!(
        "avg waiting {:.2}, avg turnaround {:.2}, avg response {:.2}, cpu {:.1}%, {} context switches",
        summary.avg_waiting,
        summary.avg_turnaround,
        summary.avg_response,
        summary.cpu_utilization * 100.0,
        schedule.context_switches
    );
}

fn print_comparison(schedules: &[Schedule]) {
    println!("\n== comparison");
    println!("  policy    avg wait  avg turnaround  avg response  switches");
    for schedule in schedules {
        let summary = schedule.summary();
        println!(
            "  {:<8}  {:>8.2}  {:>14.2}  {:>12.2}  {:>8}",
            schedule.policy.name(),
            summary.avg_waiting,
            summary.avg_turnaround,
            summary.avg_response,
            schedule.context_switches
        );
    }
}
