//! Daily wall-clock trigger.
//!
//! Each registered job gets its own loop that sleeps until the next local
//! `HH:MM` occurrence and spawns the invocation, so a run longer than a day
//! overlaps the next firing. Stopping dispatches nothing new and drains
//! in-flight invocations to completion.
use chrono::{Duration as ChronoDuration, Local, NaiveDateTime, NaiveTime};
use futures::future::BoxFuture;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
#[error("invalid time of day '{0}', expected HH:MM")]
pub struct ParseTimeOfDayError(String);

/// A local wall-clock time of day, minute granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeOfDay(NaiveTime);

impl TimeOfDay {
    /// The next occurrence strictly after `now`.
    pub fn next_after(&self, now: NaiveDateTime) -> NaiveDateTime {
        let candidate = now.date().and_time(self.0);
        if candidate > now {
            candidate
        } else {
            candidate + ChronoDuration::days(1)
        }
    }
}

impl FromStr for TimeOfDay {
    type Err = ParseTimeOfDayError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        NaiveTime::parse_from_str(value.trim(), "%H:%M")
            .map(TimeOfDay)
            .map_err(|_| ParseTimeOfDayError(value.to_string()))
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

type TaskFn = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

struct Job {
    name: String,
    at: TimeOfDay,
    task: TaskFn,
}

/// Collects daily jobs before the process starts them as one unit.
#[derive(Default)]
pub struct Scheduler {
    jobs: Vec<Job>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job to run every day at `at` local time.
    pub fn daily<F, Fut>(&mut self, name: impl Into<String>, at: TimeOfDay, task: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        self.jobs.push(Job {
            name: name.into(),
            at,
            task: Arc::new(move || Box::pin(task())),
        });
    }

    /// Start all job loops. Non-blocking; the returned handle stops them.
    pub fn start(self) -> SchedulerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handles = self
            .jobs
            .into_iter()
            .map(|job| {
                let shutdown = shutdown_rx.clone();
                tokio::spawn(run_job(job, shutdown))
            })
            .collect();
        info!("scheduler started");
        SchedulerHandle {
            shutdown: shutdown_tx,
            handles,
        }
    }
}

async fn run_job(job: Job, mut shutdown: watch::Receiver<bool>) {
    let mut inflight: JoinSet<()> = JoinSet::new();
    loop {
        let now = Local::now().naive_local();
        let next = job.at.next_after(now);
        let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
        debug!(job = %job.name, at = %next, "next run scheduled");

        tokio::select! {
            _ = tokio::time::sleep(wait) => {
                info!(job = %job.name, "dispatching scheduled job");
                inflight.spawn((job.task)());
            }
            Some(_) = inflight.join_next(), if !inflight.is_empty() => {}
            _ = shutdown.changed() => break,
        }
    }

    // Drain invocations still running; there is no mid-run cancellation.
    while inflight.join_next().await.is_some() {}
    debug!(job = %job.name, "job loop stopped");
}

/// Handle over the running scheduler. Dropping it without `stop` detaches the
/// job loops.
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Stop dispatching and wait for in-flight invocations to finish.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        for handle in self.handles {
            if let Err(err) = handle.await {
                warn!(error = %err, "scheduler job loop panicked");
            }
        }
        info!("scheduler stopped");
    }
}
