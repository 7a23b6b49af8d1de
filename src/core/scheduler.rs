//! Interval scheduler for collection jobs.
//!
//! Jobs run one after another on the calling task. A failing job is logged and
//! kept on its interval unless `cancel_on_failure` is set.

use crate::core::collector::JobRunner;
use crate::core::shutdown::ShutdownToken;
use crate::domain::model::{CollectOutcome, JobSpec};
use crate::domain::ports::Clock;
use chrono::{DateTime, Local, Utc};
use std::time::Duration;

pub const DEFAULT_TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct ScheduledJob {
    pub spec: JobSpec,
    pub next_run: DateTime<Utc>,
    pub last_run: Option<DateTime<Utc>>,
}

impl ScheduledJob {
    fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_run <= now
    }

    fn reschedule(&mut self, now: DateTime<Utc>) {
        self.last_run = Some(now);
        let every = chrono::Duration::from_std(self.spec.every).unwrap_or(chrono::Duration::MAX);
        self.next_run = now
            .checked_add_signed(every)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub ran: usize,
    pub written: usize,
    pub empty: usize,
    pub failed: usize,
    pub cancelled: usize,
}

pub struct Scheduler<R: JobRunner, C: Clock> {
    runner: R,
    clock: C,
    jobs: Vec<ScheduledJob>,
    cancel_on_failure: bool,
    tick: Duration,
}

impl<R: JobRunner, C: Clock> Scheduler<R, C> {
    pub fn new(runner: R, clock: C) -> Self {
        Self {
            runner,
            clock,
            jobs: Vec::new(),
            cancel_on_failure: false,
            tick: DEFAULT_TICK,
        }
    }

    pub fn with_cancel_on_failure(mut self, cancel_on_failure: bool) -> Self {
        self.cancel_on_failure = cancel_on_failure;
        self
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// First run is one interval from now; `run_all` brings it forward.
    pub fn add(&mut self, spec: JobSpec) {
        let now = self.clock.now();
        tracing::debug!("Scheduling {} every {:?}", spec.request, spec.every);
        let mut job = ScheduledJob {
            spec,
            next_run: now,
            last_run: None,
        };
        job.reschedule(now);
        job.last_run = None;
        self.jobs.push(job);
    }

    pub fn jobs(&self) -> &[ScheduledJob] {
        &self.jobs
    }

    /// Run every job immediately, regardless of schedule.
    pub async fn run_all(&mut self) -> RunSummary {
        self.run_matching(|_, _| true).await
    }

    pub async fn run_pending(&mut self) -> RunSummary {
        self.run_matching(|job, now| job.is_due(now)).await
    }

    async fn run_matching<F>(&mut self, select: F) -> RunSummary
    where
        F: Fn(&ScheduledJob, DateTime<Utc>) -> bool,
    {
        let mut summary = RunSummary::default();
        let mut index = 0;

        while index < self.jobs.len() {
            let now = self.clock.now();
            if !select(&self.jobs[index], now) {
                index += 1;
                continue;
            }

            summary.ran += 1;
            let request = self.jobs[index].spec.request.clone();
            match self.runner.run(&request).await {
                Ok(CollectOutcome::Written(_)) => summary.written += 1,
                Ok(CollectOutcome::Empty) => summary.empty += 1,
                Err(e) => {
                    summary.failed += 1;
                    let stamp = Local::now().format("%Y-%m-%dT%H:%M:%S%.6f");
                    tracing::error!(
                        "Job {} failed: {} (Category: {:?}, Severity: {:?})",
                        request,
                        e,
                        e.category(),
                        e.severity()
                    );
                    eprintln!("{} {}: {}", stamp, request, e);

                    if self.cancel_on_failure {
                        tracing::warn!("Cancelling job {}", request);
                        self.jobs.remove(index);
                        summary.cancelled += 1;
                        continue;
                    }
                }
            }

            let finished = self.clock.now();
            self.jobs[index].reschedule(finished);
            index += 1;
        }

        summary
    }

    /// Poll for due jobs every tick until shutdown is requested.
    pub async fn run_forever(&mut self, mut shutdown: ShutdownToken) {
        tracing::info!(
            "Scheduler running {} jobs (tick {:?})",
            self.jobs.len(),
            self.tick
        );

        while !shutdown.is_shutdown() {
            let summary = self.run_pending().await;
            if summary.ran > 0 {
                tracing::debug!("Tick summary: {:?}", summary);
            }

            tokio::select! {
                _ = tokio::time::sleep(self.tick) => {}
                _ = shutdown.wait() => break,
            }
        }

        tracing::info!("Scheduler stopped");
    }
}
