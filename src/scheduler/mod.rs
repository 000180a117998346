//! Scheduler core.
//!
//! Each job owns a cadence (fixed interval, daily, or weekly) and a
//! single-flight guard: if a tick fires while the previous run of the same
//! job is still going, the new tick is skipped and logged, never queued.
//! Job errors are caught at the tick boundary so one bad run cannot take the
//! scheduler down.

use chrono::{DateTime, Datelike, Days, Local, NaiveTime, TimeZone, Weekday};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::error::Result;

/// Every periodic job the daemon runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    PublishTick,
    CommentTick,
    DailyContent,
    ProductCycle,
    DailyMetrics,
    WeeklyTrends,
    TokenCheck,
}

impl JobKind {
    pub fn name(&self) -> &'static str {
        match self {
            JobKind::PublishTick => "publish-tick",
            JobKind::CommentTick => "comment-tick",
            JobKind::DailyContent => "daily-content",
            JobKind::ProductCycle => "product-cycle",
            JobKind::DailyMetrics => "daily-metrics",
            JobKind::WeeklyTrends => "weekly-trends",
            JobKind::TokenCheck => "token-check",
        }
    }
}

/// When a job fires.
#[derive(Debug, Clone, Copy)]
pub enum Cadence {
    /// Fixed interval between ticks.
    Every(Duration),
    /// Once a day at the given local time.
    DailyAt { hour: u32, minute: u32 },
    /// Once a week at the given local weekday and hour.
    WeeklyAt { weekday: Weekday, hour: u32 },
}

/// Fallback delay when a local time cannot be resolved (DST gaps).
const RESOLVE_FALLBACK: Duration = Duration::from_secs(60 * 60);

impl Cadence {
    /// Time until the next tick, from `now`.
    pub fn next_delay(&self, now: DateTime<Local>) -> Duration {
        match *self {
            Cadence::Every(interval) => interval,
            Cadence::DailyAt { hour, minute } => {
                let time = NaiveTime::from_hms_opt(hour.min(23), minute.min(59), 0)
                    .unwrap_or_default();
                next_occurrence(now, time, |_| true)
            }
            Cadence::WeeklyAt { weekday, hour } => {
                let time = NaiveTime::from_hms_opt(hour.min(23), 0, 0).unwrap_or_default();
                next_occurrence(now, time, |date| date.weekday() == weekday)
            }
        }
    }
}

/// Scan forward day by day for the first matching local datetime after `now`.
fn next_occurrence(
    now: DateTime<Local>,
    time: NaiveTime,
    accept: impl Fn(&chrono::NaiveDate) -> bool,
) -> Duration {
    for offset in 0..=7 {
        let Some(date) = now.date_naive().checked_add_days(Days::new(offset)) else {
            break;
        };
        if !accept(&date) {
            continue;
        }
        if let Some(candidate) = Local.from_local_datetime(&date.and_time(time)).earliest() {
            if candidate > now {
                return (candidate - now).to_std().unwrap_or(RESOLVE_FALLBACK);
            }
        }
    }
    RESOLVE_FALLBACK
}

type JobFuture = BoxFuture<'static, Result<()>>;

/// What one tick attempt did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Completed,
    /// Previous run of the same job still in flight.
    Skipped,
    Failed(String),
}

/// A registered periodic job.
pub struct Job {
    kind: JobKind,
    cadence: Cadence,
    guard: tokio::sync::Mutex<()>,
    run: Box<dyn Fn() -> JobFuture + Send + Sync>,
}

impl Job {
    pub fn new(
        kind: JobKind,
        cadence: Cadence,
        run: impl Fn() -> JobFuture + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            cadence,
            guard: tokio::sync::Mutex::new(()),
            run: Box::new(run),
        }
    }

    pub fn kind(&self) -> JobKind {
        self.kind
    }

    /// One tick attempt. Manual run-now goes through here too, so it shares
    /// the single-flight guard with the periodic loop.
    pub async fn tick(&self) -> TickOutcome {
        let Ok(_guard) = self.guard.try_lock() else {
            tracing::warn!(job = self.kind.name(), "previous run still in flight, skipping tick");
            return TickOutcome::Skipped;
        };

        match (self.run)().await {
            Ok(()) => {
                tracing::debug!(job = self.kind.name(), "tick complete");
                TickOutcome::Completed
            }
            Err(err) => {
                tracing::error!(job = self.kind.name(), error = %err, "tick failed");
                TickOutcome::Failed(err.to_string())
            }
        }
    }
}

/// Holds the job registry and spawns one tokio task per job.
#[derive(Default)]
pub struct Scheduler {
    jobs: Vec<Arc<Job>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, job: Job) -> Arc<Job> {
        let job = Arc::new(job);
        self.jobs.push(job.clone());
        job
    }

    pub fn job(&self, kind: JobKind) -> Option<Arc<Job>> {
        self.jobs.iter().find(|j| j.kind == kind).cloned()
    }

    /// Spawn the tick loop for every registered job.
    pub fn spawn_all(&self) -> Vec<JoinHandle<()>> {
        self.jobs
            .iter()
            .map(|job| {
                let job = job.clone();
                tokio::spawn(async move {
                    loop {
                        let delay = job.cadence.next_delay(Local::now());
                        tracing::debug!(
                            job = job.kind.name(),
                            delay_secs = delay.as_secs(),
                            "next tick scheduled"
                        );
                        tokio::time::sleep(delay).await;
                        job.tick().await;
                    }
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CadenceError;
    use tokio::sync::Notify;

    #[test]
    fn test_every_cadence_is_the_interval() {
        let cadence = Cadence::Every(Duration::from_secs(90));
        assert_eq!(cadence.next_delay(Local::now()), Duration::from_secs(90));
    }

    #[test]
    fn test_daily_cadence_within_24_hours() {
        let delay = Cadence::DailyAt { hour: 8, minute: 30 }.next_delay(Local::now());
        assert!(delay > Duration::ZERO);
        assert!(delay <= Duration::from_secs(24 * 60 * 60));
    }

    #[test]
    fn test_daily_cadence_clamps_bad_time() {
        let delay = Cadence::DailyAt { hour: 99, minute: 99 }.next_delay(Local::now());
        assert!(delay <= Duration::from_secs(24 * 60 * 60));
    }

    #[test]
    fn test_weekly_cadence_within_7_days() {
        let delay = Cadence::WeeklyAt {
            weekday: Weekday::Mon,
            hour: 9,
        }
        .next_delay(Local::now());
        assert!(delay > Duration::ZERO);
        assert!(delay <= Duration::from_secs(7 * 24 * 60 * 60));
    }

    #[tokio::test]
    async fn test_tick_runs_job_and_reports_outcome() {
        let job = Job::new(JobKind::PublishTick, Cadence::Every(Duration::from_secs(1)), || {
            Box::pin(async { Ok(()) })
        });
        assert_eq!(job.tick().await, TickOutcome::Completed);
    }

    #[tokio::test]
    async fn test_tick_catches_job_errors() {
        let job = Job::new(JobKind::PublishTick, Cadence::Every(Duration::from_secs(1)), || {
            Box::pin(async { Err(CadenceError::Platform("boom".to_string())) })
        });
        assert_eq!(job.tick().await, TickOutcome::Failed("Platform error: boom".to_string()));
    }

    #[tokio::test]
    async fn test_overlapping_tick_is_skipped_not_queued() {
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());

        let job = {
            let started = started.clone();
            let release = release.clone();
            Arc::new(Job::new(
                JobKind::CommentTick,
                Cadence::Every(Duration::from_secs(1)),
                move || {
                    let started = started.clone();
                    let release = release.clone();
                    Box::pin(async move {
                        started.notify_one();
                        release.notified().await;
                        Ok(())
                    })
                },
            ))
        };

        let first = tokio::spawn({
            let job = job.clone();
            async move { job.tick().await }
        });
        started.notified().await;

        // First run holds the guard; this tick must be dropped
        assert_eq!(job.tick().await, TickOutcome::Skipped);

        release.notify_one();
        assert_eq!(first.await.unwrap(), TickOutcome::Completed);

        // Guard is free again
        release.notify_one();
        let second = tokio::spawn({
            let job = job.clone();
            async move { job.tick().await }
        });
        started.notified().await;
        release.notify_one();
        assert_eq!(second.await.unwrap(), TickOutcome::Completed);
    }

    #[tokio::test]
    async fn test_registry_lookup_by_kind() {
        let mut scheduler = Scheduler::new();
        scheduler.register(Job::new(
            JobKind::TokenCheck,
            Cadence::DailyAt { hour: 8, minute: 0 },
            || Box::pin(async { Ok(()) }),
        ));

        assert!(scheduler.job(JobKind::TokenCheck).is_some());
        assert!(scheduler.job(JobKind::PublishTick).is_none());
    }
}
