//! Periodic jobs driven by the injected clock.
//!
//! A job runs to completion once started; the shutdown signal is only
//! observed while waiting for the next run.

use airena_core::environment::Clock;
use chrono::{DateTime, NaiveTime, TimeDelta, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// When a periodic job fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Once per day at the given UTC wall-clock time.
    DailyAt(NaiveTime),
    /// On every multiple of the interval since the Unix epoch
    /// (an hourly interval fires at the top of each hour).
    Every(Duration),
}

impl Schedule {
    /// The first firing time strictly after `now`.
    #[must_use]
    pub fn next_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Self::DailyAt(time) => {
                let today = now.date_naive().and_time(*time).and_utc();
                if today > now {
                    today
                } else {
                    today + TimeDelta::days(1)
                }
            }
            Self::Every(interval) => {
                let secs = i64::try_from(interval.as_secs()).unwrap_or(i64::MAX).max(1);
                let next = now.timestamp().div_euclid(secs).saturating_add(1).saturating_mul(secs);
                DateTime::from_timestamp(next, 0).unwrap_or(now + TimeDelta::seconds(secs))
            }
        }
    }
}

/// Spawn a task that runs `job` on `schedule` until `shutdown` turns `true`
/// or its sender is dropped.
///
/// Jobs are infallible from the scheduler's point of view: they report their
/// own failures.
pub fn spawn_periodic<F, Fut>(
    name: &'static str,
    schedule: Schedule,
    clock: Arc<dyn Clock>,
    mut shutdown: watch::Receiver<bool>,
    mut job: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        tracing::info!(job = name, ?schedule, "Scheduled job started");

        while !*shutdown.borrow() {
            let now = clock.now();
            let next_run = schedule.next_after(now);
            let wait = (next_run - now).to_std().unwrap_or(Duration::ZERO);
            tracing::debug!(job = name, %next_run, "Waiting for next run");

            tokio::select! {
                () = tokio::time::sleep(wait) => {
                    job().await;
                }

                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!(job = name, "Shutdown signal received");
                        break;
                    }
                }
            }
        }

        tracing::info!(job = name, "Scheduled job stopped");
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use airena_testing::test_clock;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, h, m, s).unwrap()
    }

    #[test]
    fn test_daily_fires_later_today_when_time_not_reached() {
        let schedule = Schedule::DailyAt(NaiveTime::from_hms_opt(3, 30, 0).unwrap());
        assert_eq!(schedule.next_after(at(1, 0, 0)), at(3, 30, 0));
    }

    #[test]
    fn test_daily_rolls_to_tomorrow_once_time_passed() {
        let schedule = Schedule::DailyAt(NaiveTime::from_hms_opt(3, 30, 0).unwrap());
        let tomorrow = Utc.with_ymd_and_hms(2025, 1, 2, 3, 30, 0).unwrap();

        assert_eq!(schedule.next_after(at(3, 30, 0)), tomorrow);
        assert_eq!(schedule.next_after(at(12, 0, 0)), tomorrow);
    }

    #[test]
    fn test_hourly_aligns_to_top_of_hour() {
        let schedule = Schedule::Every(Duration::from_secs(3600));

        assert_eq!(schedule.next_after(at(10, 15, 42)), at(11, 0, 0));
        assert_eq!(schedule.next_after(at(11, 0, 0)), at(12, 0, 0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_job_runs_on_each_tick_until_shutdown() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = spawn_periodic(
            "test-job",
            Schedule::Every(Duration::from_secs(3600)),
            Arc::new(test_clock()),
            shutdown_rx,
            move || {
                let c = Arc::clone(&counter);
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                }
            },
        );

        tokio::time::sleep(Duration::from_secs(3 * 3600 + 1)).await;
        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();

        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_before_first_tick_runs_nothing() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = spawn_periodic(
            "test-job",
            Schedule::DailyAt(NaiveTime::from_hms_opt(3, 30, 0).unwrap()),
            Arc::new(test_clock()),
            shutdown_rx,
            move || {
                let c = Arc::clone(&counter);
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                }
            },
        );

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();

        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }
}
