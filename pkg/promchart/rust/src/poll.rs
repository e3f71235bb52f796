// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Poll scheduler: one immediate tick, then a fixed-cadence interval that
//! always runs the most recently installed callback.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Don't poll more often than this.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Number of polls per span when no explicit interval is configured.
const POLLS_PER_SPAN: i64 = 120;

pub type TickFn = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Effective poll delay: the explicit interval when positive, otherwise
/// `span / 120` but never below [`MIN_POLL_INTERVAL`].
pub fn poll_delay(poll_interval: Option<Duration>, span_ms: i64) -> Duration {
    match poll_interval {
        Some(interval) if !interval.is_zero() => interval,
        _ => {
            let per_span = u64::try_from(span_ms / POLLS_PER_SPAN).unwrap_or_default();
            Duration::from_millis(per_span).max(MIN_POLL_INTERVAL)
        }
    }
}

fn boxed_tick<F, Fut>(f: F) -> TickFn
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move || f().boxed())
}

/// Runs a tick, containing panics from the callback and from its future so
/// one bad tick cannot end the schedule.
async fn run_tick(tick: TickFn) {
    let future = match std::panic::catch_unwind(AssertUnwindSafe(|| tick())) {
        Ok(future) => future,
        Err(_) => {
            warn!("poll tick panicked");
            return;
        }
    };
    if AssertUnwindSafe(future).catch_unwind().await.is_err() {
        warn!("poll tick panicked");
    }
}

pub struct Poller {
    callback: watch::Sender<TickFn>,
    cancel: Option<CancellationToken>,
}

impl Poller {
    pub fn new<F, Fut>(callback: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (callback, _) = watch::channel(boxed_tick(callback));
        Self { callback, cancel: None }
    }

    /// Replaces the callback. A running interval picks it up on its next
    /// tick without being rescheduled.
    pub fn set_callback<F, Fut>(&self, callback: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.callback.send_replace(boxed_tick(callback));
    }

    /// Cancels any running interval, runs one tick immediately and, for a
    /// non-zero `delay`, schedules a tick every `delay` afterwards.
    pub async fn restart(&mut self, delay: Option<Duration>) {
        self.stop();

        let tick = self.callback.borrow().clone();
        run_tick(tick).await;

        let Some(delay) = delay.filter(|d| !d.is_zero()) else {
            debug!("polling once, no interval");
            return;
        };

        let cancel = CancellationToken::new();
        let cancelled = cancel.clone();
        let callback = self.callback.subscribe();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(delay);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval.tick().await; // First tick is immediate, skip it

            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = interval.tick() => {
                        let tick = callback.borrow().clone();
                        tokio::select! {
                            _ = cancelled.cancelled() => break,
                            _ = run_tick(tick) => {}
                        }
                    }
                }
            }
            debug!("poll interval stopped");
        });

        debug!(delay_ms = delay.as_millis() as u64, "polling started");
        self.cancel = Some(cancel);
    }

    /// Stops the interval. No tick starts after this returns and an
    /// in-flight interval tick is abandoned.
    pub fn stop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
    }

    pub fn is_running(&self) -> bool {
        self.cancel.is_some()
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::{Instant, sleep};

    fn recorder(start: Instant) -> (Arc<Mutex<Vec<Duration>>>, impl Fn() -> BoxFuture<'static, ()> + Send + Sync) {
        let times = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&times);
        let f = move || {
            let sink = Arc::clone(&sink);
            async move {
                sink.lock().unwrap().push(start.elapsed());
            }
            .boxed()
        };
        (times, f)
    }

    #[test]
    fn test_poll_delay() {
        assert_eq!(poll_delay(Some(Duration::from_secs(3)), 3_600_000), Duration::from_secs(3));
        assert_eq!(poll_delay(Some(Duration::ZERO), 3_600_000), Duration::from_secs(30));
        assert_eq!(poll_delay(None, 3_600_000), Duration::from_secs(30));
        assert_eq!(poll_delay(None, 30 * 60 * 1000), Duration::from_secs(15));
        assert_eq!(poll_delay(None, 600_000), MIN_POLL_INTERVAL);
        assert_eq!(poll_delay(None, -1), MIN_POLL_INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_delay_runs_once() {
        let start = Instant::now();
        let (times, f) = recorder(start);
        let mut poller = Poller::new(f);

        poller.restart(None).await;
        assert!(!poller.is_running());
        sleep(Duration::from_secs(60)).await;

        assert_eq!(*times.lock().unwrap(), vec![Duration::ZERO]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_delay_runs_once() {
        let start = Instant::now();
        let (times, f) = recorder(start);
        let mut poller = Poller::new(f);

        poller.restart(Some(Duration::ZERO)).await;
        assert!(!poller.is_running());
        sleep(Duration::from_secs(60)).await;

        assert_eq!(*times.lock().unwrap(), vec![Duration::ZERO]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_cadence_until_stopped() {
        let start = Instant::now();
        let (times, f) = recorder(start);
        let mut poller = Poller::new(f);

        poller.restart(Some(Duration::from_secs(5))).await;
        sleep(Duration::from_millis(10_500)).await;
        poller.stop();
        sleep(Duration::from_secs(30)).await;

        assert_eq!(
            *times.lock().unwrap(),
            vec![Duration::ZERO, Duration::from_secs(5), Duration::from_secs(10)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_replaces_timer() {
        let start = Instant::now();
        let (times, f) = recorder(start);
        let mut poller = Poller::new(f);

        poller.restart(Some(Duration::from_secs(5))).await;
        sleep(Duration::from_secs(2)).await;
        poller.restart(Some(Duration::from_secs(5))).await;
        sleep(Duration::from_millis(7_500)).await;
        drop(poller);
        sleep(Duration::from_secs(30)).await;

        assert_eq!(
            *times.lock().unwrap(),
            vec![
                Duration::ZERO,
                Duration::from_secs(2),
                Duration::from_secs(7),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_uses_latest_callback() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&first);
        let mut poller = Poller::new(move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });
        poller.restart(Some(Duration::from_secs(5))).await;

        let counter = Arc::clone(&second);
        poller.set_callback(move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });
        sleep(Duration::from_millis(10_500)).await;
        poller.stop();

        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_tick_keeps_schedule() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let mut poller = Poller::new(move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                assert_ne!(n, 1, "second tick fails");
            }
        });

        poller.restart(Some(Duration::from_secs(5))).await;
        sleep(Duration::from_millis(15_500)).await;
        poller.stop();

        assert_eq!(count.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_callback_panic_keeps_schedule() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let mut poller = Poller::new(move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            assert!(n != 0 && n != 2, "callback fails before returning a future");
            async {}
        });

        // The immediate tick panics inside the callback without escaping.
        poller.restart(Some(Duration::from_secs(5))).await;
        sleep(Duration::from_millis(15_500)).await;
        assert!(poller.is_running());
        poller.stop();

        assert_eq!(count.load(Ordering::SeqCst), 4);
    }
}
