use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Calls a callback every `period` until stopped or dropped.
///
/// The first call happens one period after starting. A zero period is
/// treated as one millisecond.
#[derive(Debug)]
pub struct Interval {
    token: CancellationToken,
}

impl Interval {
    /// Starts ticking. Must run inside a tokio runtime.
    pub fn start<F>(period: Duration, mut callback: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let period = period.max(Duration::from_millis(1));
        let token = CancellationToken::new();
        let stop = token.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = stop.cancelled() => break,
                    _ = ticker.tick() => callback(),
                }
            }
            trace!(?period, "interval stopped");
        });
        Interval { token }
    }

    pub fn stop(&self) {
        self.token.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for Interval {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_ticks_every_period() {
        let count = Arc::new(AtomicUsize::new(0));
        let ticks = count.clone();
        let interval = Interval::start(Duration::from_millis(100), move || {
            ticks.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_millis(260)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);

        interval.stop();
        assert!(interval.is_stopped());
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_stops_ticking() {
        let count = Arc::new(AtomicUsize::new(0));
        let ticks = count.clone();
        let interval = Interval::start(Duration::from_millis(10), move || {
            ticks.fetch_add(1, Ordering::SeqCst);
        });
        tokio::time::sleep(Duration::from_millis(15)).await;
        drop(interval);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
