use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const AUTO_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// A single cancellable repeating timer.
///
/// Each tick receives the token of the loop that produced it so the callee can
/// drop ticks that raced with [`RefreshScheduler::stop`].
#[derive(Debug)]
pub struct RefreshScheduler {
    interval: Duration,
    token: Option<CancellationToken>,
}

impl RefreshScheduler {
    pub fn new(interval: Duration) -> Self {
        Self { interval, token: None }
    }

    pub fn is_active(&self) -> bool {
        self.token.is_some()
    }

    /// Start ticking every `interval`. No-op while a loop is already active.
    ///
    /// `on_tick` returning `false` ends the loop. Must be called from within a
    /// tokio runtime.
    pub fn start<F>(&mut self, on_tick: F)
    where
        F: Fn(&CancellationToken) -> bool + Send + 'static,
    {
        if self.token.is_some() {
            return;
        }

        let token = CancellationToken::new();
        self.token = Some(token.clone());
        let interval = self.interval;

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }
                if token.is_cancelled() || !on_tick(&token) {
                    break;
                }
            }
        });
        tracing::debug!(interval_ms = interval.as_millis() as u64, "auto refresh started");
    }

    /// Cancel the pending wait. Work already started by a tick is unaffected.
    pub fn stop(&mut self) {
        if let Some(token) = self.token.take() {
            token.cancel();
            tracing::debug!("auto refresh stopped");
        }
    }

    /// Stop and start again, resetting the countdown.
    pub fn restart<F>(&mut self, on_tick: F)
    where
        F: Fn(&CancellationToken) -> bool + Send + 'static,
    {
        self.stop();
        self.start(on_tick);
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    fn counter() -> (Arc<AtomicUsize>, impl Fn(&CancellationToken) -> bool + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let ticks = Arc::clone(&count);
        (count, move |_: &CancellationToken| {
            ticks.fetch_add(1, Ordering::SeqCst);
            true
        })
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_once_per_interval() {
        let (count, on_tick) = counter();
        let mut scheduler = RefreshScheduler::new(Duration::from_secs(30));
        scheduler.start(on_tick);
        settle().await;

        tokio::time::advance(Duration::from_secs(29)).await;
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::advance(Duration::from_secs(1)).await;
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(30)).await;
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn start_while_active_does_not_duplicate() {
        let (count, on_tick) = counter();
        let (second, other_tick) = counter();
        let mut scheduler = RefreshScheduler::new(Duration::from_secs(30));
        scheduler.start(on_tick);
        scheduler.start(other_tick);
        settle().await;

        tokio::time::advance(Duration::from_secs(30)).await;
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_suppresses_future_ticks() {
        let (count, on_tick) = counter();
        let mut scheduler = RefreshScheduler::new(Duration::from_secs(30));
        scheduler.start(on_tick);
        settle().await;

        scheduler.stop();
        assert!(!scheduler.is_active());

        tokio::time::advance(Duration::from_secs(90)).await;
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_resets_countdown() {
        let (count, on_tick) = counter();
        let mut scheduler = RefreshScheduler::new(Duration::from_secs(30));
        scheduler.start(on_tick);
        settle().await;

        tokio::time::advance(Duration::from_secs(20)).await;
        settle().await;

        let (restarted, on_tick) = counter();
        scheduler.restart(on_tick);
        settle().await;

        tokio::time::advance(Duration::from_secs(20)).await;
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(restarted.load(Ordering::SeqCst), 0);

        tokio::time::advance(Duration::from_secs(10)).await;
        settle().await;
        assert_eq!(restarted.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn tick_returning_false_ends_loop() {
        let count = Arc::new(AtomicUsize::new(0));
        let ticks = Arc::clone(&count);
        let mut scheduler = RefreshScheduler::new(Duration::from_secs(1));
        scheduler.start(move |_| {
            ticks.fetch_add(1, Ordering::SeqCst);
            false
        });
        settle().await;

        tokio::time::advance(Duration::from_secs(5)).await;
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
