//! Fixed minimum spacing between outbound host calls.

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

/// Enforces a minimum interval between successive calls during bulk work.
///
/// The first call goes out immediately; each later call waits until
/// `interval` has elapsed since the previous one started.
#[derive(Debug)]
pub struct Throttle {
    interval: Duration,
    last: Option<Instant>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait for the next slot, then claim it.
    pub async fn wait(&mut self) {
        if let Some(last) = self.last {
            let ready_at = last + self.interval;
            if ready_at > Instant::now() {
                debug!(delay_ms = self.interval.as_millis() as u64, "throttling host call");
                tokio::time::sleep_until(ready_at).await;
            }
        }
        self.last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn first_call_is_immediate_and_later_calls_are_spaced() {
        let mut throttle = Throttle::new(Duration::from_secs(1));
        let start = Instant::now();

        throttle.wait().await;
        assert_eq!(start.elapsed(), Duration::ZERO);

        throttle.wait().await;
        assert!(start.elapsed() >= Duration::from_secs(1));

        throttle.wait().await;
        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test]
    async fn zero_interval_never_sleeps() {
        let mut throttle = Throttle::new(Duration::ZERO);
        let start = std::time::Instant::now();
        for _ in 0..5 {
            throttle.wait().await;
        }
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
