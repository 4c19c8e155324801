//! Wall clock used for polling deadlines.

use async_trait::async_trait;
use std::time::{Duration, SystemTime};

/// Source of "now" and of blocking waits between observations.
///
/// Deadlines are measured on the same clock that judges file mtimes.
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;

    async fn sleep(&self, duration: Duration);

    /// Time since `start`, zero if the clock stepped backwards
    fn elapsed_since(&self, start: SystemTime) -> Duration {
        self.now().duration_since(start).unwrap_or_default()
    }
}

/// Real time backed by tokio's timer
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_system_clock_sleeps() {
        let clock = SystemClock;
        let start = clock.now();
        clock.sleep(Duration::from_millis(20)).await;
        assert!(clock.elapsed_since(start) >= Duration::from_millis(20));
    }

    #[test]
    fn test_elapsed_never_negative() {
        let clock = SystemClock;
        let future = clock.now() + Duration::from_secs(3600);
        assert_eq!(clock.elapsed_since(future), Duration::ZERO);
    }
}
