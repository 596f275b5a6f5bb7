use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Floor for the delay between two fetches against the same site.
pub const MIN_FETCH_DELAY: Duration = Duration::from_secs(1);

/// Spaces out consecutive fetches by at least `delay`.
#[derive(Debug)]
pub struct FetchThrottle {
    delay: Duration,
    last: Mutex<Option<Instant>>,
}

impl FetchThrottle {
    /// Delays shorter than [`MIN_FETCH_DELAY`] are raised to it.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay: delay.max(MIN_FETCH_DELAY),
            last: Mutex::new(None),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Waits until `delay` has passed since the previous call returned.
    pub async fn wait(&self) {
        let mut last = self.last.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.delay {
                tokio::time::sleep(self.delay - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}
