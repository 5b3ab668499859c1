use std::time::Duration;

use tokio::time::Instant;

/// Enforces a minimum spacing between consecutive calls. The first call
/// never waits.
#[derive(Debug)]
pub struct Throttle {
    min_spacing: Duration,
    last: Option<Instant>,
}

impl Throttle {
    pub fn new(min_spacing: Duration) -> Self {
        Self { min_spacing, last: None }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    pub fn min_spacing(&self) -> Duration {
        self.min_spacing
    }

    /// Sleeps until `min_spacing` has passed since the previous call.
    pub async fn wait(&mut self) {
        if let Some(last) = self.last {
            let ready = last + self.min_spacing;
            if Instant::now() < ready {
                tokio::time::sleep_until(ready).await;
            }
        }
        self.last = Some(Instant::now());
    }
}
