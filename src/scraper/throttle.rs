//! Request pacing between consecutive page fetches.

use async_trait::async_trait;
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tokio_retry::strategy::jitter;
use tracing::trace;

/// Spacing policy applied by the pipeline around every request.
#[async_trait]
pub trait RequestPacer: Send {
    /// Waits until the next request may start.
    async fn ready(&mut self);

    /// Records that a request has just completed.
    fn completed(&mut self);
}

/// Keeps at least `spacing` (+ up to `max_jitter`) between the completion of
/// one request and the start of the next.
pub struct MinSpacing {
    spacing: Duration,
    max_jitter: Duration,
    last_completed: Option<Instant>,
}

impl MinSpacing {
    pub fn new(spacing: Duration, max_jitter: Duration) -> Self {
        Self { spacing, max_jitter, last_completed: None }
    }

    pub fn from_millis(spacing_ms: u64, jitter_ms: u64) -> Self {
        Self::new(Duration::from_millis(spacing_ms), Duration::from_millis(jitter_ms))
    }

    fn target_gap(&self) -> Duration {
        if self.max_jitter.is_zero() {
            self.spacing
        } else {
            self.spacing + jitter(self.max_jitter)
        }
    }
}

#[async_trait]
impl RequestPacer for MinSpacing {
    async fn ready(&mut self) {
        let Some(last) = self.last_completed else { return };

        let gap = self.target_gap();
        let elapsed = last.elapsed();
        if elapsed < gap {
            let wait = gap - elapsed;
            trace!("pacing: sleeping {:?}", wait);
            sleep(wait).await;
        }
    }

    fn completed(&mut self) {
        self.last_completed = Some(Instant::now());
    }
}

/// No spacing at all. For tests and local fixtures.
#[derive(Debug, Default)]
pub struct NoDelay;

#[async_trait]
impl RequestPacer for NoDelay {
    async fn ready(&mut self) {}

    fn completed(&mut self) {}
}
