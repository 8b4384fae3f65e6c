use std::time::Duration;
use tokio::time::{Instant, sleep};

/// Enforces a minimum interval between consecutive calls to one upstream
/// sequence. The first call goes through immediately; later calls wait out
/// whatever remains of the interval since the previous one.
///
/// The upstream publishes no rate limits, so this is a stand-in policy: one
/// pacer per call sequence, intervals supplied by config rather than sleeps
/// scattered through the pipeline.
#[derive(Debug)]
pub struct Pacer {
    interval: Duration,
    last: Option<Instant>,
}

impl Pacer {
    pub fn new(interval: Duration) -> Self {
        Pacer {
            interval,
            last: None,
        }
    }

    pub fn from_millis(interval_ms: u64) -> Self {
        Pacer::new(Duration::from_millis(interval_ms))
    }

    pub async fn wait(&mut self) {
        if let Some(last) = self.last {
            let elapsed = last.elapsed();
            if elapsed < self.interval {
                sleep(self.interval - elapsed).await;
            }
        }
        self.last = Some(Instant::now());
    }
}
