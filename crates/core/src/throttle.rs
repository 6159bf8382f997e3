use std::time::Duration;
use tokio::time::Instant;

/// Enforces a minimum delay between consecutive commands to one device
#[derive(Clone, Debug)]
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

    /// Time left before the next command may be sent
    pub fn remaining(&self) -> Duration {
        match self.last {
            Some(last) => self.interval.saturating_sub(last.elapsed()),
            None => Duration::ZERO,
        }
    }

    /// Sleep until the interval since the last command has passed
    pub async fn wait(&self) {
        let delay = self.remaining();
        if !delay.is_zero() {
            tracing::debug!("Waiting {}ms before starting another request...", delay.as_millis());
            tokio::time::sleep(delay).await;
        }
    }

    /// Record that a command was just attempted
    pub fn mark(&mut self) {
        self.last = Some(Instant::now());
    }
}
