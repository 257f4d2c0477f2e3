use std::time::Duration;

/// Linear retry schedule: the delay after the n-th failed attempt is `base * n`.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max_attempts: u32,
    failures: u32,
}

impl Backoff {
    #[must_use]
    pub fn linear(base: Duration, max_attempts: u32) -> Self {
        Self {
            base,
            max_attempts: max_attempts.max(1),
            failures: 0,
        }
    }

    /// Records a failed attempt. Returns how long to wait before the next one,
    /// or `None` once every attempt has been spent.
    pub fn next_delay(&mut self) -> Option<Duration> {
        self.failures += 1;
        if self.failures >= self.max_attempts {
            return None;
        }
        Some(self.base * self.failures)
    }

    pub fn attempt(&self) -> u32 {
        self.failures + 1
    }
}
