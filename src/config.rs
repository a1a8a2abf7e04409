use std::time::Duration;

/// Bounded retry of transient transfer failures.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryConfig {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_secs(1),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Backoff to wait after the given failed attempt (0-indexed).
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let backoff_ms = (self.initial_backoff.as_millis() as f64
            * self.backoff_multiplier.powi(attempt as i32)) as u64;
        Duration::from_millis(backoff_ms).min(self.max_backoff)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LedgerConfig {
    /// How long a transaction waits for a row lock before giving up with a
    /// transient conflict.
    pub lock_timeout: Duration,
    pub retry: RetryConfig,
    /// Deadline applied to each request issued by the batch driver.
    pub request_timeout: Option<Duration>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_secs(2),
            retry: RetryConfig::default(),
            request_timeout: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_backoff() {
        let config = RetryConfig::default();
        assert_eq!(config.backoff_for_attempt(0), Duration::from_millis(10));
        assert_eq!(config.backoff_for_attempt(1), Duration::from_millis(20));
        assert_eq!(config.backoff_for_attempt(2), Duration::from_millis(40));
    }

    #[test]
    fn test_backoff_capped() {
        let config = RetryConfig {
            initial_backoff: Duration::from_millis(400),
            max_backoff: Duration::from_secs(1),
            ..Default::default()
        };
        assert_eq!(config.backoff_for_attempt(2), Duration::from_secs(1));
    }
}
