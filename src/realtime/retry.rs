//! Bounded retry policy for hub connection attempts.

use std::time::Duration;

/// Bounded retry schedule.
///
/// `delay_for(n)` is the wait before retry `n` (1-based); `None` once
/// `max_attempts` retries have been used.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Same delay before every retry.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay: delay,
            multiplier: 1.0,
            max_delay: delay,
        }
    }

    /// Doubling delay, capped at `max_delay`.
    pub fn exponential(max_attempts: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay,
            multiplier: 2.0,
            max_delay,
        }
    }

    pub fn never() -> Self {
        Self::fixed(0, Duration::ZERO)
    }

    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt > self.max_attempts {
            return None;
        }
        let factor = self.multiplier.max(1.0).powi(attempt as i32 - 1);
        let secs = self.initial_delay.as_secs_f64() * factor;
        let capped = secs.min(self.max_delay.as_secs_f64());
        Some(Duration::from_secs_f64(capped.max(0.0)))
    }

    /// Full delay schedule, mostly useful for logging.
    pub fn schedule(&self) -> Vec<Duration> {
        (1..=self.max_attempts)
            .filter_map(|attempt| self.delay_for(attempt))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_policy_single_retry() {
        let policy = RetryPolicy::fixed(1, Duration::from_secs(5));
        assert_eq!(policy.delay_for(1), Some(Duration::from_secs(5)));
        assert_eq!(policy.delay_for(2), None);
        assert_eq!(policy.delay_for(0), None);
    }

    #[test]
    fn test_exponential_policy_is_capped() {
        let policy =
            RetryPolicy::exponential(10, Duration::from_secs(1), Duration::from_secs(60));
        let schedule: Vec<u64> = policy.schedule().iter().map(Duration::as_secs).collect();
        assert_eq!(schedule, vec![1, 2, 4, 8, 16, 32, 60, 60, 60, 60]);
        assert!(policy.schedule().iter().all(|d| *d <= Duration::from_secs(60)));
    }

    #[test]
    fn test_never_retries() {
        assert_eq!(RetryPolicy::never().delay_for(1), None);
        assert!(RetryPolicy::never().schedule().is_empty());
    }
}
