//! Retry classification and backoff for errors seen while polling

use crate::error::{ClientError, ClientErrorKind};
use crate::reconcile::Phase;
use std::time::Duration;

/// What to do with an error returned by a refresh read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry,
    Fail,
}

/// Decide whether a read error seen while polling is transient
///
/// Only conflict (409) and rate limiting (429) are retried. Everything else,
/// including malformed requests, authorization failures and unexpected
/// statuses, stops the poll.
pub fn classify(error: &ClientError, phase: Phase) -> RetryDecision {
    let decision = match error.kind {
        ClientErrorKind::Conflict | ClientErrorKind::RateLimited => RetryDecision::Retry,
        _ => RetryDecision::Fail,
    };
    tracing::debug!("Classified {} error during {} as {:?}", error.kind, phase, decision);
    decision
}

/// Backoff applied between retried refresh reads
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Upper bound for a single backoff
    pub max_delay: Duration,

    /// Growth factor per consecutive retry
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Delay before the `attempt`-th consecutive retry (starting at 0)
    ///
    /// Starts at `floor` and never drops below it, even when `max_delay`
    /// is smaller.
    pub fn delay_for_attempt(&self, attempt: u32, floor: Duration) -> Duration {
        let factor = self.backoff_multiplier.max(1.0).powi(attempt.min(32) as i32);
        let scaled = floor.as_secs_f64() * factor;
        let capped = scaled.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped).max(floor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_kinds() {
        assert_eq!(
            classify(&ClientError::conflict("zone busy"), Phase::Create),
            RetryDecision::Retry
        );
        assert_eq!(
            classify(&ClientError::rate_limited("slow down"), Phase::Delete),
            RetryDecision::Retry
        );
    }

    #[test]
    fn test_fatal_kinds() {
        for kind in [
            ClientErrorKind::BadRequest,
            ClientErrorKind::Unauthorized,
            ClientErrorKind::Forbidden,
            ClientErrorKind::NotFound,
            ClientErrorKind::Api(500),
            ClientErrorKind::Transport,
            ClientErrorKind::InvalidResponse,
        ] {
            let error = ClientError::new(kind, "boom");
            assert_eq!(classify(&error, Phase::Update), RetryDecision::Fail, "{:?}", kind);
        }
    }

    #[test]
    fn test_delay_calculation() {
        let config = RetryConfig {
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
        };
        let floor = Duration::from_secs(3);

        assert_eq!(config.delay_for_attempt(0, floor), Duration::from_secs(3));
        assert_eq!(config.delay_for_attempt(1, floor), Duration::from_secs(6));
        assert_eq!(config.delay_for_attempt(2, floor), Duration::from_secs(10)); // capped at max
        assert_eq!(config.delay_for_attempt(20, floor), Duration::from_secs(10));
    }

    #[test]
    fn test_delay_never_below_floor() {
        let config = RetryConfig {
            max_delay: Duration::from_millis(5),
            backoff_multiplier: 0.5,
        };
        let floor = Duration::from_millis(20);
        assert_eq!(config.delay_for_attempt(0, floor), floor);
        assert_eq!(config.delay_for_attempt(3, floor), floor);
    }
}
