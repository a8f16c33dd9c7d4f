use std::time::Duration;

use crate::RequestConfig;

/// Outcome of consulting the retry policy after a failed attempt.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryDecision {
    /// Re-issue the identical request after `delay`.
    Retry { delay: Duration },
    /// Budget spent or retry disabled; the failure is terminal.
    Exhausted,
}

/// Per-request retry budget.
///
/// Owned by a single dispatch and consumed one permission per failure; the
/// delay is fixed, with no backoff growth between attempts. Cancellations
/// never reach this policy.
#[derive(Clone, Debug)]
pub struct RetryState {
    remaining: u32,
    delay: Duration,
    enabled: bool,
}

impl RetryState {
    pub fn new(config: &RequestConfig) -> Self {
        Self {
            remaining: config.retry,
            delay: Duration::from_millis(config.retry_delay_ms),
            enabled: config.should_retry,
        }
    }

    /// Consumes one retry permission for a failed attempt.
    pub fn on_failure(&mut self) -> RetryDecision {
        if !self.enabled || self.remaining == 0 {
            return RetryDecision::Exhausted;
        }
        self.remaining -= 1;
        RetryDecision::Retry { delay: self.delay }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }
}
