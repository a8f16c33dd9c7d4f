/// Configures retry, timeout, and error-notice behavior for one call.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RequestConfig {
    /// Maximum automatic retries after the initial attempt.
    pub retry: u32,
    /// Fixed delay between attempts in milliseconds.
    pub retry_delay_ms: u64,
    /// Enables automatic retry of transient failures.
    pub should_retry: bool,
    /// Suppresses the user-visible notice on terminal failure.
    ///
    /// The call still rejects; only the notification side channel is skipped.
    pub skip_error_handler: bool,
    /// Per-request transport timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            retry: 3,
            retry_delay_ms: 1_000,
            should_retry: true,
            skip_error_handler: false,
            timeout_ms: 15_000,
        }
    }
}

impl RequestConfig {
    /// Defaults with automatic retry disabled.
    pub fn no_retry() -> Self {
        Self {
            retry: 0,
            should_retry: false,
            ..Self::default()
        }
    }

    /// Defaults with the user-visible error notice suppressed.
    pub fn silent() -> Self {
        Self {
            skip_error_handler: true,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::RequestConfig;

    #[test]
    fn defaults_match_dispatch_contract() {
        let config = RequestConfig::default();
        assert_eq!(config.retry, 3);
        assert_eq!(config.retry_delay_ms, 1_000);
        assert!(config.should_retry);
        assert!(!config.skip_error_handler);
        assert_eq!(config.timeout_ms, 15_000);
    }

    #[test]
    fn no_retry_zeroes_the_budget() {
        let config = RequestConfig::no_retry();
        assert_eq!(config.retry, 0);
        assert!(!config.should_retry);
    }
}
