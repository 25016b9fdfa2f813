use std::time::Duration;

use crate::error::ClientError;

/// Retry policy for read calls made by feature modules.
///
/// The pipeline itself never retries. Callers opt in per call; network
/// failures are never retried so a down backend is not hammered, and
/// client errors (auth, validation, 4xx) are final.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt; grows linearly.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
        }
    }

    /// Whether a call that failed on attempt number `attempt` (1-based)
    /// should be tried again.
    pub fn should_retry(&self, error: &ClientError, attempt: u32) -> bool {
        if attempt >= self.max_attempts {
            return false;
        }
        match error {
            ClientError::Api { status, .. } | ClientError::MalformedResponse { status, .. } => {
                status.is_server_error()
            }
            _ => false,
        }
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt.max(1))
    }
}
