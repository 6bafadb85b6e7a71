//! Client configuration: where the backend lives and how often to poll.

use std::time::Duration;

/// Request timeout applied to every gateway call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default balance/result refresh period.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Connection settings for the copy-trading backend.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the backend REST service.
    pub base_url: String,

    /// Static bearer token attached to every request.
    pub api_token: String,

    /// Balance/result refresh period for the reconciler.
    pub poll_interval: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_token: api_token.into(),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}
