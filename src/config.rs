//! Client configuration for the CourtIQ analysis service.

use std::time::Duration;

use url::Url;

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// User agent string for all analysis service requests.
pub(crate) const CLIENT_USER_AGENT: &str = concat!("courtiq-client/", env!("CARGO_PKG_VERSION"));

/// Default request timeout. Uploads of full-length clips can be slow, so
/// this is generous.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Default delay between status polls.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Default delay before the completion listener fires, giving the user
/// time to see the result before the surrounding UI switches away.
const DEFAULT_COMPLETION_DELAY: Duration = Duration::from_secs(3);

// ─────────────────────────────────────────────────────────────────────────────
// ClientConfig
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration shared by the service client and the session orchestrator.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the analysis service (e.g. "http://localhost:5001").
    pub base_url: Url,
    /// Timeout applied to every HTTP request.
    pub timeout: Duration,
    /// Period between job status polls.
    pub poll_interval: Duration,
    /// Delay before the completion listener is notified.
    pub completion_delay: Duration,
}

impl ClientConfig {
    /// Creates a configuration with default timings for the given service.
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            completion_delay: DEFAULT_COMPLETION_DELAY,
        }
    }

    /// Overrides the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Overrides the status poll period.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Overrides the completion notification delay.
    pub fn with_completion_delay(mut self, completion_delay: Duration) -> Self {
        self.completion_delay = completion_delay;
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
