//! Engine configuration

use std::time::Duration;

/// Shortest accepted refresh interval
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_millis(1);

/// Broadcast engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Time between refresh cycles
    pub refresh_interval: Duration,

    /// Maximum time a single feed fetch may take
    pub fetch_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(5 * 60),
            fetch_timeout: Duration::from_secs(30),
        }
    }
}

impl EngineConfig {
    /// Set the refresh interval
    pub fn refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval.max(MIN_REFRESH_INTERVAL);
        self
    }

    /// Set the feed fetch timeout
    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }
}
