//! Orchestrator configuration
//!
//! Defines where dispatched jobs are sent, which namespaces are watched, and
//! the timing of the reconcile loop.

use std::time::Duration;

use armada_client::{ClientConfig, DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT};

/// Default minion endpoint
pub const DEFAULT_MINION_URL: &str = "http://localhost:8081/";

/// Orchestrator configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Minion controller endpoint receiving dispatch events
    pub minion_url: String,

    /// Namespace to watch, or every namespace when unset
    pub watch_namespace: Option<String>,

    /// Namespace jobs are created in on the minion side; defaults to the
    /// namespace of the source job
    pub target_namespace: Option<String>,

    /// Number of reconcile workers
    pub workers: usize,

    /// How often every known marked job is reconciled again
    pub resync_period: Duration,

    /// Overall timeout of a single delivery attempt
    pub request_timeout: Duration,

    /// Connection timeout of a single delivery attempt
    pub connect_timeout: Duration,
}

impl Config {
    /// Creates a new configuration with defaults
    pub fn new(minion_url: String) -> Self {
        Self {
            minion_url,
            watch_namespace: None,
            target_namespace: None,
            workers: 2,
            resync_period: Duration::from_secs(300), // 5 minutes
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - ARMADA_MINION_URL (required)
    /// - ARMADA_WATCH_NAMESPACE (optional, default: all namespaces)
    /// - ARMADA_TARGET_NAMESPACE (optional, default: source namespace)
    /// - ARMADA_WORKERS (optional, default: 2)
    /// - ARMADA_RESYNC_PERIOD (optional, seconds, default: 300)
    /// - ARMADA_REQUEST_TIMEOUT (optional, seconds, default: 100)
    /// - ARMADA_CONNECT_TIMEOUT (optional, seconds, default: 30)
    pub fn from_env() -> anyhow::Result<Self> {
        let minion_url = std::env::var("ARMADA_MINION_URL")
            .map_err(|_| anyhow::anyhow!("ARMADA_MINION_URL environment variable not set"))?;

        let defaults = Self::new(minion_url);

        Ok(Self {
            watch_namespace: env_string("ARMADA_WATCH_NAMESPACE"),
            target_namespace: env_string("ARMADA_TARGET_NAMESPACE"),
            workers: std::env::var("ARMADA_WORKERS")
                .ok()
                .and_then(|s| s.parse::<usize>().ok())
                .unwrap_or(defaults.workers),
            resync_period: env_secs("ARMADA_RESYNC_PERIOD").unwrap_or(defaults.resync_period),
            request_timeout: env_secs("ARMADA_REQUEST_TIMEOUT")
                .unwrap_or(defaults.request_timeout),
            connect_timeout: env_secs("ARMADA_CONNECT_TIMEOUT")
                .unwrap_or(defaults.connect_timeout),
            ..defaults
        })
    }

    /// Timeouts handed to the dispatch client
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            request_timeout: self.request_timeout,
            connect_timeout: self.connect_timeout,
        }
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.minion_url.starts_with("http://") && !self.minion_url.starts_with("https://") {
            anyhow::bail!("minion_url must start with http:// or https://");
        }

        if self.workers == 0 {
            anyhow::bail!("workers must be greater than 0");
        }

        if self.resync_period.is_zero() {
            anyhow::bail!("resync_period must be greater than 0");
        }

        if self.request_timeout.is_zero() || self.connect_timeout.is_zero() {
            anyhow::bail!("timeouts must be greater than 0");
        }

        if self.connect_timeout > self.request_timeout {
            anyhow::bail!("connect_timeout cannot exceed request_timeout");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_MINION_URL.to_string())
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.trim().is_empty())
}

fn env_secs(name: &str) -> Option<Duration> {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
}
