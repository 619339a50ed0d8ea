//! Minion configuration

use std::time::Duration;

/// Default listen port of the minion controller
pub const DEFAULT_PORT: u16 = 8081;

/// Minion configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Port the dispatch endpoint listens on
    pub port: u16,

    /// Namespace jobs are created in when an event carries none
    pub default_namespace: String,

    /// Upper bound on handling a single request
    pub handler_timeout: Duration,

    /// How long a replaced job may stay terminating before the create is abandoned
    pub deletion_timeout: Duration,
}

impl Config {
    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - ARMADA_MINION_CONTROLLER_PORT (optional, default: 8081)
    /// - SYSTEM_NAMESPACE (optional, default: "default")
    /// - ARMADA_HANDLER_TIMEOUT (optional, seconds, default: 600)
    /// - ARMADA_DELETION_TIMEOUT (optional, seconds, default: 60)
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let port = match std::env::var("ARMADA_MINION_CONTROLLER_PORT") {
            Ok(value) if !value.trim().is_empty() => value.trim().parse::<u16>().map_err(|_| {
                anyhow::anyhow!("ARMADA_MINION_CONTROLLER_PORT is not a valid port: {}", value)
            })?,
            _ => defaults.port,
        };

        let default_namespace = std::env::var("SYSTEM_NAMESPACE")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(defaults.default_namespace);

        let handler_timeout = std::env::var("ARMADA_HANDLER_TIMEOUT")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.handler_timeout);

        let deletion_timeout = std::env::var("ARMADA_DELETION_TIMEOUT")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.deletion_timeout);

        Ok(Self {
            port,
            default_namespace,
            handler_timeout,
            deletion_timeout,
        })
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.port == 0 {
            anyhow::bail!("port must be greater than 0");
        }

        if self.default_namespace.trim().is_empty() {
            anyhow::bail!("default_namespace cannot be empty");
        }

        if self.handler_timeout.is_zero() {
            anyhow::bail!("handler_timeout must be greater than 0");
        }

        if self.deletion_timeout.is_zero() || self.deletion_timeout >= self.handler_timeout {
            anyhow::bail!("deletion_timeout must be greater than 0 and below handler_timeout");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            default_namespace: "default".to_string(),
            handler_timeout: Duration::from_secs(600), // 10 minutes
            deletion_timeout: Duration::from_secs(60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.port, 8081);
        assert_eq!(config.default_namespace, "default");
        assert_eq!(config.handler_timeout, Duration::from_secs(600));
        assert_eq!(config.deletion_timeout, Duration::from_secs(60));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        config.port = 0;
        assert!(config.validate().is_err());
        config.port = 9090;
        assert!(config.validate().is_ok());

        config.default_namespace = "  ".to_string();
        assert!(config.validate().is_err());
        config.default_namespace = "tekton-pipelines".to_string();

        config.handler_timeout = Duration::ZERO;
        assert!(config.validate().is_err());
        config.handler_timeout = Duration::from_secs(600);

        config.deletion_timeout = Duration::ZERO;
        assert!(config.validate().is_err());
        config.deletion_timeout = Duration::from_secs(600);
        assert!(config.validate().is_err());
        config.deletion_timeout = Duration::from_secs(30);
        assert!(config.validate().is_ok());
    }
}
