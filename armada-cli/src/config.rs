//! Configuration module

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// URL of the minion controller receiving dispatch events
    pub minion_url: String,
}
