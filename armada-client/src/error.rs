//! Error types for the dispatch client

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, TransportError>;

/// Errors that can occur while delivering a dispatch event
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request never produced a response (connect failure, timeout, ...)
    #[error("failed to deliver event: {0}")]
    Delivery(#[from] reqwest::Error),

    /// The minion answered and refused the event
    #[error("event rejected by minion (status {status}): {message}")]
    Rejected {
        /// HTTP status code, or the status carried in a negative acknowledgement
        status: u16,
        /// Message returned by the minion
        message: String,
    },
}

impl TransportError {
    /// Create a rejection from status code and message
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }

    /// Whether sending the same event again could succeed
    ///
    /// Network failures and server-side errors may be transient; a 4xx
    /// rejection means the event itself is unacceptable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Delivery(_) => true,
            Self::Rejected { status, .. } => *status >= 500,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Delivery(err) => err.status().map(|s| s.as_u16()),
            Self::Rejected { status, .. } => Some(*status),
        }
    }
}
