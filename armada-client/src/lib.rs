//! Armada dispatch client
//!
//! Delivers dispatch events to a minion controller over HTTP.
//!
//! The client makes exactly one attempt per call and never retries; callers
//! decide what to do with a failure using [`TransportError::is_retryable`].
//!
//! # Example
//!
//! ```no_run
//! use armada_client::{DispatchClient, EventSender};
//! use armada_core::{JobResource, encode, sanitize};
//!
//! # async fn example(job: JobResource) -> Result<(), Box<dyn std::error::Error>> {
//! let client = DispatchClient::new()?;
//! let event = encode(&sanitize(&job)?, "ci")?;
//! client.send(&event, "http://minion:8081/").await?;
//! # Ok(())
//! # }
//! ```

pub mod error;

pub use error::{Result, TransportError};

use armada_core::DispatchEvent;
use armada_core::dto::event::EVENT_CONTENT_TYPE;
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Default overall request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(100);

/// Default connection establishment timeout
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeouts applied to every delivery attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientConfig {
    /// Upper bound for a whole request, response body included
    pub request_timeout: Duration,
    /// Upper bound for establishing the TCP/TLS connection
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

/// Positive acknowledgement returned by a minion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acknowledgement {
    pub status: u16,
    pub message: String,
}

/// Delivers dispatch events to a remote endpoint
///
/// Implemented by [`DispatchClient`]; the orchestrator holds it as a trait
/// object so tests can substitute a recording sender.
#[async_trait]
pub trait EventSender: Send + Sync {
    /// Makes a single delivery attempt of `event` to `target_url`
    async fn send(&self, event: &DispatchEvent, target_url: &str) -> Result<Acknowledgement>;
}

/// HTTP implementation of [`EventSender`]
#[derive(Debug, Clone)]
pub struct DispatchClient {
    client: Client,
}

impl DispatchClient {
    /// Create a client with the default timeouts
    pub fn new() -> Result<Self> {
        Self::with_config(&ClientConfig::default())
    }

    /// Create a client with custom timeouts
    pub fn with_config(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;
        Ok(Self { client })
    }

    /// Create a client around a preconfigured reqwest client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EventSender for DispatchClient {
    async fn send(&self, event: &DispatchEvent, target_url: &str) -> Result<Acknowledgement> {
        debug!("Sending event {} to {}", event.id, target_url);

        let response = self
            .client
            .post(target_url)
            .header(CONTENT_TYPE, EVENT_CONTENT_TYPE)
            .json(event)
            .send()
            .await?;

        handle_acknowledgement(response).await
    }
}

/// Reply body written by the minion on every route
#[derive(Debug, Deserialize)]
struct MinionReply {
    status: u16,
    #[serde(default)]
    message: String,
}

/// Interprets the minion's answer
///
/// A non-2xx status is a rejection. A 2xx status whose JSON body carries a
/// non-2xx `status` is a negative acknowledgement and is rejected as well.
async fn handle_acknowledgement(response: reqwest::Response) -> Result<Acknowledgement> {
    let status = response.status();
    let body = match response.text().await {
        Ok(body) => body,
        Err(e) if status.is_success() => return Err(TransportError::Delivery(e)),
        Err(e) => return Err(TransportError::rejected(status.as_u16(), e.to_string())),
    };
    let reply = serde_json::from_str::<MinionReply>(&body).ok();

    if !status.is_success() {
        let message = reply.map(|r| r.message).unwrap_or(body);
        return Err(TransportError::rejected(status.as_u16(), message));
    }

    match reply {
        Some(reply) if !(200..300).contains(&reply.status) => {
            Err(TransportError::rejected(reply.status, reply.message))
        }
        Some(reply) => Ok(Acknowledgement {
            status: reply.status,
            message: reply.message,
        }),
        None => Ok(Acknowledgement {
            status: status.as_u16(),
            message: body,
        }),
    }
}
