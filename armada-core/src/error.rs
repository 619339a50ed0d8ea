//! Error types for the core transformations

use thiserror::Error;

/// Errors raised while turning a live job into a transport-safe descriptor
#[derive(Debug, Error)]
pub enum SanitizeError {
    /// The job could not be converted into a field tree
    #[error("failed to convert object to field tree: {0}")]
    Conversion(String),

    /// A field had an unexpected shape while stripping it
    #[error("failed to remove fields for export: {0}")]
    FieldRemoval(String),
}

/// Errors raised while wrapping or unwrapping a dispatch event
#[derive(Debug, Error)]
pub enum CodecError {
    /// The descriptor could not be rendered as YAML
    #[error("failed to serialize job descriptor: {0}")]
    Serialize(#[from] serde_yaml::Error),

    /// The `job` payload is not valid base64
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The decoded payload is not a YAML mapping
    #[error("invalid job payload: {0}")]
    PayloadDeserialize(String),

    /// The event data does not have the `{ job, namespace }` shape
    #[error("invalid dispatch event: {0}")]
    EnvelopeDecode(String),
}

/// Errors raised by the manifest registry
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No parser is registered for this discriminator
    #[error("unsupported manifest kind {kind} ({api_version})")]
    UnknownKind { api_version: String, kind: String },

    /// The discriminator is known but the document does not match its type
    #[error("invalid {kind} manifest: {message}")]
    Invalid { kind: String, message: String },
}

impl RegistryError {
    pub(crate) fn invalid(kind: &str, err: impl std::fmt::Display) -> Self {
        Self::Invalid {
            kind: kind.to_string(),
            message: err.to_string(),
        }
    }
}
