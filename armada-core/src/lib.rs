//! Armada Core
//!
//! Core types and transformations for relaying Tekton jobs between clusters.
//!
//! This crate contains:
//! - Domain types: the job resource, the generic field tree, the manifest registry
//! - DTOs: the dispatch event that travels between orchestrator and minion
//! - The sanitizer and the envelope codec that sit between the two

pub mod codec;
pub mod domain;
pub mod dto;
pub mod error;
pub mod sanitize;

pub use codec::{decode, encode};
pub use domain::field_tree::FieldTree;
pub use domain::job::{JobResource, ObjectKey, SanitizedJob};
pub use domain::manifest::{Manifest, ManifestRegistry, ManifestSet};
pub use dto::event::{DispatchEvent, DispatchPayload};
pub use error::{CodecError, RegistryError, SanitizeError};
pub use sanitize::sanitize;
