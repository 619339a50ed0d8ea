//! Service Module
//!
//! Business logic layer for the minion.

pub mod materialize;

// Re-export for convenience
pub use materialize as materialize_service;
