//! Repository Module
//!
//! Data access layer for the minion.
//! Jobs live in the local cluster; tests swap in an in-memory store.

pub mod job;
#[cfg(test)]
pub mod memory;

// Re-export for convenience
pub use job as job_repository;
