//! Core domain types
//!
//! The structures shared by the orchestrator (which watches and sanitizes jobs)
//! and the minion (which re-creates them in its own cluster).

pub mod field_tree;
pub mod job;
pub mod manifest;
