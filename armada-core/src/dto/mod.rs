//! Data Transfer Objects for inter-service communication
//!
//! Wire types exchanged between the orchestrator and minion controllers.

pub mod event;
