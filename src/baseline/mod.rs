//! Atomic baseline: budget approval coupled with the schedule freeze.

pub mod orchestrator;

pub use orchestrator::BaselineOrchestrator;
