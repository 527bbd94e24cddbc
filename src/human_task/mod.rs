//! Human-task subsystem of the process engine.
//!
//! A process instance that reaches a human-task node hands the work to a
//! person and waits. This module creates the task record, lets candidates
//! claim and work it, and resumes the waiting instance exactly once when the
//! task is completed. It follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Store and engine contracts in [`ports`]
//! - Store implementations in [`adapters`]
//! - The lifecycle service and execution node in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;
