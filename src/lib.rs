//! Atelier: human tasks for a workflow process engine.
//!
//! A process definition can contain nodes that stop the process and hand a
//! piece of work to a person. This crate owns those human tasks: it stores
//! them, lets eligible actors claim and work them, and resumes the waiting
//! process once a task is completed.
//!
//! # Architecture
//!
//! Atelier follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for the task store and the engine
//! - **Adapters**: Concrete implementations of ports (in-memory, `PostgreSQL`)
//!
//! # Modules
//!
//! - [`human_task`]: Task records, the execution node, and the lifecycle
//!   service

pub mod human_task;
