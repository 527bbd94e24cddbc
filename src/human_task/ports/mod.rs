//! Port contracts for the human-task subsystem.
//!
//! Ports define the store and process-engine boundaries used by the
//! lifecycle service and the execution node.

pub mod engine;
pub mod repository;

pub use engine::{
    ProcessDefinitionRef, ProcessEngine, ProcessEngineError, ProcessEngineResult,
    ProcessInstance, ProcessStatus,
};
pub use repository::{HumanTaskRepository, TaskRepositoryError, TaskRepositoryResult};
