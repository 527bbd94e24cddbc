//! Application services for the human-task lifecycle.

mod config;
mod lifecycle;
mod node;

pub use config::HumanTaskConfig;
pub use lifecycle::{
    CompletionOutcome, HumanTaskService, Resumption, TaskLifecycleError, TaskLifecycleResult,
};
pub use node::{HumanTaskNode, HumanTaskNodeConfig, HumanTaskNodeError};
