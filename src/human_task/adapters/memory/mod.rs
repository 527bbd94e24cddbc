//! In-memory adapters for human-task persistence.

mod task;

pub use task::InMemoryHumanTaskRepository;
