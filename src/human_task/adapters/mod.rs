//! Store adapters implementing [`crate::human_task::ports::HumanTaskRepository`].

pub mod memory;
pub mod postgres;
