//! Utility modules: timeout and task helpers.

pub mod task;
pub mod timeout;
