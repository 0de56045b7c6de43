//! Infrastructure adapters for configuration, filesystem output, and logging.

pub mod config;
pub mod fs;
pub mod logging;
