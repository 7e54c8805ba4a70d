//! Configuration management module

pub mod env;
pub mod parser;
pub mod targets;

// Re-export main functionality
pub use env::EnvManager;
pub use parser::{display_config_summary, load_config, ConfigParser};
pub use targets::TargetLoader;

// Re-export from models for convenience
pub use crate::models::Config;

// Additional comprehensive tests in separate module
#[cfg(test)]
mod comprehensive_tests;
