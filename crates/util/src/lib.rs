//! Configuration and filesystem helpers shared by the Taskflow binaries.

pub mod config;
mod path_processing;

pub use config::{ConfigError, NavigationConfig, TaskflowConfig, default_config_path};
pub use path_processing::expand_tilde;
