//! Configuration loading and merging
//!
//! Handles config file discovery and parsing, evaluation of script configs
//! through an external runtime, and resolution against defaults.

pub mod loader;
pub mod merge;
pub mod script;

pub use loader::{load_config_file, load_options, locate_config, ConfigError, ConfigLocator};
pub use merge::resolve_options;
pub use script::ScriptRuntime;
