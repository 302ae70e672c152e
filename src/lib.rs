//! library-pack: transform a source tree into a library output tree
//!
//! Discovers source files, runs each through an external transformer, and
//! writes code, declarations and source maps to an output directory that
//! mirrors the source layout.

pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod pack;
pub mod scan;
pub mod transform;
pub mod utils;

pub use config::{resolve_options, ConfigLocator, ScriptRuntime};
pub use domain::{PackConfig, PackOptions, TransformOptions};
pub use error::{ConfigError, FileError, PackError, TransformError};
pub use pack::{pack, run, run_with, run_with_overrides, CancelFlag, PackReport, Packer};
pub use transform::{CommandTransformer, TransformOutput, TransformRequest, Transformer};
