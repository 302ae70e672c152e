//! Config file discovery and loading

use crate::config::script::ScriptRuntime;
use crate::domain::PackOptions;
pub use crate::error::ConfigError;
use json_comments::StripComments;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_STEM: &str = "library-pack";

/// Declarative formats, parsed in-process.
const DATA_EXTENSIONS: [&str; 6] = ["json", "jsonc", "json5", "yaml", "yml", "toml"];

/// Script formats, evaluated by a [`ScriptRuntime`] under a `.config` infix.
const SCRIPT_EXTENSIONS: [&str; 5] = ["ts", "js", "mts", "cjs", "mjs"];

/// Where to look for configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfigLocator {
    /// Directory searched for a config file; also the base for relative
    /// `srcdir`/`outdir`. Defaults to the explicit file's directory.
    pub root: Option<PathBuf>,
    /// Explicit config file, bypassing discovery.
    pub file: Option<PathBuf>,
    pub runtime: ScriptRuntime,
}

impl ConfigLocator {
    pub fn in_dir(root: impl Into<PathBuf>) -> Self {
        Self { root: Some(root.into()), ..Default::default() }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self { file: Some(path.into()), ..Default::default() }
    }

    pub fn runtime(mut self, runtime: ScriptRuntime) -> Self {
        self.runtime = runtime;
        self
    }

    /// Base directory for relative paths in the loaded configuration.
    pub fn root_dir(&self) -> PathBuf {
        if let Some(root) = &self.root {
            return root.clone();
        }
        self.file
            .as_deref()
            .and_then(Path::parent)
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Candidate file names in lookup order.
pub fn config_candidates() -> Vec<String> {
    DATA_EXTENSIONS
        .iter()
        .map(|ext| format!("{}.{}", CONFIG_STEM, ext))
        .chain(SCRIPT_EXTENSIONS.iter().map(|ext| format!("{}.config.{}", CONFIG_STEM, ext)))
        .collect()
}

/// Find the first config file in `root`, checking candidates in a fixed order.
pub fn locate_config(root: &Path) -> Option<PathBuf> {
    for candidate in config_candidates() {
        let path = root.join(&candidate);
        if path.is_file() {
            tracing::debug!("Found config file {}", path.display());
            return Some(path);
        }
    }
    tracing::debug!("No config file found in {}", root.display());
    None
}

/// Load options from the explicit file, or from the discovered one.
///
/// No config file at all yields empty options.
pub fn load_options(locator: &ConfigLocator) -> Result<PackOptions, ConfigError> {
    let discovered = match &locator.file {
        Some(path) => Some(path.clone()),
        None => locate_config(&locator.root_dir()),
    };

    match discovered {
        Some(path) => load_config_file(&path, &locator.runtime),
        None => Ok(PackOptions::default()),
    }
}

/// Load one config file, dispatching on its extension.
///
/// Parse errors in declarative formats propagate. Script evaluation errors
/// are logged and yield empty options, so a broken script falls back to
/// defaults instead of aborting the run.
pub fn load_config_file(path: &Path, runtime: &ScriptRuntime) -> Result<PackOptions, ConfigError> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("").to_ascii_lowercase();

    if SCRIPT_EXTENSIONS.contains(&ext.as_str()) {
        return Ok(match runtime.evaluate(path) {
            Ok(options) => options,
            Err(e) => {
                tracing::error!("Failed to evaluate config script {}: {:#}", path.display(), e);
                PackOptions::default()
            }
        });
    }

    if !DATA_EXTENSIONS.contains(&ext.as_str()) {
        tracing::debug!("Ignoring config file with unrecognized extension: {}", path.display());
        return Ok(PackOptions::default());
    }

    let content = fs::read_to_string(path)
        .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;

    match ext.as_str() {
        "yaml" | "yml" => parse_yaml_config(&content, path),
        "toml" => parse_toml_config(&content, path),
        _ => parse_json_config(&content, path),
    }
}

/// Parse JSON after stripping `//` and `/* */` comments.
fn parse_json_config(content: &str, config_file: &Path) -> Result<PackOptions, ConfigError> {
    let stripped = StripComments::new(content.as_bytes());
    serde_json::from_reader(stripped).map_err(|e| parse_error(config_file, e))
}

/// Parse YAML. Empty, comment-only and `null` documents are empty options.
fn parse_yaml_config(content: &str, config_file: &Path) -> Result<PackOptions, ConfigError> {
    let raw: serde_yaml::Value =
        serde_yaml::from_str(content).map_err(|e| parse_error(config_file, e))?;

    if raw.is_null() {
        return Ok(PackOptions::default());
    }

    serde_yaml::from_value(raw).map_err(|e| parse_error(config_file, e))
}

fn parse_toml_config(content: &str, config_file: &Path) -> Result<PackOptions, ConfigError> {
    toml::from_str(content).map_err(|e| parse_error(config_file, e))
}

fn parse_error(path: &Path, err: impl std::fmt::Display) -> ConfigError {
    ConfigError::Parse { path: path.to_path_buf(), message: err.to_string() }
}
