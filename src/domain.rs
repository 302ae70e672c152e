//! Core configuration records shared across the crate.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

pub const DEFAULT_SRCDIR: &str = "src";
pub const DEFAULT_OUTDIR: &str = "out";

/// Glob patterns selecting files to pack when none are configured.
pub fn default_includes() -> &'static [&'static str] {
    &["**/*"]
}

/// Glob patterns excluded when none are configured: dependency folders and tests.
pub fn default_excludes() -> &'static [&'static str] {
    &["node_modules/**/*", "**/*.test.ts", "**/test/**/*"]
}

/// Partial configuration, as written in a config file or assembled from CLI flags.
///
/// Every field may be absent. Absence is the only thing that lets a default
/// through during resolution: an explicit `false` or `[]` is kept as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub srcdir: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outdir: Option<PathBuf>,

    #[serde(default, deserialize_with = "patterns", skip_serializing_if = "Option::is_none")]
    pub includes: Option<Vec<String>>,

    #[serde(default, deserialize_with = "patterns", skip_serializing_if = "Option::is_none")]
    pub excludes: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub empty_outdir: Option<bool>,

    #[serde(default, alias = "transform", skip_serializing_if = "Option::is_none")]
    pub transform_options: Option<TransformOptions>,

    /// Command line of the external transformer (program followed by its arguments).
    #[serde(default, deserialize_with = "command_line", skip_serializing_if = "Option::is_none")]
    pub transformer: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jobs: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail_fast: Option<bool>,
}

/// Fully resolved configuration. Built once per run and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackConfig {
    pub srcdir: PathBuf,
    pub outdir: PathBuf,
    pub includes: Vec<String>,
    pub excludes: Vec<String>,
    pub empty_outdir: bool,
    pub transform_options: TransformOptions,
    pub transformer: Vec<String>,
    /// Worker threads for the transform pool; 0 lets rayon pick one per CPU.
    pub jobs: usize,
    pub fail_fast: bool,
}

impl From<PackConfig> for PackOptions {
    fn from(config: PackConfig) -> Self {
        Self {
            srcdir: Some(config.srcdir),
            outdir: Some(config.outdir),
            includes: Some(config.includes),
            excludes: Some(config.excludes),
            empty_outdir: Some(config.empty_outdir),
            transform_options: Some(config.transform_options),
            transformer: Some(config.transformer),
            jobs: Some(config.jobs),
            fail_fast: Some(config.fail_fast),
        }
    }
}

/// Options handed verbatim to the transformer.
///
/// The block is opaque except for `sourcemap` and `declaration.sourcemap`,
/// which default to `true` when absent (or `null`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransformOptions(Map<String, Value>);

impl TransformOptions {
    pub const SOURCEMAP: &'static str = "sourcemap";
    pub const DECLARATION: &'static str = "declaration";

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    /// Whether code source maps are requested. Absent counts as `true`.
    pub fn sourcemap(&self) -> bool {
        self.0.get(Self::SOURCEMAP).and_then(Value::as_bool).unwrap_or(true)
    }

    /// Whether declaration source maps are requested. Absent counts as `true`.
    pub fn declaration_sourcemap(&self) -> bool {
        self.0
            .get(Self::DECLARATION)
            .and_then(|d| d.get(Self::SOURCEMAP))
            .and_then(Value::as_bool)
            .unwrap_or(true)
    }

    /// Fill `sourcemap` and `declaration.sourcemap` with `true` where absent.
    ///
    /// A `declaration` value that is present but not an object (e.g. `false`)
    /// is left alone.
    pub fn with_defaults(mut self) -> Self {
        if is_absent(self.0.get(Self::SOURCEMAP)) {
            self.0.insert(Self::SOURCEMAP.to_string(), Value::Bool(true));
        }

        match self.0.get_mut(Self::DECLARATION) {
            Some(Value::Object(declaration)) => {
                if is_absent(declaration.get(Self::SOURCEMAP)) {
                    declaration.insert(Self::SOURCEMAP.to_string(), Value::Bool(true));
                }
            }
            Some(Value::Null) | None => {
                let mut declaration = Map::new();
                declaration.insert(Self::SOURCEMAP.to_string(), Value::Bool(true));
                self.0.insert(Self::DECLARATION.to_string(), Value::Object(declaration));
            }
            Some(_) => {}
        }

        self
    }

    /// Deep-merge `higher` over `self`: nested objects merge key by key,
    /// anything else in `higher` replaces the existing value.
    pub fn merge(mut self, higher: TransformOptions) -> Self {
        merge_maps(&mut self.0, higher.0);
        self
    }
}

fn is_absent(value: Option<&Value>) -> bool {
    matches!(value, None | Some(Value::Null))
}

fn merge_maps(base: &mut Map<String, Value>, higher: Map<String, Value>) {
    for (key, value) in higher {
        match value {
            Value::Object(incoming) => match base.get_mut(&key) {
                Some(Value::Object(existing)) => merge_maps(existing, incoming),
                _ => {
                    base.insert(key, Value::Object(incoming));
                }
            },
            value => {
                base.insert(key, value);
            }
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

/// Accept either a single glob or a list of globs.
fn patterns<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<OneOrMany> = Option::deserialize(deserializer)?;
    Ok(value.map(|v| match v {
        OneOrMany::One(pattern) => vec![pattern],
        OneOrMany::Many(patterns) => patterns,
    }))
}

/// Accept either an argv list or a whitespace-separated command string.
fn command_line<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<OneOrMany> = Option::deserialize(deserializer)?;
    Ok(value.map(|v| match v {
        OneOrMany::One(line) => line.split_whitespace().map(str::to_string).collect(),
        OneOrMany::Many(argv) => argv,
    }))
}
