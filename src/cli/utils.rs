//! Shared CLI arguments.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use crate::config::{ConfigLocator, ScriptRuntime};
use crate::domain::PackOptions;

/// Where configuration comes from.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Config file to load instead of discovering library-pack.* in the root
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Project root: searched for a config file and base for relative paths
    /// (defaults to the config file's directory, then the current directory)
    #[arg(short = 'r', long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Node binary used to evaluate script configs (library-pack.config.*)
    #[arg(long, value_name = "PROGRAM", env = "LIBRARY_PACK_SCRIPT_RUNTIME")]
    pub script_runtime: Option<String>,

    /// Custom command that evaluates a script config and prints it as JSON;
    /// the config path is appended (e.g. "deno run -A eval-config.ts")
    #[arg(
        long,
        value_name = "COMMAND",
        env = "LIBRARY_PACK_SCRIPT_COMMAND",
        conflicts_with = "script_runtime"
    )]
    pub script_command: Option<String>,
}

impl SourceArgs {
    pub fn locator(&self) -> Result<ConfigLocator> {
        let root = match (&self.root, &self.config) {
            (Some(root), _) => Some(root.clone()),
            (None, Some(_)) => None,
            (None, None) => {
                Some(std::env::current_dir().context("Failed to get current directory")?)
            }
        };
        let runtime = match (&self.script_command, &self.script_runtime) {
            (Some(line), _) => {
                let mut words = line.split_whitespace().map(str::to_string);
                let program = words.next().context("--script-command must not be empty")?;
                ScriptRuntime::command(program, words.collect())
            }
            (None, Some(program)) => ScriptRuntime::node_at(program.clone()),
            (None, None) => ScriptRuntime::node(),
        };

        Ok(ConfigLocator { root, file: self.config.clone(), runtime })
    }
}

/// Command-line overrides, layered over the config file.
#[derive(Args, Debug, Clone, Default)]
pub struct OverrideArgs {
    /// Source directory, relative to the root
    #[arg(long, value_name = "DIR")]
    pub srcdir: Option<PathBuf>,

    /// Output directory, relative to the root
    #[arg(long, value_name = "DIR")]
    pub outdir: Option<PathBuf>,

    /// Include glob, relative to the source directory (repeatable)
    #[arg(short = 'i', long = "include", value_name = "GLOB")]
    pub includes: Vec<String>,

    /// Exclude glob, relative to the source directory (repeatable)
    #[arg(short = 'e', long = "exclude", value_name = "GLOB")]
    pub excludes: Vec<String>,

    /// Remove everything inside the output directory before packing
    #[arg(long, overrides_with = "no_empty_outdir")]
    pub empty_outdir: bool,

    /// Keep existing output, even when the config file sets emptyOutdir
    #[arg(long, overrides_with = "empty_outdir")]
    pub no_empty_outdir: bool,

    /// Worker threads (0 = one per CPU)
    #[arg(short = 'j', long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Stop starting new files after the first failure
    #[arg(long, overrides_with = "no_fail_fast")]
    pub fail_fast: bool,

    /// Pack every file even when the config file sets failFast
    #[arg(long, overrides_with = "fail_fast")]
    pub no_fail_fast: bool,
}

impl OverrideArgs {
    /// Only flags actually given become overrides.
    pub fn to_options(&self) -> PackOptions {
        PackOptions {
            srcdir: self.srcdir.clone(),
            outdir: self.outdir.clone(),
            includes: non_empty(&self.includes),
            excludes: non_empty(&self.excludes),
            empty_outdir: switch(self.empty_outdir, self.no_empty_outdir),
            jobs: self.jobs,
            fail_fast: switch(self.fail_fast, self.no_fail_fast),
            ..Default::default()
        }
    }
}

fn non_empty(values: &[String]) -> Option<Vec<String>> {
    (!values.is_empty()).then(|| values.to_vec())
}

/// `--flag` / `--no-flag` pair; neither given means no override.
fn switch(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (false, true) => Some(false),
        (false, false) => None,
    }
}
