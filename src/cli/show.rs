//! Config command implementation

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};

use super::utils::{OverrideArgs, SourceArgs};
use crate::config::{load_options, resolve_options};

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum ConfigFormat {
    #[default]
    Yaml,
    Json,
}

#[derive(Args)]
pub struct ConfigArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub overrides: OverrideArgs,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = ConfigFormat::Yaml)]
    pub format: ConfigFormat,
}

pub fn run(args: ConfigArgs) -> Result<()> {
    let locator = args.source.locator()?;
    let options = load_options(&locator)
        .context("Failed to load configuration")?
        .overlay(args.overrides.to_options());
    let config = resolve_options(&options);

    let rendered = match args.format {
        ConfigFormat::Yaml => serde_yaml::to_string(&config)?,
        ConfigFormat::Json => serde_json::to_string_pretty(&config)?,
    };
    println!("{}", rendered.trim_end());
    Ok(())
}
