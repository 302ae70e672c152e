//! Pack command implementation

use anyhow::{Context, Result};
use clap::Args;

use super::utils::{OverrideArgs, SourceArgs};
use crate::pack::run_with_overrides;

#[derive(Args)]
pub struct PackArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub overrides: OverrideArgs,

    /// Transformer command line, overriding `transformer` from the config file
    /// (e.g. `-- node scripts/transform.mjs`)
    #[arg(last = true, value_name = "TRANSFORMER")]
    pub transformer: Vec<String>,
}

pub fn run(args: PackArgs) -> Result<()> {
    let locator = args.source.locator()?;

    let mut overrides = args.overrides.to_options();
    if !args.transformer.is_empty() {
        overrides.transformer = Some(args.transformer);
    }

    let report = run_with_overrides(&locator, overrides).context("Pack failed")?;

    for (file, err) in report.failed() {
        eprintln!("error: {}: {}", file.source.display(), err);
    }
    println!("{} -> {}", report.srcdir.display(), report.outdir.display());
    println!("{}", report.summary());

    if !report.is_success() {
        anyhow::bail!("{} file(s) failed to pack", report.failed().count());
    }
    Ok(())
}
