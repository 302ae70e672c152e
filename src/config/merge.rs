//! Option resolution and layering
//!
//! Precedence is CLI > config file > defaults. Presence decides: a field set
//! to `false`, `""` or `[]` is an explicit value and is never replaced.

use crate::domain::{
    default_excludes, default_includes, PackConfig, PackOptions, TransformOptions, DEFAULT_OUTDIR,
    DEFAULT_SRCDIR,
};
use std::path::PathBuf;

/// Fill every absent field of `options` with its default.
pub fn resolve_options(options: &PackOptions) -> PackConfig {
    let options = options.clone();
    PackConfig {
        srcdir: options.srcdir.unwrap_or_else(|| PathBuf::from(DEFAULT_SRCDIR)),
        outdir: options.outdir.unwrap_or_else(|| PathBuf::from(DEFAULT_OUTDIR)),
        includes: options.includes.unwrap_or_else(|| to_strings(default_includes())),
        excludes: options.excludes.unwrap_or_else(|| to_strings(default_excludes())),
        empty_outdir: options.empty_outdir.unwrap_or(false),
        transform_options: options.transform_options.unwrap_or_default().with_defaults(),
        transformer: options.transformer.unwrap_or_default(),
        jobs: options.jobs.unwrap_or(0),
        fail_fast: options.fail_fast.unwrap_or(false),
    }
}

impl PackOptions {
    /// Layer `higher` on top of `self`; fields set in `higher` win.
    pub fn overlay(self, higher: PackOptions) -> PackOptions {
        PackOptions {
            srcdir: higher.srcdir.or(self.srcdir),
            outdir: higher.outdir.or(self.outdir),
            includes: higher.includes.or(self.includes),
            excludes: higher.excludes.or(self.excludes),
            empty_outdir: higher.empty_outdir.or(self.empty_outdir),
            transform_options: merge_transform(self.transform_options, higher.transform_options),
            transformer: higher.transformer.or(self.transformer),
            jobs: higher.jobs.or(self.jobs),
            fail_fast: higher.fail_fast.or(self.fail_fast),
        }
    }
}

fn merge_transform(
    lower: Option<TransformOptions>,
    higher: Option<TransformOptions>,
) -> Option<TransformOptions> {
    match (lower, higher) {
        (Some(lower), Some(higher)) => Some(lower.merge(higher)),
        (lower, higher) => higher.or(lower),
    }
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}
