//! Output path layout
//!
//! Every source file maps to an output base path (relative location kept,
//! extension dropped). The four artifacts hang off that base.

use pathdiff::diff_paths;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

pub const CODE_SUFFIX: &str = ".js";
pub const DECLARATION_SUFFIX: &str = ".d.ts";
pub const CODE_MAP_SUFFIX: &str = ".js.map";
pub const DECLARATION_MAP_SUFFIX: &str = ".d.ts.map";

/// Map `file` under `srcdir` to its base path under `outdir`.
///
/// `srcdir/a/b.ts` becomes `outdir/a/b`. Containment is not checked: a file
/// outside `srcdir` yields a path with `..` segments.
pub fn output_base(srcdir: &Path, outdir: &Path, file: &Path) -> PathBuf {
    let relative = diff_paths(file, srcdir)
        .unwrap_or_else(|| file.file_name().map(PathBuf::from).unwrap_or_default());
    outdir.join(relative).with_extension("")
}

/// The sibling artifacts derived from one output base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub code: PathBuf,
    pub declaration: PathBuf,
    pub code_map: PathBuf,
    pub declaration_map: PathBuf,
}

impl OutputPaths {
    pub fn new(base: &Path) -> Self {
        Self {
            code: with_suffix(base, CODE_SUFFIX),
            declaration: with_suffix(base, DECLARATION_SUFFIX),
            code_map: with_suffix(base, CODE_MAP_SUFFIX),
            declaration_map: with_suffix(base, DECLARATION_MAP_SUFFIX),
        }
    }
}

fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(base.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Output bases claimed by more than one source file, with their sources.
pub fn find_collisions(
    srcdir: &Path,
    outdir: &Path,
    files: &[PathBuf],
) -> Vec<(PathBuf, Vec<PathBuf>)> {
    let mut by_base: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();
    for file in files {
        by_base.entry(output_base(srcdir, outdir, file)).or_default().push(file.clone());
    }
    by_base.into_iter().filter(|(_, sources)| sources.len() > 1).collect()
}
