//! Pack orchestration
//!
//! Resolves configuration, discovers sources, validates the output layout,
//! and runs one transform per file on a bounded worker pool.

use crate::config::{load_options, resolve_options, ConfigLocator};
use crate::domain::{PackConfig, PackOptions, TransformOptions};
use crate::error::{FileError, PackError};
use crate::scan::SourceScanner;
use crate::transform::{CommandTransformer, TransformRequest, Transformer};
use rayon::prelude::*;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub mod layout;
pub mod outdir;
pub mod report;

pub use layout::{find_collisions, output_base, OutputPaths};
pub use outdir::empty_dir;
pub use report::{FileReport, FileStatus, PackReport};

/// Cooperative cancellation shared between a caller and a running pack.
///
/// Checked before each file starts; transforms already running finish.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Runs a pack against a root directory with a given transformer.
pub struct Packer<'a> {
    root: PathBuf,
    transformer: &'a dyn Transformer,
    cancel: CancelFlag,
}

impl<'a> Packer<'a> {
    /// `root` is the base for relative `srcdir` and `outdir`.
    pub fn new(root: impl Into<PathBuf>, transformer: &'a dyn Transformer) -> Self {
        Self { root: root.into(), transformer, cancel: CancelFlag::new() }
    }

    pub fn cancel_flag(mut self, flag: CancelFlag) -> Self {
        self.cancel = flag;
        self
    }

    /// Resolve `options` against defaults and pack.
    pub fn pack(&self, options: &PackOptions) -> Result<PackReport, PackError> {
        self.pack_config(&resolve_options(options))
    }

    pub fn pack_config(&self, config: &PackConfig) -> Result<PackReport, PackError> {
        let requested_srcdir = self.root.join(&config.srcdir);
        let srcdir = requested_srcdir
            .canonicalize()
            .map_err(|_| PackError::SourceDirNotFound(requested_srcdir.clone()))?;
        let outdir = clean_path(&match self.root.canonicalize() {
            Ok(root) => root.join(&config.outdir),
            Err(_) => self.root.join(&config.outdir),
        });

        // Emptying an outdir at or above srcdir would delete the sources.
        if config.empty_outdir && srcdir.starts_with(&outdir) {
            return Err(PackError::OutdirContainsSrcdir { outdir, srcdir });
        }

        let mut files = SourceScanner::new(srcdir.clone())
            .includes(config.includes.clone())
            .excludes(config.excludes.clone())
            .scan()?;

        // Never feed previous outputs back in when outdir sits strictly inside srcdir.
        if outdir != srcdir && outdir.starts_with(&srcdir) {
            files.retain(|file| {
                let inside = file.starts_with(&outdir);
                if inside {
                    tracing::debug!("Skipping {} inside the output directory", file.display());
                }
                !inside
            });
        }

        let collisions = find_collisions(&srcdir, &outdir, &files);
        if let Some((output, sources)) = collisions.into_iter().next() {
            return Err(PackError::OutputCollision { output, sources });
        }

        if config.empty_outdir {
            empty_dir(&outdir)
                .map_err(|source| PackError::EmptyOutdir { path: outdir.clone(), source })?;
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.jobs)
            .thread_name(|i| format!("library-pack-{}", i))
            .build()?;

        // Indexed collect keeps discovery order, so the report is sorted by source path.
        let reports: Vec<FileReport> = pool.install(|| {
            files.par_iter().map(|file| self.pack_file(file, &srcdir, &outdir, config)).collect()
        });

        let report = PackReport { srcdir, outdir, files: reports };
        tracing::info!("{}", report.summary());
        Ok(report)
    }

    fn pack_file(&self, file: &Path, srcdir: &Path, outdir: &Path, config: &PackConfig) -> FileReport {
        let base = output_base(srcdir, outdir, file);

        if self.cancel.is_cancelled() {
            tracing::warn!("Skipped {} (run cancelled)", file.display());
            return FileReport { source: file.to_path_buf(), output_base: base, status: FileStatus::Skipped };
        }

        let status = match self.transform_file(file, &base, &config.transform_options) {
            Ok(written) => {
                tracing::info!("Packed {} -> {}", file.display(), base.display());
                FileStatus::Packed { written }
            }
            Err(err) => {
                tracing::error!("Failed to pack {}: {}", file.display(), err);
                if config.fail_fast {
                    self.cancel.cancel();
                }
                FileStatus::Failed(err)
            }
        };

        FileReport { source: file.to_path_buf(), output_base: base, status }
    }

    fn transform_file(
        &self,
        file: &Path,
        base: &Path,
        options: &TransformOptions,
    ) -> Result<Vec<PathBuf>, FileError> {
        let source = fs::read_to_string(file).map_err(FileError::Read)?;
        let output =
            self.transformer.transform(&TransformRequest { path: file, source: &source, options })?;

        let paths = OutputPaths::new(base);
        if let Some(parent) = paths.code.parent() {
            fs::create_dir_all(parent)
                .map_err(|source| FileError::Write { path: parent.to_path_buf(), source })?;
        }

        let artifacts = [
            (&paths.code, Some(&output.code)),
            (&paths.declaration, output.declaration.as_ref()),
            (&paths.code_map, output.map.as_ref()),
            (&paths.declaration_map, output.declaration_map.as_ref()),
        ];

        let mut written = Vec::new();
        for (path, content) in artifacts {
            let Some(content) = content else {
                continue;
            };
            fs::write(path, content)
                .map_err(|source| FileError::Write { path: path.clone(), source })?;
            written.push(path.clone());
        }

        Ok(written)
    }
}

/// Resolve `.` and `..` components without touching the filesystem.
fn clean_path(path: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match cleaned.components().next_back() {
                Some(Component::Normal(_)) => {
                    cleaned.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => cleaned.push(component),
            },
            other => cleaned.push(other),
        }
    }
    cleaned
}

/// Pack `root` with the given options and transformer.
pub fn pack(
    root: &Path,
    options: &PackOptions,
    transformer: &dyn Transformer,
) -> Result<PackReport, PackError> {
    Packer::new(root, transformer).pack(options)
}

/// Load configuration from `locator` and pack with the configured
/// command-line transformer.
pub fn run(locator: &ConfigLocator) -> Result<PackReport, PackError> {
    run_with_overrides(locator, PackOptions::default())
}

/// Like [`run`], with `overrides` layered over the loaded configuration.
pub fn run_with_overrides(
    locator: &ConfigLocator,
    overrides: PackOptions,
) -> Result<PackReport, PackError> {
    let config = resolve_options(&load_options(locator)?.overlay(overrides));
    let transformer =
        CommandTransformer::from_argv(&config.transformer).ok_or(PackError::NoTransformer)?;
    Packer::new(locator.root_dir(), &transformer).pack_config(&config)
}

/// Like [`run_with_overrides`], with an explicit transformer.
pub fn run_with(
    locator: &ConfigLocator,
    overrides: PackOptions,
    transformer: &dyn Transformer,
) -> Result<PackReport, PackError> {
    let options = load_options(locator)?.overlay(overrides);
    Packer::new(locator.root_dir(), transformer).pack(&options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransformError;
    use crate::transform::TransformOutput;
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(path, content).expect("write");
    }

    fn full_output(request: &TransformRequest<'_>) -> Result<TransformOutput, TransformError> {
        Ok(TransformOutput {
            code: format!("// packed\n{}", request.source),
            declaration: Some("export {};\n".to_string()),
            map: Some("{\"version\":3}".to_string()),
            declaration_map: Some("{\"version\":3}".to_string()),
        })
    }

    fn code_only(request: &TransformRequest<'_>) -> Result<TransformOutput, TransformError> {
        Ok(TransformOutput { code: request.source.to_string(), ..Default::default() })
    }

    fn rel_set(root: &Path, paths: impl Iterator<Item = PathBuf>) -> BTreeSet<String> {
        let root = root.canonicalize().expect("canonical");
        paths
            .map(|p| p.strip_prefix(&root).expect("under root").to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[test]
    fn test_pack_writes_mirrored_artifacts() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(root, "src/index.ts", "export * from './a/b';\n");
        touch(root, "src/a/b.ts", "export const b = 1;\n");
        touch(root, "src/a/b.test.ts", "test();\n");

        let report = pack(root, &PackOptions::default(), &full_output).unwrap();
        assert!(report.is_success(), "{}", report.summary());
        assert_eq!(report.files.len(), 2);

        let out = root.join("out");
        for rel in ["index", "a/b"] {
            for suffix in [".js", ".d.ts", ".js.map", ".d.ts.map"] {
                let path = out.join(format!("{}{}", rel, suffix));
                assert!(path.is_file(), "missing {}", path.display());
            }
        }
        assert_eq!(
            fs::read_to_string(out.join("a/b.js")).unwrap(),
            "// packed\nexport const b = 1;\n"
        );
        assert!(!out.join("a/b.test.js").exists());
    }

    #[test]
    fn test_pack_output_set_matches_layout() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        let sources = ["z.ts", "m/n.ts", "a/b/c.ts", "a/d.ts", "q.mts"];
        for rel in sources {
            touch(root, &format!("src/{}", rel), "x");
        }

        let report = pack(root, &PackOptions::default(), &code_only).unwrap();

        let written = rel_set(
            root,
            report.files.iter().flat_map(|f| match &f.status {
                FileStatus::Packed { written } => written.clone(),
                _ => Vec::new(),
            }),
        );
        let expected = rel_set(
            root,
            report.files.iter().map(|f| {
                OutputPaths::new(&output_base(&report.srcdir, &report.outdir, &f.source)).code
            }),
        );
        assert_eq!(written.len(), sources.len());
        assert_eq!(written, expected);
        assert!(written.contains("out/a/b/c.js"));
        assert!(written.contains("out/q.js"));
    }

    #[test]
    fn test_pack_skips_absent_maps() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(root, "src/a.ts", "x");

        pack(root, &PackOptions::default(), &code_only).unwrap();
        let out = root.join("out");
        assert!(out.join("a.js").is_file());
        assert!(!out.join("a.d.ts").exists());
        assert!(!out.join("a.js.map").exists());
        assert!(!out.join("a.d.ts.map").exists());
    }

    #[test]
    fn test_pack_passes_resolved_transform_options() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(root, "src/a.ts", "x");

        let check = |request: &TransformRequest<'_>| {
            if request.options.sourcemap() && request.options.declaration_sourcemap() {
                code_only(request)
            } else {
                Err(TransformError::Message("sourcemaps not defaulted".to_string()))
            }
        };
        let report = pack(root, &PackOptions::default(), &check).unwrap();
        assert!(report.is_success(), "{}", report.summary());
    }

    #[test]
    fn test_pack_best_effort_collects_failures() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(root, "src/good.ts", "ok");
        touch(root, "src/bad.ts", "boom");
        touch(root, "src/fine.ts", "ok");

        let flaky = |request: &TransformRequest<'_>| {
            if request.source == "boom" {
                Err(TransformError::Message("unexpected token".to_string()))
            } else {
                code_only(request)
            }
        };
        let report = pack(root, &PackOptions::default(), &flaky).unwrap();

        assert_eq!(report.packed().count(), 2);
        let failed: Vec<_> = report.failed().collect();
        assert_eq!(failed.len(), 1);
        assert!(failed[0].0.source.ends_with("bad.ts"));
        assert!(failed[0].1.to_string().contains("unexpected token"));
        assert!(root.join("out/good.js").is_file());
        assert!(root.join("out/fine.js").is_file());
        assert!(!root.join("out/bad.js").exists());
    }

    #[test]
    fn test_pack_fail_fast_skips_remaining_files() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(root, "src/a.ts", "boom");
        touch(root, "src/b.ts", "ok");
        touch(root, "src/c.ts", "ok");

        let flaky = |request: &TransformRequest<'_>| {
            if request.source == "boom" {
                Err(TransformError::Message("boom".to_string()))
            } else {
                code_only(request)
            }
        };
        let options = PackOptions { jobs: Some(1), fail_fast: Some(true), ..Default::default() };
        let report = pack(root, &options, &flaky).unwrap();

        assert_eq!(report.failed().count(), 1);
        assert_eq!(report.skipped().count(), 2);
        assert!(!root.join("out/b.js").exists());
    }

    #[test]
    fn test_pack_cancelled_before_start_skips_everything() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(root, "src/a.ts", "x");

        let flag = CancelFlag::new();
        flag.cancel();
        let report = Packer::new(root, &code_only)
            .cancel_flag(flag)
            .pack(&PackOptions::default())
            .unwrap();
        assert_eq!(report.skipped().count(), 1);
        assert!(!root.join("out").exists());
    }

    #[test]
    fn test_pack_rejects_output_collisions() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(root, "src/a.ts", "x");
        touch(root, "src/a.tsx", "y");

        let err = pack(root, &PackOptions::default(), &code_only).unwrap_err();
        match err {
            PackError::OutputCollision { output, sources } => {
                assert!(output.ends_with("out/a"));
                assert_eq!(sources.len(), 2);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(!root.join("out").exists(), "nothing should be written on collision");
    }

    #[test]
    fn test_pack_empties_outdir_when_requested() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(root, "src/a.ts", "x");
        touch(root, "out/stale/old.js", "old");

        let keep = PackOptions::default();
        pack(root, &keep, &code_only).unwrap();
        assert!(root.join("out/stale/old.js").exists());

        let empty = PackOptions { empty_outdir: Some(true), ..Default::default() };
        pack(root, &empty, &code_only).unwrap();
        assert!(!root.join("out/stale").exists());
        assert!(root.join("out/a.js").is_file());
    }

    #[test]
    fn test_pack_missing_srcdir_is_error() {
        let tmp = TempDir::new().unwrap();
        let err = pack(tmp.path(), &PackOptions::default(), &code_only).unwrap_err();
        assert!(matches!(err, PackError::SourceDirNotFound(_)));
    }

    #[test]
    fn test_pack_ignores_outdir_inside_srcdir() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(root, "lib/a.ts", "x");
        touch(root, "lib/dist/a.js", "previous output");

        let options = PackOptions {
            srcdir: Some(PathBuf::from("lib")),
            outdir: Some(PathBuf::from("lib/dist")),
            ..Default::default()
        };
        let report = pack(root, &options, &code_only).unwrap();
        assert_eq!(report.files.len(), 1);
        assert!(root.join("lib/dist/a.js").is_file());
    }

    #[test]
    fn test_pack_refuses_to_empty_outdir_above_srcdir() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(root, "src/a.ts", "x");
        touch(root, "library-pack.json", "{}");

        let options = PackOptions {
            outdir: Some(PathBuf::from(".")),
            empty_outdir: Some(true),
            ..Default::default()
        };
        let err = pack(root, &options, &code_only).unwrap_err();
        assert!(matches!(err, PackError::OutdirContainsSrcdir { .. }), "{:?}", err);
        assert!(root.join("src/a.ts").is_file());
        assert!(root.join("library-pack.json").is_file());
    }

    #[test]
    fn test_pack_refuses_to_empty_outdir_equal_to_srcdir() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(root, "src/a.ts", "x");

        let options = PackOptions {
            outdir: Some(PathBuf::from("lib/../src")),
            empty_outdir: Some(true),
            ..Default::default()
        };
        let err = pack(root, &options, &code_only).unwrap_err();
        assert!(matches!(err, PackError::OutdirContainsSrcdir { .. }), "{:?}", err);
        assert!(root.join("src/a.ts").is_file());
    }

    #[test]
    fn test_pack_into_parent_of_srcdir_keeps_sources() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(root, "src/a.ts", "x");
        touch(root, "src/b/c.ts", "y");

        let options = PackOptions { outdir: Some(PathBuf::from(".")), ..Default::default() };
        let report = pack(root, &options, &code_only).unwrap();
        assert_eq!(report.files.len(), 2);
        assert!(root.join("a.js").is_file());
        assert!(root.join("b/c.js").is_file());
    }

    #[test]
    fn test_pack_in_place_writes_next_to_sources() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(root, "src/a.ts", "x");
        touch(root, "src/b/c.ts", "y");

        let options = PackOptions { outdir: Some(PathBuf::from("src")), ..Default::default() };
        let report = pack(root, &options, &code_only).unwrap();
        assert!(report.is_success());
        assert_eq!(report.files.len(), 2);
        assert!(root.join("src/a.js").is_file());
        assert!(root.join("src/b/c.js").is_file());
    }

    #[test]
    fn test_clean_path_resolves_dot_components() {
        assert_eq!(clean_path(Path::new("/proj/./out")), PathBuf::from("/proj/out"));
        assert_eq!(clean_path(Path::new("/proj/lib/../src")), PathBuf::from("/proj/src"));
        assert_eq!(clean_path(Path::new("../out")), PathBuf::from("../out"));
        assert_eq!(clean_path(Path::new("../../out")), PathBuf::from("../../out"));
        assert_eq!(clean_path(Path::new("/..")), PathBuf::from("/"));
    }

    #[test]
    fn test_run_requires_transformer() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "src/a.ts", "x");

        let err = run(&ConfigLocator::in_dir(tmp.path())).unwrap_err();
        assert!(matches!(err, PackError::NoTransformer));
    }

    #[test]
    fn test_run_with_loads_discovered_config() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(root, "source/a.ts", "x");
        touch(root, "library-pack.json", "{\n  // custom layout\n  \"srcdir\": \"source\",\n  \"outdir\": \"dist\"\n}\n");

        let report =
            run_with(&ConfigLocator::in_dir(root), PackOptions::default(), &code_only).unwrap();
        assert!(report.is_success());
        assert!(root.join("dist/a.js").is_file());
    }

    #[test]
    fn test_run_with_overrides_beat_config_file() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(root, "src/a.ts", "x");
        touch(root, "library-pack.yaml", "outdir: dist\n");

        let overrides = PackOptions { outdir: Some(PathBuf::from("build")), ..Default::default() };
        run_with(&ConfigLocator::in_dir(root), overrides, &code_only).unwrap();
        assert!(root.join("build/a.js").is_file());
        assert!(!root.join("dist").exists());
    }

    #[test]
    fn test_run_with_broken_script_config_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(root, "src/a.ts", "x");
        touch(root, "library-pack.config.ts", "throw new Error('nope');\n");

        let locator = ConfigLocator::in_dir(root)
            .runtime(crate::config::ScriptRuntime::node_at("library-pack-test-no-such-runtime"));
        let report = run_with(&locator, PackOptions::default(), &code_only).unwrap();
        assert!(report.is_success());
        assert!(root.join("out/a.js").is_file());
    }
}
