//! Source file discovery with include/exclude globs

use crate::error::PackError;
use crate::utils::normalize_path;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

/// Discovers files under a source directory.
///
/// Globs are matched against the `/`-separated path relative to the source
/// directory. `*` stays within one path segment, `**` crosses segments.
pub struct SourceScanner {
    root_path: PathBuf,
    includes: Vec<String>,
    excludes: Vec<String>,
}

impl SourceScanner {
    /// Create a scanner with the default include and exclude globs.
    pub fn new(root_path: PathBuf) -> Self {
        Self {
            root_path,
            includes: crate::domain::default_includes().iter().map(|s| s.to_string()).collect(),
            excludes: crate::domain::default_excludes().iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Set glob patterns a file must match
    pub fn includes(mut self, globs: Vec<String>) -> Self {
        self.includes = globs;
        self
    }

    /// Set glob patterns that drop a file
    pub fn excludes(mut self, globs: Vec<String>) -> Self {
        self.excludes = globs;
        self
    }

    /// Walk the source directory and return absolute paths of matching files,
    /// sorted by relative path.
    pub fn scan(&self) -> Result<Vec<PathBuf>, PackError> {
        if !self.root_path.is_dir() {
            return Err(PackError::SourceDirNotFound(self.root_path.clone()));
        }

        let root = self
            .root_path
            .canonicalize()
            .map_err(|_| PackError::SourceDirNotFound(self.root_path.clone()))?;
        let include_set = build_globset(&self.includes)?;
        let exclude_set = build_globset(&self.excludes)?;

        let mut builder = WalkBuilder::new(&root);
        builder
            .standard_filters(false)
            .hidden(true) // dotfiles are not matched by `**/*`
            .follow_links(false);

        let mut files: Vec<(String, PathBuf)> = Vec::new();
        for entry in builder.build() {
            let entry = entry?;
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }

            let path = entry.path();
            let Some(rel_path) = relative_str(path, &root) else {
                continue;
            };

            if !include_set.is_match(&rel_path) || exclude_set.is_match(&rel_path) {
                continue;
            }

            files.push((rel_path, path.to_path_buf()));
        }

        files.sort_by(|a, b| a.0.cmp(&b.0));
        tracing::debug!("Discovered {} source files under {}", files.len(), root.display());

        Ok(files.into_iter().map(|(_, path)| path).collect())
    }
}

fn relative_str(path: &Path, root: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    Some(normalize_path(&rel.to_string_lossy()))
}

/// Compile globs with a literal `/` separator.
fn build_globset(patterns: &[String]) -> Result<GlobSet, PackError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern).literal_separator(true).build().map_err(|source| {
            PackError::InvalidGlob { pattern: pattern.clone(), source }
        })?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|source| PackError::InvalidGlob { pattern: patterns.join(", "), source })
}
