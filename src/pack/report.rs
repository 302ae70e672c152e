//! Per-run result aggregation

use crate::error::FileError;
use std::path::PathBuf;

/// Outcome of one source file.
#[derive(Debug)]
pub enum FileStatus {
    /// Transformed; lists the artifacts written, code first.
    Packed { written: Vec<PathBuf> },
    Failed(FileError),
    /// Never started because the run was cancelled.
    Skipped,
}

#[derive(Debug)]
pub struct FileReport {
    pub source: PathBuf,
    pub output_base: PathBuf,
    pub status: FileStatus,
}

/// Every discovered file with its outcome, in source path order.
#[derive(Debug, Default)]
pub struct PackReport {
    pub srcdir: PathBuf,
    pub outdir: PathBuf,
    pub files: Vec<FileReport>,
}

impl PackReport {
    pub fn packed(&self) -> impl Iterator<Item = &FileReport> {
        self.files.iter().filter(|f| matches!(f.status, FileStatus::Packed { .. }))
    }

    pub fn failed(&self) -> impl Iterator<Item = (&FileReport, &FileError)> {
        self.files.iter().filter_map(|f| match &f.status {
            FileStatus::Failed(err) => Some((f, err)),
            _ => None,
        })
    }

    pub fn skipped(&self) -> impl Iterator<Item = &FileReport> {
        self.files.iter().filter(|f| matches!(f.status, FileStatus::Skipped))
    }

    /// True when every discovered file was packed.
    pub fn is_success(&self) -> bool {
        self.packed().count() == self.files.len()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} of {} files packed ({} failed, {} skipped)",
            self.packed().count(),
            self.files.len(),
            self.failed().count(),
            self.skipped().count()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransformError;

    fn report(status: FileStatus) -> FileReport {
        FileReport { source: PathBuf::from("a.ts"), output_base: PathBuf::from("a"), status }
    }

    #[test]
    fn summary_counts_each_status() {
        let report = PackReport {
            files: vec![
                report(FileStatus::Packed { written: vec![PathBuf::from("a.js")] }),
                report(FileStatus::Failed(FileError::Transform(TransformError::Message(
                    "bad".to_string(),
                )))),
                report(FileStatus::Skipped),
            ],
            ..Default::default()
        };

        assert!(!report.is_success());
        assert_eq!(report.summary(), "1 of 3 files packed (1 failed, 1 skipped)");
    }

    #[test]
    fn empty_report_is_success() {
        assert!(PackReport::default().is_success());
    }
}
