use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("failed to start transformer `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("transformer i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("transformer exited with {status}: {stderr}")]
    Failed { status: ExitStatus, stderr: String },

    #[error("failed to encode transformer request: {0}")]
    EncodeRequest(#[source] serde_json::Error),

    #[error("invalid transformer response: {0}")]
    InvalidResponse(#[from] serde_json::Error),

    #[error("{0}")]
    Message(String),
}

/// Failure of a single file; recorded in the report, never aborts the run.
#[derive(Debug, Error)]
pub enum FileError {
    #[error("failed to read source: {0}")]
    Read(#[source] std::io::Error),

    #[error("transform failed: {0}")]
    Transform(#[from] TransformError),

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum PackError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("source directory not found: {0}")]
    SourceDirNotFound(PathBuf),

    #[error("invalid glob pattern `{pattern}`: {source}")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("failed to walk source directory: {0}")]
    Walk(#[from] ignore::Error),

    #[error("{} sources map to output {}: {}", .sources.len(), .output.display(), join_paths(.sources))]
    OutputCollision { output: PathBuf, sources: Vec<PathBuf> },

    #[error(
        "refusing to empty output directory {} because it contains the source directory {}",
        .outdir.display(),
        .srcdir.display()
    )]
    OutdirContainsSrcdir { outdir: PathBuf, srcdir: PathBuf },

    #[error("failed to empty output directory {path}: {source}")]
    EmptyOutdir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("no transformer configured; set `transformer` in the config file or pass one after `--`")]
    NoTransformer,
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", ")
}
