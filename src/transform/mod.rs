//! Transform collaborator
//!
//! The transformer turns one source file into target code plus optional
//! declaration text and source maps. It is pluggable: anything implementing
//! [`Transformer`] works, including plain closures.

use crate::domain::TransformOptions;
pub use crate::error::TransformError;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub mod command;

pub use command::CommandTransformer;

/// Input for one file.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TransformRequest<'a> {
    pub path: &'a Path,
    pub source: &'a str,
    pub options: &'a TransformOptions,
}

/// Result for one file. Optional artifacts that are `None` are not written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformOutput {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declaration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declaration_map: Option<String>,
}

pub trait Transformer: Send + Sync {
    fn transform(&self, request: &TransformRequest<'_>) -> Result<TransformOutput, TransformError>;
}

impl<F> Transformer for F
where
    F: Fn(&TransformRequest<'_>) -> Result<TransformOutput, TransformError> + Send + Sync,
{
    fn transform(&self, request: &TransformRequest<'_>) -> Result<TransformOutput, TransformError> {
        self(request)
    }
}
