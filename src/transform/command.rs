//! External-process transformer
//!
//! Each file is handled by one process run: a JSON request on stdin
//! (`path`, `source`, `options`) and a JSON response on stdout (`code`,
//! `declaration`, `map`, `declarationMap`).

use super::{TransformError, TransformOutput, TransformRequest, Transformer};
use std::io::Write;
use std::process::{Command, Stdio};
use std::thread;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTransformer {
    program: String,
    args: Vec<String>,
}

impl CommandTransformer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self { program: program.into(), args }
    }

    /// Build from an argv list; `None` when it is empty.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self::new(program.clone(), args.to_vec()))
    }
}

impl Transformer for CommandTransformer {
    fn transform(&self, request: &TransformRequest<'_>) -> Result<TransformOutput, TransformError> {
        let payload = serde_json::to_vec(request).map_err(TransformError::EncodeRequest)?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| TransformError::Spawn { program: self.program.clone(), source })?;

        // Feed stdin from another thread so a chatty child cannot block on a full stdout pipe.
        let mut stdin = child.stdin.take().ok_or_else(|| {
            TransformError::Message("transformer stdin was not captured".to_string())
        })?;
        let output = thread::scope(|scope| {
            let writer = scope.spawn(move || {
                let result = stdin.write_all(&payload);
                drop(stdin);
                result
            });
            let output = child.wait_with_output();
            let written = writer.join().unwrap_or(Ok(()));
            output.and_then(|o| match written {
                // A child that exits without reading its input closes the pipe early.
                Err(e) if e.kind() != std::io::ErrorKind::BrokenPipe => Err(e),
                _ => Ok(o),
            })
        })?;

        if !output.status.success() {
            return Err(TransformError::Failed {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(serde_json::from_slice(&output.stdout)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TransformOptions;
    use std::path::Path;

    fn request<'a>(options: &'a TransformOptions) -> TransformRequest<'a> {
        TransformRequest { path: Path::new("/proj/src/a.ts"), source: "export const a = 1;", options }
    }

    #[test]
    fn from_argv_splits_program() {
        let argv = vec!["node".to_string(), "transform.mjs".to_string()];
        let transformer = CommandTransformer::from_argv(&argv).expect("transformer");
        assert_eq!(transformer, CommandTransformer::new("node", vec!["transform.mjs".to_string()]));
        assert!(CommandTransformer::from_argv(&[]).is_none());
    }

    #[test]
    fn spawn_failure_names_program() {
        let options = TransformOptions::default();
        let transformer = CommandTransformer::new("library-pack-test-no-such-transformer", vec![]);
        let err = transformer.transform(&request(&options)).unwrap_err();
        assert!(matches!(err, TransformError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn reads_response_from_stdout() {
        let options = TransformOptions::default();
        let transformer = CommandTransformer::new(
            "sh",
            vec![
                "-c".to_string(),
                r#"cat > /dev/null; printf '{"code":"export {};","map":"{}"}'"#.to_string(),
            ],
        );
        let output = transformer.transform(&request(&options)).expect("transform");
        assert_eq!(output.code, "export {};");
        assert_eq!(output.map.as_deref(), Some("{}"));
        assert!(output.declaration.is_none());
        assert!(output.declaration_map.is_none());
    }

    #[cfg(unix)]
    #[test]
    fn request_is_sent_as_json() {
        let options = TransformOptions::default().with_defaults();
        // Echo the request back as the code so the payload can be inspected.
        let transformer = CommandTransformer::new(
            "sh",
            vec![
                "-c".to_string(),
                r#"input=$(cat | tr -d '\n' | sed 's/\\/\\\\/g; s/"/\\"/g'); printf '{"code":"%s"}' "$input""#
                    .to_string(),
            ],
        );
        let output = transformer.transform(&request(&options)).expect("transform");
        let echoed: serde_json::Value = serde_json::from_str(&output.code).expect("request json");
        assert_eq!(echoed["path"], "/proj/src/a.ts");
        assert_eq!(echoed["source"], "export const a = 1;");
        assert_eq!(echoed["options"]["sourcemap"], true);
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_captures_stderr() {
        let options = TransformOptions::default();
        let transformer = CommandTransformer::new(
            "sh",
            vec!["-c".to_string(), "cat > /dev/null; echo 'syntax error' >&2; exit 1".to_string()],
        );
        match transformer.transform(&request(&options)).unwrap_err() {
            TransformError::Failed { stderr, .. } => assert_eq!(stderr, "syntax error"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn invalid_response_is_reported() {
        let options = TransformOptions::default();
        let transformer = CommandTransformer::new(
            "sh",
            vec!["-c".to_string(), "cat > /dev/null; echo not-json".to_string()],
        );
        assert!(matches!(
            transformer.transform(&request(&options)).unwrap_err(),
            TransformError::InvalidResponse(_)
        ));
    }

    #[cfg(unix)]
    #[test]
    fn unencodable_request_is_not_a_response_error() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let options = TransformOptions::default();
        let request = TransformRequest {
            path: Path::new(OsStr::from_bytes(b"/proj/src/\xff.ts")),
            source: "",
            options: &options,
        };
        let transformer = CommandTransformer::new("library-pack-test-no-such-transformer", vec![]);
        let err = transformer.transform(&request).unwrap_err();
        assert!(matches!(err, TransformError::EncodeRequest(_)), "{:?}", err);
        assert!(err.to_string().starts_with("failed to encode transformer request"));
    }
}
