//! Script config evaluation through an external runtime
//!
//! Script configs (`library-pack.config.{ts,js,mts,cjs,mjs}`) are executable
//! modules. They are evaluated by spawning a runtime that prints the module's
//! exported configuration as JSON on stdout.

use crate::domain::PackOptions;
use anyhow::{Context, Result};
use std::path::Path;
use std::process::{Command, Stdio};

/// ESM loader run by node: import the config, prefer the default export,
/// call it when it is a factory, print the result as JSON.
const NODE_LOADER: &str = r#"
const { pathToFileURL } = await import("node:url");
const mod = await import(pathToFileURL(process.argv[process.argv.length - 1]).href);
let value = mod.default !== undefined ? mod.default : { ...mod };
if (typeof value === "function") value = value();
value = await value;
process.stdout.write(JSON.stringify(value ?? {}));
"#;

#[derive(Debug, Clone, PartialEq, Eq)]
enum RuntimeKind {
    Node,
    Command,
}

/// The external program used to evaluate script configs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptRuntime {
    kind: RuntimeKind,
    program: String,
    args: Vec<String>,
}

impl Default for ScriptRuntime {
    fn default() -> Self {
        Self::node()
    }
}

impl ScriptRuntime {
    /// Node from `PATH`.
    pub fn node() -> Self {
        Self::node_at("node")
    }

    /// A specific node binary.
    pub fn node_at(program: impl Into<String>) -> Self {
        Self { kind: RuntimeKind::Node, program: program.into(), args: Vec::new() }
    }

    /// Any program invoked as `program args... <config path>` that prints the
    /// configuration as JSON.
    pub fn command(program: impl Into<String>, args: Vec<String>) -> Self {
        Self { kind: RuntimeKind::Command, program: program.into(), args }
    }

    fn build_command(&self, path: &Path) -> Command {
        // The runtime runs from the config's directory, so hand it an absolute path.
        let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let path = path.as_path();
        let mut command = Command::new(&self.program);
        match self.kind {
            RuntimeKind::Node => {
                let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
                if matches!(ext, "ts" | "mts") {
                    command.arg("--experimental-strip-types");
                }
                command.args(["--input-type=module", "--eval", NODE_LOADER, "--"]);
            }
            RuntimeKind::Command => {
                command.args(&self.args);
            }
        }
        command.arg(path);
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            command.current_dir(dir);
        }
        command
    }

    /// Evaluate the script at `path` and deserialize its exported options.
    pub fn evaluate(&self, path: &Path) -> Result<PackOptions> {
        let output = self
            .build_command(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .with_context(|| format!("Failed to start script runtime `{}`", self.program))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!(
                "Script runtime `{}` exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            );
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let trimmed = stdout.trim();
        if trimmed.is_empty() || trimmed == "null" {
            return Ok(PackOptions::default());
        }

        serde_json::from_str(trimmed)
            .with_context(|| format!("Script config {} did not export valid options", path.display()))
    }
}
