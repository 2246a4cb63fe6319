//! Process execution with a time budget

use crate::{ToolError, ToolOutput, ToolResult};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Run `program` in `cwd` and capture its output
///
/// The child is killed if it outlives `timeout`.
pub async fn run_tool(
    program: &str,
    args: &[String],
    cwd: &Path,
    timeout: Duration,
) -> ToolResult<ToolOutput> {
    log::debug!("{} {} (in {})", program, args.join(" "), cwd.display());

    let child = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ToolError::NotFound(program.to_string()),
            _ => ToolError::Io(e),
        })?;

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(output) => output?,
        Err(_) => {
            return Err(ToolError::Timeout {
                tool: program.to_string(),
                secs: timeout.as_secs(),
            })
        }
    };

    Ok(ToolOutput {
        // Killed by a signal
        returncode: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
}

/// Like [`run_tool`], but folds adapter errors into a failed output
pub async fn run_tool_captured(
    program: &str,
    args: &[String],
    cwd: &Path,
    timeout: Duration,
) -> ToolOutput {
    match run_tool(program, args, cwd, timeout).await {
        Ok(output) => output,
        Err(e) => {
            log::warn!("{}: {}", program, e);
            ToolOutput::from_error(&e)
        }
    }
}

/// Path argument for a tool running with `cwd` as its working directory
pub fn relative_to(path: &Path, cwd: &Path) -> PathBuf {
    path.strip_prefix(cwd)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Write a file into the working directory, folding errors into a failed output
pub async fn write_input(path: &Path, contents: &str) -> Result<(), ToolOutput> {
    tokio::fs::write(path, contents)
        .await
        .map_err(|e| ToolOutput::from_error(&ToolError::Io(e)))
}
