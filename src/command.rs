//! # External Commands
//!
//! Thin wrapper over [`tokio::process::Command`] used by the `eksctl` and
//! `kubectl` adapters. Each invocation runs to completion and its exit status
//! and captured output are returned to the caller.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Failure of an external command invocation
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to execute {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} exited with {status}: {output}")]
    Failed {
        program: String,
        status: std::process::ExitStatus,
        output: String,
    },
}

impl CommandError {
    /// Text the tool wrote to stdout/stderr before failing
    #[must_use]
    pub fn output(&self) -> &str {
        match self {
            CommandError::Spawn { .. } => "",
            CommandError::Failed { output, .. } => output,
        }
    }
}

/// Run `program` with `args`, returning its stdout on success
///
/// # Errors
///
/// Returns [`CommandError::Spawn`] when the process cannot be started and
/// [`CommandError::Failed`] when it exits non-zero. The failure carries the
/// combined stderr and stdout so callers can inspect the tool's message.
pub async fn run<I, S>(program: &Path, args: I) -> Result<String, CommandError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let program_name = program.display().to_string();
    let args: Vec<S> = args.into_iter().collect();
    debug!(
        command.program = program_name.as_str(),
        command.args = ?args.iter().map(|a| a.as_ref().to_string_lossy().into_owned()).collect::<Vec<_>>(),
        "Executing external command"
    );

    let output = Command::new(program)
        .args(&args)
        .output()
        .await
        .map_err(|source| CommandError::Spawn {
            program: program_name.clone(),
            source,
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    if output.status.success() {
        return Ok(stdout);
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let combined = [stderr.trim(), stdout.trim()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    Err(CommandError::Failed {
        program: program_name,
        status: output.status,
        output: combined,
    })
}

/// Resolve a tool binary, honoring an explicit override before searching `PATH`
///
/// # Errors
///
/// Returns an error if the binary cannot be found.
pub fn resolve_binary(override_path: Option<&str>, default: &str) -> Result<PathBuf, which::Error> {
    match override_path.filter(|p| !p.is_empty()) {
        Some(path) => which::which(path),
        None => which::which(default),
    }
}
