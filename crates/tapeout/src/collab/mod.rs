//! External collaborators
//!
//! Analysis and publishing happen outside this crate. Both sit behind async
//! traits so the workflow can be driven by in-process fakes in tests and by
//! operator-configured programs in production.

pub mod analysis;
pub mod publish;

pub use analysis::{AnalysisReport, Analyzer, CommandAnalyzer};
pub use publish::{parse_publish_id, CommandPublisher, Publisher};

use serde::{Deserialize, Serialize};
use std::io;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Failure of a collaborator call.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("Failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("'{program}' exited with {status}: {stderr}")]
    Exit {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("'{program}' did not finish within {secs}s")]
    Timeout { program: String, secs: u64 },

    #[error("I/O error talking to collaborator: {0}")]
    Io(#[from] io::Error),

    #[error("Malformed collaborator output: {0}")]
    MalformedOutput(String),

    #[error("Collaborator returned no output")]
    EmptyOutput,
}

/// An external program and how to call it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Seconds before the child is killed. `None` uses the caller's default.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout_secs: None,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub(crate) fn timeout_or(&self, default_secs: u64) -> u64 {
        self.timeout_secs.unwrap_or(default_secs)
    }
}

/// Run `spec` with `extra_args` appended, feed `stdin_data`, and return
/// stdout. Non-zero exit and timeout are errors; the child is killed when
/// the timeout fires.
pub(crate) async fn run_command(
    spec: &CommandSpec,
    extra_args: &[&str],
    stdin_data: Option<&[u8]>,
    timeout_secs: u64,
) -> Result<String, CollaboratorError> {
    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args)
        .args(extra_args)
        .stdin(if stdin_data.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!(program = %spec.program, args = spec.args.len() + extra_args.len(), "Spawning collaborator");
    let mut child = cmd.spawn().map_err(|source| CollaboratorError::Spawn {
        program: spec.program.clone(),
        source,
    })?;

    // Feeding stdin counts against the timeout; dropping the child kills it.
    let exchange = async move {
        if let (Some(data), Some(mut stdin)) = (stdin_data, child.stdin.take()) {
            // A child that never reads its input closes the pipe early.
            match stdin.write_all(data).await {
                Ok(()) => {}
                Err(err) if err.kind() == io::ErrorKind::BrokenPipe => {}
                Err(err) => return Err(CollaboratorError::from(err)),
            }
            drop(stdin);
        }
        Ok::<_, CollaboratorError>(child.wait_with_output().await?)
    };

    let output = tokio::time::timeout(Duration::from_secs(timeout_secs), exchange)
        .await
        .map_err(|_| CollaboratorError::Timeout {
            program: spec.program.clone(),
            secs: timeout_secs,
        })??;

    if !output.status.success() {
        return Err(CollaboratorError::Exit {
            program: spec.program.clone(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> CommandSpec {
        CommandSpec::new("/bin/sh").with_args(["-c", script])
    }

    #[tokio::test]
    async fn captures_stdout() {
        let out = run_command(&sh("echo hello"), &[], None, 5).await.unwrap();
        assert_eq!(out.trim(), "hello");
    }

    #[tokio::test]
    async fn feeds_stdin() {
        let out = run_command(&sh("cat"), &[], Some(b"ping".as_slice()), 5).await.unwrap();
        assert_eq!(out, "ping");
    }

    #[tokio::test]
    async fn appends_extra_args_after_configured_ones() {
        // With `sh -c`, the first extra arg becomes $0.
        let out = run_command(&sh("echo \"$1\""), &["name", "last"], None, 5)
            .await
            .unwrap();
        assert_eq!(out.trim(), "last");
    }

    #[tokio::test]
    async fn nonzero_exit_is_an_error() {
        let err = run_command(&sh("echo boom >&2; exit 3"), &[], None, 5)
            .await
            .unwrap_err();
        match err {
            CollaboratorError::Exit { stderr, .. } => assert_eq!(stderr, "boom"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn missing_program_is_spawn_error() {
        let spec = CommandSpec::new("/nonexistent/tapeout-collaborator");
        let err = run_command(&spec, &[], None, 5).await.unwrap_err();
        assert!(matches!(err, CollaboratorError::Spawn { .. }));
    }

    #[tokio::test]
    async fn slow_program_times_out() {
        let err = run_command(&sh("sleep 5"), &[], None, 1).await.unwrap_err();
        assert!(matches!(err, CollaboratorError::Timeout { secs: 1, .. }));
    }

    #[tokio::test]
    async fn child_ignoring_stdin_is_fine() {
        let big = vec![b'x'; 1 << 20];
        let out = run_command(&sh("echo done"), &[], Some(big.as_slice()), 5)
            .await
            .unwrap();
        assert_eq!(out.trim(), "done");
    }

    #[tokio::test]
    async fn stalled_reader_times_out() {
        let big = vec![b'x'; 1 << 20];
        let err = run_command(&sh("exec sleep 5"), &[], Some(big.as_slice()), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, CollaboratorError::Timeout { secs: 1, .. }));
    }
}
