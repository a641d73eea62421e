use std::{ffi::OsStr, fmt, process::Output, time::Duration};

use tokio::process::Command;
use tracing::debug;

use crate::error::LectureVideoError;

/// Why an external tool invocation did not produce usable output.
#[derive(Debug)]
pub enum ToolFailure {
    Spawn(std::io::Error),
    Exit { status: String, stderr: String },
    TimedOut(Duration),
}

impl fmt::Display for ToolFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolFailure::Spawn(e) => write!(f, "failed to start: {e}"),
            ToolFailure::Exit { status, stderr } => write!(f, "{status}: {stderr}"),
            ToolFailure::TimedOut(after) => write!(f, "timed out after {after:?}"),
        }
    }
}

impl ToolFailure {
    /// Maps a failure to the stage's error, keeping timeouts distinguishable.
    pub fn into_error(
        self,
        stage: &'static str,
        index: Option<usize>,
        otherwise: impl FnOnce(String) -> LectureVideoError,
    ) -> LectureVideoError {
        match self {
            ToolFailure::TimedOut(after) => LectureVideoError::Timeout {
                stage,
                index,
                after,
            },
            other => otherwise(other.to_string()),
        }
    }
}

pub fn command(program: impl AsRef<OsStr>) -> Command {
    let mut cmd = Command::new(program);
    cmd.kill_on_drop(true);
    cmd
}

/// Runs `cmd` to completion under `deadline`. The child is killed if the
/// deadline passes or the calling task is dropped.
pub async fn run_tool(cmd: &mut Command, deadline: Duration) -> Result<Output, ToolFailure> {
    debug!(command = ?cmd.as_std(), "running external tool");

    let output = tokio::time::timeout(deadline, cmd.output())
        .await
        .map_err(|_| ToolFailure::TimedOut(deadline))?
        .map_err(ToolFailure::Spawn)?;

    if !output.status.success() {
        return Err(ToolFailure::Exit {
            status: output.status.to_string(),
            stderr: stderr_tail(&output.stderr),
        });
    }

    Ok(output)
}

fn stderr_tail(stderr: &[u8]) -> String {
    const MAX_LINES: usize = 12;

    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(MAX_LINES);
    lines[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stderr_keeps_only_the_tail() {
        let input: String = (0..30).map(|i| format!("line {i}\n")).collect();
        let tail = stderr_tail(input.as_bytes());
        assert!(tail.starts_with("line 18"));
        assert!(tail.ends_with("line 29"));
    }

    #[tokio::test]
    async fn missing_binary_is_a_spawn_failure() {
        let mut cmd = command("lecturecast-definitely-not-a-binary");
        let err = run_tool(&mut cmd, Duration::from_secs(5)).await.unwrap_err();
        assert!(matches!(err, ToolFailure::Spawn(_)));
    }

    #[test]
    fn timeouts_map_to_timeout_error() {
        let err = ToolFailure::TimedOut(Duration::from_secs(1)).into_error(
            "render",
            Some(2),
            |reason| LectureVideoError::RenderFailed { index: 2, reason },
        );
        assert!(matches!(
            err,
            LectureVideoError::Timeout {
                stage: "render",
                index: Some(2),
                ..
            }
        ));
    }
}
