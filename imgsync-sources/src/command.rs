//! Child-process helper shared by the shell-out collaborators.

use std::fmt;
use std::io;
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Combined result of one external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    /// stdout followed by stderr, lossily decoded.
    pub output: String,
}

impl CommandOutput {
    pub fn contains_any(&self, needles: &[&str]) -> bool {
        needles.iter().any(|needle| self.output.contains(needle))
    }
}

impl fmt::Display for CommandOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit status {code}"),
            None => write!(f, "terminated by signal"),
        }
    }
}

/// Run `cmd` to completion, optionally feeding `stdin`.
///
/// The child is killed if the returned future is dropped, so an enclosing
/// `tokio::time::timeout` never leaves a stray process behind.
pub async fn run(mut cmd: Command, stdin: Option<&[u8]>) -> io::Result<CommandOutput> {
    cmd.kill_on_drop(true)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });

    let mut child = cmd.spawn()?;
    if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
        pipe.write_all(input).await?;
        pipe.shutdown().await?;
    }

    let output = child.wait_with_output().await?;
    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));

    Ok(CommandOutput {
        success: output.status.success(),
        code: output.status.code(),
        output: combined,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_both_streams_and_exit_code() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo out; echo err >&2; exit 3"]);
        let out = run(cmd, None).await.expect("run sh");
        assert!(!out.success);
        assert_eq!(out.code, Some(3));
        assert!(out.output.contains("out"));
        assert!(out.output.contains("err"));
        assert_eq!(out.to_string(), "exit status 3");
    }

    #[tokio::test]
    async fn feeds_stdin() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "cat"]);
        let out = run(cmd, Some(b"s3cret")).await.expect("run cat");
        assert!(out.success);
        assert_eq!(out.output, "s3cret");
    }
}
