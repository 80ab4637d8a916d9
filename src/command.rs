//! External command execution

use crate::error::{NetconvergeError, NetconvergeResult};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Captured result of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub code: Option<i32>,
}

/// Runs a program with an argument vector, no shell involved
///
/// A non-zero exit is reported as [`NetconvergeError::CommandFailed`].
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run_command(&self, program: &str, args: &[&str]) -> NetconvergeResult<CommandOutput>;
}

#[derive(Debug, Clone, Default)]
pub struct OsCommandRunner;

impl OsCommandRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for OsCommandRunner {
    async fn run_command(&self, program: &str, args: &[&str]) -> NetconvergeResult<CommandOutput> {
        let cmd_str = command_line(program, args);
        debug!("Running: {}", cmd_str);

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| NetconvergeError::CommandFailed {
                cmd: cmd_str.clone(),
                code: None,
                stderr: e.to_string(),
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        if !output.status.success() {
            return Err(NetconvergeError::CommandFailed {
                cmd: cmd_str,
                code: output.status.code(),
                stderr,
            });
        }

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr,
            code: output.status.code(),
        })
    }
}

/// Human-readable form of a command for logs and errors
pub fn command_line(program: &str, args: &[&str]) -> String {
    if args.is_empty() {
        program.to_string()
    } else {
        format!("{} {}", program, args.join(" "))
    }
}
