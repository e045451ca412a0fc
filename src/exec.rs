//! External tool execution with a testable seam.
//!
//! Every ffmpeg/ffprobe invocation goes through the `CommandExecutor` trait so
//! the analysis adapters and pipeline stations can be exercised without the
//! real tools installed.

use crate::error::{BookcastError, Result};
use std::path::Path;
use std::process::Command;
use tracing::debug;

/// Captured output of a successful command.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Output with only stdout populated.
    pub fn stdout(text: impl Into<String>) -> Self {
        Self {
            stdout: text.into(),
            stderr: String::new(),
        }
    }

    /// Output with only stderr populated (ffmpeg logs filters there).
    pub fn stderr(text: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: text.into(),
        }
    }
}

/// Trait for executing system commands.
///
/// Object-safe, Send + Sync for use from pipeline threads.
pub trait CommandExecutor: Send + Sync {
    /// Execute a command with arguments.
    ///
    /// Returns the captured output when the command exits successfully.
    /// A non-zero exit is a `ToolFailed` error carrying the command line and
    /// the combined output.
    fn execute(&self, command: &str, args: &[&str]) -> Result<CommandOutput>;
}

/// Production command executor using std::process::Command.
#[derive(Debug, Clone, Default)]
pub struct SystemCommandExecutor;

impl SystemCommandExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl CommandExecutor for SystemCommandExecutor {
    fn execute(&self, command: &str, args: &[&str]) -> Result<CommandOutput> {
        debug!(command = %render_command(command, args), "running");

        let output = Command::new(command).args(args).output().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BookcastError::ToolNotFound {
                    tool: command.to_string(),
                }
            } else {
                BookcastError::ToolFailed {
                    command: render_command(command, args),
                    output: e.to_string(),
                }
            }
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            return Err(BookcastError::ToolFailed {
                command: render_command(command, args),
                output: format!("{}: {}{}", output.status, stdout, stderr),
            });
        }

        Ok(CommandOutput { stdout, stderr })
    }
}

/// Render a command line for logs and error messages.
///
/// Arguments containing whitespace or quotes are single-quoted.
pub fn render_command(command: &str, args: &[&str]) -> String {
    let mut line = command.to_string();
    for arg in args {
        line.push(' ');
        if arg.is_empty() || arg.contains(|c: char| c.is_whitespace() || c == '\'' || c == '"') {
            line.push('\'');
            line.push_str(&arg.replace('\'', r"'\''"));
            line.push('\'');
        } else {
            line.push_str(arg);
        }
    }
    line
}

/// Borrow a path as a command argument.
///
/// ffmpeg arguments are passed as UTF-8; a path that is not valid UTF-8 is
/// rejected instead of being silently mangled.
pub fn path_arg(path: &Path) -> Result<&str> {
    path.to_str()
        .ok_or_else(|| BookcastError::Other(format!("Path is not valid UTF-8: {}", path.display())))
}
