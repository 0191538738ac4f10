//! Child process execution.
//!
//! The [`Executor`] trait is the seam between layer contribution and the
//! installed toolchain; [`CommandExecutor`] runs real processes.

use std::path::PathBuf;
use std::process::Command;

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ExecError {
  #[error("failed to spawn {command}: {source}")]
  Spawn {
    command: String,
    #[source]
    source: std::io::Error,
  },

  #[error("{output}: command {command} failed with exit code {code:?}")]
  Failed {
    command: String,
    code: Option<i32>,
    output: String,
  },
}

/// A command to run, with its arguments and optional working directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Execution {
  pub command: String,
  pub args: Vec<String>,
  pub dir: Option<PathBuf>,
}

impl Execution {
  pub fn new<I, S>(command: &str, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      command: command.to_string(),
      args: args.into_iter().map(Into::into).collect(),
      ..Default::default()
    }
  }

  pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.dir = Some(dir.into());
    self
  }

  /// The command line as a single string, for messages.
  pub fn display(&self) -> String {
    std::iter::once(self.command.as_str())
      .chain(self.args.iter().map(String::as_str))
      .collect::<Vec<_>>()
      .join(" ")
  }
}

/// Runs an [`Execution`] and returns its captured output.
pub trait Executor {
  /// Run to completion. Returns stdout followed by stderr on success.
  fn execute(&self, execution: &Execution) -> Result<String, ExecError>;
}

/// Runs executions as real child processes, inheriting the current environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandExecutor;

impl Executor for CommandExecutor {
  fn execute(&self, execution: &Execution) -> Result<String, ExecError> {
    let mut command = Command::new(&execution.command);
    command.args(&execution.args);
    if let Some(dir) = &execution.dir {
      command.current_dir(dir);
    }

    debug!(command = %execution.display(), dir = ?execution.dir, "spawning process");

    let output = command.output().map_err(|source| ExecError::Spawn {
      command: execution.command.clone(),
      source,
    })?;

    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));

    if !output.status.success() {
      return Err(ExecError::Failed {
        command: execution.display(),
        code: output.status.code(),
        output: combined,
      });
    }

    if !combined.is_empty() {
      debug!(output = %combined.trim_end(), "command output");
    }

    Ok(combined)
  }
}
