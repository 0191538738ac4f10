//! Environment handling: layer env files and process-level PATH updates.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// How a layer environment variable is applied by the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EnvOp {
  /// Applied only if the variable is not already set.
  Default,
}

impl EnvOp {
  /// File suffix understood by the lifecycle (`<NAME>.<suffix>`).
  pub fn suffix(&self) -> &'static str {
    match self {
      Self::Default => "default",
    }
  }
}

/// A set of environment variable bindings written as `env.*` files in a layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
  entries: BTreeMap<(String, EnvOp), String>,
}

impl Environment {
  pub fn new() -> Self {
    Self::default()
  }

  /// Set `name` to `value` unless it is already set downstream.
  pub fn set_default(&mut self, name: &str, value: impl AsRef<Path>) {
    self
      .entries
      .insert((name.to_string(), EnvOp::Default), value.as_ref().to_string_lossy().into_owned());
  }

  pub fn get(&self, name: &str, op: EnvOp) -> Option<&str> {
    self.entries.get(&(name.to_string(), op)).map(String::as_str)
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  /// Write one file per binding into `dir` (e.g. `<layer>/env.launch`).
  pub fn write(&self, dir: &Path) -> std::io::Result<()> {
    if self.entries.is_empty() {
      return Ok(());
    }
    fs::create_dir_all(dir)?;
    for ((name, op), value) in &self.entries {
      fs::write(dir.join(format!("{}.{}", name, op.suffix())), value)?;
    }
    Ok(())
  }
}

/// Return the current value of `name` with `values` appended, joined by `delimiter`.
///
/// An unset or empty variable yields just the joined values.
pub fn append_to_env_var(name: &str, delimiter: &str, values: &[&str]) -> String {
  let appended = values.join(delimiter);
  match std::env::var(name) {
    Ok(existing) if !existing.is_empty() => format!("{}{}{}", existing, delimiter, appended),
    _ => appended,
  }
}

/// Append `dir` to this process's `PATH` so later child processes can find binaries in it.
pub fn append_to_path(dir: &Path) {
  let dir = dir.to_string_lossy();
  let path = append_to_env_var("PATH", ":", &[dir.as_ref()]);
  // SAFETY: the buildpack runs its build on a single thread; nothing reads the
  // environment concurrently.
  unsafe { std::env::set_var("PATH", path) };
}
