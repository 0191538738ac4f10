mod build;
mod detect;
mod package;

pub use build::cmd_build;
pub use detect::cmd_detect;
pub use package::cmd_package;

use std::path::PathBuf;

use anyhow::{Context, Result};

/// The buildpack root: `CNB_BUILDPACK_DIR`, or the parent of the directory
/// holding this executable (`<buildpack>/bin/<exe>`).
fn buildpack_dir() -> Result<PathBuf> {
  if let Some(dir) = std::env::var_os("CNB_BUILDPACK_DIR").filter(|d| !d.is_empty()) {
    return Ok(PathBuf::from(dir));
  }
  let exe = std::env::current_exe().context("Failed to locate executable")?;
  exe
    .parent()
    .and_then(|bin| bin.parent())
    .map(PathBuf::from)
    .with_context(|| format!("Failed to derive buildpack directory from {}", exe.display()))
}

fn application_dir() -> Result<PathBuf> {
  std::env::current_dir().context("Failed to read working directory")
}
