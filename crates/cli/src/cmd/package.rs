//! Implementation of the `package` command.

use std::path::Path;

use anyhow::{Context, Result};

use forc_buildpack_lib::package::{PackageOptions, package};

use crate::output;

/// Lay out a runnable buildpack in `destination` from the descriptor in `source`.
///
/// The running executable is shipped as `bin/forc-buildpack`, with
/// `bin/detect` and `bin/build` pointing at it. Every dependency hash is
/// pinned; `offline` also bundles the artifacts.
pub fn cmd_package(destination: &Path, source: Option<&Path>, offline: bool) -> Result<()> {
  let source_dir = match source {
    Some(dir) => dir.to_path_buf(),
    None => std::env::current_dir().context("Failed to read working directory")?,
  };
  let binary = std::env::current_exe().context("Failed to locate executable")?;

  let packaged = package(&PackageOptions {
    source_dir,
    binary,
    destination: destination.to_path_buf(),
    download_dir: std::env::temp_dir().join("forc-buildpack"),
    offline,
  })
  .context("Packaging failed")?;

  for dependency in &packaged {
    output::print_info(&format!(
      "{} {} sha256:{}",
      dependency.id, dependency.version, dependency.sha256
    ));
  }
  output::print_success(&format!("Packaged buildpack into {}", destination.display()));
  Ok(())
}
