//! Implementation of the `detect` phase.

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing::debug;

use forc_buildpack_lib::consts::DETECT_FAIL_EXIT_CODE;
use forc_buildpack_lib::detect::DetectResult;
use forc_buildpack_lib::lifecycle::run_detect;

use super::application_dir;

/// Execute the detect phase.
///
/// Exits 0 after writing the build plan when the application has a
/// `Forc.toml`, and with the lifecycle's "fail" code otherwise.
pub fn cmd_detect(platform: &Path, plan: &Path) -> Result<ExitCode> {
  let app = application_dir()?;
  debug!(application = %app.display(), platform = %platform.display(), "detecting");

  match run_detect(&app, plan).context("Detect failed")? {
    DetectResult::Pass(_) => Ok(ExitCode::SUCCESS),
    DetectResult::Fail => Ok(ExitCode::from(DETECT_FAIL_EXIT_CODE as u8)),
  }
}
