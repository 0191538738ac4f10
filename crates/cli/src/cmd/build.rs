//! Implementation of the `build` phase.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};

use forc_buildpack_lib::build::BuildContext;
use forc_buildpack_lib::lifecycle::run_build;

use super::{application_dir, buildpack_dir};
use crate::output;

/// Execute the build phase.
///
/// Loads `buildpack.toml` and the buildpack plan, prints the buildpack title,
/// then contributes every layer the plan calls for.
pub fn cmd_build(layers: &Path, platform: &Path, plan: &Path) -> Result<()> {
  let environment: BTreeMap<String, String> = std::env::vars().collect();
  let context = BuildContext::load(
    &application_dir()?,
    &buildpack_dir()?,
    layers,
    platform,
    plan,
    environment,
  )
  .context("Failed to load build context")?;

  output::print_title(&context.buildpack.title(), context.buildpack.info.homepage.as_deref());

  let contributed = run_build(&context).context("Build failed")?;

  if contributed.is_empty() {
    output::print_info("No layers contributed");
  } else {
    output::print_success(&format!("Contributed {}", contributed.join(", ")));
  }
  Ok(())
}
