//! Detect phase: does the application look like a Sway project?

use std::path::Path;

use tracing::{debug, info};

use crate::consts::{FORC_MANIFEST, PLAN_ENTRY_FORC};
use crate::plan::BuildPlan;

/// Outcome of detection.
#[derive(Debug, Clone, PartialEq)]
pub enum DetectResult {
  /// The buildpack applies; the plan is written for the lifecycle.
  Pass(BuildPlan),
  /// The buildpack does not apply to this application.
  Fail,
}

/// Pass when `Forc.toml` exists at the root of `application_dir`.
///
/// A passing result provides and requires the `forc` plan entry.
pub fn detect(application_dir: &Path) -> DetectResult {
  let manifest = application_dir.join(FORC_MANIFEST);
  if !manifest.is_file() {
    debug!(path = %manifest.display(), "no forc manifest");
    return DetectResult::Fail;
  }
  info!(path = %manifest.display(), "found forc manifest");
  DetectResult::Pass(BuildPlan::provide_and_require(PLAN_ENTRY_FORC))
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::fs;
  use tempfile::TempDir;

  #[test]
  fn passes_with_manifest() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("Forc.toml"), "[project]\nname = \"counter\"\n").unwrap();

    let DetectResult::Pass(plan) = detect(temp.path()) else {
      panic!("expected detection to pass");
    };
    assert_eq!(plan.provides.len(), 1);
    assert_eq!(plan.provides[0].name, "forc");
    assert_eq!(plan.requires.len(), 1);
    assert_eq!(plan.requires[0].name, "forc");
  }

  #[test]
  fn fails_without_manifest() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("Cargo.toml"), "[package]\n").unwrap();

    assert_eq!(detect(temp.path()), DetectResult::Fail);
  }

  #[test]
  fn nested_manifest_does_not_count() {
    let temp = TempDir::new().unwrap();
    fs::create_dir_all(temp.path().join("contracts/counter")).unwrap();
    fs::write(temp.path().join("contracts/counter/Forc.toml"), "").unwrap();

    assert_eq!(detect(temp.path()), DetectResult::Fail);
  }

  #[test]
  fn manifest_directory_does_not_count() {
    let temp = TempDir::new().unwrap();
    fs::create_dir_all(temp.path().join("Forc.toml")).unwrap();

    assert_eq!(detect(temp.path()), DetectResult::Fail);
  }
}
