//! The CNB `detect` and `build` entry points.
//!
//! These wire the pure phases ([`detect`](crate::detect::detect),
//! [`build`](crate::build::build)) to the files the lifecycle exchanges with a
//! buildpack: the build plan written by detect, and the layer directories,
//! layer TOML and `launch.toml` written by build.

use std::path::Path;

use thiserror::Error;
use tracing::{debug, info};

use crate::build::{self, BuildContext, BuildError, ContextError, ContributeError};
use crate::detect::{self, DetectResult};
use crate::launch::{Launch, LaunchError};
use crate::layer::LayerError;
use crate::plan::PlanError;

#[derive(Debug, Error)]
pub enum LifecycleError {
  #[error(transparent)]
  Context(#[from] ContextError),

  #[error("unable to write build plan: {0}")]
  Plan(#[from] PlanError),

  #[error(transparent)]
  Build(#[from] BuildError),

  #[error(transparent)]
  Layer(#[from] LayerError),

  #[error("unable to contribute layer {layer}: {source}")]
  Contribute {
    layer: String,
    #[source]
    source: ContributeError,
  },

  #[error("unable to write launch metadata: {0}")]
  Launch(#[from] LaunchError),
}

/// Run detection against `application_dir`, writing the build plan to
/// `plan_path` when it passes.
pub fn run_detect(application_dir: &Path, plan_path: &Path) -> Result<DetectResult, LifecycleError> {
  let result = detect::detect(application_dir);
  if let DetectResult::Pass(plan) = &result {
    plan.write(plan_path)?;
    debug!(path = %plan_path.display(), "wrote build plan");
  }
  Ok(result)
}

/// Run the build phase and persist every contributed layer.
///
/// Returns the names of the contributed layers.
pub fn run_build(context: &BuildContext) -> Result<Vec<String>, LifecycleError> {
  let result = build::build(context)?;

  let mut contributed = Vec::with_capacity(result.layers.len());
  for contributor in &result.layers {
    let name = contributor.name().to_string();
    let layer = context.layers.layer(&name)?;
    let layer = contributor
      .contribute(layer)
      .map_err(|source| LifecycleError::Contribute {
        layer: name.clone(),
        source,
      })?;
    context.layers.write(&layer)?;
    info!(layer = %name, path = %layer.path.display(), "contributed layer");
    contributed.push(name);
  }

  if !result.processes.is_empty() {
    let path = context.layers.path.join("launch.toml");
    Launch {
      processes: result.processes,
    }
    .write(&path)?;
    info!(path = %path.display(), "wrote launch metadata");
  }

  Ok(contributed)
}

#[cfg(test)]
mod tests {
  use std::collections::BTreeMap;
  use std::fs;

  use super::*;
  use crate::layer::LayerContentMetadata;
  use crate::plan::BuildPlan;
  use crate::util::testutil;
  use serial_test::serial;
  use tempfile::TempDir;

  #[test]
  fn run_detect_writes_plan_on_pass() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("Forc.toml"), "").unwrap();
    let plan_path = temp.path().join("plan.toml");

    let result = run_detect(temp.path(), &plan_path).unwrap();

    assert!(matches!(result, DetectResult::Pass(_)));
    let written: BuildPlan = toml::from_str(&fs::read_to_string(&plan_path).unwrap()).unwrap();
    assert_eq!(written, BuildPlan::provide_and_require("forc"));
  }

  #[test]
  fn run_detect_fail_writes_nothing() {
    let temp = TempDir::new().unwrap();
    let plan_path = temp.path().join("plan.toml");

    assert_eq!(run_detect(temp.path(), &plan_path).unwrap(), DetectResult::Fail);
    assert!(!plan_path.exists());
  }

  fn context(temp: &TempDir, plan: &str, env: &[(&str, &str)]) -> BuildContext {
    let app = temp.path().join("app");
    fs::create_dir_all(&app).unwrap();
    fs::write(app.join("Forc.toml"), "[project]\nname = \"counter\"\n").unwrap();
    let layers = temp.path().join("layers");
    fs::create_dir_all(&layers).unwrap();
    testutil::write_fake_forc_buildpack(&temp.path().join("buildpack"), temp.path());
    let plan_path = temp.path().join("plan.toml");
    fs::write(&plan_path, plan).unwrap();

    let mut context = BuildContext::load(
      &app,
      &temp.path().join("buildpack"),
      &layers,
      &temp.path().join("platform"),
      &plan_path,
      env.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect::<BTreeMap<_, _>>(),
    )
    .unwrap();
    context.download_dir = temp.path().join("downloads");
    context
  }

  #[test]
  fn run_build_without_entry_contributes_nothing() {
    let temp = TempDir::new().unwrap();
    let ctx = context(&temp, "", &[]);

    let contributed = run_build(&ctx).unwrap();

    assert!(contributed.is_empty());
    assert_eq!(fs::read_dir(&ctx.layers.path).unwrap().count(), 0);
  }

  #[test]
  #[serial]
  #[cfg(unix)]
  fn run_build_contributes_forc_layer() {
    let temp = TempDir::new().unwrap();
    let ctx = context(
      &temp,
      "[[entries]]\nname = \"forc\"\n",
      &[("BP_ENABLE_FORC_DEPLOY", "true")],
    );
    let path = std::env::var("PATH").unwrap_or_default();

    let contributed = temp_env::with_var("PATH", Some(path), || run_build(&ctx)).unwrap();

    assert_eq!(contributed, vec!["forc"]);
    let layer = ctx.layers.path.join("forc");
    assert!(layer.join("bin/forc").is_file());
    assert_eq!(
      fs::read_to_string(ctx.application_dir.join("out/release/contract.bin")).unwrap(),
      "built\n"
    );
    assert!(layer.join("fuel/wallets/.wallet").is_file());

    let metadata: LayerContentMetadata =
      toml::from_str(&fs::read_to_string(ctx.layers.path.join("forc.toml")).unwrap()).unwrap();
    assert!(metadata.types.launch);
    assert!(metadata.types.cache);
    assert_eq!(
      fs::read_to_string(layer.join("env.launch/HOME.default")).unwrap(),
      layer.join("fuel").to_string_lossy()
    );

    let launch: Launch = toml::from_str(&fs::read_to_string(ctx.layers.path.join("launch.toml")).unwrap()).unwrap();
    assert_eq!(launch.processes.len(), 1);
    assert_eq!(launch.processes[0].command, vec!["forc"]);
  }

  #[test]
  #[serial]
  #[cfg(unix)]
  fn run_build_replaces_stale_layer() {
    let temp = TempDir::new().unwrap();
    let ctx = context(&temp, "[[entries]]\nname = \"forc\"\n", &[]);
    let stale = ctx.layers.path.join("forc/stale");
    fs::create_dir_all(stale.parent().unwrap()).unwrap();
    fs::write(&stale, "old").unwrap();
    let path = std::env::var("PATH").unwrap_or_default();

    temp_env::with_var("PATH", Some(path), || run_build(&ctx)).unwrap();

    assert!(!stale.exists());
    assert!(!ctx.layers.path.join("launch.toml").exists());
  }

  #[test]
  #[serial]
  #[cfg(unix)]
  fn run_build_reports_failing_layer() {
    let temp = TempDir::new().unwrap();
    let ctx = context(&temp, "[[entries]]\nname = \"forc\"\n", &[]);
    fs::write(ctx.application_dir.join("out"), "not a directory").unwrap();
    let path = std::env::var("PATH").unwrap_or_default();

    let err = temp_env::with_var("PATH", Some(path), || run_build(&ctx)).unwrap_err();

    assert!(matches!(err, LifecycleError::Contribute { ref layer, .. } if layer == "forc"));
    assert!(err.to_string().starts_with("unable to contribute layer forc"));
  }
}
