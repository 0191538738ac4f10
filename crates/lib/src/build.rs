//! Build phase orchestration.
//!
//! [`build`] decides what this buildpack contributes: if the `forc` plan entry
//! is present it resolves configuration and the matching dependency, and
//! returns the layer contributors and launch processes. Contributing the
//! layers is left to the lifecycle driver, so `build` itself touches nothing
//! on disk except creating the download directory.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::buildpack::{Buildpack, BuildpackError};
use crate::config::{ConfigError, ConfigurationResolver};
use crate::consts::{BP_FORC_PLATFORM, BP_FORC_VERSION, PLAN_ENTRY_FORC};
use crate::dependency::{DependencyCache, DependencyError, DependencyResolver};
use crate::forc::{self, Forc};
use crate::launch::Process;
use crate::layer::{Layer, Layers};
use crate::plan::{BuildpackPlan, PlanEntryResolver, PlanError};
use crate::platform;

/// Errors that abort the build phase before any layer is contributed.
#[derive(Debug, Error)]
pub enum BuildError {
  #[error("unable to resolve {PLAN_ENTRY_FORC} plan entry: {0}")]
  PlanEntry(#[source] PlanError),

  #[error("unable to create configuration resolver: {0}")]
  ConfigurationResolver(#[from] ConfigError),

  #[error("unable to create dependency cache: {0}")]
  DependencyCache(#[source] DependencyError),

  #[error("unable to find dependency: {0}")]
  Dependency(#[source] DependencyError),
}

/// Failure reported by a [`LayerContributor`]; each contributor keeps its own error type behind it.
pub type ContributeError = Box<dyn std::error::Error + Send + Sync>;

/// Produces the content of one layer.
pub trait LayerContributor {
  /// Layer name, used as the directory name under the layers dir.
  fn name(&self) -> &str;

  /// Populate `layer` (an empty directory) and return it with types, metadata and env set.
  fn contribute(&self, layer: Layer) -> Result<Layer, ContributeError>;
}

/// Everything the build phase is given by the lifecycle.
#[derive(Debug, Clone)]
pub struct BuildContext {
  pub application_dir: PathBuf,
  pub buildpack: Buildpack,
  pub layers: Layers,
  pub platform_dir: PathBuf,
  pub plan: BuildpackPlan,
  /// `CNB_STACK_ID`, when the platform provides one.
  pub stack_id: Option<String>,
  /// Build environment snapshot used to resolve `BP_*` configuration.
  pub environment: BTreeMap<String, String>,
  /// Where downloaded dependencies are stored.
  pub download_dir: PathBuf,
}

/// Errors loading a [`BuildContext`] from the lifecycle's files.
#[derive(Debug, Error)]
pub enum ContextError {
  #[error(transparent)]
  Buildpack(#[from] BuildpackError),

  #[error(transparent)]
  Plan(#[from] PlanError),
}

impl BuildContext {
  /// Read `buildpack.toml` and the buildpack plan and assemble the context.
  ///
  /// `environment` is the build environment; `CNB_STACK_ID` is taken from it.
  pub fn load(
    application_dir: &Path,
    buildpack_dir: &Path,
    layers_dir: &Path,
    platform_dir: &Path,
    plan_path: &Path,
    environment: BTreeMap<String, String>,
  ) -> Result<Self, ContextError> {
    let buildpack = Buildpack::load(buildpack_dir)?;
    let plan = BuildpackPlan::load(plan_path)?;
    Ok(Self {
      application_dir: application_dir.to_path_buf(),
      buildpack,
      layers: Layers::new(layers_dir),
      platform_dir: platform_dir.to_path_buf(),
      plan,
      stack_id: environment.get("CNB_STACK_ID").cloned(),
      environment,
      download_dir: std::env::temp_dir().join("forc-buildpack"),
    })
  }
}

/// Result of the build phase: layers to contribute and processes to declare.
#[derive(Default)]
pub struct BuildResult {
  pub layers: Vec<Box<dyn LayerContributor>>,
  pub processes: Vec<Process>,
}

impl fmt::Debug for BuildResult {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("BuildResult")
      .field("layers", &self.layers.iter().map(|l| l.name()).collect::<Vec<_>>())
      .field("processes", &self.processes)
      .finish()
  }
}

/// Run the build phase decision logic.
///
/// An absent `forc` plan entry yields an empty result and no side effects.
pub fn build(context: &BuildContext) -> Result<BuildResult, BuildError> {
  let mut result = BuildResult::default();

  let entry = PlanEntryResolver::new(&context.plan)
    .resolve(PLAN_ENTRY_FORC)
    .map_err(BuildError::PlanEntry)?;
  if entry.is_none() {
    debug!("no {} plan entry, nothing to contribute", PLAN_ENTRY_FORC);
    return Ok(result);
  }

  let config = ConfigurationResolver::new(&context.buildpack.metadata.configurations, context.environment.clone())?;

  let cache = DependencyCache::new(&context.buildpack.path, context.download_dir.clone())
    .map_err(BuildError::DependencyCache)?;

  let resolver = DependencyResolver::new(
    context.buildpack.metadata.dependencies.clone(),
    context.stack_id.clone(),
  );

  let (version, _) = config.resolve(BP_FORC_VERSION);
  let (mut release_platform, _) = config.resolve(BP_FORC_PLATFORM);
  if release_platform.is_empty() {
    release_platform = platform::current_identifier().unwrap_or_default();
  }
  let dependency = resolver
    .resolve(&format!("{}-{}", PLAN_ENTRY_FORC, release_platform), &version)
    .map_err(BuildError::Dependency)?;
  info!(id = %dependency.id, version = %dependency.version, "resolved dependency");

  result.processes = forc::build_process_types(&config);
  result.layers.push(Box::new(Forc::new(
    dependency,
    cache,
    config,
    context.application_dir.clone(),
  )));

  Ok(result)
}
