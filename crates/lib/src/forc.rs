//! The `forc` layer: toolchain install, contract build and deploy wallet.
//!
//! Contribution runs these steps in order against a fresh layer:
//! 1. expand the release archive into `<layer>/bin` and mark `forc` executable
//! 2. append `<layer>/bin` to this process's `PATH`
//! 3. query `forc --version`
//! 4. write the deploy wallet to `<layer>/fuel/wallets/.wallet`
//! 5. run `forc build --release` in the application directory
//! 6. copy fetched git dependencies into `<layer>/fuel/.forc`
//! 7. set `WALLET_PATH`, `FUEL_HOME` and `HOME` launch defaults

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use crate::archive::{self, ArchiveError};
use crate::build::{ContributeError, LayerContributor};
use crate::config::ConfigurationResolver;
use crate::consts::{ARCHIVE_STRIP_COMPONENTS, BP_ENABLE_FORC_DEPLOY, FORC_DEPENDENCY_SOURCE, PLAN_ENTRY_FORC};
use crate::copy::{self, CopyError, CopyPolicy};
use crate::dependency::{BuildpackDependency, DependencyCache, DependencyError};
use crate::env;
use crate::exec::{CommandExecutor, ExecError, Execution, Executor};
use crate::launch::Process;
use crate::layer::{Layer, LayerTypes};
use crate::wallet::{self, StaticWallet, WalletError, WalletProvider};

/// Errors that can occur while contributing the forc layer.
#[derive(Debug, Error)]
pub enum ForcError {
  #[error("unable to obtain dependency: {0}")]
  Artifact(#[from] DependencyError),

  #[error("unable to expand {}: {source}", archive.display())]
  Expand {
    archive: PathBuf,
    #[source]
    source: ArchiveError,
  },

  #[error("unable to chmod {}: {source}", path.display())]
  Chmod {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("unable to get {PLAN_ENTRY_FORC} version: {0}")]
  Version(#[source] ExecError),

  #[error("unrecognized {PLAN_ENTRY_FORC} version output: {0:?}")]
  UnrecognizedVersion(String),

  #[error("unable to initialize deploy wallet: {0}")]
  Wallet(#[from] WalletError),

  #[error("unable to build contract: {0}")]
  BuildContract(#[source] ExecError),

  #[error("unable to copy dependencies: {0}")]
  CopyDependencies(#[source] CopyError),
}

/// Contributes the forc toolchain layer.
pub struct Forc {
  dependency: BuildpackDependency,
  cache: DependencyCache,
  config: ConfigurationResolver,
  application_dir: PathBuf,
  executor: Box<dyn Executor>,
  wallet: Box<dyn WalletProvider>,
  dependency_source: PathBuf,
  copy_policy: CopyPolicy,
}

impl Forc {
  pub fn new(
    dependency: BuildpackDependency,
    cache: DependencyCache,
    config: ConfigurationResolver,
    application_dir: PathBuf,
  ) -> Self {
    Self {
      dependency,
      cache,
      config,
      application_dir,
      executor: Box::new(CommandExecutor),
      wallet: Box::new(StaticWallet),
      dependency_source: PathBuf::from(FORC_DEPENDENCY_SOURCE),
      copy_policy: CopyPolicy::BestEffort,
    }
  }

  pub fn with_executor(mut self, executor: Box<dyn Executor>) -> Self {
    self.executor = executor;
    self
  }

  pub fn with_wallet_provider(mut self, wallet: Box<dyn WalletProvider>) -> Self {
    self.wallet = wallet;
    self
  }

  pub fn with_dependency_source(mut self, path: impl Into<PathBuf>) -> Self {
    self.dependency_source = path.into();
    self
  }

  pub fn with_copy_policy(mut self, policy: CopyPolicy) -> Self {
    self.copy_policy = policy;
    self
  }

  pub fn dependency(&self) -> &BuildpackDependency {
    &self.dependency
  }

  fn version(&self) -> Result<String, ForcError> {
    let output = self
      .executor
      .execute(&Execution::new(PLAN_ENTRY_FORC, ["--version"]))
      .map_err(ForcError::Version)?;
    parse_version(&output)
      .map(String::from)
      .ok_or_else(|| ForcError::UnrecognizedVersion(output.trim().to_string()))
  }

  fn build_contract(&self) -> Result<(), ForcError> {
    let execution = Execution::new(PLAN_ENTRY_FORC, ["build", "--release"]).in_dir(&self.application_dir);
    self
      .executor
      .execute(&execution)
      .map_err(ForcError::BuildContract)?;
    info!("built contract");
    Ok(())
  }

  fn copy_dependencies(&self, dest: &Path) -> Result<(), ForcError> {
    match copy::copy_dir(&self.dependency_source, dest, self.copy_policy) {
      Ok(report) => {
        info!(
          from = %self.dependency_source.display(),
          to = %dest.display(),
          files = report.files,
          skipped = report.skipped.len(),
          "copied forc dependencies"
        );
        Ok(())
      }
      Err(e) if self.copy_policy == CopyPolicy::BestEffort => {
        warn!(from = %self.dependency_source.display(), error = %e, "unable to copy forc dependencies");
        Ok(())
      }
      Err(e) => Err(ForcError::CopyDependencies(e)),
    }
  }
}

impl LayerContributor for Forc {
  fn name(&self) -> &str {
    PLAN_ENTRY_FORC
  }

  fn contribute(&self, layer: Layer) -> Result<Layer, ContributeError> {
    Ok(self.install(layer)?)
  }
}

impl Forc {
  /// Run every contribution step against `layer`.
  pub fn install(&self, mut layer: Layer) -> Result<Layer, ForcError> {
    layer.types = LayerTypes {
      build: false,
      cache: true,
      launch: true,
    };
    layer
      .metadata
      .insert("dependency".into(), toml::Value::Table(self.dependency.layer_metadata()));

    info!(
      name = %self.dependency.name,
      version = %self.dependency.version,
      uri = %self.dependency.uri,
      "contributing dependency"
    );
    let artifact = self.cache.artifact(&self.dependency)?;

    let bin = layer.path.join("bin");
    info!(archive = %artifact.display(), dest = %bin.display(), "expanding");
    archive::extract(&artifact, &bin, ARCHIVE_STRIP_COMPONENTS).map_err(|source| ForcError::Expand {
      archive: artifact.clone(),
      source,
    })?;

    let file = bin.join(PLAN_ENTRY_FORC);
    info!(path = %file.display(), "setting executable");
    set_executable(&file).map_err(|source| ForcError::Chmod { path: file, source })?;

    info!(dir = %bin.display(), "adding to PATH");
    env::append_to_path(&bin);

    let version = self.version()?;
    info!(version = %version, "checked {} version", PLAN_ENTRY_FORC);

    let fuel_home = layer.path.join("fuel");
    let wallet_dir = fuel_home.join("wallets");
    wallet::initialize_wallet(self.wallet.as_ref(), &self.config, &wallet_dir)?;

    self.build_contract()?;

    self.copy_dependencies(&fuel_home.join(".forc"))?;

    layer.launch_environment.set_default("WALLET_PATH", &wallet_dir);
    layer.launch_environment.set_default("FUEL_HOME", &fuel_home);
    layer.launch_environment.set_default("HOME", &fuel_home);
    Ok(layer)
  }
}

#[cfg(unix)]
fn set_executable(path: &Path) -> std::io::Result<()> {
  use std::os::unix::fs::PermissionsExt;
  fs::set_permissions(path, fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn set_executable(path: &Path) -> std::io::Result<()> {
  fs::metadata(path).map(|_| ())
}

/// Take the version from `forc --version` output (`forc 0.49.1` -> `0.49.1`).
pub fn parse_version(output: &str) -> Option<&str> {
  output.split_whitespace().nth(1)
}

/// Launch processes for the image: `forc deploy` when deploys are enabled, otherwise none.
pub fn build_process_types(config: &ConfigurationResolver) -> Vec<Process> {
  if !config.resolve_bool(BP_ENABLE_FORC_DEPLOY) {
    return Vec::new();
  }
  vec![Process {
    type_: PLAN_ENTRY_FORC.to_string(),
    command: vec![PLAN_ENTRY_FORC.to_string()],
    args: ["deploy", "--testnet", "--default-signer"].map(String::from).to_vec(),
    default: true,
  }]
}

#[cfg(test)]
mod tests {
  use std::cell::RefCell;
  use std::rc::Rc;

  use super::*;
  use crate::env::EnvOp;
  use crate::layer::Layers;
  use crate::util::testutil;
  use crate::wallet::STATIC_WALLET;
  use serial_test::serial;
  use tempfile::TempDir;

  /// Executor that answers forc invocations without running anything.
  struct FakeExecutor {
    version_output: String,
    build_failure: Option<String>,
    calls: Rc<RefCell<Vec<Execution>>>,
  }

  impl Executor for FakeExecutor {
    fn execute(&self, execution: &Execution) -> Result<String, ExecError> {
      self.calls.borrow_mut().push(execution.clone());
      match execution.args.first().map(String::as_str) {
        Some("--version") => Ok(self.version_output.clone()),
        Some("build") => match &self.build_failure {
          Some(output) => Err(ExecError::Failed {
            command: execution.display(),
            code: Some(1),
            output: output.clone(),
          }),
          None => Ok(String::new()),
        },
        _ => Ok(String::new()),
      }
    }
  }

  struct Fixture {
    temp: TempDir,
    forc: Forc,
    calls: Rc<RefCell<Vec<Execution>>>,
  }

  fn fixture(version_output: &str, build_failure: Option<&str>) -> Fixture {
    let temp = TempDir::new().unwrap();
    let buildpack_dir = temp.path().join("buildpack");
    let app_dir = temp.path().join("app");
    fs::create_dir_all(&app_dir).unwrap();

    let buildpack = testutil::write_fake_forc_buildpack(&buildpack_dir, temp.path());
    let dependency = buildpack.metadata.dependencies[0].clone();
    let cache = DependencyCache::new(&buildpack_dir, temp.path().join("downloads")).unwrap();
    let config = ConfigurationResolver::new(&buildpack.metadata.configurations, std::iter::empty::<(String, String)>())
      .unwrap();

    let calls = Rc::new(RefCell::new(Vec::new()));
    let forc = Forc::new(dependency, cache, config, app_dir)
      .with_executor(Box::new(FakeExecutor {
        version_output: version_output.to_string(),
        build_failure: build_failure.map(String::from),
        calls: Rc::clone(&calls),
      }))
      .with_dependency_source(temp.path().join("home/.forc"));

    Fixture { temp, forc, calls }
  }

  fn contribute(fixture: &Fixture) -> Result<Layer, ForcError> {
    let layers = Layers::new(fixture.temp.path().join("layers"));
    let layer = layers.layer(PLAN_ENTRY_FORC).unwrap();
    temp_env::with_var("PATH", Some("/usr/bin:/bin"), || fixture.forc.install(layer))
  }

  #[test]
  fn parse_version_takes_second_token() {
    assert_eq!(parse_version("forc 0.49.1"), Some("0.49.1"));
    assert_eq!(parse_version("  forc 0.49.1\n"), Some("0.49.1"));
  }

  #[test]
  fn parse_version_without_second_token() {
    assert_eq!(parse_version("forc"), None);
    assert_eq!(parse_version(""), None);
  }

  #[test]
  fn process_types_when_deploy_enabled() {
    let config = ConfigurationResolver::new(&[], [(BP_ENABLE_FORC_DEPLOY, "true")]).unwrap();

    let processes = build_process_types(&config);

    assert_eq!(processes.len(), 1);
    assert_eq!(processes[0].type_, "forc");
    assert_eq!(processes[0].command, vec!["forc"]);
    assert_eq!(processes[0].args, vec!["deploy", "--testnet", "--default-signer"]);
    assert!(processes[0].default);
  }

  #[test]
  fn process_types_when_deploy_disabled() {
    let config = ConfigurationResolver::new(&[], [(BP_ENABLE_FORC_DEPLOY, "false")]).unwrap();
    assert!(build_process_types(&config).is_empty());

    let config = ConfigurationResolver::new(&[], std::iter::empty::<(String, String)>()).unwrap();
    assert!(build_process_types(&config).is_empty());
  }

  #[test]
  #[serial]
  fn contribute_installs_executable_forc() {
    let fixture = fixture("forc 0.49.1", None);

    let layer = contribute(&fixture).unwrap();

    let forc = layer.path.join("bin/forc");
    assert!(forc.is_file());
    #[cfg(unix)]
    {
      use std::os::unix::fs::PermissionsExt;
      assert_eq!(fs::metadata(&forc).unwrap().permissions().mode() & 0o777, 0o755);
    }
    assert!(layer.types.launch);
    assert!(layer.types.cache);
    assert_eq!(
      layer.metadata["dependency"]["version"].as_str(),
      Some("0.49.1")
    );
  }

  #[test]
  #[serial]
  fn contribute_writes_wallet_and_launch_env() {
    let fixture = fixture("forc 0.49.1", None);

    let layer = contribute(&fixture).unwrap();

    let fuel = layer.path.join("fuel");
    assert_eq!(
      fs::read(fuel.join("wallets/.wallet")).unwrap(),
      STATIC_WALLET.as_bytes()
    );
    let env = &layer.launch_environment;
    assert_eq!(env.len(), 3);
    assert_eq!(
      env.get("WALLET_PATH", EnvOp::Default).map(PathBuf::from),
      Some(fuel.join("wallets"))
    );
    assert_eq!(env.get("FUEL_HOME", EnvOp::Default).map(PathBuf::from), Some(fuel.clone()));
    assert_eq!(env.get("HOME", EnvOp::Default).map(PathBuf::from), Some(fuel));
  }

  #[test]
  #[serial]
  fn contribute_runs_version_then_release_build_in_app_dir() {
    let fixture = fixture("forc 0.49.1", None);

    contribute(&fixture).unwrap();

    let calls = fixture.calls.borrow();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].args, vec!["--version"]);
    assert_eq!(calls[1].args, vec!["build", "--release"]);
    assert_eq!(calls[1].dir, Some(fixture.temp.path().join("app")));
  }

  #[test]
  #[serial]
  fn contribute_copies_dependency_source() {
    let fixture = fixture("forc 0.49.1", None);
    let source = fixture.temp.path().join("home/.forc/git/checkouts");
    fs::create_dir_all(&source).unwrap();
    fs::write(source.join("std.sw"), "library;").unwrap();

    let layer = contribute(&fixture).unwrap();

    assert_eq!(
      fs::read_to_string(layer.path.join("fuel/.forc/git/checkouts/std.sw")).unwrap(),
      "library;"
    );
  }

  #[test]
  #[serial]
  fn contribute_tolerates_missing_dependency_source() {
    let fixture = fixture("forc 0.49.1", None);

    let layer = contribute(&fixture).unwrap();

    assert!(!layer.path.join("fuel/.forc").exists());
  }

  #[test]
  #[serial]
  fn contribute_fail_fast_rejects_missing_dependency_source() {
    let mut fixture = fixture("forc 0.49.1", None);
    fixture.forc = fixture.forc.with_copy_policy(CopyPolicy::FailFast);

    let err = contribute(&fixture).unwrap_err();

    assert!(matches!(err, ForcError::CopyDependencies(_)));
  }

  #[test]
  #[serial]
  fn contribute_build_failure_carries_output() {
    let fixture = fixture("forc 0.49.1", Some("error: could not compile `contract`"));

    let err = contribute(&fixture).unwrap_err();

    assert!(matches!(err, ForcError::BuildContract(_)));
    assert!(err.to_string().contains("could not compile"));
  }

  #[test]
  #[serial]
  fn contribute_unrecognized_version_fails() {
    let fixture = fixture("forc", None);

    let err = contribute(&fixture).unwrap_err();

    assert!(matches!(err, ForcError::UnrecognizedVersion(output) if output == "forc"));
  }

  #[test]
  #[serial]
  fn contributor_error_keeps_forc_cause() {
    let fixture = fixture("forc", None);
    let layers = Layers::new(fixture.temp.path().join("layers"));
    let layer = layers.layer(PLAN_ENTRY_FORC).unwrap();

    let err = temp_env::with_var("PATH", Some("/usr/bin:/bin"), || fixture.forc.contribute(layer)).unwrap_err();

    assert!(matches!(err.downcast_ref::<ForcError>(), Some(ForcError::UnrecognizedVersion(_))));
  }
}
