//! Assemble a buildpack directory the lifecycle can run.
//!
//! The packaged layout is:
//! - `buildpack.toml`, with the `sha256` of every dependency pinned
//! - `bin/forc-buildpack` plus `bin/detect` and `bin/build` pointing at it
//! - `dependencies/<sha256>/<filename>` for every artifact, when offline
//!
//! Dependencies that declare no `sha256` are fetched once here and the hash of
//! what was fetched is written into the packaged descriptor, so builds from the
//! package always verify their artifact and offline packages are found by hash.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::buildpack::BUILDPACK_TOML;
use crate::dependency::cache::{hash_file, url_to_filename};
use crate::dependency::{BuildpackDependency, DependencyCache, DependencyError};

/// File name of the buildpack binary inside `bin/`.
pub const BINARY_NAME: &str = "forc-buildpack";

/// Lifecycle entry points, each dispatched to [`BINARY_NAME`] by its own name.
pub const ENTRY_POINTS: [&str; 2] = ["detect", "build"];

#[derive(Debug, Error)]
pub enum PackageError {
  #[error("unable to read {}: {source}", path.display())]
  Read { path: PathBuf, source: std::io::Error },

  #[error("unable to parse {}: {source}", path.display())]
  Parse { path: PathBuf, source: toml::de::Error },

  #[error("invalid dependency entry {index} in {}: {source}", path.display())]
  Dependency {
    path: PathBuf,
    index: usize,
    #[source]
    source: toml::de::Error,
  },

  #[error("unable to create download directory: {0}")]
  DownloadDir(#[source] DependencyError),

  #[error("unable to obtain dependency {id}: {source}")]
  Artifact {
    id: String,
    #[source]
    source: DependencyError,
  },

  #[error("unable to write {}: {source}", path.display())]
  Write { path: PathBuf, source: std::io::Error },

  #[error("unable to serialize {BUILDPACK_TOML}: {0}")]
  Serialize(#[from] toml::ser::Error),
}

/// What to package and where.
#[derive(Debug, Clone)]
pub struct PackageOptions {
  /// Directory holding the source `buildpack.toml`.
  pub source_dir: PathBuf,
  /// The `forc-buildpack` executable to ship.
  pub binary: PathBuf,
  /// Directory the package is written to.
  pub destination: PathBuf,
  /// Where artifacts are downloaded while packaging.
  pub download_dir: PathBuf,
  /// Bundle every artifact under `dependencies/`.
  pub offline: bool,
}

/// A dependency as it appears in the packaged descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagedDependency {
  pub id: String,
  pub version: String,
  pub sha256: String,
  /// Bundled artifact, for offline packages.
  pub bundled: Option<PathBuf>,
}

/// Write the package described by `options`.
pub fn package(options: &PackageOptions) -> Result<Vec<PackagedDependency>, PackageError> {
  let source = options.source_dir.join(BUILDPACK_TOML);
  let content = fs::read_to_string(&source).map_err(|e| PackageError::Read {
    path: source.clone(),
    source: e,
  })?;
  let mut descriptor: toml::Table = toml::from_str(&content).map_err(|e| PackageError::Parse {
    path: source.clone(),
    source: e,
  })?;

  let cache =
    DependencyCache::new(&options.source_dir, options.download_dir.clone()).map_err(PackageError::DownloadDir)?;

  let mut packaged = Vec::new();
  if let Some(entries) = descriptor
    .get_mut("metadata")
    .and_then(|m| m.get_mut("dependencies"))
    .and_then(|d| d.as_array_mut())
  {
    for (index, entry) in entries.iter_mut().enumerate() {
      let dependency: BuildpackDependency = entry.clone().try_into().map_err(|e| PackageError::Dependency {
        path: source.clone(),
        index,
        source: e,
      })?;
      let result = pin(&cache, &dependency, options)?;
      if let Some(table) = entry.as_table_mut() {
        table.insert("sha256".into(), result.sha256.clone().into());
      }
      packaged.push(result);
    }
  }

  let dest = options.destination.join(BUILDPACK_TOML);
  create_dir(&options.destination)?;
  fs::write(&dest, toml::to_string_pretty(&descriptor)?).map_err(|e| PackageError::Write { path: dest, source: e })?;

  install_binary(&options.binary, &options.destination.join("bin"))?;

  info!(destination = %options.destination.display(), dependencies = packaged.len(), "packaged buildpack");
  Ok(packaged)
}

/// Resolve the hash of `dependency`, fetching it when it is unknown or when bundling.
fn pin(
  cache: &DependencyCache,
  dependency: &BuildpackDependency,
  options: &PackageOptions,
) -> Result<PackagedDependency, PackageError> {
  let mut packaged = PackagedDependency {
    id: dependency.id.clone(),
    version: dependency.version.clone(),
    sha256: dependency.sha256.clone().unwrap_or_default(),
    bundled: None,
  };
  if dependency.sha256.is_some() && !options.offline {
    return Ok(packaged);
  }

  let artifact = cache.artifact(dependency).map_err(|e| PackageError::Artifact {
    id: dependency.id.clone(),
    source: e,
  })?;
  if dependency.sha256.is_none() {
    packaged.sha256 = hash_file(&artifact).map_err(|e| PackageError::Read {
      path: artifact.clone(),
      source: e,
    })?;
    info!(id = %dependency.id, sha256 = %packaged.sha256, "pinned dependency");
  }

  if options.offline {
    let dir = options.destination.join("dependencies").join(&packaged.sha256);
    create_dir(&dir)?;
    let bundled = dir.join(url_to_filename(&dependency.uri));
    fs::copy(&artifact, &bundled).map_err(|e| PackageError::Write {
      path: bundled.clone(),
      source: e,
    })?;
    info!(id = %dependency.id, path = %bundled.display(), "bundled dependency");
    packaged.bundled = Some(bundled);
  }
  Ok(packaged)
}

/// Copy `binary` into `bin_dir` and link each lifecycle entry point to it.
fn install_binary(binary: &Path, bin_dir: &Path) -> Result<(), PackageError> {
  create_dir(bin_dir)?;
  let target = bin_dir.join(BINARY_NAME);
  fs::copy(binary, &target).map_err(|e| PackageError::Write {
    path: target.clone(),
    source: e,
  })?;

  for name in ENTRY_POINTS {
    let link = bin_dir.join(name);
    if fs::symlink_metadata(&link).is_ok() {
      fs::remove_file(&link).map_err(|e| PackageError::Write {
        path: link.clone(),
        source: e,
      })?;
    }
    link_entry_point(&target, &link).map_err(|e| PackageError::Write { path: link, source: e })?;
  }
  Ok(())
}

#[cfg(unix)]
fn link_entry_point(_target: &Path, link: &Path) -> std::io::Result<()> {
  std::os::unix::fs::symlink(BINARY_NAME, link)
}

#[cfg(not(unix))]
fn link_entry_point(target: &Path, link: &Path) -> std::io::Result<()> {
  fs::copy(target, link).map(|_| ())
}

fn create_dir(path: &Path) -> Result<(), PackageError> {
  fs::create_dir_all(path).map_err(|e| PackageError::Write {
    path: path.to_path_buf(),
    source: e,
  })
}
