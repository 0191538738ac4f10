//! Buildpack descriptor (`buildpack.toml`).
//!
//! The descriptor carries the buildpack identity plus two metadata lists the
//! build consumes:
//! - `[[metadata.configurations]]`: user-facing `BP_*` options with defaults
//! - `[[metadata.dependencies]]`: downloadable artifacts, one per version/platform

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dependency::BuildpackDependency;

/// Descriptor file name at the root of the buildpack directory.
pub const BUILDPACK_TOML: &str = "buildpack.toml";

/// Errors that can occur while loading the descriptor.
#[derive(Debug, Error)]
pub enum BuildpackError {
  #[error("failed to read {}: {source}", path.display())]
  Read { path: PathBuf, source: std::io::Error },

  #[error("failed to parse {}: {source}", path.display())]
  Parse { path: PathBuf, source: toml::de::Error },
}

/// A parsed `buildpack.toml` plus the directory it was loaded from.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Buildpack {
  /// Buildpack API version (e.g. `"0.9"`).
  pub api: String,

  #[serde(rename = "buildpack")]
  pub info: BuildpackInfo,

  #[serde(default)]
  pub stacks: Vec<BuildpackStack>,

  #[serde(default)]
  pub metadata: BuildpackMetadata,

  /// Directory containing `buildpack.toml`. Not part of the file.
  #[serde(skip)]
  pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BuildpackInfo {
  pub id: String,
  pub name: String,
  pub version: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub homepage: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BuildpackStack {
  pub id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct BuildpackMetadata {
  #[serde(default)]
  pub configurations: Vec<BuildpackConfiguration>,

  #[serde(default)]
  pub dependencies: Vec<BuildpackDependency>,
}

/// A user-facing configuration option declared by the buildpack.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct BuildpackConfiguration {
  pub name: String,
  #[serde(default)]
  pub default: String,
  #[serde(default)]
  pub description: String,
  /// Option applies at build time.
  #[serde(default)]
  pub build: bool,
  /// Option applies at launch time.
  #[serde(default)]
  pub launch: bool,
}

impl Buildpack {
  /// Load `buildpack.toml` from the given buildpack directory.
  pub fn load(dir: &Path) -> Result<Self, BuildpackError> {
    let path = dir.join(BUILDPACK_TOML);
    let content = fs::read_to_string(&path).map_err(|source| BuildpackError::Read {
      path: path.clone(),
      source,
    })?;
    let mut buildpack: Buildpack = toml::from_str(&content).map_err(|source| BuildpackError::Parse { path, source })?;
    buildpack.path = dir.to_path_buf();
    Ok(buildpack)
  }

  /// Title line printed at the start of each phase, e.g. `Forc Buildpack 0.1.0`.
  pub fn title(&self) -> String {
    format!("{} {}", self.info.name, self.info.version)
  }
}
