//! Layers: directories under the lifecycle's layers dir plus their TOML metadata.
//!
//! For a layer named `forc` the lifecycle expects:
//! - `<layers>/forc/` with the layer content
//! - `<layers>/forc.toml` with `[types]` and `[metadata]`
//! - `<layers>/forc/env.launch/<NAME>.<op>` for launch environment bindings

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::env::Environment;

#[derive(Debug, Error)]
pub enum LayerError {
  #[error("failed to reset layer {}: {source}", path.display())]
  Reset { path: PathBuf, source: std::io::Error },

  #[error("failed to write layer metadata {}: {source}", path.display())]
  Write { path: PathBuf, source: std::io::Error },

  #[error("failed to serialize layer metadata: {0}")]
  Serialize(#[from] toml::ser::Error),
}

/// Flags telling the lifecycle where a layer is visible.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct LayerTypes {
  #[serde(default)]
  pub build: bool,
  #[serde(default)]
  pub cache: bool,
  #[serde(default)]
  pub launch: bool,
}

/// Contents of `<layers>/<name>.toml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct LayerContentMetadata {
  pub types: LayerTypes,
  #[serde(default)]
  pub metadata: toml::Table,
}

/// A single layer being contributed.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
  pub name: String,
  pub path: PathBuf,
  pub types: LayerTypes,
  pub metadata: toml::Table,
  pub launch_environment: Environment,
}

impl Layer {
  fn metadata_path(&self) -> PathBuf {
    let mut file = self.path.clone().into_os_string();
    file.push(".toml");
    PathBuf::from(file)
  }
}

/// The lifecycle's layers directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layers {
  pub path: PathBuf,
}

impl Layers {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  /// Return an empty layer called `name`.
  ///
  /// Any previous content or metadata for the layer is removed; layers are
  /// rebuilt from scratch on every build.
  pub fn layer(&self, name: &str) -> Result<Layer, LayerError> {
    let layer = Layer {
      name: name.to_string(),
      path: self.path.join(name),
      types: LayerTypes::default(),
      metadata: toml::Table::new(),
      launch_environment: Environment::new(),
    };

    let reset = |path: &Path, source| LayerError::Reset {
      path: path.to_path_buf(),
      source,
    };

    if layer.path.exists() {
      debug!(path = %layer.path.display(), "removing previous layer content");
      fs::remove_dir_all(&layer.path).map_err(|e| reset(&layer.path, e))?;
    }
    let metadata_path = layer.metadata_path();
    if metadata_path.exists() {
      fs::remove_file(&metadata_path).map_err(|e| reset(&metadata_path, e))?;
    }
    fs::create_dir_all(&layer.path).map_err(|e| reset(&layer.path, e))?;

    Ok(layer)
  }

  /// Persist a contributed layer's TOML metadata and environment files.
  pub fn write(&self, layer: &Layer) -> Result<(), LayerError> {
    let env_dir = layer.path.join("env.launch");
    layer
      .launch_environment
      .write(&env_dir)
      .map_err(|source| LayerError::Write { path: env_dir, source })?;

    let content = toml::to_string(&LayerContentMetadata {
      types: layer.types,
      metadata: layer.metadata.clone(),
    })?;
    let path = layer.metadata_path();
    fs::write(&path, content).map_err(|source| LayerError::Write { path, source })?;
    Ok(())
  }
}
