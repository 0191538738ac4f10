//! Build plan types exchanged with the lifecycle.
//!
//! Detection writes a [`BuildPlan`] (what this buildpack provides and requires);
//! the lifecycle resolves it across buildpacks and hands build a
//! [`BuildpackPlan`] listing the entries this buildpack must satisfy.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur while reading or writing plan files.
#[derive(Debug, Error)]
pub enum PlanError {
  #[error("failed to read plan {}: {source}", path.display())]
  Read { path: PathBuf, source: std::io::Error },

  #[error("failed to parse plan {}: {source}", path.display())]
  Parse { path: PathBuf, source: toml::de::Error },

  #[error("failed to serialize plan: {0}")]
  Serialize(#[from] toml::ser::Error),

  #[error("failed to write plan {}: {source}", path.display())]
  Write { path: PathBuf, source: std::io::Error },
}

/// A single requirement handed to this buildpack at build time.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct PlanEntry {
  pub name: String,
  #[serde(default)]
  pub metadata: toml::Table,
}

/// The buildpack plan read during the build phase.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct BuildpackPlan {
  #[serde(default)]
  pub entries: Vec<PlanEntry>,
}

impl BuildpackPlan {
  /// Read a buildpack plan. A missing file is treated as an empty plan.
  pub fn load(path: &Path) -> Result<Self, PlanError> {
    if !path.exists() {
      debug!(path = %path.display(), "no buildpack plan, using empty plan");
      return Ok(Self::default());
    }
    let content = fs::read_to_string(path).map_err(|source| PlanError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    toml::from_str(&content).map_err(|source| PlanError::Parse {
      path: path.to_path_buf(),
      source,
    })
  }
}

/// Resolves named entries from a [`BuildpackPlan`].
pub struct PlanEntryResolver<'a> {
  pub plan: &'a BuildpackPlan,
}

impl<'a> PlanEntryResolver<'a> {
  pub fn new(plan: &'a BuildpackPlan) -> Self {
    Self { plan }
  }

  /// Return the entry called `name`, or `None` if the plan does not contain it.
  ///
  /// Multiple entries with the same name are merged into one: later metadata
  /// values override earlier ones, except arrays, which are concatenated.
  pub fn resolve(&self, name: &str) -> Result<Option<PlanEntry>, PlanError> {
    let mut matched = self.plan.entries.iter().filter(|e| e.name == name).peekable();
    if matched.peek().is_none() {
      return Ok(None);
    }

    let mut merged = PlanEntry {
      name: name.to_string(),
      metadata: toml::Table::new(),
    };
    for entry in matched {
      for (key, value) in &entry.metadata {
        let value = match (merged.metadata.remove(key), value) {
          (Some(toml::Value::Array(mut existing)), toml::Value::Array(more)) => {
            existing.extend(more.iter().cloned());
            toml::Value::Array(existing)
          }
          _ => value.clone(),
        };
        merged.metadata.insert(key.clone(), value);
      }
    }
    Ok(Some(merged))
  }
}

/// Something this buildpack provides or requires during detection.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Provide {
  pub name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Require {
  pub name: String,
  #[serde(default, skip_serializing_if = "toml::Table::is_empty")]
  pub metadata: toml::Table,
}

/// The build plan written by a passing detection.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct BuildPlan {
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub provides: Vec<Provide>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub requires: Vec<Require>,
}

impl BuildPlan {
  /// A plan that both provides and requires `name`.
  pub fn provide_and_require(name: &str) -> Self {
    Self {
      provides: vec![Provide { name: name.to_string() }],
      requires: vec![Require {
        name: name.to_string(),
        metadata: toml::Table::new(),
      }],
    }
  }

  pub fn write(&self, path: &Path) -> Result<(), PlanError> {
    let content = toml::to_string(self)?;
    fs::write(path, content).map_err(|source| PlanError::Write {
      path: path.to_path_buf(),
      source,
    })
  }
}
