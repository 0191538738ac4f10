//! Buildpack dependencies: declaration, version resolution and caching.
//!
//! Dependencies are declared in `buildpack.toml`. The [`DependencyResolver`]
//! picks the entry matching an id and version constraint; the
//! [`DependencyCache`] turns that entry into a local file.

pub(crate) mod cache;

use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub use cache::DependencyCache;

/// Errors that can occur while resolving or obtaining a dependency.
#[derive(Debug, Error)]
pub enum DependencyError {
  #[error("invalid version constraint '{constraint}': {source}")]
  InvalidConstraint {
    constraint: String,
    #[source]
    source: semver::Error,
  },

  #[error("no valid dependencies for {id}, {constraint}, and {stack} in [{candidates}]")]
  NoMatch {
    id: String,
    constraint: String,
    stack: String,
    candidates: String,
  },

  #[error("failed to create directory {}: {source}", path.display())]
  CreateDir {
    path: std::path::PathBuf,
    source: std::io::Error,
  },

  #[error("fetch failed for {url}: {message}")]
  FetchFailed { url: String, message: String },

  #[error("hash mismatch for {url}: expected {expected}, got {actual}")]
  HashMismatch {
    url: String,
    expected: String,
    actual: String,
  },

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

/// A downloadable artifact declared in `buildpack.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct BuildpackDependency {
  pub id: String,
  #[serde(default)]
  pub name: String,
  pub version: String,
  pub uri: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub sha256: Option<String>,
  #[serde(default)]
  pub stacks: Vec<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub licenses: Vec<DependencyLicense>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub purl: Option<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub cpes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct DependencyLicense {
  #[serde(default, rename = "type")]
  pub type_: String,
  #[serde(default)]
  pub uri: String,
}

impl BuildpackDependency {
  /// Whether this dependency can be used on `stack`. No stack id means any stack.
  pub fn supports_stack(&self, stack: Option<&str>) -> bool {
    match stack {
      None => true,
      Some(stack) => self.stacks.is_empty() || self.stacks.iter().any(|s| s == "*" || s == stack),
    }
  }

  /// Metadata recorded in the layer TOML so a contributed layer names its source.
  pub fn layer_metadata(&self) -> toml::Table {
    let mut table = toml::Table::new();
    table.insert("id".into(), self.id.clone().into());
    table.insert("name".into(), self.name.clone().into());
    table.insert("version".into(), self.version.clone().into());
    table.insert("uri".into(), self.uri.clone().into());
    if let Some(sha256) = &self.sha256 {
      table.insert("sha256".into(), sha256.clone().into());
    }
    table
  }
}

/// How a configured version string is matched against declared versions.
#[derive(Debug, Clone, PartialEq)]
enum Constraint {
  Any,
  Exact(Version),
  Req(VersionReq),
}

impl Constraint {
  fn parse(constraint: &str) -> Result<Self, DependencyError> {
    let constraint = constraint.trim();
    if constraint.is_empty() || constraint == "*" {
      return Ok(Self::Any);
    }
    if let Ok(version) = Version::parse(constraint) {
      return Ok(Self::Exact(version));
    }
    VersionReq::parse(constraint)
      .map(Self::Req)
      .map_err(|source| DependencyError::InvalidConstraint {
        constraint: constraint.to_string(),
        source,
      })
  }

  fn matches(&self, version: &Version) -> bool {
    match self {
      Self::Any => true,
      Self::Exact(exact) => exact == version,
      Self::Req(req) => req.matches(version),
    }
  }
}

/// Selects a dependency by id and version constraint.
#[derive(Debug, Clone)]
pub struct DependencyResolver {
  dependencies: Vec<BuildpackDependency>,
  stack: Option<String>,
}

impl DependencyResolver {
  pub fn new(dependencies: Vec<BuildpackDependency>, stack: Option<String>) -> Self {
    Self { dependencies, stack }
  }

  /// Return the highest version of `id` satisfying `constraint`.
  ///
  /// An empty constraint or `*` matches any version, a bare version is an
  /// exact match, anything else is parsed as a semver requirement.
  pub fn resolve(&self, id: &str, constraint: &str) -> Result<BuildpackDependency, DependencyError> {
    let parsed = Constraint::parse(constraint)?;

    let mut candidates: Vec<(Version, &BuildpackDependency)> = self
      .dependencies
      .iter()
      .filter(|d| d.id == id && d.supports_stack(self.stack.as_deref()))
      .filter_map(|d| match Version::parse(&d.version) {
        Ok(version) => Some((version, d)),
        Err(e) => {
          debug!(id = %d.id, version = %d.version, error = %e, "skipping dependency with invalid version");
          None
        }
      })
      .filter(|(version, _)| parsed.matches(version))
      .collect();

    candidates.sort_by(|a, b| b.0.cmp(&a.0));

    match candidates.first() {
      Some((_, dependency)) => Ok((*dependency).clone()),
      None => Err(DependencyError::NoMatch {
        id: id.to_string(),
        constraint: constraint.to_string(),
        stack: self.stack.clone().unwrap_or_else(|| "*".to_string()),
        candidates: self
          .dependencies
          .iter()
          .filter(|d| d.id == id)
          .map(|d| d.version.as_str())
          .collect::<Vec<_>>()
          .join(", "),
      }),
    }
  }
}
