//! Resolution of `BP_*` configuration options.
//!
//! Each option declared in `buildpack.toml` resolves to the value from the
//! build environment when set, otherwise to its declared default.

use std::collections::{BTreeMap, HashSet};

use thiserror::Error;
use tracing::{info, warn};

use crate::buildpack::BuildpackConfiguration;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("configuration '{0}' is declared more than once")]
  Duplicate(String),
}

/// Resolves declared configuration options against an environment snapshot.
#[derive(Debug, Clone)]
pub struct ConfigurationResolver {
  configurations: Vec<BuildpackConfiguration>,
  environment: BTreeMap<String, String>,
}

impl ConfigurationResolver {
  /// Build a resolver and log the build-time configuration table.
  pub fn new<I, K, V>(configurations: &[BuildpackConfiguration], environment: I) -> Result<Self, ConfigError>
  where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
  {
    let mut seen = HashSet::new();
    for config in configurations {
      if !seen.insert(config.name.as_str()) {
        return Err(ConfigError::Duplicate(config.name.clone()));
      }
    }

    let mut configurations = configurations.to_vec();
    configurations.sort_by(|a, b| a.name.cmp(&b.name));

    let resolver = Self {
      configurations,
      environment: environment.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
    };
    resolver.log_build_configuration();
    Ok(resolver)
  }

  /// Resolve `name` to its value, and whether that value came from the environment.
  ///
  /// Undeclared options still resolve from the environment; otherwise they
  /// are empty.
  pub fn resolve(&self, name: &str) -> (String, bool) {
    if let Some(value) = self.environment.get(name) {
      return (value.clone(), true);
    }
    let default = self
      .configurations
      .iter()
      .find(|c| c.name == name)
      .map(|c| c.default.clone())
      .unwrap_or_default();
    (default, false)
  }

  /// Resolve `name` as a boolean. Unset or unparseable values are `false`.
  pub fn resolve_bool(&self, name: &str) -> bool {
    let (value, _) = self.resolve(name);
    if value.is_empty() {
      return false;
    }
    match parse_bool(&value) {
      Some(b) => b,
      None => {
        warn!(name, value = %value, "invalid boolean value, treating as false");
        false
      }
    }
  }

  fn log_build_configuration(&self) {
    let build: Vec<&BuildpackConfiguration> = self.configurations.iter().filter(|c| c.build).collect();
    if build.is_empty() {
      return;
    }
    info!("Build Configuration:");
    for config in build {
      let (value, from_env) = self.resolve(&config.name);
      let source = if from_env { "set" } else { "default" };
      info!(
        "  ${:<24} {:<16} {} ({})",
        config.name,
        value,
        config.description,
        source
      );
    }
  }
}

/// Parse a boolean the way `strconv.ParseBool`-style configuration does.
pub fn parse_bool(value: &str) -> Option<bool> {
  match value {
    "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
    "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
    _ => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tracing_test::traced_test;

  fn configuration(name: &str, default: &str) -> BuildpackConfiguration {
    BuildpackConfiguration {
      name: name.to_string(),
      default: default.to_string(),
      description: format!("the {}", name),
      build: true,
      launch: false,
    }
  }

  fn resolver(env: &[(&str, &str)]) -> ConfigurationResolver {
    ConfigurationResolver::new(
      &[
        configuration("BP_FORC_VERSION", "0.49.*"),
        configuration("BP_ENABLE_FORC_DEPLOY", "false"),
      ],
      env.iter().copied(),
    )
    .unwrap()
  }

  #[test]
  fn resolve_uses_default_when_unset() {
    assert_eq!(resolver(&[]).resolve("BP_FORC_VERSION"), ("0.49.*".to_string(), false));
  }

  #[test]
  fn resolve_prefers_environment() {
    let r = resolver(&[("BP_FORC_VERSION", "0.48.0")]);
    assert_eq!(r.resolve("BP_FORC_VERSION"), ("0.48.0".to_string(), true));
  }

  #[test]
  fn resolve_undeclared_is_empty() {
    assert_eq!(resolver(&[]).resolve("BP_UNKNOWN"), (String::new(), false));
  }

  #[test]
  fn resolve_bool_parses_values() {
    assert!(resolver(&[("BP_ENABLE_FORC_DEPLOY", "true")]).resolve_bool("BP_ENABLE_FORC_DEPLOY"));
    assert!(resolver(&[("BP_ENABLE_FORC_DEPLOY", "1")]).resolve_bool("BP_ENABLE_FORC_DEPLOY"));
    assert!(!resolver(&[("BP_ENABLE_FORC_DEPLOY", "F")]).resolve_bool("BP_ENABLE_FORC_DEPLOY"));
    assert!(!resolver(&[]).resolve_bool("BP_ENABLE_FORC_DEPLOY"));
  }

  #[test]
  #[traced_test]
  fn resolve_bool_invalid_is_false() {
    assert!(!resolver(&[("BP_ENABLE_FORC_DEPLOY", "yes please")]).resolve_bool("BP_ENABLE_FORC_DEPLOY"));
    assert!(logs_contain("invalid boolean value"));
  }

  #[test]
  #[traced_test]
  fn new_logs_build_configuration() {
    resolver(&[("BP_FORC_VERSION", "0.48.0")]);
    assert!(logs_contain("Build Configuration:"));
    assert!(logs_contain("0.48.0"));
    assert!(logs_contain("(set)"));
    assert!(logs_contain("(default)"));
  }

  #[test]
  fn duplicate_configuration_is_rejected() {
    let err = ConfigurationResolver::new(
      &[configuration("BP_A", ""), configuration("BP_A", "x")],
      std::iter::empty::<(String, String)>(),
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::Duplicate(name) if name == "BP_A"));
  }

  #[test]
  fn parse_bool_rejects_mixed_case() {
    assert_eq!(parse_bool("tRUE"), None);
    assert_eq!(parse_bool("True"), Some(true));
  }
}
