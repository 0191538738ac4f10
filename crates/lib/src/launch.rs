//! Launch metadata (`<layers>/launch.toml`).

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// A process type exposed by the built image.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Process {
  #[serde(rename = "type")]
  pub type_: String,
  pub command: Vec<String>,
  #[serde(default)]
  pub args: Vec<String>,
  #[serde(default)]
  pub default: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Launch {
  #[serde(default)]
  pub processes: Vec<Process>,
}

impl Launch {
  pub fn write(&self, path: &Path) -> Result<(), LaunchError> {
    let content = toml::to_string(self)?;
    fs::write(path, content).map_err(LaunchError::Write)
  }
}

#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
  #[error("failed to serialize launch metadata: {0}")]
  Serialize(#[from] toml::ser::Error),

  #[error("failed to write launch metadata: {0}")]
  Write(#[source] std::io::Error),
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  #[test]
  fn write_serializes_processes() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("launch.toml");
    let launch = Launch {
      processes: vec![Process {
        type_: "forc".to_string(),
        command: vec!["forc".to_string()],
        args: vec!["deploy".to_string()],
        default: true,
      }],
    };

    launch.write(&path).unwrap();

    let content = fs::read_to_string(&path).unwrap();
    assert!(content.contains("[[processes]]"));
    assert!(content.contains("type = \"forc\""));
    assert_eq!(toml::from_str::<Launch>(&content).unwrap(), launch);
  }
}
