//! Release platform detection.
//!
//! forc release archives are published per platform as
//! `forc-binaries-<os>_<arch>.tar.gz`; dependency ids in `buildpack.toml`
//! follow the same `<os>_<arch>` naming.

pub mod arch;
pub mod os;

use arch::Arch;
use os::Os;
use std::fmt;

/// Platform identifier combining OS and architecture (e.g., "linux_amd64")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Platform {
  pub os: Os,
  pub arch: Arch,
}

impl Platform {
  /// Detect the current platform at runtime
  ///
  /// Returns `None` if the OS or architecture has no forc release
  pub fn current() -> Option<Self> {
    Some(Self {
      os: Os::current()?,
      arch: Arch::current()?,
    })
  }

  /// Returns the release identifier (e.g., "linux_amd64")
  pub fn identifier(&self) -> String {
    format!("{}_{}", self.os, self.arch)
  }
}

impl fmt::Display for Platform {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.identifier())
  }
}

/// Returns the release identifier for the current system, if forc ships one
pub fn current_identifier() -> Option<String> {
  Platform::current().map(|p| p.identifier())
}
