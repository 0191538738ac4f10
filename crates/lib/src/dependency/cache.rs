//! Local cache for dependency artifacts.
//!
//! Lookup order:
//! 1. `<buildpack>/dependencies/<sha256>/<filename>` (packaged offline buildpacks)
//! 2. `<download_dir>/<sha256>/<filename>` from an earlier download whose hash still matches
//! 3. a fresh download, verified against `sha256` when the dependency declares one
//!
//! Dependencies without a declared hash are fetched on every call; nothing
//! vouches for a file left behind by an earlier run. Downloads land in a
//! temporary file next to the destination and are renamed into place only
//! after verification, so an interrupted transfer never leaves a partial
//! artifact at the final path.
//!
//! Besides `http(s)://`, `file://` URIs are read from the local filesystem.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use super::{BuildpackDependency, DependencyError};

/// Resolves dependencies to local files, downloading when needed.
#[derive(Debug, Clone)]
pub struct DependencyCache {
  /// Directory of pre-packaged artifacts shipped with the buildpack.
  pub cache_path: PathBuf,
  /// Directory downloads are written to.
  pub download_path: PathBuf,
}

impl DependencyCache {
  /// Create a cache rooted at `<buildpack_dir>/dependencies`, downloading into `download_path`.
  pub fn new(buildpack_dir: &Path, download_path: PathBuf) -> Result<Self, DependencyError> {
    fs::create_dir_all(&download_path).map_err(|source| DependencyError::CreateDir {
      path: download_path.clone(),
      source,
    })?;
    Ok(Self {
      cache_path: buildpack_dir.join("dependencies"),
      download_path,
    })
  }

  /// Return a local path to the dependency's artifact.
  pub fn artifact(&self, dependency: &BuildpackDependency) -> Result<PathBuf, DependencyError> {
    let filename = url_to_filename(&dependency.uri);

    if let Some(sha256) = &dependency.sha256 {
      let packaged = self.cache_path.join(sha256).join(&filename);
      if packaged.is_file() {
        info!(path = %packaged.display(), "using cached dependency");
        return Ok(packaged);
      }
    }

    let key = dependency.sha256.clone().unwrap_or_else(|| url_key(&dependency.uri));
    let dest_dir = self.download_path.join(&key);
    let dest_path = dest_dir.join(&filename);

    match &dependency.sha256 {
      Some(expected) if dest_path.is_file() => {
        debug!(path = %dest_path.display(), "checking downloaded file");
        if let Ok(actual) = hash_file(&dest_path) {
          if &actual == expected {
            info!(path = %dest_path.display(), "using downloaded dependency");
            return Ok(dest_path);
          }
          debug!(expected = %expected, actual = %actual, "downloaded file hash mismatch, re-downloading");
        }
      }
      Some(_) => {}
      None => warn!(id = %dependency.id, uri = %dependency.uri, "dependency declares no sha256, integrity is not verified"),
    }

    fs::create_dir_all(&dest_dir).map_err(|source| DependencyError::CreateDir {
      path: dest_dir.clone(),
      source,
    })?;
    download(&dependency.uri, dependency.sha256.as_deref(), &dest_path)?;
    Ok(dest_path)
  }
}

/// Download `url` to `dest`, verifying the SHA256 hash when one is given.
fn download(url: &str, expected_sha256: Option<&str>, dest: &Path) -> Result<(), DependencyError> {
  info!(url = %url, "downloading dependency");
  let bytes = fetch(url)?;
  store(url, &bytes, expected_sha256, dest)?;
  info!(path = %dest.display(), size = bytes.len(), "download complete");
  Ok(())
}

fn fetch(url: &str) -> Result<Vec<u8>, DependencyError> {
  if let Some(path) = url.strip_prefix("file://") {
    return fs::read(path).map_err(|e| DependencyError::FetchFailed {
      url: url.to_string(),
      message: e.to_string(),
    });
  }

  let response = reqwest::blocking::get(url).map_err(|e| DependencyError::FetchFailed {
    url: url.to_string(),
    message: e.to_string(),
  })?;

  if !response.status().is_success() {
    return Err(DependencyError::FetchFailed {
      url: url.to_string(),
      message: format!("HTTP {}", response.status()),
    });
  }

  let bytes = response.bytes().map_err(|e| DependencyError::FetchFailed {
    url: url.to_string(),
    message: e.to_string(),
  })?;
  Ok(bytes.to_vec())
}

/// Verify `bytes` and move them to `dest` once fully written.
fn store(url: &str, bytes: &[u8], expected_sha256: Option<&str>, dest: &Path) -> Result<(), DependencyError> {
  match expected_sha256 {
    Some(expected) => {
      let actual = hash_bytes(bytes);
      if actual != expected {
        return Err(DependencyError::HashMismatch {
          url: url.to_string(),
          expected: expected.to_string(),
          actual,
        });
      }
      debug!(sha256 = %expected, "checksum verified");
    }
    None => debug!(url = %url, "no checksum declared, skipping verification"),
  }

  let dir = dest.parent().unwrap_or_else(|| Path::new("."));
  let mut file = NamedTempFile::new_in(dir)?;
  file.write_all(bytes)?;
  file.flush()?;
  file.persist(dest).map_err(|e| DependencyError::Io(e.error))?;
  Ok(())
}

fn hash_bytes(bytes: &[u8]) -> String {
  let mut hasher = Sha256::new();
  hasher.update(bytes);
  hex::encode(hasher.finalize())
}

/// Compute the SHA256 hash of a file.
pub(crate) fn hash_file(path: &Path) -> io::Result<String> {
  let mut file = File::open(path)?;
  let mut hasher = Sha256::new();
  let mut buf = [0u8; 8192];
  loop {
    let n = file.read(&mut buf)?;
    if n == 0 {
      break;
    }
    hasher.update(&buf[..n]);
  }
  Ok(hex::encode(hasher.finalize()))
}

/// Directory key for dependencies without a declared hash.
fn url_key(url: &str) -> String {
  hash_bytes(url.as_bytes())[..16].to_string()
}

/// Convert a URL to a safe filename.
///
/// Takes the last path component and sanitizes it. Falls back to a hash of
/// the URL if no suitable filename can be extracted.
pub(crate) fn url_to_filename(url: &str) -> String {
  if let Some(filename) = url.rsplit('/').next() {
    let filename = filename.split('?').next().unwrap_or(filename);

    let sanitized: String = filename
      .chars()
      .map(|c| {
        if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
          c
        } else {
          '_'
        }
      })
      .collect();

    if !sanitized.is_empty() && sanitized != "." && sanitized != ".." {
      return sanitized;
    }
  }

  format!("download_{}", url_key(url))
}
