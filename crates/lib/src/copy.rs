//! Recursive directory copy with an explicit failure policy.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum CopyError {
  #[error("{} is not a regular file", .0.display())]
  NotRegularFile(PathBuf),

  #[error("failed to read {}: {source}", path.display())]
  Read { path: PathBuf, source: io::Error },

  #[error("failed to create directory {}: {source}", path.display())]
  CreateDir { path: PathBuf, source: io::Error },

  #[error("failed to copy {} to {}: {source}", from.display(), to.display())]
  CopyFile {
    from: PathBuf,
    to: PathBuf,
    source: io::Error,
  },

  #[error("failed to walk {}: {source}", path.display())]
  Walk { path: PathBuf, source: walkdir::Error },
}

/// What to do when a single entry cannot be copied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CopyPolicy {
  /// Stop at the first error.
  FailFast,
  /// Log the error, skip the entry, keep copying its siblings.
  #[default]
  BestEffort,
}

/// Outcome of a copy.
#[derive(Debug, Default)]
pub struct CopyReport {
  /// Regular files copied.
  pub files: usize,
  /// Directories created.
  pub directories: usize,
  /// Entries skipped under [`CopyPolicy::BestEffort`].
  pub skipped: Vec<CopyError>,
}

/// Recursively copy `src` to `dst`.
///
/// Directories are created with the permission mode of their source. Regular
/// files are copied with the default creation mode. Symlinks are not followed;
/// they, like any other non-regular entry, fail with
/// [`CopyError::NotRegularFile`].
///
/// The source directory itself must be readable regardless of policy.
pub fn copy_dir(src: &Path, dst: &Path, policy: CopyPolicy) -> Result<CopyReport, CopyError> {
  let src_meta = fs::metadata(src).map_err(|source| CopyError::Read {
    path: src.to_path_buf(),
    source,
  })?;
  create_dir(dst, &src_meta)?;

  let mut report = CopyReport {
    directories: 1,
    ..Default::default()
  };

  for entry in WalkDir::new(src).min_depth(1).sort_by_file_name() {
    let result = entry
      .map_err(|e| CopyError::Walk {
        path: e.path().map(Path::to_path_buf).unwrap_or_else(|| src.to_path_buf()),
        source: e,
      })
      .and_then(|entry| copy_entry(src, dst, &entry));

    match result {
      Ok(true) => report.directories += 1,
      Ok(false) => report.files += 1,
      Err(e) => match policy {
        CopyPolicy::FailFast => return Err(e),
        CopyPolicy::BestEffort => {
          warn!(error = %e, "skipping entry");
          report.skipped.push(e);
        }
      },
    }
  }

  debug!(
    src = %src.display(),
    dst = %dst.display(),
    files = report.files,
    directories = report.directories,
    skipped = report.skipped.len(),
    "copied directory"
  );
  Ok(report)
}

/// Copy one walked entry. Returns `true` for a directory, `false` for a file.
fn copy_entry(src: &Path, dst: &Path, entry: &walkdir::DirEntry) -> Result<bool, CopyError> {
  let relative = entry.path().strip_prefix(src).unwrap_or(entry.path());
  let target = dst.join(relative);

  if entry.file_type().is_dir() {
    let meta = entry.metadata().map_err(|e| CopyError::Walk {
      path: entry.path().to_path_buf(),
      source: e,
    })?;
    create_dir(&target, &meta)?;
    return Ok(true);
  }

  copy_file(entry.path(), &target)?;
  Ok(false)
}

fn create_dir(path: &Path, src_meta: &fs::Metadata) -> Result<(), CopyError> {
  fs::create_dir_all(path).map_err(|source| CopyError::CreateDir {
    path: path.to_path_buf(),
    source,
  })?;
  fs::set_permissions(path, src_meta.permissions()).map_err(|source| CopyError::CreateDir {
    path: path.to_path_buf(),
    source,
  })
}

/// Copy a single regular file from `src` to `dst`.
pub fn copy_file(src: &Path, dst: &Path) -> Result<(), CopyError> {
  let meta = fs::symlink_metadata(src).map_err(|source| CopyError::Read {
    path: src.to_path_buf(),
    source,
  })?;
  if !meta.file_type().is_file() {
    return Err(CopyError::NotRegularFile(src.to_path_buf()));
  }

  let copy_err = |source| CopyError::CopyFile {
    from: src.to_path_buf(),
    to: dst.to_path_buf(),
    source,
  };

  let mut source = File::open(src).map_err(copy_err)?;
  let mut destination = File::create(dst).map_err(copy_err)?;
  io::copy(&mut source, &mut destination).map_err(copy_err)?;
  destination.sync_all().map_err(copy_err)?;
  Ok(())
}
