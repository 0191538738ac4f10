//! Archive extraction with leading path components stripped.
//!
//! Supports:
//! - `.tar.gz` / `.tgz`
//! - `.tar`
//! - `.zip`
//!
//! Files without a recognised extension are sniffed for the gzip magic bytes.

use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use tar::Archive;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ArchiveError {
  #[error("unsupported archive format: {}", .0.display())]
  Unsupported(PathBuf),

  #[error("invalid archive entry: {0}")]
  InvalidEntry(String),

  #[error("zip error: {0}")]
  Zip(#[from] zip::result::ZipError),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
  TarGz,
  Tar,
  Zip,
}

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

fn detect_format(archive_path: &Path) -> Result<Format, ArchiveError> {
  let name = archive_path.to_string_lossy();
  if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
    return Ok(Format::TarGz);
  }
  if name.ends_with(".tar") {
    return Ok(Format::Tar);
  }
  if name.ends_with(".zip") {
    return Ok(Format::Zip);
  }

  let mut magic = [0u8; 2];
  let mut file = File::open(archive_path)?;
  if file.read_exact(&mut magic).is_ok() && magic == GZIP_MAGIC {
    return Ok(Format::TarGz);
  }
  Err(ArchiveError::Unsupported(archive_path.to_path_buf()))
}

/// Extract `archive_path` into `dest`, dropping `strip_components` leading path components.
///
/// Entries whose path is consumed entirely by stripping are skipped.
pub fn extract(archive_path: &Path, dest: &Path, strip_components: usize) -> Result<(), ArchiveError> {
  fs::create_dir_all(dest)?;

  match detect_format(archive_path)? {
    Format::TarGz => {
      let decoder = GzDecoder::new(BufReader::new(File::open(archive_path)?));
      extract_tar(Archive::new(decoder), dest, strip_components)?;
    }
    Format::Tar => {
      let file = BufReader::new(File::open(archive_path)?);
      extract_tar(Archive::new(file), dest, strip_components)?;
    }
    Format::Zip => extract_zip(archive_path, dest, strip_components)?,
  }

  info!(archive = %archive_path.display(), dest = %dest.display(), "expanded archive");
  Ok(())
}

/// Drop the first `n` components. `.` counts as a component, so
/// `./forc-binaries/forc` with `n = 2` becomes `forc`.
fn strip(path: &Path, n: usize) -> Result<Option<PathBuf>, ArchiveError> {
  if path
    .components()
    .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)))
  {
    return Err(ArchiveError::InvalidEntry(path.display().to_string()));
  }

  let stripped: PathBuf = path.components().skip(n).collect();
  if stripped.as_os_str().is_empty() {
    return Ok(None);
  }
  Ok(Some(stripped))
}

fn extract_tar<R: Read>(mut archive: Archive<R>, dest: &Path, strip_components: usize) -> Result<(), ArchiveError> {
  for entry in archive.entries()? {
    let mut entry = entry?;
    let path = entry.path()?.into_owned();

    let Some(stripped) = strip(&path, strip_components)? else {
      debug!(entry = %path.display(), "skipping stripped entry");
      continue;
    };

    let dest_path = dest.join(&stripped);
    if let Some(parent) = dest_path.parent() {
      fs::create_dir_all(parent)?;
    }

    entry.unpack(&dest_path)?;
  }

  Ok(())
}

fn extract_zip(archive_path: &Path, dest: &Path, strip_components: usize) -> Result<(), ArchiveError> {
  let file = File::open(archive_path)?;
  let mut archive = zip::ZipArchive::new(BufReader::new(file))?;

  for i in 0..archive.len() {
    let mut file = archive.by_index(i)?;

    let path = file
      .enclosed_name()
      .ok_or_else(|| ArchiveError::InvalidEntry(file.name().to_string()))?;

    let Some(stripped) = strip(&path, strip_components)? else {
      continue;
    };

    let dest_path = dest.join(&stripped);

    if file.is_dir() {
      fs::create_dir_all(&dest_path)?;
    } else {
      if let Some(parent) = dest_path.parent() {
        fs::create_dir_all(parent)?;
      }

      let mut outfile = File::create(&dest_path)?;
      std::io::copy(&mut file, &mut outfile)?;

      #[cfg(unix)]
      {
        use std::os::unix::fs::PermissionsExt;
        if let Some(mode) = file.unix_mode() {
          fs::set_permissions(&dest_path, fs::Permissions::from_mode(mode))?;
        }
      }
    }
  }

  Ok(())
}
