//! Test utilities for forc-buildpack-lib.
//!
//! Helpers to build release-shaped archives, packaged buildpack directories
//! and shell invocations without network access.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::GzEncoder;

use crate::buildpack::Buildpack;
use crate::dependency::cache::hash_file;

/// Stand-in for the forc binary: reports a version and fakes a release build.
pub const FAKE_FORC: &str = r#"#!/bin/sh
case "$1" in
  --version) echo "forc 0.49.1" ;;
  build) mkdir -p out/release && echo built > out/release/contract.bin ;;
  *) echo "unexpected arguments: $*" >&2; exit 1 ;;
esac
"#;

/// Write a gzipped tarball with the given `(path, content, mode)` entries.
///
/// Entry names are written verbatim so leading `./` components survive, the
/// way release tarballs created with `tar -C dir .` carry them.
pub fn write_tar_gz(path: &Path, entries: &[(&str, &[u8], u32)]) -> PathBuf {
  let encoder = GzEncoder::new(File::create(path).unwrap(), Compression::default());
  let mut builder = tar::Builder::new(encoder);
  for (name, data, mode) in entries {
    let mut header = tar::Header::new_gnu();
    let bytes = name.as_bytes();
    header.as_old_mut().name[..bytes.len()].copy_from_slice(bytes);
    header.set_size(data.len() as u64);
    header.set_mode(*mode);
    header.set_entry_type(tar::EntryType::Regular);
    header.set_cksum();
    builder.append(&header, *data).unwrap();
  }
  builder.into_inner().unwrap().finish().unwrap();
  path.to_path_buf()
}

/// Create a buildpack directory whose only `forc-linux_amd64` dependency is
/// `archive`, pre-packaged under `dependencies/<sha256>/` so no download happens.
pub fn write_buildpack(dir: &Path, archive: &Path) -> Buildpack {
  let sha256 = hash_file(archive).unwrap();
  let filename = "forc-binaries-linux_amd64.tar.gz";
  let packaged = dir.join("dependencies").join(&sha256);
  fs::create_dir_all(&packaged).unwrap();
  fs::copy(archive, packaged.join(filename)).unwrap();

  let descriptor = format!(
    r#"api = "0.9"

[buildpack]
id = "test/forc"
name = "Test Forc Buildpack"
version = "0.0.1"

[[stacks]]
id = "*"

[[metadata.configurations]]
name = "BP_FORC_VERSION"
default = "0.49.*"
description = "the forc version"
build = true

[[metadata.configurations]]
name = "BP_FORC_PLATFORM"
default = "linux_amd64"
description = "the forc release platform"
build = true

[[metadata.configurations]]
name = "BP_ENABLE_FORC_DEPLOY"
default = "false"
description = "enable the forc deploy process"
launch = true

[[metadata.dependencies]]
id = "forc-linux_amd64"
name = "Forc"
version = "0.49.1"
uri = "https://example.invalid/{filename}"
sha256 = "{sha256}"
stacks = ["*"]
"#
  );
  fs::write(dir.join("buildpack.toml"), descriptor).unwrap();
  Buildpack::load(dir).unwrap()
}

/// Write [`FAKE_FORC`] as a release archive and package it into a buildpack at `dir`.
pub fn write_fake_forc_buildpack(dir: &Path, scratch: &Path) -> Buildpack {
  let archive = write_tar_gz(
    &scratch.join("forc-binaries-linux_amd64.tar.gz"),
    &[("./forc-binaries/forc", FAKE_FORC.as_bytes(), 0o644)],
  );
  write_buildpack(dir, &archive)
}

/// Returns the shell command and args to execute a shell script.
#[cfg(unix)]
pub fn shell_cmd(script: &str) -> (&'static str, Vec<String>) {
  ("/bin/sh", vec!["-c".to_string(), script.to_string()])
}

#[cfg(windows)]
pub fn shell_cmd(script: &str) -> (&'static str, Vec<String>) {
  ("cmd.exe", vec!["/C".to_string(), script.to_string()])
}
