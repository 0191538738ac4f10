//! forc-buildpack-lib: a Cloud Native Buildpack that installs the Fuel `forc` toolchain
//!
//! The crate is organized around the two buildpack phases:
//! - `detect`: passes when the application has a `Forc.toml`
//! - `build`: resolves configuration and the `forc` release for the target
//!   platform, then contributes a layer holding the toolchain, a deploy wallet
//!   and the fetched Sway dependencies, after building the contract
//! - `lifecycle`: reads and writes the files exchanged with the CNB lifecycle
//! - `package`: lays out a runnable buildpack directory with pinned dependencies
//!
//! Supporting modules mirror libpak: plan, configuration and dependency
//! resolution, a dependency cache, archive extraction and process execution.

pub mod archive;
pub mod build;
pub mod buildpack;
pub mod config;
pub mod consts;
pub mod copy;
pub mod dependency;
pub mod detect;
pub mod env;
pub mod exec;
pub mod forc;
pub mod launch;
pub mod layer;
pub mod lifecycle;
pub mod package;
pub mod plan;
pub mod platform;
pub mod util;
pub mod wallet;
