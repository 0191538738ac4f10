mod cmd;
mod output;

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use forc_buildpack_lib::consts::BP_LOG_LEVEL;
use tracing_subscriber::EnvFilter;

use crate::cmd::{cmd_build, cmd_detect, cmd_package};

/// Cloud Native Buildpack that installs forc and builds Sway contracts
#[derive(Parser)]
#[command(name = "forc-buildpack")]
#[command(author, version, about, long_about = None)]
struct Cli {
  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Decide whether the application is a Sway project
  Detect {
    /// Platform directory provided by the lifecycle
    platform: PathBuf,

    /// Where to write the build plan
    plan: PathBuf,
  },

  /// Install forc and build the contract
  Build {
    /// Layers directory provided by the lifecycle
    layers: PathBuf,

    /// Platform directory provided by the lifecycle
    platform: PathBuf,

    /// Buildpack plan to satisfy
    plan: PathBuf,
  },

  /// Write a runnable buildpack directory with pinned dependency hashes
  Package {
    /// Directory to write the buildpack into
    destination: PathBuf,

    /// Directory holding the source buildpack.toml (defaults to the current directory)
    #[arg(long)]
    source: Option<PathBuf>,

    /// Bundle every dependency artifact for use without network access
    #[arg(long)]
    offline: bool,
  },
}

fn main() -> ExitCode {
  init_tracing();

  let cli = Cli::parse_from(dispatch_args(std::env::args_os()));

  let result = match cli.command {
    Commands::Detect { platform, plan } => cmd_detect(&platform, &plan),
    Commands::Build { layers, platform, plan } => cmd_build(&layers, &platform, &plan).map(|_| ExitCode::SUCCESS),
    Commands::Package {
      destination,
      source,
      offline,
    } => cmd_package(&destination, source.as_deref(), offline).map(|_| ExitCode::SUCCESS),
  };

  match result {
    Ok(code) => code,
    Err(e) => {
      output::print_error(&render_error(&e));
      ExitCode::FAILURE
    }
  }
}

/// Join the error chain with `: `, skipping causes whose text the previous
/// message already includes.
fn render_error(err: &anyhow::Error) -> String {
  let mut message = String::new();
  let mut previous = String::new();
  for cause in err.chain() {
    let text = cause.to_string();
    if previous.contains(&text) {
      continue;
    }
    if !message.is_empty() {
      message.push_str(": ");
    }
    message.push_str(&text);
    previous = text;
  }
  message
}

fn init_tracing() {
  let filter = EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| EnvFilter::new(log_level(std::env::var(BP_LOG_LEVEL).ok().as_deref())));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stdout)
    .with_target(false)
    .without_time()
    .init();
}

/// Map `BP_LOG_LEVEL` to a filter directive. Only `DEBUG` raises verbosity.
fn log_level(value: Option<&str>) -> &'static str {
  match value {
    Some(level) if level.eq_ignore_ascii_case("debug") => "debug",
    _ => "info",
  }
}

/// Lifecycles invoke `bin/detect` and `bin/build` directly; when the binary is
/// reached through one of those names, treat the name as the subcommand.
fn dispatch_args<I>(args: I) -> Vec<OsString>
where
  I: IntoIterator<Item = OsString>,
{
  let mut args: Vec<OsString> = args.into_iter().collect();
  let phase = args
    .first()
    .and_then(|arg0| Path::new(arg0).file_name())
    .and_then(|name| name.to_str())
    .filter(|name| matches!(*name, "detect" | "build"))
    .map(OsString::from);
  if let Some(phase) = phase {
    args.insert(1, phase);
  }
  args
}
