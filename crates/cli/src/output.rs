//! CLI output formatting utilities.
//!
//! Status lines go to stdout alongside the build log; errors go to stderr.

use owo_colors::{OwoColorize, Stream};

pub mod symbols {
  pub const SUCCESS: &str = "✓";
  pub const ERROR: &str = "✗";
  pub const INFO: &str = "•";
}

/// Print the buildpack title in bold, with its homepage underneath when set.
pub fn print_title(title: &str, homepage: Option<&str>) {
  println!("{}", title.if_supports_color(Stream::Stdout, |s| s.bold()));
  if let Some(homepage) = homepage.filter(|h| !h.is_empty()) {
    println!("  {}", homepage.if_supports_color(Stream::Stdout, |s| s.dimmed()));
  }
}

pub fn print_success(message: &str) {
  println!(
    "{} {}",
    symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green()),
    message
  );
}

pub fn print_error(message: &str) {
  eprintln!(
    "{} {}",
    symbols::ERROR.if_supports_color(Stream::Stderr, |s| s.red()),
    message.if_supports_color(Stream::Stderr, |s| s.red())
  );
}

pub fn print_info(message: &str) {
  println!(
    "{} {}",
    symbols::INFO.if_supports_color(Stream::Stdout, |s| s.blue()),
    message
  );
}
