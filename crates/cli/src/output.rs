//! CLI output formatting utilities.
//!
//! Colored status lines, change markers and duration formatting shared by
//! the subcommands. Everything human-readable goes through here; `-o json`
//! bypasses it with `print_json`.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{OwoColorize, Stream};
use sfdelta_lib::consts::HASH_PREFIX_LEN;
use sfdelta_lib::job::JobResult;

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

pub mod symbols {
  pub const SUCCESS: &str = "✓";
  pub const ERROR: &str = "✗";
  pub const WARNING: &str = "⚠";
  pub const INFO: &str = "•";
  pub const ARROW: &str = "→";
  pub const ADD: &str = "+";
  pub const MODIFY: &str = "~";
  pub const REMOVE: &str = "-";
}

pub fn truncate_hash(hash: &str) -> &str {
  let len = hash.len().min(HASH_PREFIX_LEN);
  &hash[..len]
}

pub fn format_duration(duration: Duration) -> String {
  let secs = duration.as_secs();
  let millis = duration.subsec_millis();

  if secs >= 60 {
    let mins = secs / 60;
    let remaining_secs = secs % 60;
    format!("{}m {}s", mins, remaining_secs)
  } else if secs > 0 {
    format!("{}.{:02}s", secs, millis / 10)
  } else {
    format!("{}ms", millis)
  }
}

/// Relative age of a unix timestamp, e.g. "3 hours ago".
pub fn format_age(timestamp: u64) -> String {
  let datetime = UNIX_EPOCH + Duration::from_secs(timestamp);
  match SystemTime::now().duration_since(datetime) {
    Ok(duration) => {
      let secs = duration.as_secs();
      if secs < 60 {
        format!("{} seconds ago", secs)
      } else if secs < 3600 {
        format!("{} minutes ago", secs / 60)
      } else if secs < 86400 {
        format!("{} hours ago", secs / 3600)
      } else {
        format!("{} days ago", secs / 86400)
      }
    }
    Err(_) => format!("timestamp: {}", timestamp),
  }
}

pub fn print_added(line: &str) {
  println!(
    "  {} {}",
    symbols::ADD.if_supports_color(Stream::Stdout, |s| s.green()),
    line
  );
}

pub fn print_modified(line: &str) {
  println!(
    "  {} {}",
    symbols::MODIFY.if_supports_color(Stream::Stdout, |s| s.yellow()),
    line
  );
}

pub fn print_removed(line: &str) {
  println!(
    "  {} {}",
    symbols::REMOVE.if_supports_color(Stream::Stdout, |s| s.red()),
    line
  );
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

pub fn print_warning(message: &str) {
  eprintln!(
    "{} {}",
    symbols::WARNING.if_supports_color(Stream::Stderr, |s| s.yellow()),
    message.if_supports_color(Stream::Stderr, |s| s.yellow())
  );
}

pub fn print_info(message: &str) {
  println!(
    "{} {}",
    symbols::INFO.if_supports_color(Stream::Stdout, |s| s.blue()),
    message
  );
}

pub fn print_stat(label: &str, value: &str) {
  println!(
    "  {}: {}",
    label.if_supports_color(Stream::Stdout, |s| s.dimmed()),
    value
  );
}

/// Per-component failures and warnings of a finished job.
pub fn print_job_details(job: &JobResult) {
  for failure in job.failures() {
    print_error(&format!("{}: {}", failure.identity, failure.error_messages.join("; ")));
  }
  for warning in job.warnings() {
    print_warning(&format!("{}: {}", warning.identity, warning.error_messages.join("; ")));
  }
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}
