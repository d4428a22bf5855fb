//! # Output Module
//!
//! All user-facing terminal output of the CLI: consistent formatting, colors
//! and symbols.
//!
//! - Lists are sorted and shown relative to the scan root
//! - Long lists are truncated unless `-v` is given
//! - With `-q` only bare file paths are printed, for scripting

use std::path::{Path, PathBuf};
use std::time::Duration;

use owo_colors::{OwoColorize, Stream};

use crate::logging::{is_quiet, is_verbose};
use crate::processor::ScanOutcome;

/// Symbols used in output
pub mod symbols {
  /// Success/has header
  pub const SUCCESS: &str = "\u{2713}"; // ✓
  /// Missing header/failure
  pub const FAILURE: &str = "\u{2717}"; // ✗
  /// Header rewritten
  pub const UPDATED: &str = "\u{21bb}"; // ↻
}

/// Maximum number of files to show in the default output before truncating
const DEFAULT_FILE_LIST_LIMIT: usize = 20;

/// Print the initial "Checking N files..." or "Formatting N files..." message.
pub fn print_start_message(file_count: usize, format_mode: bool) {
  if is_quiet() {
    return;
  }

  let verb = if format_mode { "Formatting" } else { "Checking" };
  println!("{} {} {}...", verb, file_count, plural(file_count));
}

/// Print a blank line for visual separation (respects quiet mode).
pub fn print_blank_line() {
  if !is_quiet() {
    println!();
  }
}

/// Print the list of files missing headers.
///
/// In quiet mode only the bare paths are printed.
pub fn print_missing_files(files: &[PathBuf], root: &Path, limit: Option<usize>) {
  if files.is_empty() {
    return;
  }

  if is_quiet() {
    for path in sorted_display_paths(files, root) {
      println!("{path}");
    }
    return;
  }

  let header = format!(
    "{} {} {} missing license headers:",
    symbols::FAILURE.if_supports_color(Stream::Stdout, |s| s.red()),
    files.len(),
    plural(files.len())
  );
  print_file_list(&header, files, root, limit);
}

/// Print the list of files whose header was inserted or replaced.
pub fn print_updated_files(files: &[PathBuf], root: &Path, dry_run: bool) {
  if is_quiet() || files.is_empty() {
    return;
  }

  let verb = if dry_run { "Would update" } else { "Updated" };
  let header = format!(
    "{} {} license header in {} {}:",
    symbols::UPDATED.if_supports_color(Stream::Stdout, |s| s.yellow()),
    verb,
    files.len(),
    plural(files.len())
  );
  print_file_list(&header, files, root, None);
}

fn print_file_list(header: &str, files: &[PathBuf], root: &Path, limit: Option<usize>) {
  println!("{header}");

  let paths = sorted_display_paths(files, root);
  let count = paths.len();
  let show_all = is_verbose();
  let effective_limit = if show_all {
    count
  } else {
    limit.unwrap_or(DEFAULT_FILE_LIST_LIMIT)
  };

  for path in paths.iter().take(effective_limit) {
    println!("  {path}");
  }

  if !show_all && count > effective_limit {
    println!(
      "  {} ... and {} more (use -v to see all)",
      "".if_supports_color(Stream::Stdout, |s| s.dimmed()),
      count - effective_limit
    );
  }
}

/// Print the success message when all files have acceptable headers.
pub fn print_all_files_ok() {
  if is_quiet() {
    return;
  }

  println!(
    "{} All files have license headers.",
    symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green())
  );
}

/// Print the scan summary.
///
/// Format: "Summary: X OK, Y missing, Z differ, W unsupported"
/// In verbose mode, also shows timing.
pub fn print_summary(outcome: &ScanOutcome, elapsed: Duration) {
  if is_quiet() {
    return;
  }

  let ok_count = outcome.canonical + outcome.alternate;
  let ok_str = ok_count.if_supports_color(Stream::Stdout, |s| s.cyan());
  let missing_str = if outcome.absent > 0 {
    outcome
      .absent
      .if_supports_color(Stream::Stdout, |s| s.red())
      .to_string()
  } else {
    outcome
      .absent
      .if_supports_color(Stream::Stdout, |s| s.cyan())
      .to_string()
  };
  let unsupported_str = outcome
    .unsupported_files
    .len()
    .if_supports_color(Stream::Stdout, |s| s.dimmed())
    .to_string();

  let mut summary_line = format!(
    "Summary: {} OK, {} missing, {} differ, {} unsupported",
    ok_str, missing_str, outcome.differs, unsupported_str
  );

  if outcome.interrupted {
    summary_line.push_str(&format!(", {} cancelled", outcome.cancelled));
  }

  if is_verbose() {
    summary_line.push_str(&format!(" ({:.2}s)", elapsed.as_secs_f64()));
  }

  println!("{summary_line}");
}

/// Print a hint for the user about what to do next.
pub fn print_hint(message: &str) {
  if is_quiet() {
    return;
  }

  println!("{}", message.if_supports_color(Stream::Stdout, |s| s.yellow()));
}

const fn plural(count: usize) -> &'static str {
  if count == 1 { "file" } else { "files" }
}

fn sorted_display_paths(files: &[PathBuf], root: &Path) -> Vec<String> {
  let mut paths: Vec<String> = files.iter().map(|path| make_relative_path(path, root)).collect();
  paths.sort();
  paths
}

/// Make a path relative to the scan root for display.
fn make_relative_path(path: &Path, root: &Path) -> String {
  path
    .strip_prefix(root)
    .map(|p| p.to_string_lossy().to_string())
    .unwrap_or_else(|_| path.to_string_lossy().to_string())
}
