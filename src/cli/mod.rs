//! # CLI Module
//!
//! This module contains the command-line interface implementation.
//! It uses clap for argument parsing, with one subcommand per outcome
//! policy.

mod scan;

use clap::builder::styling::{AnsiColor, Color, Style, Styles};
use clap::{Parser, Subcommand};
pub use scan::{CheckArgs, FormatArgs, ScanArgs, run_check, run_format};

const CUSTOM_STYLES: Styles = Styles::styled()
  .header(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Green))).bold())
  .usage(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Green))).bold())
  .literal(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Blue))).bold())
  .placeholder(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Cyan))))
  .error(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Red))).bold())
  .valid(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Green))))
  .invalid(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Yellow))));

/// Top-level CLI arguments
#[derive(Parser, Debug)]
#[command(
  author,
  version,
  about,
  styles = CUSTOM_STYLES,
  after_help = "Examples:
  # Report files without the header in HEADER.txt
  headerwarden check --header HEADER.txt src/

  # Insert or replace headers, filling ${year} and ${owner}
  headerwarden format --header HEADER.txt -D year=2024 -D owner=Acme .

  # Preview changes in sibling .licensed files
  headerwarden format --header HEADER.txt --dry-run src/

  # Accept an older header and map a custom extension
  headerwarden check --header HEADER.txt --valid-header OLD.txt --mapping tmpl=xml .

  # Write a JSON report of the scan
  headerwarden check --header HEADER.txt --report-json report.json src/
",
  help_template = "{before-help}{name} v{version}
{about-section}
{usage-heading} {usage}

{all-args}{after-help}
"
)]
pub struct Cli {
  #[command(subcommand)]
  pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
  /// Report files whose license header is missing (exit code 1 if any)
  Check(CheckArgs),

  /// Insert or replace license headers
  Format(FormatArgs),
}

impl Cli {
  /// Parse CLI arguments and return the Cli struct
  pub fn parse_args() -> Self {
    Self::parse()
  }
}
