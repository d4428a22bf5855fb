//! # headerwarden
//!
//! Command-line front-end: checks and repairs license headers across a
//! source tree.

use anyhow::Result;
use headerwarden::cli::{Cli, Command, run_check, run_format};

fn main() -> Result<()> {
  let cli = Cli::parse_args();

  match cli.command {
    Command::Check(args) => run_check(args),
    Command::Format(args) => run_format(args),
  }
}
