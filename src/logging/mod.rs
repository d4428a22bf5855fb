//! # Logging Module
//!
//! Output helpers for headerwarden:
//! - Lifecycle messages ("Missing header in: ...") that the user always sees
//!   unless `--quiet` is given
//! - Verbose messages shown only with `--verbose`
//! - Setup of the `tracing` subscriber used for diagnostics
//!
//! Lifecycle messages go to stdout so they can be piped; verbose messages and
//! `tracing` output go to stderr.
//!
//! ## Example
//!
//! ```rust
//! use headerwarden::logging::{ColorMode, set_verbose};
//! use headerwarden::{info_log, verbose_log};
//!
//! set_verbose();
//! ColorMode::Never.apply();
//!
//! verbose_log!("Processing file: {}", "example.rs");
//! info_log!("Missing header in: {}", "example.rs");
//! ```

mod modes;

pub use modes::{ColorMode, default_directive, init_tracing, is_quiet, is_verbose, set_quiet, set_verbose};
use owo_colors::{OwoColorize, Stream};

/// Logs a message to stderr if verbose mode is enabled.
///
/// Uses the same format string syntax as [`eprintln!`].
#[macro_export]
macro_rules! verbose_log {
    ($($arg:tt)*) => {
        if $crate::logging::is_verbose() {
            eprintln!($($arg)*);
        }
    };
}

/// Logs a lifecycle message to stdout unless quiet mode is enabled.
///
/// Uses the same format string syntax as [`println!`].
#[macro_export]
macro_rules! info_log {
    ($($arg:tt)*) => {
        if !$crate::logging::is_quiet() {
            $crate::logging::print_info_log(&format!($($arg)*));
        }
    };
}

/// Prints a lifecycle message, colored when stdout supports it.
///
/// Used by the [`info_log!`] macro.
pub fn print_info_log(message: &str) {
  println!("{}", message.if_supports_color(Stream::Stdout, |m| m.yellow()));
}
