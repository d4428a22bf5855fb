//! # Error Module
//!
//! Typed errors for the header engine.
//!
//! [`ConfigError`] covers everything that is detected before a single file is
//! read: bad templates, unknown comment styles, invalid configuration values.
//! [`ScanError`] covers failures that happen while the orchestrator is working
//! through the file set.

use std::path::PathBuf;

/// Error raised while assembling the engine's configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  /// A `${name}` placeholder has no property value and no section default.
  #[error("No value supplied for header placeholder '${{{name}}}'")]
  UnresolvedPlaceholder { name: String },

  /// An extension was mapped to a style name that is not in the catalog.
  #[error("The provided header type ({style}) for {extension} is invalid")]
  UnknownHeaderStyle { style: String, extension: String },

  /// A custom comment style definition is malformed.
  #[error("Invalid comment style '{name}': {message}")]
  InvalidCommentStyle { name: String, message: String },

  /// The configured charset is not supported.
  #[error("Unsupported encoding '{name}' (expected utf-8 or iso-8859-1)")]
  UnsupportedEncoding { name: String },

  /// A property provider name does not match any registered provider.
  #[error("Unknown property provider '{name}'")]
  UnknownProvider { name: String },

  /// A regex or glob in the configuration failed to compile.
  #[error("Invalid pattern '{pattern}': {message}")]
  InvalidPattern { pattern: String, message: String },

  /// The worker sizing parameters are out of range.
  #[error("Invalid concurrency setting: {message}")]
  InvalidConcurrency { message: String },

  /// The config file could not be read.
  #[error("Failed to read config file '{path}': {source}")]
  ReadError { path: PathBuf, source: std::io::Error },

  /// The config file contains invalid TOML.
  #[error("Failed to parse config file '{path}': {source}")]
  ParseError { path: PathBuf, source: toml::de::Error },
}

/// Error raised by the scan orchestrator or one of its per-file tasks.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
  /// A document's header could not be resolved from its properties.
  #[error("Failed to resolve header for '{path}': {source}")]
  Config { path: PathBuf, source: ConfigError },

  #[error("Failed to read file '{path}': {source}")]
  Read { path: PathBuf, source: std::io::Error },

  #[error("Failed to write file '{path}': {source}")]
  Write { path: PathBuf, source: std::io::Error },

  /// The file's bytes are not valid in the configured charset.
  #[error("Failed to decode '{path}' as {encoding}")]
  Decode { path: PathBuf, encoding: &'static str },

  /// The document content holds characters the configured charset cannot
  /// represent.
  #[error("Failed to encode '{path}' as {encoding}")]
  Encode { path: PathBuf, encoding: &'static str },

  /// A worker task panicked while processing the given file.
  #[error("Worker panicked while processing '{path}': {message}")]
  WorkerPanicked { path: PathBuf, message: String },

  /// The worker pool could not be started.
  #[error("Failed to start worker pool: {0}")]
  Pool(#[from] rayon::ThreadPoolBuildError),
}

impl ScanError {
  /// Path of the file the error relates to, when there is one.
  pub fn path(&self) -> Option<&std::path::Path> {
    match self {
      Self::Config { path, .. }
      | Self::Read { path, .. }
      | Self::Write { path, .. }
      | Self::Decode { path, .. }
      | Self::Encode { path, .. }
      | Self::WorkerPanicked { path, .. } => Some(path),
      Self::Pool(_) => None,
    }
  }
}
