//! # File I/O Module
//!
//! Reading and writing document content in the configured charset.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{ConfigError, ScanError};

/// Charset used to decode and encode every document in a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
  #[default]
  Utf8,
  /// ISO-8859-1: every byte maps to the code point of the same value.
  Latin1,
}

impl Encoding {
  pub const fn name(self) -> &'static str {
    match self {
      Self::Utf8 => "utf-8",
      Self::Latin1 => "iso-8859-1",
    }
  }

  /// Decodes raw file bytes.
  ///
  /// # Errors
  ///
  /// Returns [`ScanError::Decode`] if the bytes are not valid in this charset.
  pub fn decode(self, path: &Path, bytes: Vec<u8>) -> Result<String, ScanError> {
    match self {
      Self::Utf8 => String::from_utf8(bytes).map_err(|_| ScanError::Decode {
        path: path.to_path_buf(),
        encoding: self.name(),
      }),
      Self::Latin1 => Ok(bytes.into_iter().map(char::from).collect()),
    }
  }

  /// Encodes document content for writing.
  ///
  /// # Errors
  ///
  /// Returns [`ScanError::Encode`] if the content holds characters this
  /// charset cannot represent.
  pub fn encode(self, path: &Path, content: &str) -> Result<Vec<u8>, ScanError> {
    match self {
      Self::Utf8 => Ok(content.as_bytes().to_vec()),
      Self::Latin1 => content
        .chars()
        .map(|c| u8::try_from(u32::from(c)))
        .collect::<Result<Vec<u8>, _>>()
        .map_err(|_| ScanError::Encode {
          path: path.to_path_buf(),
          encoding: self.name(),
        }),
    }
  }
}

impl FromStr for Encoding {
  type Err = ConfigError;

  fn from_str(name: &str) -> Result<Self, Self::Err> {
    match name.trim().to_lowercase().replace('_', "-").as_str() {
      "utf-8" | "utf8" => Ok(Self::Utf8),
      "iso-8859-1" | "iso8859-1" | "latin1" | "latin-1" => Ok(Self::Latin1),
      _ => Err(ConfigError::UnsupportedEncoding { name: name.to_string() }),
    }
  }
}

impl fmt::Display for Encoding {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

/// File I/O operations for documents.
pub struct FileIO;

impl FileIO {
  /// Reads and decodes the full content of `path`.
  ///
  /// # Errors
  ///
  /// [`ScanError::Read`] when the file cannot be read, [`ScanError::Decode`]
  /// when its bytes are invalid in `encoding`.
  pub fn read(path: &Path, encoding: Encoding) -> Result<String, ScanError> {
    let bytes = std::fs::read(path).map_err(|source| ScanError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    encoding.decode(path, bytes)
  }

  /// Encodes `content` and writes it to `path`, replacing the file.
  ///
  /// # Errors
  ///
  /// [`ScanError::Encode`] when the content cannot be represented,
  /// [`ScanError::Write`] when the file cannot be written.
  pub fn write(path: &Path, content: &str, encoding: Encoding) -> Result<(), ScanError> {
    let bytes = encoding.encode(path, content)?;
    std::fs::write(path, bytes).map_err(|source| ScanError::Write {
      path: path.to_path_buf(),
      source,
    })
  }
}
