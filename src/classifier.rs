//! # Classifier Module
//!
//! Resolves each file to a comment style and, for supported files, loads it
//! as a [`Document`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::trace;

use crate::comment_styles::StyleRegistry;
use crate::document::{DEFAULT_KEYWORDS, Document, Encoding};
use crate::error::ScanError;

/// Result of classifying a single file.
#[derive(Debug)]
pub enum Classification {
  /// The file maps to a known comment style and was loaded.
  Supported(Document),

  /// The file's extension maps to no comment style. Its content is never
  /// read.
  Unsupported { path: PathBuf },
}

/// Creates documents for the files of one scan.
#[derive(Debug, Clone)]
pub struct DocumentFactory {
  root: PathBuf,
  registry: Arc<StyleRegistry>,
  encoding: Encoding,
  keywords: Vec<String>,
}

impl DocumentFactory {
  /// # Parameters
  ///
  /// * `root` - Directory that relative paths are resolved against
  /// * `registry` - Extension to comment style mapping
  pub fn new(root: impl Into<PathBuf>, registry: Arc<StyleRegistry>) -> Self {
    Self {
      root: root.into(),
      registry,
      encoding: Encoding::default(),
      keywords: DEFAULT_KEYWORDS.iter().map(|k| (*k).to_string()).collect(),
    }
  }

  #[must_use]
  pub const fn with_encoding(mut self, encoding: Encoding) -> Self {
    self.encoding = encoding;
    self
  }

  #[must_use]
  pub fn with_keywords(mut self, keywords: Vec<String>) -> Self {
    self.keywords = keywords;
    self
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  /// Classifies `path` and loads it when its style is known.
  ///
  /// # Errors
  ///
  /// Returns [`ScanError::Read`] or [`ScanError::Decode`] if a supported
  /// file cannot be read.
  pub fn create(&self, path: &Path) -> Result<Classification, ScanError> {
    let path = if path.is_absolute() {
      path.to_path_buf()
    } else {
      self.root.join(path)
    };

    let style = self.registry.style_for_path(&path);
    if style.is_unknown() {
      return Ok(Classification::Unsupported { path });
    }

    trace!("Classified {} as {}", path.display(), style.name);
    let document = Document::load(&path, style, self.encoding, &self.keywords)?;
    Ok(Classification::Supported(document))
  }

  /// `path` relative to the root, for display. Falls back to the path itself
  /// when no relative form exists.
  pub fn relative_display(&self, path: &Path) -> String {
    pathdiff::diff_paths(path, &self.root)
      .filter(|relative| !relative.as_os_str().is_empty())
      .unwrap_or_else(|| path.to_path_buf())
      .display()
      .to_string()
  }
}

#[cfg(test)]
mod tests {
  use anyhow::Result;
  use tempfile::tempdir;

  use super::*;

  #[test]
  fn test_supported_file_is_loaded() -> Result<()> {
    let dir = tempdir()?;
    std::fs::write(dir.path().join("main.go"), "package main\n")?;

    let factory = DocumentFactory::new(dir.path(), Arc::new(StyleRegistry::with_default_mapping()));
    match factory.create(Path::new("main.go"))? {
      Classification::Supported(document) => {
        assert_eq!(document.style().name, "slashslash");
        assert_eq!(document.content(), "package main\n");
        assert_eq!(document.path(), dir.path().join("main.go"));
      }
      Classification::Unsupported { .. } => panic!("main.go should be supported"),
    }
    Ok(())
  }

  #[test]
  fn test_unsupported_file_is_not_read() -> Result<()> {
    let dir = tempdir()?;
    let factory = DocumentFactory::new(dir.path(), Arc::new(StyleRegistry::with_default_mapping()));

    // The file does not exist; classification must not touch it
    let classification = factory.create(&dir.path().join("unknown.bin"))?;
    assert!(matches!(classification, Classification::Unsupported { .. }));
    Ok(())
  }

  #[test]
  fn test_missing_supported_file_is_read_error() {
    let dir = tempdir().unwrap();
    let factory = DocumentFactory::new(dir.path(), Arc::new(StyleRegistry::with_default_mapping()));
    let err = factory.create(&dir.path().join("missing.rs")).unwrap_err();
    assert!(matches!(err, ScanError::Read { .. }));
  }

  #[test]
  fn test_relative_display() {
    let factory = DocumentFactory::new("/repo", Arc::new(StyleRegistry::new()));
    assert_eq!(factory.relative_display(Path::new("/repo/src/lib.rs")), "src/lib.rs");
    assert_eq!(factory.relative_display(Path::new("/repo")), "/repo");
  }
}
