//! # Callback Module
//!
//! The policies that act on each document's verdict.
//!
//! [`CheckPolicy`] only records files that lack an acceptable header.
//! [`FormatPolicy`] rewrites them, in place or into a `.licensed` preview
//! next to the original. Both may be called from many worker threads at once
//! and keep their record of affected files behind an internal lock.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::debug;

use crate::document::Document;
use crate::error::ScanError;
use crate::info_log;
use crate::templates::HeaderTemplate;

/// Suffix appended to a file name for dry-run output.
pub const DRY_RUN_SUFFIX: &str = ".licensed";

/// Reacts to the matching verdict for each document.
pub trait HeaderCallback: Send + Sync {
  /// Called when the document has no header, or one that matches neither
  /// the canonical header nor any alternate.
  ///
  /// # Errors
  ///
  /// Returns a [`ScanError`] when the document cannot be saved.
  fn on_header_not_found(&self, document: &mut Document, header: &HeaderTemplate) -> Result<(), ScanError>;

  /// Called when the document carries an acceptable header.
  ///
  /// # Errors
  ///
  /// Returns a [`ScanError`] on I/O failure.
  fn on_existing_header(&self, document: &mut Document, header: &HeaderTemplate) -> Result<(), ScanError>;

  /// Whether the scan should be reported as failed.
  fn had_failure(&self) -> bool;

  /// Files this policy recorded, sorted.
  fn affected_files(&self) -> Vec<PathBuf>;
}

/// Append-only set of paths shared by worker threads.
#[derive(Debug, Default)]
struct AffectedFiles(Mutex<BTreeSet<PathBuf>>);

impl AffectedFiles {
  fn insert(&self, path: &Path) {
    self
      .0
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .insert(path.to_path_buf());
  }

  fn is_empty(&self) -> bool {
    self.0.lock().unwrap_or_else(PoisonError::into_inner).is_empty()
  }

  fn to_vec(&self) -> Vec<PathBuf> {
    self
      .0
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .iter()
      .cloned()
      .collect()
  }
}

/// Records files without an acceptable header. Never modifies files.
#[derive(Debug)]
pub struct CheckPolicy {
  report_non_canonical: bool,
  missing: AffectedFiles,
}

impl CheckPolicy {
  /// # Parameters
  ///
  /// * `report_non_canonical` - Whether a file whose header is present but
  ///   unrecognized counts as missing. Files with no header at all are always
  ///   recorded.
  pub fn new(report_non_canonical: bool) -> Self {
    Self {
      report_non_canonical,
      missing: AffectedFiles::default(),
    }
  }
}

impl Default for CheckPolicy {
  fn default() -> Self {
    Self::new(true)
  }
}

impl HeaderCallback for CheckPolicy {
  fn on_header_not_found(&self, document: &mut Document, _header: &HeaderTemplate) -> Result<(), ScanError> {
    document.parse_header();
    if document.header_detected() && !self.report_non_canonical {
      debug!("Ignoring non-canonical header in: {}", document.path().display());
      return Ok(());
    }

    info_log!("Missing header in: {}", document.path().display());
    self.missing.insert(document.path());
    Ok(())
  }

  fn on_existing_header(&self, document: &mut Document, _header: &HeaderTemplate) -> Result<(), ScanError> {
    debug!("Header OK in: {}", document.path().display());
    Ok(())
  }

  fn had_failure(&self) -> bool {
    !self.missing.is_empty()
  }

  fn affected_files(&self) -> Vec<PathBuf> {
    self.missing.to_vec()
  }
}

/// Inserts or replaces headers. Never reports failure.
#[derive(Debug)]
pub struct FormatPolicy {
  dry_run: bool,
  skip_existing_headers: bool,
  blank_line_after_header: bool,
  updated: AffectedFiles,
}

impl FormatPolicy {
  /// # Parameters
  ///
  /// * `dry_run` - Write `<name>.licensed` next to each file instead of
  ///   modifying it
  /// * `skip_existing_headers` - Leave files that already have some header
  ///   untouched
  /// * `blank_line_after_header` - Separate the inserted header from the body
  ///   with one blank line
  pub fn new(dry_run: bool, skip_existing_headers: bool, blank_line_after_header: bool) -> Self {
    Self {
      dry_run,
      skip_existing_headers,
      blank_line_after_header,
      updated: AffectedFiles::default(),
    }
  }

  /// Path of the dry-run preview for `path`.
  pub fn preview_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(DRY_RUN_SUFFIX);
    path.with_file_name(name)
  }
}

impl HeaderCallback for FormatPolicy {
  fn on_header_not_found(&self, document: &mut Document, header: &HeaderTemplate) -> Result<(), ScanError> {
    document.parse_header();
    if document.header_detected() {
      if self.skip_existing_headers {
        debug!("Keeping license header in: {}", document.path().display());
        return Ok(());
      }
      document.remove_header();
    }

    info_log!("Updating license header in: {}", document.path().display());
    document.update_header(header);

    if self.blank_line_after_header {
      let body = document.body();
      if !body.is_empty() && !body.starts_with('\n') && !body.starts_with("\r\n") {
        let eol = document.line_ending().as_str();
        document.insert_after_header(eol);
      }
    }

    self.updated.insert(document.path());

    if self.dry_run {
      let preview = Self::preview_path(document.path());
      debug!("Result saved to: {}", preview.display());
      document.save_to(&preview)
    } else {
      document.save()
    }
  }

  fn on_existing_header(&self, document: &mut Document, _header: &HeaderTemplate) -> Result<(), ScanError> {
    debug!("Header OK in: {}", document.path().display());
    Ok(())
  }

  fn had_failure(&self) -> bool {
    false
  }

  fn affected_files(&self) -> Vec<PathBuf> {
    self.updated.to_vec()
  }
}

#[cfg(test)]
mod tests {
  use std::collections::HashMap;
  use std::sync::Arc;

  use anyhow::Result;
  use tempfile::tempdir;

  use super::*;
  use crate::comment_styles::CommentStyle;

  fn template() -> HeaderTemplate {
    HeaderTemplate::build("Copyright 2024 Acme", &HashMap::new()).unwrap()
  }

  fn load(path: &Path) -> Result<Document> {
    Ok(Document::load(
      path,
      Arc::new(CommentStyle::slash_slash()),
      Default::default(),
      &["copyright".to_string()],
    )?)
  }

  #[test]
  fn test_check_policy_records_missing_header_once() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("a.go");
    std::fs::write(&path, "package main\n")?;

    let policy = CheckPolicy::default();
    let mut document = load(&path)?;
    policy.on_header_not_found(&mut document, &template())?;
    policy.on_header_not_found(&mut document, &template())?;

    assert!(policy.had_failure());
    assert_eq!(policy.affected_files(), vec![path.clone()]);
    assert_eq!(std::fs::read_to_string(&path)?, "package main\n");
    Ok(())
  }

  #[test]
  fn test_check_policy_can_ignore_non_canonical_headers() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("a.go");
    std::fs::write(&path, "// Copyright 1999 Other\n\npackage main\n")?;

    let policy = CheckPolicy::new(false);
    let mut document = load(&path)?;
    policy.on_header_not_found(&mut document, &template())?;

    assert!(!policy.had_failure());
    assert!(policy.affected_files().is_empty());
    Ok(())
  }

  #[test]
  fn test_format_policy_inserts_header_with_blank_line() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("a.go");
    std::fs::write(&path, "package main\n")?;

    let policy = FormatPolicy::new(false, false, true);
    let mut document = load(&path)?;
    policy.on_header_not_found(&mut document, &template())?;

    assert_eq!(std::fs::read_to_string(&path)?, "// Copyright 2024 Acme\n\npackage main\n");
    assert!(!policy.had_failure());
    assert_eq!(policy.affected_files(), vec![path]);
    Ok(())
  }

  #[test]
  fn test_format_policy_without_blank_line() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("a.go");
    std::fs::write(&path, "package main\n")?;

    let policy = FormatPolicy::new(false, false, false);
    let mut document = load(&path)?;
    policy.on_header_not_found(&mut document, &template())?;

    assert_eq!(std::fs::read_to_string(&path)?, "// Copyright 2024 Acme\npackage main\n");
    Ok(())
  }

  #[test]
  fn test_format_policy_replaces_old_header() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("a.go");
    std::fs::write(&path, "// Copyright 1999 Other\n// Line two\n\npackage main\n")?;

    let policy = FormatPolicy::new(false, false, true);
    let mut document = load(&path)?;
    policy.on_header_not_found(&mut document, &template())?;

    assert_eq!(std::fs::read_to_string(&path)?, "// Copyright 2024 Acme\n\npackage main\n");
    Ok(())
  }

  #[test]
  fn test_format_policy_skip_existing_headers() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("a.go");
    let original = "// Copyright 1999 Other\n\npackage main\n";
    std::fs::write(&path, original)?;

    let policy = FormatPolicy::new(false, true, true);
    let mut document = load(&path)?;
    policy.on_header_not_found(&mut document, &template())?;

    assert_eq!(std::fs::read_to_string(&path)?, original);
    assert!(policy.affected_files().is_empty());
    Ok(())
  }

  #[test]
  fn test_format_policy_dry_run_writes_preview() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("a.go");
    std::fs::write(&path, "package main\n")?;

    let policy = FormatPolicy::new(true, false, true);
    let mut document = load(&path)?;
    policy.on_header_not_found(&mut document, &template())?;

    assert_eq!(std::fs::read_to_string(&path)?, "package main\n");
    assert_eq!(
      std::fs::read_to_string(dir.path().join("a.go.licensed"))?,
      "// Copyright 2024 Acme\n\npackage main\n"
    );
    Ok(())
  }

  #[test]
  fn test_preview_path() {
    assert_eq!(
      FormatPolicy::preview_path(Path::new("/src/main.rs")),
      PathBuf::from("/src/main.rs.licensed")
    );
  }
}
