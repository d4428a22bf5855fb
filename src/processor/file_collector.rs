//! # File Collector Module
//!
//! Expands command-line inputs (files, directories, glob patterns) into the
//! sorted, de-duplicated list of absolute paths that a scan consumes.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, trace};
use walkdir::WalkDir;

use crate::callback::DRY_RUN_SUFFIX;
use crate::error::ConfigError;

/// Directory names never descended into.
const SKIPPED_DIRS: &[&str] = &[".git", ".hg", ".svn"];

/// Collects the files of a scan.
///
/// The `FileCollector` handles:
/// - Resolving inputs relative to the root
/// - Walking directories recursively
/// - Expanding glob patterns
/// - Dropping excluded paths and dry-run previews
#[derive(Debug)]
pub struct FileCollector {
  root: PathBuf,
  excludes: Vec<glob::Pattern>,
}

impl FileCollector {
  /// # Parameters
  ///
  /// * `root` - Directory that relative inputs and exclude patterns are
  ///   resolved against
  pub const fn new(root: PathBuf) -> Self {
    Self {
      root,
      excludes: Vec::new(),
    }
  }

  /// Adds glob patterns for files to leave out. Patterns are matched against
  /// the path relative to the root.
  ///
  /// # Errors
  ///
  /// Returns [`ConfigError::InvalidPattern`] for a malformed glob.
  pub fn with_excludes(mut self, patterns: &[String]) -> Result<Self, ConfigError> {
    for pattern in patterns {
      let compiled = glob::Pattern::new(pattern).map_err(|e| ConfigError::InvalidPattern {
        pattern: pattern.clone(),
        message: e.to_string(),
      })?;
      self.excludes.push(compiled);
    }
    Ok(self)
  }

  /// Expands `inputs` into absolute file paths.
  ///
  /// An input naming an existing directory contributes every file below it,
  /// an existing file contributes itself, and anything else is treated as a
  /// glob pattern relative to the root. An empty input list scans the root.
  ///
  /// # Errors
  ///
  /// Fails on an invalid glob pattern.
  pub fn collect(&self, inputs: &[String]) -> Result<Vec<PathBuf>> {
    let start_time = std::time::Instant::now();
    let mut files = BTreeSet::new();

    if inputs.is_empty() {
      self.walk(&self.root, &mut files);
    }

    for input in inputs {
      let path = self.resolve(Path::new(input));
      if path.is_dir() {
        self.walk(&path, &mut files);
      } else if path.is_file() {
        files.insert(path);
      } else {
        let pattern = normalize_path_string(&path.to_string_lossy().replace('\\', "/"));
        let matches = glob::glob(&pattern).with_context(|| format!("Invalid glob pattern: {input}"))?;
        for entry in matches.flatten() {
          if entry.is_file() {
            files.insert(entry);
          }
        }
      }
    }

    let files: Vec<PathBuf> = files.into_iter().filter(|path| self.is_included(path)).collect();
    debug!(
      "Collected {} files in {}ms",
      files.len(),
      start_time.elapsed().as_millis()
    );
    Ok(files)
  }

  fn resolve(&self, path: &Path) -> PathBuf {
    if path.is_absolute() {
      path.to_path_buf()
    } else {
      self.root.join(path)
    }
  }

  fn walk(&self, dir: &Path, files: &mut BTreeSet<PathBuf>) {
    debug!("Scanning directory: {}", dir.display());
    let walker = WalkDir::new(dir).follow_links(false).into_iter().filter_entry(|entry| {
      !(entry.file_type().is_dir() && SKIPPED_DIRS.iter().any(|name| entry.file_name() == *name))
    });

    for entry in walker {
      match entry {
        Ok(entry) if entry.file_type().is_file() => {
          files.insert(entry.into_path());
        }
        Ok(_) => {}
        Err(e) => debug!("Skipping unreadable entry: {}", e),
      }
    }
  }

  fn is_included(&self, path: &Path) -> bool {
    if path.to_string_lossy().ends_with(DRY_RUN_SUFFIX) {
      trace!("Skipping dry-run output: {}", path.display());
      return false;
    }

    let relative = normalize_relative_path(path, &self.root);
    let excluded = self
      .excludes
      .iter()
      .any(|pattern| pattern.matches_path(&relative) || pattern.matches_path(path));
    if excluded {
      trace!("Excluded: {}", path.display());
    }
    !excluded
  }
}

/// Converts a potentially relative path to an absolute path.
///
/// # Errors
///
/// Fails if the current directory cannot be determined.
pub fn absolutize_path(path: &Path) -> Result<PathBuf> {
  if path.is_absolute() {
    Ok(path.to_path_buf())
  } else {
    let current_dir = std::env::current_dir().with_context(|| "Failed to get current directory")?;
    Ok(current_dir.join(path))
  }
}

/// Normalizes a path to be relative to a given directory.
///
/// # Parameters
///
/// * `path` - The path to normalize
/// * `base` - The directory to make the path relative to
pub fn normalize_relative_path(path: &Path, base: &Path) -> PathBuf {
  if path.is_absolute() {
    if let Ok(stripped) = path.strip_prefix(base) {
      return stripped.to_path_buf();
    }

    if let Some(rel_path) = pathdiff::diff_paths(path, base) {
      return rel_path;
    }
  }

  let mut normalized = PathBuf::new();
  for component in path.components() {
    if matches!(component, std::path::Component::CurDir) {
      continue;
    }
    normalized.push(component.as_os_str());
  }

  if normalized.as_os_str().is_empty() {
    PathBuf::from(".")
  } else {
    normalized
  }
}

/// Normalizes a path string by resolving `..` segments.
///
/// Used for glob patterns, which cannot go through `PathBuf` canonicalization
/// because they may contain wildcards.
///
/// # Examples
/// - `subdir/../other/**/*.rs` -> `other/**/*.rs`
/// - `../other/*.rs` -> `../other/*.rs` (can't resolve, keeps as-is)
pub fn normalize_path_string(path: &str) -> String {
  let mut components: Vec<&str> = Vec::new();

  for segment in path.split('/') {
    match segment {
      ".." => {
        if let Some(last) = components.last()
          && *last != ".."
          && !last.is_empty()
        {
          components.pop();
          continue;
        }
        components.push(segment);
      }
      "." => {}
      _ => components.push(segment),
    }
  }

  components.join("/")
}
