//! # Report Module
//!
//! Machine-readable JSON report of a scan.
//!
//! The report lists every file the scan acted on (missing headers in check
//! mode, rewritten files in format mode) and every unsupported file, with
//! paths relative to the scan root, plus the aggregate counts.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::processor::ScanOutcome;
use crate::processor::file_collector::normalize_relative_path;

/// Which policy produced the scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
  Check,
  Format,
}

/// Status of a listed file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
  /// No acceptable header (check mode)
  Missing,
  /// Header inserted or replaced (format mode)
  Updated,
  /// Extension maps to no comment style
  Unsupported,
}

/// A file listed in the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReport {
  /// Path relative to the scan root
  #[serde(with = "path_serialization")]
  pub path: PathBuf,
  pub status: FileStatus,
}

/// Helper module for serializing/deserializing PathBuf
mod path_serialization {
  use std::path::PathBuf;

  use serde::{Deserialize, Deserializer, Serializer};

  pub fn serialize<S>(path: &std::path::Path, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: Serializer,
  {
    serializer.serialize_str(&path.to_string_lossy().replace('\\', "/"))
  }

  pub fn deserialize<'de, D>(deserializer: D) -> Result<PathBuf, D::Error>
  where
    D: Deserializer<'de>,
  {
    let s = String::deserialize(deserializer)?;
    Ok(PathBuf::from(s))
  }
}

/// Aggregate counts of a scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
  pub total_files: usize,
  pub canonical: usize,
  pub alternate: usize,
  pub differs: usize,
  pub absent: usize,
  pub unsupported: usize,
  pub skipped: usize,
  pub cancelled: usize,
  pub affected: usize,
  pub had_failure: bool,
  pub interrupted: bool,
  #[serde(rename = "processing_time_seconds")]
  pub processing_time_secs: f64,
}

/// The full report document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
  pub mode: ScanMode,
  /// RFC 3339 timestamp of report creation
  pub generated_at: String,
  pub summary: ReportSummary,
  pub files: Vec<FileReport>,
}

impl ScanReport {
  /// Builds a report from `outcome`, with paths relative to `root`.
  pub fn from_outcome(mode: ScanMode, outcome: &ScanOutcome, root: &Path, elapsed: Duration) -> Self {
    let affected_status = match mode {
      ScanMode::Check => FileStatus::Missing,
      ScanMode::Format => FileStatus::Updated,
    };

    let mut files: Vec<FileReport> = outcome
      .missing_header_files
      .iter()
      .map(|path| FileReport {
        path: normalize_relative_path(path, root),
        status: affected_status,
      })
      .chain(outcome.unsupported_files.iter().map(|path| FileReport {
        path: normalize_relative_path(path, root),
        status: FileStatus::Unsupported,
      }))
      .collect();
    files.sort_by(|a, b| a.path.cmp(&b.path));

    Self {
      mode,
      generated_at: Local::now().to_rfc3339(),
      summary: ReportSummary {
        total_files: outcome.total_files,
        canonical: outcome.canonical,
        alternate: outcome.alternate,
        differs: outcome.differs,
        absent: outcome.absent,
        unsupported: outcome.unsupported_files.len(),
        skipped: outcome.skipped,
        cancelled: outcome.cancelled,
        affected: outcome.missing_header_files.len(),
        had_failure: outcome.had_failure,
        interrupted: outcome.interrupted,
        processing_time_secs: elapsed.as_secs_f64(),
      },
      files,
    }
  }

  /// Serializes the report as pretty-printed JSON.
  ///
  /// # Errors
  ///
  /// Fails only if serialization fails.
  pub fn to_json(&self) -> Result<String> {
    serde_json::to_string_pretty(self).context("Failed to serialize JSON report")
  }

  /// Writes the JSON report to `output_path`.
  ///
  /// # Errors
  ///
  /// Fails if the report cannot be serialized or written to disk.
  pub fn write(&self, output_path: &Path) -> Result<()> {
    fs::write(output_path, self.to_json()?)
      .with_context(|| format!("Failed to write report to {}", output_path.display()))
  }
}
