//! # Processor Module
//!
//! The concurrent scan orchestrator.
//!
//! A [`Processor`] takes a list of files and, on a dedicated worker pool,
//! runs classify → parse → match → callback for each of them. Per-file work
//! is fully independent; the only shared state is the callback's record of
//! affected files and the abort flag raised by the first fatal error.
//!
//! The module is organized into:
//! - [`file_collector`] - Expanding paths, directories and globs into the
//!   file list consumed by [`Processor::run`]
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::path::PathBuf;
//!
//! use headerwarden::callback::CheckPolicy;
//! use headerwarden::processor::{Processor, ProcessorConfig};
//! use headerwarden::templates::TemplateSource;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = ProcessorConfig::new(PathBuf::from("."), TemplateSource::parse("Copyright 2024 Acme"));
//! let processor = Processor::new(config)?;
//!
//! let policy = CheckPolicy::default();
//! let outcome = processor.run(&[PathBuf::from("src/main.rs")], &policy)?;
//! println!("{} files without a header", outcome.missing_header_files.len());
//! # Ok(())
//! # }
//! ```

pub mod file_collector;

use std::any::Any;
use std::collections::BTreeSet;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;

pub use file_collector::{FileCollector, absolutize_path};
use tracing::{debug, trace, warn};

use crate::callback::HeaderCallback;
use crate::classifier::{Classification, DocumentFactory};
use crate::comment_styles::StyleRegistry;
use crate::document::{DEFAULT_KEYWORDS, Encoding};
use crate::error::{ConfigError, ScanError};
use crate::matching::{self, MatchResult};
use crate::properties::{DocumentPropertiesLoader, PropertyMap};
use crate::templates::{HeaderTemplate, TemplateSource};

/// Default multiplier applied to the number of available CPUs.
///
/// Above one because the work is dominated by file I/O.
pub const DEFAULT_CONCURRENCY_FACTOR: f64 = 1.5;

/// Everything a [`Processor`] needs for one scan.
pub struct ProcessorConfig {
  /// Directory that relative file paths are resolved against
  pub root: PathBuf,

  /// The canonical header
  pub header: TemplateSource,

  /// Headers accepted in place of the canonical one, in precedence order
  pub valid_headers: Vec<TemplateSource>,

  pub registry: StyleRegistry,
  pub properties: DocumentPropertiesLoader,
  pub encoding: Encoding,

  /// Words a leading comment must contain to count as a header
  pub keywords: Vec<String>,

  /// Require line-for-line equality when comparing headers
  pub strict_check: bool,

  /// Worker count multiplier over the available CPUs
  pub concurrency_factor: f64,

  /// Explicit worker count, overriding `concurrency_factor`
  pub threads: Option<usize>,
}

impl ProcessorConfig {
  /// Creates a config with default mappings, no properties and no
  /// alternates.
  ///
  /// Use struct update syntax to override specific fields:
  /// ```ignore
  /// ProcessorConfig {
  ///     strict_check: true,
  ///     ..ProcessorConfig::new(root, header)
  /// }
  /// ```
  pub fn new(root: PathBuf, header: TemplateSource) -> Self {
    Self {
      root,
      header,
      valid_headers: Vec::new(),
      registry: StyleRegistry::with_default_mapping(),
      properties: DocumentPropertiesLoader::new(PropertyMap::new()),
      encoding: Encoding::default(),
      keywords: DEFAULT_KEYWORDS.iter().map(|k| (*k).to_string()).collect(),
      strict_check: false,
      concurrency_factor: DEFAULT_CONCURRENCY_FACTOR,
      threads: None,
    }
  }
}

/// Lets a caller interrupt a running scan.
///
/// Cancelling never fails the scan: files whose task has not started yet are
/// skipped, in-flight tasks finish, and the outcome is marked interrupted.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn cancel(&self) {
    self.0.store(true, Ordering::SeqCst);
  }

  pub fn is_cancelled(&self) -> bool {
    self.0.load(Ordering::SeqCst)
  }
}

/// Aggregate result of one scan.
///
/// Per-verdict counters are built on the calling thread from task results.
/// The affected-file set is owned by the [`HeaderCallback`] while tasks run;
/// [`missing_header_files`](Self::missing_header_files) is a copy of
/// [`HeaderCallback::affected_files`] taken once every task has reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOutcome {
  pub total_files: usize,

  /// Files whose extension maps to no comment style
  pub unsupported_files: BTreeSet<PathBuf>,

  /// Files the callback recorded: missing headers for the check policy,
  /// rewritten files for the format policy
  pub missing_header_files: BTreeSet<PathBuf>,

  pub had_failure: bool,

  /// The scan was cancelled before every file was processed
  pub interrupted: bool,

  pub canonical: usize,
  pub alternate: usize,
  pub differs: usize,
  pub absent: usize,

  /// Files skipped because they hold the header template itself
  pub skipped: usize,

  /// Files not processed because of cancellation
  pub cancelled: usize,
}

impl ScanOutcome {
  fn record(&mut self, path: PathBuf, outcome: FileOutcome) {
    match outcome {
      FileOutcome::Unsupported => {
        self.unsupported_files.insert(path);
      }
      FileOutcome::Skipped => self.skipped += 1,
      FileOutcome::Cancelled => self.cancelled += 1,
      FileOutcome::Abandoned => {}
      FileOutcome::Matched(result) => match result {
        MatchResult::NoHeaderPresent => self.absent += 1,
        MatchResult::HeaderMatchesCanonical => self.canonical += 1,
        MatchResult::HeaderMatchesAlternate { .. } => self.alternate += 1,
        MatchResult::HeaderPresentButDiffers => self.differs += 1,
      },
    }
  }
}

/// What happened to a single file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileOutcome {
  Unsupported,
  Skipped,
  Cancelled,
  /// Not started because another file failed
  Abandoned,
  Matched(MatchResult),
}

/// Number of workers for `available` CPUs: `ceil(available * factor)`, at
/// least one.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
pub fn worker_count(available: usize, factor: f64) -> usize {
  let workers = (available as f64 * factor).ceil();
  if workers.is_finite() && workers >= 1.0 {
    workers as usize
  } else {
    1
  }
}

/// Runs header scans over file lists.
pub struct Processor {
  factory: DocumentFactory,
  header: TemplateSource,
  valid_headers: Vec<TemplateSource>,
  properties: DocumentPropertiesLoader,
  strict_check: bool,
  workers: usize,

  /// Canonicalized location of the header template file, if it came from one
  header_location: Option<PathBuf>,
}

impl Processor {
  /// Validates `config` and prepares a processor.
  ///
  /// Every template is resolved once against the properties known up front,
  /// so a missing placeholder value is reported before any file is read.
  ///
  /// # Errors
  ///
  /// Returns [`ConfigError::InvalidConcurrency`] for a non-positive factor or
  /// zero threads, and [`ConfigError::UnresolvedPlaceholder`] or
  /// [`ConfigError::InvalidPattern`] for templates that cannot be resolved.
  pub fn new(config: ProcessorConfig) -> Result<Self, ConfigError> {
    if !config.concurrency_factor.is_finite() || config.concurrency_factor <= 0.0 {
      return Err(ConfigError::InvalidConcurrency {
        message: format!("concurrency factor must be positive, got {}", config.concurrency_factor),
      });
    }
    if config.threads == Some(0) {
      return Err(ConfigError::InvalidConcurrency {
        message: "thread count must be at least 1".to_string(),
      });
    }

    let preflight = config.properties.preflight_properties();
    config.header.resolve(&preflight)?;
    for alternate in &config.valid_headers {
      alternate.resolve(&preflight)?;
    }

    let workers = config
      .threads
      .unwrap_or_else(|| worker_count(num_cpus::get(), config.concurrency_factor));
    debug!("Using {} worker threads", workers);

    let header_location = config
      .header
      .location()
      .map(|location| std::fs::canonicalize(location).unwrap_or_else(|_| location.to_path_buf()));

    let factory = DocumentFactory::new(config.root, Arc::new(config.registry))
      .with_encoding(config.encoding)
      .with_keywords(config.keywords);

    Ok(Self {
      factory,
      header: config.header,
      valid_headers: config.valid_headers,
      properties: config.properties,
      strict_check: config.strict_check,
      workers,
      header_location,
    })
  }

  pub const fn worker_count(&self) -> usize {
    self.workers
  }

  /// Scans `files`, handing every verdict to `callback`.
  ///
  /// # Errors
  ///
  /// Returns the first fatal per-file error (I/O, encoding, header
  /// resolution, worker panic) after all in-flight tasks have drained, or
  /// [`ScanError::Pool`] if the worker pool cannot be started.
  pub fn run(&self, files: &[PathBuf], callback: &dyn HeaderCallback) -> Result<ScanOutcome, ScanError> {
    self.run_with_cancel(files, callback, &CancellationToken::new())
  }

  /// Like [`run`](Self::run), stopping early when `cancel` is triggered.
  ///
  /// # Errors
  ///
  /// See [`run`](Self::run). Cancellation on its own is never an error.
  pub fn run_with_cancel(
    &self,
    files: &[PathBuf],
    callback: &dyn HeaderCallback,
    cancel: &CancellationToken,
  ) -> Result<ScanOutcome, ScanError> {
    let pool = rayon::ThreadPoolBuilder::new()
      .num_threads(self.workers)
      .thread_name(|i| format!("headerwarden-worker-{i}"))
      .build()?;

    debug!("Scanning {} files with {} workers", files.len(), self.workers);
    let start_time = std::time::Instant::now();

    let abort = AtomicBool::new(false);
    let mut outcome = ScanOutcome {
      total_files: files.len(),
      ..ScanOutcome::default()
    };
    let mut first_error: Option<ScanError> = None;

    pool.in_place_scope(|scope| {
      let (tx, rx) = mpsc::channel::<(PathBuf, Result<FileOutcome, ScanError>)>();

      for path in files {
        let tx = tx.clone();
        let abort = &abort;
        scope.spawn(move |_| {
          let result = if cancel.is_cancelled() {
            Ok(FileOutcome::Cancelled)
          } else if abort.load(Ordering::SeqCst) {
            Ok(FileOutcome::Abandoned)
          } else {
            self.process_guarded(path, callback)
          };
          // The receiver outlives every task in this scope
          let _ = tx.send((path.clone(), result));
        });
      }
      drop(tx);

      // Drain until every task has reported, even after a failure
      for (path, result) in rx {
        match result {
          Ok(file_outcome) => outcome.record(path, file_outcome),
          Err(e) => {
            debug!("Task for {} failed: {}", path.display(), e);
            abort.store(true, Ordering::SeqCst);
            if first_error.is_none() {
              first_error = Some(e);
            }
          }
        }
      }
    });
    drop(pool);

    debug!(
      "Scanned {} files in {}ms",
      files.len(),
      start_time.elapsed().as_millis()
    );

    if let Some(e) = first_error {
      return Err(e);
    }

    outcome.missing_header_files = callback.affected_files().into_iter().collect();
    outcome.had_failure = callback.had_failure();
    outcome.interrupted = cancel.is_cancelled() && outcome.cancelled > 0;
    Ok(outcome)
  }

  fn process_guarded(&self, path: &Path, callback: &dyn HeaderCallback) -> Result<FileOutcome, ScanError> {
    catch_unwind(AssertUnwindSafe(|| self.process_file(path, callback))).unwrap_or_else(|payload| {
      Err(ScanError::WorkerPanicked {
        path: path.to_path_buf(),
        message: panic_message(payload.as_ref()),
      })
    })
  }

  fn process_file(&self, path: &Path, callback: &dyn HeaderCallback) -> Result<FileOutcome, ScanError> {
    if self.is_header_file(path) {
      debug!("Skipping header file: {}", path.display());
      return Ok(FileOutcome::Skipped);
    }

    let mut document = match self.factory.create(path)? {
      Classification::Supported(document) => document,
      Classification::Unsupported { path } => {
        warn!("Unknown file extension: {}", self.factory.relative_display(&path));
        return Ok(FileOutcome::Unsupported);
      }
    };

    let properties = self.properties.load(&document);
    let resolve = |source: &TemplateSource| -> Result<HeaderTemplate, ScanError> {
      source.resolve(&properties).map_err(|err| ScanError::Config {
        path: document.path().to_path_buf(),
        source: err,
      })
    };
    let canonical = resolve(&self.header)?;
    let alternates = self.valid_headers.iter().map(resolve).collect::<Result<Vec<_>, _>>()?;

    let result = matching::classify(&mut document, &canonical, &alternates, self.strict_check);
    trace!("Verdict for {}: {:?}", document.path().display(), result);

    if result.is_accepted() {
      callback.on_existing_header(&mut document, &canonical)?;
    } else {
      callback.on_header_not_found(&mut document, &canonical)?;
    }

    Ok(FileOutcome::Matched(result))
  }

  fn is_header_file(&self, path: &Path) -> bool {
    let Some(location) = &self.header_location else {
      return false;
    };
    if location.file_name() != path.file_name() {
      return false;
    }
    let path = if path.is_absolute() {
      path.to_path_buf()
    } else {
      self.factory.root().join(path)
    };
    std::fs::canonicalize(&path).map_or(path == *location, |canonical| canonical == *location)
  }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
  if let Some(message) = payload.downcast_ref::<&str>() {
    (*message).to_string()
  } else if let Some(message) = payload.downcast_ref::<String>() {
    message.clone()
  } else {
    "unknown panic".to_string()
  }
}
