//! # Scan Commands
//!
//! The `check` and `format` commands. Both share [`ScanArgs`]: they resolve
//! configuration, build a [`Processor`], collect the files and run the scan
//! with their respective outcome policy.

use std::path::{Path, PathBuf};
use std::process;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::Datelike;
use clap::Args;
use tracing::debug;

use crate::callback::{CheckPolicy, FormatPolicy};
use crate::config::{Config, load_config};
use crate::document::{DEFAULT_KEYWORDS, Encoding};
use crate::info_log;
use crate::logging::{ColorMode, init_tracing, set_quiet, set_verbose};
use crate::output::{
  print_all_files_ok, print_blank_line, print_hint, print_missing_files, print_start_message, print_summary,
  print_updated_files,
};
use crate::processor::{
  DEFAULT_CONCURRENCY_FACTOR, FileCollector, Processor, ProcessorConfig, ScanOutcome, absolutize_path,
};
use crate::properties::{DocumentPropertiesLoader, PropertyMap, merge_properties, provider_by_name};
use crate::report::{ScanMode, ScanReport};
use crate::templates::TemplateSource;

/// Arguments shared by `check` and `format`
#[derive(Args, Debug, Default)]
pub struct ScanArgs {
  /// Files, directories or glob patterns to scan. Directories are walked
  /// recursively. Defaults to the whole root directory.
  #[arg(required = false)]
  pub patterns: Vec<String>,

  /// Directory relative paths and excludes are resolved against
  /// [default: current directory]
  #[arg(long, value_name = "DIR")]
  pub root: Option<PathBuf>,

  /// Path to config file (default: .headerwarden.toml in the root directory)
  #[arg(long, value_name = "FILE")]
  pub config: Option<PathBuf>,

  /// Ignore config file even if present
  #[arg(long)]
  pub no_config: bool,

  /// Canonical header template file
  #[arg(long, value_name = "FILE")]
  pub header: Option<PathBuf>,

  /// Header template accepted in place of the canonical one (repeatable,
  /// checked in order)
  #[arg(long = "valid-header", value_name = "FILE")]
  pub valid_headers: Vec<PathBuf>,

  /// Set a template property (repeatable, format: KEY=VALUE)
  #[arg(short = 'D', long = "define", value_name = "KEY=VALUE", value_parser = parse_key_value)]
  pub define: Vec<(String, String)>,

  /// Map an extension to a comment style (repeatable, format: EXT=STYLE)
  #[arg(long, value_name = "EXT=STYLE", value_parser = parse_key_value)]
  pub mapping: Vec<(String, String)>,

  /// Start from an empty extension mapping
  #[arg(long)]
  pub no_default_mappings: bool,

  /// Compare headers line for line instead of ignoring whitespace
  #[arg(long)]
  pub strict: bool,

  /// Character encoding of source files (utf-8, iso-8859-1)
  #[arg(long, value_name = "NAME")]
  pub encoding: Option<String>,

  /// Words a leading comment must contain to count as a header
  /// (comma-separated) [default: copyright]
  #[arg(long, value_name = "WORDS", value_delimiter = ',')]
  pub keywords: Option<Vec<String>>,

  /// Glob patterns of files to leave out (repeatable)
  #[arg(long, value_name = "PATTERN")]
  pub exclude: Vec<String>,

  /// Year the project started, exposed as ${inceptionYear}
  #[arg(long, value_name = "YEAR")]
  pub inception_year: Option<i32>,

  /// Enable a property provider by name (repeatable)
  #[arg(long = "provider", value_name = "NAME")]
  pub providers: Vec<String>,

  /// Number of worker threads [default: CPUs x concurrency factor]
  #[arg(long, value_name = "N")]
  pub threads: Option<usize>,

  /// Multiplier applied to the number of CPUs to size the worker pool
  #[arg(long, value_name = "FACTOR")]
  pub concurrency_factor: Option<f64>,

  /// Increase verbosity (-v info, -vv debug, -vvv trace)
  #[arg(short, long, action = clap::ArgAction::Count)]
  pub verbose: u8,

  /// Suppress all output except errors and file lists
  #[arg(short, long, conflicts_with = "verbose")]
  pub quiet: bool,

  /// Control when to use colored output (auto, never, always)
  #[arg(
    long,
    value_name = "WHEN",
    num_args = 0..=1,
    default_value_t = ColorMode::Auto,
    default_missing_value = "always",
    value_enum
  )]
  pub colors: ColorMode,

  /// Write a JSON report of the scan to the specified path
  #[arg(long, value_name = "OUTPUT")]
  pub report_json: Option<PathBuf>,
}

/// Arguments for the check command
#[derive(Args, Debug, Default)]
pub struct CheckArgs {
  #[command(flatten)]
  pub scan: ScanArgs,

  /// Do not report files whose header is present but not canonical
  #[arg(long)]
  pub allow_non_canonical: bool,
}

/// Arguments for the format command
#[derive(Args, Debug, Default)]
pub struct FormatArgs {
  #[command(flatten)]
  pub scan: ScanArgs,

  /// Write results to sibling `.licensed` files instead of the originals
  #[arg(long)]
  pub dry_run: bool,

  /// Leave files that already have a header untouched
  #[arg(long)]
  pub skip_existing_headers: bool,

  /// Ensure a blank line separates the header from the code
  #[arg(long)]
  pub blank_line_after_header: bool,
}

/// Parses a `KEY=VALUE` argument.
fn parse_key_value(raw: &str) -> Result<(String, String), String> {
  match raw.split_once('=') {
    Some((key, value)) if !key.trim().is_empty() => Ok((key.trim().to_string(), value.to_string())),
    _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
  }
}

/// Everything a command needs once configuration is resolved.
struct ScanSetup {
  root: PathBuf,
  config: Config,
  processor: Processor,
  files: Vec<PathBuf>,
}

fn init_output(args: &ScanArgs) {
  init_tracing(args.quiet, args.verbose);

  if args.verbose > 0 {
    set_verbose();
  } else if args.quiet {
    set_quiet();
  }
  args.colors.apply();
}

/// Property layers below the environment: the current year, then the config
/// file, then `-D` definitions.
fn base_properties(config: &Config, defines: &[(String, String)]) -> PropertyMap {
  let mut initial = PropertyMap::new();
  initial.insert("year".to_string(), chrono::Local::now().year().to_string());
  initial.extend(config.properties.iter().map(|(k, v)| (k.clone(), v.clone())));

  let overrides: PropertyMap = defines.iter().cloned().collect();
  merge_properties(&initial, &overrides)
}

fn prepare(args: &ScanArgs) -> Result<ScanSetup> {
  let root = match &args.root {
    Some(root) => absolutize_path(root)?,
    None => std::env::current_dir().context("Failed to get current directory")?,
  };
  debug!("Using root directory: {}", root.display());

  let mut config = load_config(args.config.as_deref(), &root, args.no_config)?.unwrap_or_default();
  for (extension, style) in &args.mapping {
    config.mapping.insert(extension.to_lowercase(), style.to_lowercase());
  }

  let header_path = args
    .header
    .clone()
    .or_else(|| config.header.clone())
    .context("No header template given: pass --header or set `header` in the config file")?;

  let sections = config.header_sections()?;
  let header = TemplateSource::load(&absolutize_path(&header_path)?)?.with_sections(sections.clone());

  let valid_header_paths = if args.valid_headers.is_empty() {
    config.valid_headers.clone()
  } else {
    args.valid_headers.clone()
  };
  let valid_headers = valid_header_paths
    .iter()
    .map(|path| -> Result<TemplateSource> {
      Ok(TemplateSource::load(&absolutize_path(path)?)?.with_sections(sections.clone()))
    })
    .collect::<Result<Vec<_>>>()?;

  let use_default_mappings = !args.no_default_mappings && config.use_default_mappings.unwrap_or(true);
  let registry = config.build_registry(use_default_mappings)?;

  let mut properties = DocumentPropertiesLoader::new(base_properties(&config, &args.define))
    .with_inception_year(args.inception_year.or(config.inception_year));
  let mut provider_names = config.providers.clone();
  for name in &args.providers {
    if !provider_names.contains(name) {
      provider_names.push(name.clone());
    }
  }
  for name in &provider_names {
    properties = properties.with_provider(provider_by_name(name)?);
  }

  let encoding = args
    .encoding
    .as_deref()
    .or(config.encoding.as_deref())
    .map(str::parse::<Encoding>)
    .transpose()?
    .unwrap_or_default();

  let keywords = args
    .keywords
    .clone()
    .or_else(|| config.keywords.clone())
    .unwrap_or_else(|| DEFAULT_KEYWORDS.iter().map(|k| (*k).to_string()).collect());

  let processor = Processor::new(ProcessorConfig {
    valid_headers,
    registry,
    properties,
    encoding,
    keywords,
    strict_check: args.strict || config.strict_check.unwrap_or(false),
    concurrency_factor: args
      .concurrency_factor
      .or(config.concurrency_factor)
      .unwrap_or(DEFAULT_CONCURRENCY_FACTOR),
    threads: args.threads.or(config.threads),
    ..ProcessorConfig::new(root.clone(), header)
  })?;

  let mut excludes = config.excludes.clone();
  excludes.extend(args.exclude.iter().cloned());
  let files = FileCollector::new(root.clone())
    .with_excludes(&excludes)?
    .collect(&args.patterns)?;

  Ok(ScanSetup {
    root,
    config,
    processor,
    files,
  })
}

fn write_report(path: Option<&Path>, mode: ScanMode, outcome: &ScanOutcome, root: &Path, elapsed: Duration) {
  let Some(output_path) = path else {
    return;
  };

  let report = ScanReport::from_outcome(mode, outcome, root, elapsed);
  if let Err(e) = report.write(output_path) {
    eprintln!("Error generating JSON report: {e:#}");
  } else {
    info_log!("Generated JSON report at {}", output_path.display());
  }
}

/// Run the check command with the given arguments
///
/// Exits the process with status 1 when any file is missing its header.
pub fn run_check(args: CheckArgs) -> Result<()> {
  init_output(&args.scan);
  let setup = prepare(&args.scan)?;

  let report_non_canonical = !args.allow_non_canonical && setup.config.report_non_canonical.unwrap_or(true);
  let policy = CheckPolicy::new(report_non_canonical);

  print_start_message(setup.files.len(), false);

  let start_time = Instant::now();
  let outcome = setup.processor.run(&setup.files, &policy)?;
  let elapsed = start_time.elapsed();

  print_blank_line();
  let missing: Vec<PathBuf> = outcome.missing_header_files.iter().cloned().collect();
  if missing.is_empty() {
    print_all_files_ok();
  } else {
    print_missing_files(&missing, &setup.root, None);
  }

  print_blank_line();
  print_summary(&outcome, elapsed);

  if outcome.had_failure {
    print_blank_line();
    print_hint("Run `headerwarden format` to add the missing headers.");
  }

  write_report(
    args.scan.report_json.as_deref(),
    ScanMode::Check,
    &outcome,
    &setup.root,
    elapsed,
  );

  if outcome.had_failure {
    process::exit(1);
  }

  Ok(())
}

/// Run the format command with the given arguments
pub fn run_format(args: FormatArgs) -> Result<()> {
  init_output(&args.scan);
  let setup = prepare(&args.scan)?;

  let dry_run = args.dry_run || setup.config.dry_run.unwrap_or(false);
  let policy = FormatPolicy::new(
    dry_run,
    args.skip_existing_headers || setup.config.skip_existing_headers.unwrap_or(false),
    args.blank_line_after_header || setup.config.blank_line_after_header.unwrap_or(false),
  );

  print_start_message(setup.files.len(), true);

  let start_time = Instant::now();
  let outcome = setup.processor.run(&setup.files, &policy)?;
  let elapsed = start_time.elapsed();

  print_blank_line();
  let updated: Vec<PathBuf> = outcome.missing_header_files.iter().cloned().collect();
  if updated.is_empty() {
    print_all_files_ok();
  } else {
    print_updated_files(&updated, &setup.root, dry_run);
  }

  print_blank_line();
  print_summary(&outcome, elapsed);

  write_report(
    args.scan.report_json.as_deref(),
    ScanMode::Format,
    &outcome,
    &setup.root,
    elapsed,
  );

  Ok(())
}
