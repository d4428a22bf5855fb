//! End-to-end tests of the scan orchestrator with both outcome policies.

#![allow(clippy::panic_in_result_fn)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::shadow_unrelated)]

mod common;

use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use common::{acme_config, acme_processor, properties, read, write_file};
use headerwarden::callback::{CheckPolicy, FormatPolicy, HeaderCallback};
use headerwarden::document::{Document, Encoding};
use headerwarden::error::ScanError;
use headerwarden::processor::{CancellationToken, Processor, ProcessorConfig};
use headerwarden::properties::{CopyrightRangeProvider, DocumentPropertiesLoader};
use headerwarden::templates::{HeaderTemplate, TemplateSource};
use tempfile::tempdir;

#[test]
fn test_check_records_file_without_header() -> Result<()> {
  let temp_dir = tempdir()?;
  let file = write_file(temp_dir.path(), "a.go", "package main\n")?;

  let processor = acme_processor(temp_dir.path())?;
  let policy = CheckPolicy::default();
  let outcome = processor.run(std::slice::from_ref(&file), &policy)?;

  assert!(outcome.had_failure);
  assert_eq!(outcome.missing_header_files, BTreeSet::from([file.clone()]));
  assert_eq!(outcome.absent, 1);
  assert_eq!(read(&file)?, "package main\n");
  Ok(())
}

#[test]
fn test_format_inserts_header_above_content() -> Result<()> {
  let temp_dir = tempdir()?;
  let file = write_file(temp_dir.path(), "a.go", "package main\n")?;

  let processor = acme_processor(temp_dir.path())?;
  let outcome = processor.run(std::slice::from_ref(&file), &FormatPolicy::new(false, false, false))?;

  assert!(!outcome.had_failure);
  assert_eq!(outcome.missing_header_files, BTreeSet::from([file.clone()]));
  assert_eq!(read(&file)?, "// Copyright 2024 Acme\npackage main\n");

  // The rewritten file now passes the check
  let policy = CheckPolicy::default();
  let outcome = processor.run(std::slice::from_ref(&file), &policy)?;
  assert!(!outcome.had_failure);
  assert_eq!(outcome.canonical, 1);
  Ok(())
}

#[test]
fn test_unsupported_extension_is_left_alone() -> Result<()> {
  let temp_dir = tempdir()?;
  let file = write_file(temp_dir.path(), "unknown.bin", "\u{1}\u{2}binary")?;

  let processor = acme_processor(temp_dir.path())?;

  let policy = CheckPolicy::default();
  let outcome = processor.run(std::slice::from_ref(&file), &policy)?;
  assert!(!outcome.had_failure);
  assert!(outcome.missing_header_files.is_empty());
  assert_eq!(outcome.unsupported_files, BTreeSet::from([file.clone()]));

  let outcome = processor.run(std::slice::from_ref(&file), &FormatPolicy::new(false, false, false))?;
  assert!(outcome.missing_header_files.is_empty());
  assert_eq!(read(&file)?, "\u{1}\u{2}binary");
  Ok(())
}

#[test]
fn test_second_alternate_header_is_accepted() -> Result<()> {
  let temp_dir = tempdir()?;
  let file = write_file(
    temp_dir.path(),
    "main.rs",
    "// Copyright 2010 Old Acme\n\nfn main() {}\n",
  )?;

  let config = ProcessorConfig {
    valid_headers: vec![
      TemplateSource::parse("Copyright 2015 Foo Inc"),
      TemplateSource::parse("Copyright 2010 Old Acme"),
    ],
    ..acme_config(temp_dir.path())
  };
  let processor = Processor::new(config)?;

  let policy = CheckPolicy::default();
  let outcome = processor.run(std::slice::from_ref(&file), &policy)?;

  assert!(!outcome.had_failure);
  assert!(outcome.missing_header_files.is_empty());
  assert_eq!(outcome.alternate, 1);

  // Format leaves accepted headers untouched
  processor.run(std::slice::from_ref(&file), &FormatPolicy::new(false, false, false))?;
  assert_eq!(read(&file)?, "// Copyright 2010 Old Acme\n\nfn main() {}\n");
  Ok(())
}

#[test]
fn test_differing_header_reporting_is_configurable() -> Result<()> {
  let temp_dir = tempdir()?;
  let file = write_file(temp_dir.path(), "lib.rs", "// Copyright 1999 Other Corp\n\npub fn f() {}\n")?;

  let processor = acme_processor(temp_dir.path())?;

  let strict_policy = CheckPolicy::new(true);
  let outcome = processor.run(std::slice::from_ref(&file), &strict_policy)?;
  assert_eq!(outcome.differs, 1);
  assert!(outcome.had_failure);

  let lenient_policy = CheckPolicy::new(false);
  let outcome = processor.run(std::slice::from_ref(&file), &lenient_policy)?;
  assert_eq!(outcome.differs, 1);
  assert!(!outcome.had_failure);
  assert!(outcome.missing_header_files.is_empty());
  Ok(())
}

#[test]
fn test_format_replaces_differing_header() -> Result<()> {
  let temp_dir = tempdir()?;
  let file = write_file(temp_dir.path(), "lib.rs", "// Copyright 1999 Other Corp\n\npub fn f() {}\n")?;

  let processor = acme_processor(temp_dir.path())?;
  processor.run(std::slice::from_ref(&file), &FormatPolicy::new(false, false, true))?;

  assert_eq!(read(&file)?, "// Copyright 2024 Acme\n\npub fn f() {}\n");
  Ok(())
}

#[test]
fn test_skip_existing_headers_keeps_differing_header() -> Result<()> {
  let temp_dir = tempdir()?;
  let original = "// Copyright 1999 Other Corp\n\npub fn f() {}\n";
  let file = write_file(temp_dir.path(), "lib.rs", original)?;

  let processor = acme_processor(temp_dir.path())?;
  let outcome = processor.run(std::slice::from_ref(&file), &FormatPolicy::new(false, true, false))?;

  assert!(outcome.missing_header_files.is_empty());
  assert_eq!(read(&file)?, original);
  Ok(())
}

#[test]
fn test_non_license_comment_is_preserved() -> Result<()> {
  let temp_dir = tempdir()?;
  let file = write_file(temp_dir.path(), "doc.go", "// Package doc explains things.\npackage doc\n")?;

  let processor = acme_processor(temp_dir.path())?;
  processor.run(std::slice::from_ref(&file), &FormatPolicy::new(false, false, true))?;

  assert_eq!(
    read(&file)?,
    "// Copyright 2024 Acme\n\n// Package doc explains things.\npackage doc\n"
  );
  Ok(())
}

#[test]
fn test_dry_run_writes_preview_only() -> Result<()> {
  let temp_dir = tempdir()?;
  let file = write_file(temp_dir.path(), "a.go", "package main\n")?;

  let processor = acme_processor(temp_dir.path())?;
  let outcome = processor.run(std::slice::from_ref(&file), &FormatPolicy::new(true, false, false))?;

  assert_eq!(outcome.missing_header_files, BTreeSet::from([file.clone()]));
  assert_eq!(read(&file)?, "package main\n");

  let preview = temp_dir.path().join("a.go.licensed");
  assert_eq!(FormatPolicy::preview_path(&file), preview);
  assert_eq!(read(&preview)?, "// Copyright 2024 Acme\npackage main\n");
  Ok(())
}

#[test]
fn test_format_is_idempotent() -> Result<()> {
  let temp_dir = tempdir()?;
  let files = vec![
    write_file(temp_dir.path(), "a.go", "package main\n")?,
    write_file(temp_dir.path(), "b.py", "#!/usr/bin/env python3\nprint('hi')\n")?,
    write_file(temp_dir.path(), "c.java", "class C {}\n")?,
    write_file(temp_dir.path(), "d.xml", "<?xml version=\"1.0\"?>\n<root/>\n")?,
  ];

  let processor = acme_processor(temp_dir.path())?;
  processor.run(&files, &FormatPolicy::new(false, false, true))?;
  let first: Vec<String> = files.iter().map(|f| read(f)).collect::<Result<_>>()?;

  let outcome = processor.run(&files, &FormatPolicy::new(false, false, true))?;
  let second: Vec<String> = files.iter().map(|f| read(f)).collect::<Result<_>>()?;

  assert_eq!(first, second);
  assert!(outcome.missing_header_files.is_empty());
  assert_eq!(outcome.canonical, files.len());

  assert_eq!(
    first[1],
    "#!/usr/bin/env python3\n\n# Copyright 2024 Acme\n\nprint('hi')\n"
  );
  assert_eq!(first[2], "/*\n * Copyright 2024 Acme\n */\n\nclass C {}\n");
  Ok(())
}

#[test]
fn test_result_independent_of_worker_count() -> Result<()> {
  let temp_dir = tempdir()?;
  let mut files = Vec::new();
  let mut expected = BTreeSet::new();
  for i in 0..40 {
    if i % 3 == 0 {
      files.push(write_file(
        temp_dir.path(),
        &format!("pkg/f{i}.go"),
        "// Copyright 2024 Acme\n\npackage pkg\n",
      )?);
    } else {
      let file = write_file(temp_dir.path(), &format!("pkg/f{i}.go"), "package pkg\n")?;
      expected.insert(file.clone());
      files.push(file);
    }
  }

  for threads in [1, 2, 3, 8, 32] {
    let config = ProcessorConfig {
      threads: Some(threads),
      ..acme_config(temp_dir.path())
    };
    let processor = Processor::new(config)?;
    assert_eq!(processor.worker_count(), threads);

    let policy = CheckPolicy::default();
    let outcome = processor.run(&files, &policy)?;
    assert_eq!(outcome.missing_header_files, expected, "threads = {threads}");
    assert_eq!(outcome.absent + outcome.canonical, files.len());
  }
  Ok(())
}

#[test]
fn test_cancelled_scan_is_interrupted_not_failed() -> Result<()> {
  let temp_dir = tempdir()?;
  let files: Vec<PathBuf> = (0..5)
    .map(|i| write_file(temp_dir.path(), &format!("f{i}.go"), "package main\n"))
    .collect::<Result<_>>()?;

  let processor = acme_processor(temp_dir.path())?;
  let cancel = CancellationToken::new();
  cancel.cancel();

  let outcome = processor.run_with_cancel(&files, &FormatPolicy::new(false, false, false), &cancel)?;

  assert!(outcome.interrupted);
  assert!(!outcome.had_failure);
  assert_eq!(outcome.cancelled, files.len());
  for file in &files {
    assert_eq!(read(file)?, "package main\n");
  }
  Ok(())
}

#[test]
fn test_undecodable_file_aborts_scan() -> Result<()> {
  let temp_dir = tempdir()?;
  let good = write_file(temp_dir.path(), "good.go", "package main\n")?;
  let bad = write_file(temp_dir.path(), "bad.go", [0x2f, 0x2f, 0x20, 0xff, 0xfe, 0x0a])?;

  let processor = acme_processor(temp_dir.path())?;
  let policy = CheckPolicy::default();
  let err = processor.run(&[good, bad.clone()], &policy).unwrap_err();

  assert!(matches!(err, ScanError::Decode { .. }), "unexpected error: {err}");
  assert_eq!(err.path(), Some(bad.as_path()));
  Ok(())
}

#[test]
fn test_missing_file_is_read_error() -> Result<()> {
  let temp_dir = tempdir()?;
  let missing = temp_dir.path().join("gone.go");

  let processor = acme_processor(temp_dir.path())?;
  let policy = CheckPolicy::default();
  let err = processor.run(&[missing], &policy).unwrap_err();

  assert!(matches!(err, ScanError::Read { .. }), "unexpected error: {err}");
  Ok(())
}

#[test]
fn test_latin1_files_round_trip() -> Result<()> {
  let temp_dir = tempdir()?;
  let file = write_file(temp_dir.path(), "cafe.go", b"// caf\xe9\npackage main\n")?;

  let config = ProcessorConfig {
    encoding: Encoding::Latin1,
    ..acme_config(temp_dir.path())
  };
  let processor = Processor::new(config)?;
  processor.run(std::slice::from_ref(&file), &FormatPolicy::new(false, false, false))?;

  assert_eq!(
    fs::read(&file)?,
    b"// Copyright 2024 Acme\n// caf\xe9\npackage main\n".to_vec()
  );
  Ok(())
}

struct PanickingPolicy;

impl HeaderCallback for PanickingPolicy {
  fn on_header_not_found(&self, _document: &mut Document, _header: &HeaderTemplate) -> Result<(), ScanError> {
    panic!("callback exploded");
  }

  fn on_existing_header(&self, _document: &mut Document, _header: &HeaderTemplate) -> Result<(), ScanError> {
    Ok(())
  }

  fn had_failure(&self) -> bool {
    false
  }

  fn affected_files(&self) -> Vec<PathBuf> {
    Vec::new()
  }
}

#[test]
fn test_worker_panic_is_reported() -> Result<()> {
  let temp_dir = tempdir()?;
  let file = write_file(temp_dir.path(), "a.go", "package main\n")?;

  let processor = acme_processor(temp_dir.path())?;
  let err = processor.run(std::slice::from_ref(&file), &PanickingPolicy).unwrap_err();

  match err {
    ScanError::WorkerPanicked { path, message } => {
      assert_eq!(path, file);
      assert_eq!(message, "callback exploded");
    }
    other => panic!("unexpected error: {other}"),
  }
  Ok(())
}

#[test]
fn test_header_file_is_skipped() -> Result<()> {
  let temp_dir = tempdir()?;
  let header_file = write_file(temp_dir.path(), "header.sh", "Copyright 2024 Acme\n")?;
  let source = write_file(temp_dir.path(), "run.sh", "echo hi\n")?;

  let config = ProcessorConfig {
    properties: DocumentPropertiesLoader::new(properties(&[])),
    ..ProcessorConfig::new(temp_dir.path().to_path_buf(), TemplateSource::load(&header_file)?)
  };
  let processor = Processor::new(config)?;
  let outcome = processor.run(&[header_file.clone(), source.clone()], &FormatPolicy::new(false, false, false))?;

  assert_eq!(outcome.skipped, 1);
  assert_eq!(outcome.missing_header_files, BTreeSet::from([source.clone()]));
  assert_eq!(read(&header_file)?, "Copyright 2024 Acme\n");
  assert_eq!(read(&source)?, "# Copyright 2024 Acme\necho hi\n");
  Ok(())
}

#[test]
fn test_copyright_range_provider() -> Result<()> {
  let temp_dir = tempdir()?;
  let file = write_file(temp_dir.path(), "main.rs", "fn main() {}\n")?;

  let properties = DocumentPropertiesLoader::new(properties(&[]))
    .with_inception_year(Some(2019))
    .with_provider(Box::new(CopyrightRangeProvider::with_current_year(2024)));
  let config = ProcessorConfig {
    properties,
    ..ProcessorConfig::new(
      temp_dir.path().to_path_buf(),
      TemplateSource::parse("Copyright ${copyrightRange} Acme (${file.name})"),
    )
  };
  let processor = Processor::new(config)?;
  processor.run(std::slice::from_ref(&file), &FormatPolicy::new(false, false, false))?;

  assert_eq!(read(&file)?, "// Copyright 2019-2024 Acme (main.rs)\nfn main() {}\n");
  Ok(())
}

#[test]
fn test_strict_check_rejects_whitespace_differences() -> Result<()> {
  let temp_dir = tempdir()?;
  let file = write_file(temp_dir.path(), "a.go", "//   Copyright 2024 Acme\n\npackage main\n")?;

  let relaxed = acme_processor(temp_dir.path())?;
  let policy = CheckPolicy::default();
  let outcome = relaxed.run(std::slice::from_ref(&file), &policy)?;
  assert_eq!(outcome.canonical, 1);

  let strict = Processor::new(ProcessorConfig {
    strict_check: true,
    ..acme_config(temp_dir.path())
  })?;
  let policy = CheckPolicy::default();
  let outcome = strict.run(std::slice::from_ref(&file), &policy)?;
  assert_eq!(outcome.differs, 1);
  assert!(outcome.had_failure);
  Ok(())
}

#[test]
fn test_strict_check_accepts_freshly_formatted_headers() -> Result<()> {
  let temp_dir = tempdir()?;
  let go_file = write_file(temp_dir.path(), "a.go", "package main\n")?;
  let java_file = write_file(temp_dir.path(), "Main.java", "class Main {}\n")?;
  let files = [go_file.clone(), java_file];

  let strict = Processor::new(ProcessorConfig {
    strict_check: true,
    ..ProcessorConfig::new(
      temp_dir.path().to_path_buf(),
      TemplateSource::parse("Copyright 2024 Acme \nAll rights reserved.\n\n"),
    )
  })?;
  strict.run(&files, &FormatPolicy::new(false, false, false))?;
  assert_eq!(read(&go_file)?, "// Copyright 2024 Acme\n// All rights reserved.\n//\npackage main\n");

  let policy = CheckPolicy::new(true);
  let outcome = strict.run(&files, &policy)?;
  assert!(!outcome.had_failure);
  assert_eq!(outcome.canonical, 2);
  Ok(())
}

#[test]
fn test_format_keeps_build_directive_below_old_header() -> Result<()> {
  let temp_dir = tempdir()?;
  let file = write_file(
    temp_dir.path(),
    "a.go",
    "// Copyright 1999 Old\n//go:build linux\n\npackage main\n",
  )?;

  let processor = acme_processor(temp_dir.path())?;
  processor.run(std::slice::from_ref(&file), &FormatPolicy::new(false, false, false))?;
  assert_eq!(read(&file)?, "// Copyright 2024 Acme\n//go:build linux\n\npackage main\n");

  let policy = CheckPolicy::default();
  let outcome = processor.run(std::slice::from_ref(&file), &policy)?;
  assert_eq!(outcome.canonical, 1);
  Ok(())
}

#[test]
fn test_format_keeps_code_on_block_closing_line() -> Result<()> {
  let temp_dir = tempdir()?;
  let file = write_file(temp_dir.path(), "a.c", "/* Copyright 1999 Old */ int keep_me = 1;\nint y;\n")?;

  let processor = acme_processor(temp_dir.path())?;
  processor.run(std::slice::from_ref(&file), &FormatPolicy::new(false, false, false))?;
  assert_eq!(read(&file)?, "/*\n * Copyright 2024 Acme\n */\nint keep_me = 1;\nint y;\n");
  Ok(())
}
