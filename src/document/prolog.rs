//! # Prolog Module
//!
//! Detection of content that must stay above the license header: a UTF-8
//! byte order mark and special first lines such as shebangs, XML
//! declarations or interpreter directives.

const BOM: char = '\u{feff}';

/// First-line prefixes that are preserved above the header.
///
/// Matched case-insensitively.
const PROLOG_PREFIXES: &[&str] = &[
  "#!",                       // shebang
  "<?xml",                    // XML declaration
  "<!doctype",                // HTML doctype
  "# encoding:",              // Ruby encoding
  "# -*- coding:",            // Python/Ruby coding cookie
  "# frozen_string_literal:", // Ruby interpreter instruction
  "<?php",                    // PHP opening tag
  "# escape",                 // Dockerfile directive
  "# syntax",                 // Dockerfile directive
];

/// The leading part of a document that precedes the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prolog {
  /// Byte offset where a header starts or would be inserted.
  pub end: usize,

  /// Whether a prolog line (not just a BOM) was found.
  pub has_line: bool,
}

impl Prolog {
  /// Separator to write between the prolog and an inserted header.
  ///
  /// Empty when there is no prolog line; otherwise one blank line, plus the
  /// line break the prolog line itself may be missing at end of file.
  pub fn separator(&self, content: &str, eol: &str) -> String {
    if !self.has_line {
      return String::new();
    }
    if content[..self.end].ends_with('\n') {
      eol.to_string()
    } else {
      format!("{eol}{eol}")
    }
  }
}

/// Locates the prolog at the start of `content`.
pub fn detect(content: &str) -> Prolog {
  let start = if content.starts_with(BOM) { BOM.len_utf8() } else { 0 };
  let rest = &content[start..];

  let first_line_end = rest.find('\n').unwrap_or(rest.len());
  let first_line = rest[..first_line_end].to_lowercase();

  if PROLOG_PREFIXES.iter().any(|prefix| first_line.starts_with(prefix)) {
    // Include the newline when there is one
    let end = if first_line_end < rest.len() {
      start + first_line_end + 1
    } else {
      content.len()
    };
    return Prolog { end, has_line: true };
  }

  Prolog {
    end: start,
    has_line: false,
  }
}
