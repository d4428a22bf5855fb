//! # Templates Module
//!
//! This module provides the header template: the license text a project wants
//! at the top of its files, with `${name}` placeholders filled in from a
//! property dictionary.
//!
//! The module includes:
//! - [`TemplateSource`] for the raw, parsed-once template text
//! - [`HeaderSection`] for declaring dynamic fields (e.g. copyright years)
//! - [`HeaderTemplate`] for a fully resolved template that can be rendered
//!   and compared against the header text found in a document
//!
//! ## Example
//!
//! ```rust
//! use std::collections::HashMap;
//!
//! use headerwarden::templates::HeaderTemplate;
//!
//! # fn main() -> Result<(), headerwarden::error::ConfigError> {
//! let mut properties = HashMap::new();
//! properties.insert("year".to_string(), "2024".to_string());
//!
//! let template = HeaderTemplate::build("Copyright ${year} Acme", &properties)?;
//! assert_eq!(template.render(), "Copyright 2024 Acme");
//! assert!(template.equals_structurally("  Copyright 2024 Acme  ", false));
//! # Ok(())
//! # }
//! ```

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use regex::Regex;
use tracing::trace;

use crate::error::ConfigError;
use crate::properties::PropertyMap;

/// One piece of a parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Section {
  /// Text copied verbatim into the rendered header.
  Literal(String),
  /// A `${name}` token resolved from the property dictionary.
  Placeholder(String),
}

/// Declaration of a dynamic header field.
///
/// A section names a placeholder key, an optional default used when no
/// property supplies the key, and an optional pattern the existing header
/// text must satisfy at that position. During structural comparison a
/// section's position accepts any text (or only text matching
/// `ensure_match`), so headers carrying an older year still match.
#[derive(Debug, Clone)]
pub struct HeaderSection {
  pub key: String,
  pub default_value: Option<String>,
  pub ensure_match: Option<Regex>,
}

impl HeaderSection {
  pub fn new(key: impl Into<String>) -> Self {
    Self {
      key: key.into(),
      default_value: None,
      ensure_match: None,
    }
  }

  #[must_use]
  pub fn with_default(mut self, value: impl Into<String>) -> Self {
    self.default_value = Some(value.into());
    self
  }

  /// Restricts the text accepted at this section's position.
  ///
  /// # Errors
  ///
  /// Returns [`ConfigError::InvalidPattern`] if `pattern` is not a valid regex.
  pub fn with_pattern(mut self, pattern: &str) -> Result<Self, ConfigError> {
    let regex = Regex::new(pattern).map_err(|e| ConfigError::InvalidPattern {
      pattern: pattern.to_string(),
      message: e.to_string(),
    })?;
    self.ensure_match = Some(regex);
    Ok(self)
  }
}

/// Raw header text parsed into literal and placeholder sections.
///
/// A source is parsed once and then resolved per document, since document
/// properties such as `file.name` differ between files.
#[derive(Debug, Clone)]
pub struct TemplateSource {
  raw: String,
  sections: Vec<Section>,
  dynamic: Vec<HeaderSection>,
  location: Option<PathBuf>,
}

impl TemplateSource {
  /// Parses `${name}` placeholders out of `raw`.
  ///
  /// An unterminated `${` and an empty `${}` are kept as literal text.
  pub fn parse(raw: impl Into<String>) -> Self {
    let raw = raw.into();
    let sections = parse_sections(&raw);
    Self {
      raw,
      sections,
      dynamic: Vec::new(),
      location: None,
    }
  }

  /// Loads a template from a file and remembers where it came from.
  ///
  /// # Errors
  ///
  /// Returns an error if the file cannot be read or is not valid UTF-8.
  pub fn load(path: &Path) -> Result<Self> {
    trace!("Loading header template from: {}", path.display());

    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("Failed to read header template file: {}", path.display()))?;

    let mut source = Self::parse(raw);
    source.location = Some(path.to_path_buf());
    Ok(source)
  }

  /// Attaches the dynamic section declarations used by this template.
  #[must_use]
  pub fn with_sections(mut self, sections: Vec<HeaderSection>) -> Self {
    self.dynamic = sections;
    self
  }

  #[must_use]
  pub fn with_location(mut self, path: impl Into<PathBuf>) -> Self {
    self.location = Some(path.into());
    self
  }

  /// File the template was loaded from, if any.
  pub fn location(&self) -> Option<&Path> {
    self.location.as_deref()
  }

  pub fn raw_text(&self) -> &str {
    &self.raw
  }

  pub fn sections(&self) -> &[Section] {
    &self.sections
  }

  /// Names of all placeholders, in order of first appearance.
  pub fn placeholders(&self) -> Vec<&str> {
    let mut seen = HashSet::new();
    self
      .sections
      .iter()
      .filter_map(|section| match section {
        Section::Placeholder(name) if seen.insert(name.as_str()) => Some(name.as_str()),
        _ => None,
      })
      .collect()
  }

  /// Resolves every placeholder against `properties`.
  ///
  /// Lookup order for a placeholder is the property dictionary, then the
  /// default of a matching [`HeaderSection`].
  ///
  /// # Errors
  ///
  /// Returns [`ConfigError::UnresolvedPlaceholder`] for the first placeholder
  /// that has neither a property value nor a default.
  pub fn resolve(&self, properties: &PropertyMap) -> Result<HeaderTemplate, ConfigError> {
    let mut values = HashMap::new();
    for name in self.placeholders() {
      let value = properties
        .get(name)
        .cloned()
        .or_else(|| self.section(name).and_then(|s| s.default_value.clone()))
        .ok_or_else(|| ConfigError::UnresolvedPlaceholder { name: name.to_string() })?;
      values.insert(name.to_string(), value);
    }

    let rendered = self
      .sections
      .iter()
      .map(|section| match section {
        Section::Literal(text) => text.as_str(),
        Section::Placeholder(name) => values.get(name).map_or("", String::as_str),
      })
      .collect::<String>();

    let lines = self.split_lines(&values);
    let strict_lines = compile_lines(&lines, true)?;
    let relaxed_lines = compile_lines(&lines, false)?;

    Ok(HeaderTemplate {
      raw: self.raw.clone(),
      sections: self.sections.clone(),
      rendered,
      strict_lines,
      relaxed_lines,
    })
  }

  fn section(&self, key: &str) -> Option<&HeaderSection> {
    self.dynamic.iter().find(|s| s.key == key)
  }

  /// Splits the template into lines of pieces. Static placeholders are
  /// substituted; dynamic ones stay as wildcards.
  fn split_lines(&self, values: &HashMap<String, String>) -> Vec<Vec<Piece>> {
    let mut lines: Vec<Vec<Piece>> = vec![Vec::new()];

    for section in &self.sections {
      match section {
        Section::Literal(text) => push_text(&mut lines, text),
        Section::Placeholder(name) => match self.section(name) {
          Some(dynamic) => {
            let pattern = dynamic
              .ensure_match
              .as_ref()
              .map_or_else(|| ".*".to_string(), |re| format!("(?:{})", re.as_str()));
            if let Some(line) = lines.last_mut() {
              line.push(Piece::Dynamic(pattern));
            }
          }
          None => push_text(&mut lines, values.get(name).map_or("", String::as_str)),
        },
      }
    }

    // A trailing newline does not start another header line.
    if lines.len() > 1 && lines.last().is_some_and(Vec::is_empty) {
      lines.pop();
    }
    lines
  }
}

/// A header template with every placeholder resolved.
///
/// Immutable once built. Rendering is plain substitution; comparison is
/// structural (see [`HeaderTemplate::equals_structurally`]).
#[derive(Debug, Clone)]
pub struct HeaderTemplate {
  raw: String,
  sections: Vec<Section>,
  rendered: String,
  strict_lines: Vec<LineMatcher>,
  relaxed_lines: Vec<LineMatcher>,
}

impl HeaderTemplate {
  /// Parses `raw` and resolves it against `properties` in one step.
  ///
  /// # Errors
  ///
  /// Returns [`ConfigError::UnresolvedPlaceholder`] if a placeholder has no
  /// value.
  pub fn build(raw: &str, properties: &PropertyMap) -> Result<Self, ConfigError> {
    TemplateSource::parse(raw).resolve(properties)
  }

  /// The header text with all placeholders substituted, without comment
  /// delimiters.
  pub fn render(&self) -> &str {
    &self.rendered
  }

  pub fn raw_text(&self) -> &str {
    &self.raw
  }

  pub fn sections(&self) -> &[Section] {
    &self.sections
  }

  /// Compares header text (comment delimiters already stripped) with this
  /// template.
  ///
  /// With `strict == false`, leading and trailing whitespace on every line is
  /// ignored, runs of blank lines count as one, and blank lines at either end
  /// are dropped. With `strict == true` the lines must be equal one for one,
  /// apart from whitespace at line ends and blank lines at the end, which
  /// comment writers do not keep.
  /// Dynamic sections accept any text in both modes, subject to their
  /// `ensure_match` pattern.
  pub fn equals_structurally(&self, candidate: &str, strict: bool) -> bool {
    let matchers = if strict { &self.strict_lines } else { &self.relaxed_lines };

    let candidate_lines: Vec<&str> = candidate.lines().collect();
    let candidate_lines = if strict {
      trim_trailing_blank(candidate_lines.into_iter().map(str::trim_end).collect())
    } else {
      relax(candidate_lines.into_iter().map(str::trim))
    };

    matchers.len() == candidate_lines.len()
      && matchers
        .iter()
        .zip(&candidate_lines)
        .all(|(matcher, line)| matcher.matches(line))
  }
}

#[derive(Debug, Clone)]
enum Piece {
  Text(String),
  /// Regex fragment accepted at a dynamic section's position.
  Dynamic(String),
}

#[derive(Debug, Clone)]
enum LineMatcher {
  Exact(String),
  Pattern(Regex),
}

impl LineMatcher {
  fn matches(&self, line: &str) -> bool {
    match self {
      Self::Exact(expected) => expected == line,
      Self::Pattern(regex) => regex.is_match(line),
    }
  }

  fn is_blank(&self) -> bool {
    matches!(self, Self::Exact(text) if text.is_empty())
  }
}

fn push_text(lines: &mut Vec<Vec<Piece>>, text: &str) {
  for (i, part) in text.split('\n').enumerate() {
    if i > 0 {
      lines.push(Vec::new());
    }
    let part = part.strip_suffix('\r').unwrap_or(part);
    if !part.is_empty()
      && let Some(line) = lines.last_mut()
    {
      line.push(Piece::Text(part.to_string()));
    }
  }
}

fn push_literal(sections: &mut Vec<Section>, text: &str) {
  if text.is_empty() {
    return;
  }
  if let Some(Section::Literal(previous)) = sections.last_mut() {
    previous.push_str(text);
  } else {
    sections.push(Section::Literal(text.to_string()));
  }
}

fn parse_sections(raw: &str) -> Vec<Section> {
  let mut sections: Vec<Section> = Vec::new();

  let mut rest = raw;
  while let Some(start) = rest.find("${") {
    let after = &rest[start + 2..];
    let Some(end) = after.find('}') else {
      break;
    };

    let name = after[..end].trim();
    if name.is_empty() {
      push_literal(&mut sections, &rest[..start + 3 + end]);
    } else {
      push_literal(&mut sections, &rest[..start]);
      sections.push(Section::Placeholder(name.to_string()));
    }
    rest = &after[end + 1..];
  }
  push_literal(&mut sections, rest);

  sections
}

fn compile_lines(lines: &[Vec<Piece>], strict: bool) -> Result<Vec<LineMatcher>, ConfigError> {
  let mut matchers = Vec::with_capacity(lines.len());

  for pieces in lines {
    let has_dynamic = pieces.iter().any(|piece| matches!(piece, Piece::Dynamic(_)));
    if !has_dynamic {
      let text: String = pieces
        .iter()
        .map(|piece| match piece {
          Piece::Text(text) => text.as_str(),
          Piece::Dynamic(_) => "",
        })
        .collect();
      let text = if strict { text.trim_end() } else { text.trim() };
      matchers.push(LineMatcher::Exact(text.to_string()));
      continue;
    }

    let last = pieces.len() - 1;
    let mut pattern = String::from("^");
    for (i, piece) in pieces.iter().enumerate() {
      match piece {
        Piece::Text(text) => {
          let mut text = text.as_str();
          if !strict && i == 0 {
            text = text.trim_start();
          }
          if i == last {
            text = text.trim_end();
          }
          pattern.push_str(&regex::escape(text));
        }
        Piece::Dynamic(fragment) => pattern.push_str(fragment),
      }
    }
    pattern.push('$');

    let regex = Regex::new(&pattern).map_err(|e| ConfigError::InvalidPattern {
      pattern: pattern.clone(),
      message: e.to_string(),
    })?;
    matchers.push(LineMatcher::Pattern(regex));
  }

  if strict {
    // Comment writers drop line-end whitespace and a trailing blank line
    while matchers.last().is_some_and(LineMatcher::is_blank) {
      matchers.pop();
    }
    Ok(matchers)
  } else {
    Ok(relax_matchers(matchers))
  }
}

fn trim_trailing_blank(mut lines: Vec<&str>) -> Vec<&str> {
  while lines.last().is_some_and(|line| line.is_empty()) {
    lines.pop();
  }
  lines
}

/// Collapses blank-line runs and drops blank lines at either end.
fn relax<'a>(lines: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
  let mut relaxed: Vec<&str> = Vec::new();
  for line in lines {
    if line.is_empty() && relaxed.last().is_none_or(|previous| previous.is_empty()) {
      continue;
    }
    relaxed.push(line);
  }
  trim_trailing_blank(relaxed)
}

fn relax_matchers(matchers: Vec<LineMatcher>) -> Vec<LineMatcher> {
  let mut relaxed: Vec<LineMatcher> = Vec::with_capacity(matchers.len());
  for matcher in matchers {
    if matcher.is_blank() && relaxed.last().is_none_or(LineMatcher::is_blank) {
      continue;
    }
    relaxed.push(matcher);
  }
  while relaxed.last().is_some_and(LineMatcher::is_blank) {
    relaxed.pop();
  }
  relaxed
}
