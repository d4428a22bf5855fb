//! # Document Module
//!
//! A single source file held in memory while its license header is checked
//! or rewritten.
//!
//! A [`Document`] owns the decoded file content and the comment style of its
//! file type. [`Document::parse_header`] locates the leading comment block
//! (after any prolog such as a shebang) and records its byte range; the
//! mutation methods then work on that range without touching the rest of the
//! content. Nothing is written to disk until [`Document::save`] or
//! [`Document::save_to`] is called.

pub mod file_io;
pub mod prolog;

use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, trace};

pub use self::file_io::{Encoding, FileIO};
use crate::comment_styles::CommentStyle;
use crate::error::ScanError;
use crate::templates::HeaderTemplate;

/// Keywords used when none are configured.
pub const DEFAULT_KEYWORDS: &[&str] = &["copyright"];

/// Line terminator convention of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
  #[default]
  Lf,
  CrLf,
}

impl LineEnding {
  /// Detects the convention from the first line break in `content`.
  ///
  /// Content without any line break is treated as LF.
  pub fn detect(content: &str) -> Self {
    match content.find('\n') {
      Some(i) if content[..i].ends_with('\r') => Self::CrLf,
      _ => Self::Lf,
    }
  }

  pub const fn as_str(self) -> &'static str {
    match self {
      Self::Lf => "\n",
      Self::CrLf => "\r\n",
    }
  }
}

/// Byte ranges of a detected header.
#[derive(Debug, Clone, PartialEq, Eq)]
struct HeaderSpan {
  /// Everything removed with the header: from the insertion point through
  /// the blank lines that follow the comment.
  range: Range<usize>,

  /// The comment block itself.
  comment: Range<usize>,
}

/// One line of content. `start..end` excludes the terminator, `next` is the
/// offset of the following line.
#[derive(Debug, Clone, Copy)]
struct LineSpan {
  start: usize,
  end: usize,
  next: usize,
}

fn line_at(content: &str, start: usize) -> Option<LineSpan> {
  if start >= content.len() {
    return None;
  }
  match content[start..].find('\n') {
    Some(i) => {
      let newline = start + i;
      let end = if content[start..newline].ends_with('\r') {
        newline - 1
      } else {
        newline
      };
      Some(LineSpan {
        start,
        end,
        next: newline + 1,
      })
    }
    None => Some(LineSpan {
      start,
      end: content.len(),
      next: content.len(),
    }),
  }
}

fn lines_from(content: &str, start: usize) -> impl Iterator<Item = LineSpan> + '_ {
  std::iter::successors(line_at(content, start), move |line| line_at(content, line.next))
}

/// A file's content plus the state of its license header.
#[derive(Debug, Clone)]
pub struct Document {
  path: PathBuf,
  style: Arc<CommentStyle>,
  encoding: Encoding,
  keywords: Vec<String>,
  content: String,
  line_ending: LineEnding,
  header: Option<HeaderSpan>,
  parsed: bool,
}

impl Document {
  /// Reads `path` and wraps its content.
  ///
  /// # Errors
  ///
  /// Returns [`ScanError::Read`] or [`ScanError::Decode`] if the file cannot
  /// be read in `encoding`.
  pub fn load(
    path: &Path,
    style: Arc<CommentStyle>,
    encoding: Encoding,
    keywords: &[String],
  ) -> Result<Self, ScanError> {
    let content = FileIO::read(path, encoding)?;
    trace!("Loaded {} ({} bytes)", path.display(), content.len());
    Ok(
      Self::from_content(path.to_path_buf(), style, &content)
        .with_encoding(encoding)
        .with_keywords(keywords),
    )
  }

  /// Wraps in-memory content, using UTF-8 and the default keywords.
  pub fn from_content(path: PathBuf, style: Arc<CommentStyle>, content: &str) -> Self {
    Self {
      path,
      style,
      encoding: Encoding::Utf8,
      keywords: DEFAULT_KEYWORDS.iter().map(|k| (*k).to_string()).collect(),
      content: content.to_string(),
      line_ending: LineEnding::detect(content),
      header: None,
      parsed: false,
    }
  }

  #[must_use]
  pub const fn with_encoding(mut self, encoding: Encoding) -> Self {
    self.encoding = encoding;
    self
  }

  /// Replaces the header keywords. An empty list accepts any leading comment
  /// as a header.
  #[must_use]
  pub fn with_keywords(mut self, keywords: &[String]) -> Self {
    self.keywords = keywords.iter().map(|k| k.to_lowercase()).collect();
    self.reset();
    self
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn style(&self) -> &CommentStyle {
    &self.style
  }

  pub const fn encoding(&self) -> Encoding {
    self.encoding
  }

  pub fn content(&self) -> &str {
    &self.content
  }

  pub const fn line_ending(&self) -> LineEnding {
    self.line_ending
  }

  /// Locates the header, if any.
  ///
  /// The result is cached: calling this again has no effect until
  /// [`reset`](Self::reset).
  pub fn parse_header(&mut self) {
    if self.parsed {
      return;
    }
    self.header = self.find_header();
    self.parsed = true;
    trace!(
      "Parsed {}: header {}",
      self.path.display(),
      if self.header.is_some() { "detected" } else { "absent" }
    );
  }

  /// Forgets the parsed header so the next [`parse_header`](Self::parse_header)
  /// scans the content again.
  pub fn reset(&mut self) {
    self.header = None;
    self.parsed = false;
  }

  pub const fn is_parsed(&self) -> bool {
    self.parsed
  }

  pub const fn header_detected(&self) -> bool {
    self.header.is_some()
  }

  /// Byte range that [`remove_header`](Self::remove_header) would delete.
  pub fn header_range(&self) -> Option<Range<usize>> {
    self.header.as_ref().map(|span| span.range.clone())
  }

  /// Text of the detected header with comment delimiters stripped, one line
  /// per header line.
  pub fn header_text(&self) -> Option<String> {
    let span = self.header.as_ref()?;
    let lines: Vec<&str> = lines_from(&self.content, span.comment.start)
      .take_while(|line| line.start < span.comment.end)
      .map(|line| &self.content[line.start..line.end.min(span.comment.end)])
      .collect();

    let text = if self.style.allows_line_comment {
      lines.iter().map(|&line| self.strip_line_prefix(line).trim_end()).collect::<Vec<_>>()
    } else {
      self.block_text_lines(&lines)
    };
    Some(text.join("\n"))
  }

  /// Content following the header (or the whole content when no header is
  /// detected).
  pub fn body(&self) -> &str {
    match &self.header {
      Some(span) => &self.content[span.range.end..],
      None => &self.content,
    }
  }

  /// Deletes the detected header and the blank lines after it.
  ///
  /// No-op when no header is detected.
  pub fn remove_header(&mut self) {
    if let Some(span) = self.header.take() {
      debug!("Removing header from {}", self.path.display());
      self.content.replace_range(span.range, "");
    }
  }

  /// Inserts `template`, wrapped in this document's comment delimiters, at
  /// the top of the content (below any prolog) and records it as the
  /// detected header.
  ///
  /// Inserted text uses the document's detected line ending.
  pub fn update_header(&mut self, template: &HeaderTemplate) {
    let eol = self.line_ending.as_str();
    let prolog = prolog::detect(&self.content);
    let separator = prolog.separator(&self.content, eol);
    let block = self.style.format(template.render(), eol);

    let insert_at = prolog.end;
    let comment_start = insert_at + separator.len();
    let end = comment_start + block.len();
    self.content.insert_str(insert_at, &format!("{separator}{block}"));

    self.header = Some(HeaderSpan {
      range: insert_at..end,
      comment: comment_start..end,
    });
    self.parsed = true;
  }

  /// Inserts `text` directly after the detected header, extending the header
  /// range over it.
  ///
  /// No-op when no header is detected.
  pub fn insert_after_header(&mut self, text: &str) {
    if let Some(span) = self.header.as_mut() {
      self.content.insert_str(span.range.end, text);
      span.range.end += text.len();
    }
  }

  /// Writes the content back to the document's own path.
  ///
  /// # Errors
  ///
  /// Returns [`ScanError::Encode`] or [`ScanError::Write`].
  pub fn save(&self) -> Result<(), ScanError> {
    self.save_to(&self.path)
  }

  /// Writes the content to `path`, leaving the original file untouched.
  ///
  /// # Errors
  ///
  /// Returns [`ScanError::Encode`] or [`ScanError::Write`].
  pub fn save_to(&self, path: &Path) -> Result<(), ScanError> {
    debug!("Saving {} to {}", self.path.display(), path.display());
    FileIO::write(path, &self.content, self.encoding)
  }

  fn find_header(&self) -> Option<HeaderSpan> {
    if self.style.is_unknown() {
      return None;
    }

    let insert_at = prolog::detect(&self.content).end;
    let first = lines_from(&self.content, insert_at).find(|line| !self.text(line).trim().is_empty())?;

    let comment_end = if self.style.allows_line_comment {
      self.scan_line_comment(first)
    } else {
      self.scan_block_comment(first)
    }?;
    let comment = first.start..comment_end;

    if !self.has_keyword(&self.content[comment.clone()]) {
      debug!("Leading comment in {} has no header keyword", self.path.display());
      return None;
    }

    let end = lines_from(&self.content, comment_end)
      .take_while(|line| self.text(line).trim().is_empty())
      .last()
      .map_or(comment_end, |line| line.next);

    Some(HeaderSpan {
      range: insert_at..end,
      comment,
    })
  }

  fn text(&self, line: &LineSpan) -> &str {
    &self.content[line.start..line.end]
  }

  fn scan_line_comment(&self, first: LineSpan) -> Option<usize> {
    let marker = self.style.line_marker();
    if marker.is_empty() {
      return None;
    }
    let opening = self.text(&first);
    if !opening.trim_start().starts_with(marker) || (is_directive(opening, marker) && !self.has_keyword(opening)) {
      return None;
    }

    // Directives below the header belong to the body
    let end = lines_from(&self.content, first.next)
      .take_while(|line| {
        let text = self.text(line);
        text.trim_start().starts_with(marker) && !is_directive(text, marker)
      })
      .last()
      .map_or(first.next, |line| line.next);
    Some(end)
  }

  fn scan_block_comment(&self, first: LineSpan) -> Option<usize> {
    let open = self.style.first_line.trim();
    let close = self.style.end_line.trim();
    if open.is_empty() || close.is_empty() {
      return None;
    }

    let line = self.text(&first);
    let trimmed = line.trim_start();
    if !trimmed.starts_with(open) {
      return None;
    }

    let after_open = first.start + (line.len() - trimmed.len()) + open.len();
    let close_at = after_open + self.content[after_open..].find(close)?;
    let after_close = close_at + close.len();
    let Some(closing) = line_at(&self.content, close_at) else {
      return Some(self.content.len());
    };

    // Code sharing the closing line stays in the body
    let rest = &self.content[after_close..closing.end];
    if rest.trim().is_empty() {
      Some(closing.next)
    } else {
      Some(after_close + (rest.len() - rest.trim_start().len()))
    }
  }

  fn has_keyword(&self, comment: &str) -> bool {
    if self.keywords.is_empty() {
      return true;
    }
    let comment = comment.to_lowercase();
    self.keywords.iter().any(|keyword| comment.contains(keyword.as_str()))
  }

  fn strip_line_prefix<'a>(&self, line: &'a str) -> &'a str {
    let prefix = self.style.before_each_line.as_str();
    if !prefix.is_empty()
      && let Some(rest) = line.strip_prefix(prefix)
    {
      return rest;
    }

    let marker = prefix.trim();
    let trimmed = line.trim_start();
    if marker.is_empty() {
      return trimmed;
    }
    match trimmed.strip_prefix(marker) {
      Some(rest) => rest.strip_prefix(' ').unwrap_or(rest),
      None => line,
    }
  }

  fn block_text_lines<'a>(&self, lines: &[&'a str]) -> Vec<&'a str> {
    let open = self.style.first_line.trim();
    let close = self.style.end_line.trim();
    let last = lines.len().saturating_sub(1);

    let mut text = Vec::with_capacity(lines.len());
    for (i, line) in lines.iter().enumerate() {
      let mut part: &str = line;
      if i == last
        && let Some(pos) = part.rfind(close)
      {
        part = &part[..pos];
      }

      if i == 0 {
        let rest = part.trim_start();
        let rest = rest.strip_prefix(open).unwrap_or(rest);
        if is_decoration(rest) {
          continue;
        }
        text.push(rest.strip_prefix(' ').unwrap_or(rest).trim_end());
        continue;
      }

      if i == last && is_decoration(part) {
        continue;
      }
      text.push(self.strip_line_prefix(part).trim_end());
    }
    text
  }
}

/// Tool directives written as line comments with a space after the marker.
const SPACED_DIRECTIVES: &[&str] = &[
  "+build",
  "eslint-",
  "prettier-ignore",
  "noqa",
  "type:",
  "pylint:",
  "fmt:",
  "isort:",
  "mypy:",
  "@ts-",
];

/// Whether a line comment is a tool directive such as `//go:build`,
/// `//nolint:errcheck`, `#!` or `# noqa` rather than prose.
///
/// Runs of the marker character (`////`, `###`) are banners, not directives.
fn is_directive(line: &str, marker: &str) -> bool {
  let Some(rest) = line.trim_start().strip_prefix(marker) else {
    return false;
  };
  let glued = rest
    .chars()
    .next()
    .is_some_and(|c| !c.is_whitespace() && !marker.contains(c));
  glued || SPACED_DIRECTIVES.iter().any(|word| rest.trim_start().starts_with(word))
}

/// Opening or closing comment line remainder with no header text.
fn is_decoration(text: &str) -> bool {
  text.trim().chars().all(|c| c == '*')
}
