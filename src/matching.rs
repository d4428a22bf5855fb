//! # Matching Module
//!
//! Compares a document's existing header with the canonical header and the
//! accepted alternates.

use tracing::trace;

use crate::document::Document;
use crate::templates::HeaderTemplate;

/// Verdict for one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchResult {
  NoHeaderPresent,
  HeaderMatchesCanonical,
  /// Zero-based position in the alternates list of the first alternate that
  /// matched.
  HeaderMatchesAlternate { index: usize },
  HeaderPresentButDiffers,
}

impl MatchResult {
  /// Whether the document carries an acceptable header.
  pub const fn is_accepted(self) -> bool {
    matches!(self, Self::HeaderMatchesCanonical | Self::HeaderMatchesAlternate { .. })
  }
}

/// Classifies `document`'s header, parsing it first if needed.
///
/// Alternates are tried in order and the first structural match wins.
pub fn classify(
  document: &mut Document,
  canonical: &HeaderTemplate,
  alternates: &[HeaderTemplate],
  strict: bool,
) -> MatchResult {
  document.parse_header();

  let Some(text) = document.header_text() else {
    return MatchResult::NoHeaderPresent;
  };

  let result = if canonical.equals_structurally(&text, strict) {
    MatchResult::HeaderMatchesCanonical
  } else {
    alternates
      .iter()
      .position(|alternate| alternate.equals_structurally(&text, strict))
      .map_or(MatchResult::HeaderPresentButDiffers, |index| {
        MatchResult::HeaderMatchesAlternate { index }
      })
  };

  trace!("{}: {:?}", document.path().display(), result);
  result
}
