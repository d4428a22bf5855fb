//! # Comment Styles Module
//!
//! Comment delimiter definitions and the registry that maps file extensions
//! to them.
//!
//! The registry always carries the built-in catalog (see
//! [`CommentStyle::builtin_catalog`]) plus any custom styles declared by the
//! user. Extensions that are not mapped resolve to the `none` style, which
//! never matches a header.
//!
//! ## Example
//!
//! ```rust
//! use std::path::Path;
//!
//! use headerwarden::comment_styles::StyleRegistry;
//!
//! # fn main() -> Result<(), headerwarden::error::ConfigError> {
//! let mut registry = StyleRegistry::with_default_mapping();
//! registry.register("tmpl", "xml")?;
//!
//! assert_eq!(registry.style_for("GO").name, "slashslash");
//! assert_eq!(registry.style_for_path(Path::new("index.tmpl")).name, "xml");
//! assert!(registry.style_for("bin").is_unknown());
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tracing::trace;

use crate::error::ConfigError;

/// Name of the sentinel style used for unmapped extensions.
pub const UNKNOWN_STYLE: &str = "none";

/// Delimiter syntax used to wrap a header in a given file type.
///
/// For block styles (`/* ... */`) `first_line` opens the comment,
/// `before_each_line` prefixes every header line and `end_line` closes it.
/// Line styles (`// ...`) have empty `first_line` and `end_line` and set
/// `allows_line_comment`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentStyle {
  /// Symbolic name (e.g. "slashstar", "script", "xml")
  pub name: String,

  /// Opening delimiter of a block comment
  pub first_line: String,

  /// Prefix written before every line of the header
  pub before_each_line: String,

  /// Closing delimiter of a block comment
  pub end_line: String,

  /// Whether the header is a run of line comments rather than a block
  pub allows_line_comment: bool,
}

impl CommentStyle {
  /// Create a line-comment style (no opening/closing delimiters).
  ///
  /// # Arguments
  ///
  /// * `name` - Symbolic style name
  /// * `prefix` - The prefix to use for each line (e.g., "// " or "# ")
  pub fn line(name: &str, prefix: &str) -> Self {
    Self {
      name: name.to_string(),
      first_line: String::new(),
      before_each_line: prefix.to_string(),
      end_line: String::new(),
      allows_line_comment: true,
    }
  }

  /// Create a block-comment style.
  ///
  /// # Arguments
  ///
  /// * `name` - Symbolic style name
  /// * `first_line` - The string to start the comment block (e.g., "/*")
  /// * `before_each_line` - The prefix for each line (e.g., " * ")
  /// * `end_line` - The string to end the comment block (e.g., " */")
  pub fn block(name: &str, first_line: &str, before_each_line: &str, end_line: &str) -> Self {
    Self {
      name: name.to_string(),
      first_line: first_line.to_string(),
      before_each_line: before_each_line.to_string(),
      end_line: end_line.to_string(),
      allows_line_comment: false,
    }
  }

  pub fn slash_star() -> Self {
    Self::block("slashstar", "/*", " * ", " */")
  }

  pub fn javadoc() -> Self {
    Self::block("javadoc", "/**", " * ", " */")
  }

  pub fn slash_slash() -> Self {
    Self::line("slashslash", "// ")
  }

  pub fn script() -> Self {
    Self::line("script", "# ")
  }

  pub fn xml() -> Self {
    Self::block("xml", "<!--", "    ", "-->")
  }

  pub fn dash_dash() -> Self {
    Self::line("dashdash", "-- ")
  }

  pub fn semicolon() -> Self {
    Self::line("semicolon", "; ")
  }

  pub fn percent() -> Self {
    Self::line("percent", "% ")
  }

  /// The sentinel style for unknown or binary files.
  pub fn none() -> Self {
    Self {
      name: UNKNOWN_STYLE.to_string(),
      first_line: String::new(),
      before_each_line: String::new(),
      end_line: String::new(),
      allows_line_comment: false,
    }
  }

  /// Every built-in style, including the `none` sentinel.
  pub fn builtin_catalog() -> Vec<Self> {
    vec![
      Self::slash_star(),
      Self::javadoc(),
      Self::slash_slash(),
      Self::script(),
      Self::xml(),
      Self::dash_dash(),
      Self::semicolon(),
      Self::percent(),
      Self::none(),
    ]
  }

  pub fn is_unknown(&self) -> bool {
    self.name == UNKNOWN_STYLE
  }

  /// Prefix that marks a comment line, without surrounding whitespace.
  pub fn line_marker(&self) -> &str {
    self.before_each_line.trim()
  }

  /// Wraps `text` in this style's delimiters.
  ///
  /// Every line of `text` is prefixed with `before_each_line` (trimmed for
  /// empty lines, so no trailing whitespace is produced) and terminated with
  /// `eol`, including the closing delimiter.
  pub fn format(&self, text: &str, eol: &str) -> String {
    let mut result = String::with_capacity(text.len() + 64);

    if !self.first_line.is_empty() {
      result.push_str(&self.first_line);
      result.push_str(eol);
    }

    for line in text.lines() {
      if line.trim().is_empty() {
        result.push_str(self.before_each_line.trim_end());
      } else {
        result.push_str(&self.before_each_line);
        result.push_str(line.trim_end());
      }
      result.push_str(eol);
    }

    if !self.end_line.is_empty() {
      result.push_str(&self.end_line);
      result.push_str(eol);
    }

    result
  }

  fn validate(&self) -> Result<(), ConfigError> {
    let invalid = |message: &str| ConfigError::InvalidCommentStyle {
      name: self.name.clone(),
      message: message.to_string(),
    };

    if self.name.trim().is_empty() {
      return Err(invalid("name cannot be empty"));
    }
    if self.is_unknown() {
      return Err(invalid("the 'none' style cannot be redefined"));
    }
    if self.allows_line_comment && self.line_marker().is_empty() {
      return Err(invalid("before-each-line cannot be empty for a line comment style"));
    }
    if !self.allows_line_comment && (self.first_line.trim().is_empty() || self.end_line.trim().is_empty()) {
      return Err(invalid("first-line and end-line are required for a block comment style"));
    }
    Ok(())
  }
}

/// Default extension to style-name mapping.
///
/// Keys are lowercased extensions without the leading dot.
pub fn default_mapping() -> HashMap<String, String> {
  const TABLE: &[(&str, &[&str])] = &[
    ("slashstar", &["c", "h", "gv", "java", "scala", "kt", "kts"]),
    ("javadoc", &["js", "mjs", "cjs", "jsx", "ts", "tsx", "css", "scss", "sass", "less"]),
    (
      "slashslash",
      &[
        "cc", "cpp", "cs", "go", "hcl", "hh", "hpp", "m", "mm", "proto", "rs", "swift", "dart", "groovy", "v", "sv",
        "php", "gradle",
      ],
    ),
    (
      "script",
      &[
        "py", "sh", "bash", "zsh", "yaml", "yml", "rb", "tcl", "tf", "bzl", "pl", "pp", "toml", "properties", "cmake",
        "dockerfile", "r",
      ],
    ),
    ("semicolon", &["el", "lisp", "clj", "ini"]),
    ("percent", &["erl", "tex"]),
    ("dashdash", &["hs", "sql", "sdl", "lua"]),
    ("xml", &["html", "htm", "xml", "xsd", "xsl", "vue", "wxi", "wxl", "wxs", "svg", "pom"]),
  ];

  TABLE
    .iter()
    .flat_map(|(style, extensions)| extensions.iter().map(|ext| ((*ext).to_string(), (*style).to_string())))
    .collect()
}

/// Default mapping for well-known files without a useful extension.
///
/// Keys are lowercased file names.
pub fn default_filename_mapping() -> HashMap<String, String> {
  ["dockerfile", "makefile", "cmakelists.txt", "jenkinsfile", "justfile"]
    .iter()
    .map(|name| ((*name).to_string(), "script".to_string()))
    .collect()
}

/// Maps extensions and file names to comment styles.
#[derive(Debug, Clone)]
pub struct StyleRegistry {
  styles: HashMap<String, Arc<CommentStyle>>,
  extensions: HashMap<String, String>,
  filenames: HashMap<String, String>,
  unknown: Arc<CommentStyle>,
}

impl Default for StyleRegistry {
  fn default() -> Self {
    Self::with_default_mapping()
  }
}

impl StyleRegistry {
  /// Creates a registry holding the built-in catalog and no mappings.
  pub fn new() -> Self {
    let styles: HashMap<String, Arc<CommentStyle>> = CommentStyle::builtin_catalog()
      .into_iter()
      .map(|style| (style.name.clone(), Arc::new(style)))
      .collect();
    let unknown = styles
      .get(UNKNOWN_STYLE)
      .cloned()
      .unwrap_or_else(|| Arc::new(CommentStyle::none()));

    Self {
      styles,
      extensions: HashMap::new(),
      filenames: HashMap::new(),
      unknown,
    }
  }

  /// Creates a registry seeded with [`default_mapping`] and
  /// [`default_filename_mapping`].
  pub fn with_default_mapping() -> Self {
    let mut registry = Self::new();
    registry.extensions = default_mapping();
    registry.filenames = default_filename_mapping();
    registry
  }

  /// Adds a custom comment style to the catalog, replacing any style of the
  /// same name.
  ///
  /// # Errors
  ///
  /// Returns [`ConfigError::InvalidCommentStyle`] if the definition is
  /// incomplete or tries to redefine `none`.
  pub fn define_style(&mut self, mut style: CommentStyle) -> Result<(), ConfigError> {
    style.name = style.name.trim().to_lowercase();
    style.validate()?;
    trace!("Defining comment style: {}", style.name);
    self.styles.insert(style.name.clone(), Arc::new(style));
    Ok(())
  }

  /// Maps `extension` to the style called `style_name`.
  ///
  /// The extension is normalized (lowercased, leading dot removed).
  ///
  /// # Errors
  ///
  /// Returns [`ConfigError::UnknownHeaderStyle`] if `style_name` is neither
  /// built in nor previously defined with [`define_style`](Self::define_style).
  pub fn register(&mut self, extension: &str, style_name: &str) -> Result<(), ConfigError> {
    let extension = normalize_extension(extension);
    let style_name = self.checked_style_name(style_name, &extension)?;
    self.extensions.insert(extension, style_name);
    Ok(())
  }

  /// Maps an exact (case-insensitive) file name to the style called
  /// `style_name`.
  ///
  /// # Errors
  ///
  /// Returns [`ConfigError::UnknownHeaderStyle`] for an unknown style name.
  pub fn register_filename(&mut self, file_name: &str, style_name: &str) -> Result<(), ConfigError> {
    let file_name = file_name.trim().to_lowercase();
    let style_name = self.checked_style_name(style_name, &file_name)?;
    self.filenames.insert(file_name, style_name);
    Ok(())
  }

  fn checked_style_name(&self, style_name: &str, key: &str) -> Result<String, ConfigError> {
    let style_name = style_name.trim().to_lowercase();
    if !self.styles.contains_key(&style_name) {
      return Err(ConfigError::UnknownHeaderStyle {
        style: style_name,
        extension: key.to_string(),
      });
    }
    Ok(style_name)
  }

  /// Looks up a style by name.
  pub fn style(&self, name: &str) -> Option<Arc<CommentStyle>> {
    self.styles.get(&name.trim().to_lowercase()).cloned()
  }

  /// Resolves an extension to its style, or the `none` style when unmapped.
  pub fn style_for(&self, extension: &str) -> Arc<CommentStyle> {
    let extension = normalize_extension(extension);
    self
      .extensions
      .get(&extension)
      .and_then(|name| self.styles.get(name))
      .cloned()
      .unwrap_or_else(|| Arc::clone(&self.unknown))
  }

  /// Resolves a path to its style, checking the file-name table before the
  /// extension.
  pub fn style_for_path(&self, path: &Path) -> Arc<CommentStyle> {
    let file_name = path
      .file_name()
      .and_then(|name| name.to_str())
      .unwrap_or("")
      .to_lowercase();

    if let Some(style) = self.filenames.get(&file_name).and_then(|name| self.styles.get(name)) {
      return Arc::clone(style);
    }

    let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");
    self.style_for(extension)
  }

  /// Current extension mapping.
  pub const fn mapping(&self) -> &HashMap<String, String> {
    &self.extensions
  }
}

fn normalize_extension(extension: &str) -> String {
  extension.trim().trim_start_matches('.').to_lowercase()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_default_mapping_resolves_common_types() {
    let registry = StyleRegistry::with_default_mapping();

    assert_eq!(registry.style_for("rs").name, "slashslash");
    assert_eq!(registry.style_for("java").name, "slashstar");
    assert_eq!(registry.style_for("ts").name, "javadoc");
    assert_eq!(registry.style_for("py").name, "script");
    assert_eq!(registry.style_for("xml").name, "xml");
    assert_eq!(registry.style_for("sql").name, "dashdash");
  }

  #[test]
  fn test_style_for_normalizes_extension() {
    let registry = StyleRegistry::with_default_mapping();
    assert_eq!(registry.style_for(".GO").name, "slashslash");
  }

  #[test]
  fn test_unknown_extension_resolves_to_none() {
    let registry = StyleRegistry::with_default_mapping();
    let style = registry.style_for("bin");
    assert!(style.is_unknown());
    assert_eq!(style.name, UNKNOWN_STYLE);
  }

  #[test]
  fn test_empty_registry_has_no_mappings() {
    let registry = StyleRegistry::new();
    assert!(registry.style_for("rs").is_unknown());
    assert!(registry.mapping().is_empty());
  }

  #[test]
  fn test_register_overrides_default() {
    let mut registry = StyleRegistry::with_default_mapping();
    registry.register("java", "SlashSlash").unwrap();
    assert_eq!(registry.style_for("java").name, "slashslash");
  }

  #[test]
  fn test_register_unknown_style_fails() {
    let mut registry = StyleRegistry::with_default_mapping();
    let err = registry.register("foo", "sparkles").unwrap_err();
    assert!(matches!(
      err,
      ConfigError::UnknownHeaderStyle { ref style, ref extension } if style == "sparkles" && extension == "foo"
    ));
  }

  #[test]
  fn test_custom_style_can_be_mapped() {
    let mut registry = StyleRegistry::with_default_mapping();
    registry
      .define_style(CommentStyle::block("Fancy", "/**********", " ** ", " **********/"))
      .unwrap();
    registry.register("fancy", "fancy").unwrap();

    let style = registry.style_for("fancy");
    assert_eq!(style.first_line, "/**********");
    assert!(!style.allows_line_comment);
  }

  #[test]
  fn test_invalid_custom_styles_rejected() {
    let mut registry = StyleRegistry::new();
    assert!(registry.define_style(CommentStyle::line("blank", "   ")).is_err());
    assert!(registry.define_style(CommentStyle::block("open", "/*", " * ", "")).is_err());
    assert!(registry.define_style(CommentStyle::line("none", "# ")).is_err());
  }

  #[test]
  fn test_filename_mapping_precedes_extension() {
    let registry = StyleRegistry::with_default_mapping();
    assert_eq!(registry.style_for_path(Path::new("/repo/Dockerfile")).name, "script");
    assert_eq!(registry.style_for_path(Path::new("/repo/CMakeLists.txt")).name, "script");
    assert!(registry.style_for_path(Path::new("/repo/notes.txt")).is_unknown());
  }

  #[test]
  fn test_format_line_style() {
    let formatted = CommentStyle::slash_slash().format("Copyright 2025\n\nAll rights reserved.", "\n");
    assert_eq!(formatted, "// Copyright 2025\n//\n// All rights reserved.\n");
  }

  #[test]
  fn test_format_block_style_with_crlf() {
    let formatted = CommentStyle::slash_star().format("Copyright 2025", "\r\n");
    assert_eq!(formatted, "/*\r\n * Copyright 2025\r\n */\r\n");
  }
}
