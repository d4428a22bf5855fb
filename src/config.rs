//! # Configuration Module
//!
//! Project configuration for headerwarden, read from a TOML file.
//!
//! Configuration can be specified in a `.headerwarden.toml` file in the root
//! directory, via the `HEADERWARDEN_CONFIG` environment variable, or with
//! `--config`. Command-line flags override values from the file.
//!
//! ```toml
//! header = "HEADER.txt"
//! valid-headers = ["OLD_HEADER.txt"]
//! inception-year = 2019
//! providers = ["copyright-range"]
//! excludes = ["vendor/**"]
//!
//! [properties]
//! owner = "Acme"
//!
//! [mapping]
//! tmpl = "xml"
//! fancy = "fancy"
//!
//! [header-definitions.fancy]
//! first-line = "/**********"
//! before-each-line = " ** "
//! end-line = " **********/"
//!
//! [[header-sections]]
//! key = "year"
//! ensure-match = "[0-9]{4}(-[0-9]{4})?"
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::comment_styles::{CommentStyle, StyleRegistry};
use crate::document::Encoding;
use crate::error::ConfigError;
use crate::properties::{PropertyProvider, provider_by_name};
use crate::templates::HeaderSection;
use crate::verbose_log;

/// The default config file name.
pub const DEFAULT_CONFIG_FILENAME: &str = ".headerwarden.toml";

/// Environment variable for specifying config file path.
pub const CONFIG_ENV_VAR: &str = "HEADERWARDEN_CONFIG";

/// A custom comment style declared under `[header-definitions.<name>]`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct HeaderDefinitionConfig {
  /// Opening delimiter (e.g. "/*"). Empty for line-comment styles.
  #[serde(default)]
  pub first_line: String,

  /// Prefix of each header line (e.g. " * " or "// ").
  pub before_each_line: String,

  /// Closing delimiter (e.g. " */"). Empty for line-comment styles.
  #[serde(default)]
  pub end_line: String,

  /// Defaults to true when both delimiters are empty.
  #[serde(default)]
  pub allows_line_comment: Option<bool>,
}

impl HeaderDefinitionConfig {
  pub fn to_style(&self, name: &str) -> CommentStyle {
    let allows_line_comment = self
      .allows_line_comment
      .unwrap_or_else(|| self.first_line.trim().is_empty() && self.end_line.trim().is_empty());

    CommentStyle {
      name: name.to_string(),
      first_line: self.first_line.clone(),
      before_each_line: self.before_each_line.clone(),
      end_line: self.end_line.clone(),
      allows_line_comment,
    }
  }
}

/// A dynamic header field declared under `[[header-sections]]`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct HeaderSectionConfig {
  pub key: String,

  #[serde(default)]
  pub default: Option<String>,

  #[serde(default)]
  pub ensure_match: Option<String>,
}

impl HeaderSectionConfig {
  /// # Errors
  ///
  /// Returns [`ConfigError::InvalidPattern`] if `ensure-match` is not a valid
  /// regex.
  pub fn to_section(&self) -> Result<HeaderSection, ConfigError> {
    let mut section = HeaderSection::new(self.key.trim());
    if let Some(default) = &self.default {
      section = section.with_default(default.clone());
    }
    if let Some(pattern) = &self.ensure_match {
      section = section.with_pattern(pattern)?;
    }
    Ok(section)
  }
}

/// Main configuration struct, loaded from a `.headerwarden.toml` file.
///
/// Scalar options are optional so that command-line flags can tell "unset"
/// apart from an explicit value.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
  /// Canonical header template file
  pub header: Option<PathBuf>,

  /// Header template files accepted in place of the canonical one
  #[serde(default)]
  pub valid_headers: Vec<PathBuf>,

  pub strict_check: Option<bool>,
  pub dry_run: Option<bool>,
  pub skip_existing_headers: Option<bool>,
  pub report_non_canonical: Option<bool>,
  pub use_default_mappings: Option<bool>,
  pub blank_line_after_header: Option<bool>,
  pub encoding: Option<String>,
  pub concurrency_factor: Option<f64>,
  pub threads: Option<usize>,
  pub keywords: Option<Vec<String>>,
  pub inception_year: Option<i32>,

  /// Property providers to enable, by name
  #[serde(default)]
  pub providers: Vec<String>,

  /// Glob patterns of files to leave out
  #[serde(default)]
  pub excludes: Vec<String>,

  /// Properties available to header placeholders
  #[serde(default)]
  pub properties: HashMap<String, String>,

  /// Extension (without leading dot) to comment style name
  #[serde(default)]
  pub mapping: HashMap<String, String>,

  /// Exact file name (e.g. "Justfile") to comment style name
  #[serde(default)]
  pub filenames: HashMap<String, String>,

  #[serde(default)]
  pub header_definitions: HashMap<String, HeaderDefinitionConfig>,

  #[serde(default)]
  pub header_sections: Vec<HeaderSectionConfig>,
}

impl Config {
  /// Load configuration from a file.
  ///
  /// Relative template paths are resolved against the directory holding the
  /// config file.
  ///
  /// # Errors
  ///
  /// Returns [`ConfigError::ReadError`] or [`ConfigError::ParseError`] if the
  /// file cannot be read or parsed, or any validation error.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    verbose_log!("Loading config from: {}", path.display());

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
      path: path.to_path_buf(),
      source: e,
    })?;

    let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
      path: path.to_path_buf(),
      source: e,
    })?;

    config.validate()?;

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let config = config.resolve_paths(base_dir).normalize();

    verbose_log!(
      "Loaded {} mappings and {} custom comment styles",
      config.mapping.len(),
      config.header_definitions.len()
    );

    Ok(config)
  }

  /// Validate the values that need no other context.
  fn validate(&self) -> Result<(), ConfigError> {
    if let Some(encoding) = &self.encoding {
      encoding.parse::<Encoding>()?;
    }

    if let Some(factor) = self.concurrency_factor
      && (!factor.is_finite() || factor <= 0.0)
    {
      return Err(ConfigError::InvalidConcurrency {
        message: format!("concurrency-factor must be positive, got {factor}"),
      });
    }

    if self.threads == Some(0) {
      return Err(ConfigError::InvalidConcurrency {
        message: "threads must be at least 1".to_string(),
      });
    }

    for ext in self.mapping.keys() {
      if ext.starts_with('.') {
        return Err(ConfigError::InvalidPattern {
          pattern: ext.clone(),
          message: "extension should not include leading dot".to_string(),
        });
      }
    }

    for section in &self.header_sections {
      section.to_section()?;
    }

    Ok(())
  }

  fn resolve_paths(mut self, base_dir: &Path) -> Self {
    let resolve = |path: PathBuf| if path.is_absolute() { path } else { base_dir.join(path) };
    self.header = self.header.map(resolve);
    self.valid_headers = self.valid_headers.into_iter().map(resolve).collect();
    self
  }

  /// Normalize keys to lowercase for case-insensitive matching.
  fn normalize(mut self) -> Self {
    self.mapping = self
      .mapping
      .into_iter()
      .map(|(k, v)| (k.to_lowercase(), v.to_lowercase()))
      .collect();
    self.filenames = self
      .filenames
      .into_iter()
      .map(|(k, v)| (k.to_lowercase(), v.to_lowercase()))
      .collect();
    self.header_definitions = self
      .header_definitions
      .into_iter()
      .map(|(k, v)| (k.to_lowercase(), v))
      .collect();
    self
  }

  /// Builds the comment style registry described by this configuration.
  ///
  /// Custom styles are defined first so mappings may refer to them.
  ///
  /// # Errors
  ///
  /// Returns [`ConfigError::InvalidCommentStyle`] for a malformed definition
  /// and [`ConfigError::UnknownHeaderStyle`] for a mapping to an unknown
  /// style.
  pub fn build_registry(&self, use_default_mappings: bool) -> Result<StyleRegistry, ConfigError> {
    let mut registry = if use_default_mappings {
      StyleRegistry::with_default_mapping()
    } else {
      StyleRegistry::new()
    };

    let mut definitions: Vec<_> = self.header_definitions.iter().collect();
    definitions.sort_by(|a, b| a.0.cmp(b.0));
    for (name, definition) in definitions {
      registry.define_style(definition.to_style(name))?;
    }

    let mut mapping: Vec<_> = self.mapping.iter().collect();
    mapping.sort();
    for (extension, style) in mapping {
      registry.register(extension, style)?;
    }

    let mut filenames: Vec<_> = self.filenames.iter().collect();
    filenames.sort();
    for (file_name, style) in filenames {
      registry.register_filename(file_name, style)?;
    }

    Ok(registry)
  }

  /// Dynamic header sections declared in the file.
  ///
  /// # Errors
  ///
  /// Returns [`ConfigError::InvalidPattern`] for an invalid `ensure-match`.
  pub fn header_sections(&self) -> Result<Vec<HeaderSection>, ConfigError> {
    self.header_sections.iter().map(HeaderSectionConfig::to_section).collect()
  }

  /// Instantiates the configured property providers.
  ///
  /// # Errors
  ///
  /// Returns [`ConfigError::UnknownProvider`] for an unknown name.
  pub fn providers(&self) -> Result<Vec<Box<dyn PropertyProvider>>, ConfigError> {
    self.providers.iter().map(|name| provider_by_name(name)).collect()
  }
}

/// Discover the configuration file path.
///
/// The configuration file is discovered in the following order:
/// 1. Path specified via `--config` flag (passed as `explicit_path`)
/// 2. Path specified via `HEADERWARDEN_CONFIG` environment variable
/// 3. `.headerwarden.toml` in the root directory
///
/// # Returns
///
/// The path to the configuration file, or `None` if no config file is found.
pub fn discover_config_path(explicit_path: Option<&Path>, root: &Path) -> Option<PathBuf> {
  if let Some(path) = explicit_path {
    if path.exists() {
      verbose_log!("Using explicit config path: {}", path.display());
      return Some(path.to_path_buf());
    }
    verbose_log!("Explicit config path does not exist: {}", path.display());
    return None;
  }

  if let Ok(env_path) = std::env::var(CONFIG_ENV_VAR) {
    let path = PathBuf::from(&env_path);
    if path.exists() {
      verbose_log!("Using config from {}: {}", CONFIG_ENV_VAR, path.display());
      return Some(path);
    }
    verbose_log!("{} path does not exist: {}", CONFIG_ENV_VAR, env_path);
  }

  let root_config = root.join(DEFAULT_CONFIG_FILENAME);
  if root_config.exists() {
    verbose_log!("Using project config: {}", root_config.display());
    return Some(root_config);
  }

  verbose_log!("No config file found");
  None
}

/// Load configuration from the discovered path.
///
/// # Arguments
///
/// * `explicit_path` - Optional explicit path from CLI flag
/// * `root` - The root directory of the scan
/// * `no_config` - If true, skip config file discovery
///
/// # Errors
///
/// Fails if an explicit path does not exist, or if the discovered file
/// cannot be loaded.
pub fn load_config(explicit_path: Option<&Path>, root: &Path, no_config: bool) -> Result<Option<Config>> {
  if no_config {
    verbose_log!("Config file discovery disabled (--no-config)");
    return Ok(None);
  }

  if let Some(path) = explicit_path
    && !path.exists()
  {
    anyhow::bail!("Config file not found: {}", path.display());
  }

  match discover_config_path(explicit_path, root) {
    Some(path) => {
      let config = Config::load(&path).with_context(|| format!("Failed to load config from {}", path.display()))?;
      Ok(Some(config))
    }
    None => Ok(None),
  }
}

#[cfg(test)]
mod tests {
  use tempfile::TempDir;

  use super::*;

  fn write_config(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join(DEFAULT_CONFIG_FILENAME);
    std::fs::write(&path, content).unwrap();
    path
  }

  #[test]
  fn test_parse_full_config() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
      &dir,
      concat!(
        "header = \"HEADER.txt\"\n",
        "valid-headers = [\"/abs/OLD.txt\"]\n",
        "strict-check = true\n",
        "encoding = \"latin1\"\n",
        "concurrency-factor = 2.0\n",
        "keywords = [\"Copyright\", \"License\"]\n",
        "inception-year = 2019\n",
        "providers = [\"copyright-range\"]\n",
        "[properties]\n",
        "owner = \"Acme\"\n",
        "[mapping]\n",
        "TMPL = \"XML\"\n",
        "[header-definitions.fancy]\n",
        "first-line = \"/**********\"\n",
        "before-each-line = \" ** \"\n",
        "end-line = \" **********/\"\n",
        "[[header-sections]]\n",
        "key = \"year\"\n",
        "ensure-match = \"[0-9]{4}\"\n",
      ),
    );

    let config = Config::load(&path).unwrap();
    assert_eq!(config.header, Some(dir.path().join("HEADER.txt")));
    assert_eq!(config.valid_headers, vec![PathBuf::from("/abs/OLD.txt")]);
    assert_eq!(config.strict_check, Some(true));
    assert_eq!(config.inception_year, Some(2019));
    assert_eq!(config.properties.get("owner").map(String::as_str), Some("Acme"));
    assert_eq!(config.mapping.get("tmpl").map(String::as_str), Some("xml"));
    assert_eq!(config.header_sections().unwrap().len(), 1);
    assert_eq!(config.providers().unwrap().len(), 1);

    let style = config.header_definitions["fancy"].to_style("fancy");
    assert!(!style.allows_line_comment);
  }

  #[test]
  fn test_build_registry_with_custom_style() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
      &dir,
      concat!(
        "[mapping]\n",
        "fancy = \"fancy\"\n",
        "[filenames]\n",
        "Justfile = \"script\"\n",
        "[header-definitions.fancy]\n",
        "before-each-line = \"!! \"\n",
      ),
    );

    let config = Config::load(&path).unwrap();
    let registry = config.build_registry(true).unwrap();
    let style = registry.style_for("fancy");
    assert_eq!(style.before_each_line, "!! ");
    assert!(style.allows_line_comment);
    assert_eq!(registry.style_for_path(Path::new("Justfile")).name, "script");
    assert_eq!(registry.style_for("rs").name, "slashslash");

    let registry = config.build_registry(false).unwrap();
    assert!(registry.style_for("rs").is_unknown());
  }

  #[test]
  fn test_unknown_mapping_style_fails() {
    let config = Config {
      mapping: HashMap::from([("foo".to_string(), "sparkles".to_string())]),
      ..Config::default()
    };
    assert!(matches!(
      config.build_registry(true),
      Err(ConfigError::UnknownHeaderStyle { .. })
    ));
  }

  #[test]
  fn test_invalid_values_rejected() {
    let dir = TempDir::new().unwrap();

    let path = write_config(&dir, "encoding = \"utf-16\"\n");
    assert!(matches!(
      Config::load(&path),
      Err(ConfigError::UnsupportedEncoding { .. })
    ));

    let path = write_config(&dir, "concurrency-factor = 0.0\n");
    assert!(matches!(
      Config::load(&path),
      Err(ConfigError::InvalidConcurrency { .. })
    ));

    let path = write_config(&dir, "[mapping]\n\".rs\" = \"slashslash\"\n");
    assert!(matches!(Config::load(&path), Err(ConfigError::InvalidPattern { .. })));

    let path = write_config(&dir, "[[header-sections]]\nkey = \"year\"\nensure-match = \"(\"\n");
    assert!(matches!(Config::load(&path), Err(ConfigError::InvalidPattern { .. })));
  }

  #[test]
  fn test_parse_errors() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "not-a-key = 1\n");
    assert!(matches!(Config::load(&path), Err(ConfigError::ParseError { .. })));

    let err = Config::load(&dir.path().join("missing.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::ReadError { .. }));
  }

  #[test]
  fn test_discover_config_in_root() {
    let dir = TempDir::new().unwrap();
    assert_eq!(discover_config_path(Some(&dir.path().join("nope.toml")), dir.path()), None);

    let path = write_config(&dir, "dry-run = true\n");
    assert_eq!(discover_config_path(None, dir.path()), Some(path.clone()));
    assert_eq!(discover_config_path(Some(&path), Path::new("/elsewhere")), Some(path));
  }

  #[test]
  fn test_load_config_disabled_and_missing_explicit() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, "dry-run = true\n");

    assert!(load_config(None, dir.path(), true).unwrap().is_none());
    assert!(load_config(Some(&dir.path().join("nope.toml")), dir.path(), false).is_err());
    assert_eq!(
      load_config(None, dir.path(), false).unwrap().and_then(|c| c.dry_run),
      Some(true)
    );
  }
}
