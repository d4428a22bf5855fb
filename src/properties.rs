//! # Properties Module
//!
//! The property dictionary used to fill in header placeholders, and the
//! pluggable providers that adjust it per document.
//!
//! The base dictionary is layered from the process environment, caller
//! supplied values and command-line overrides (see [`merge_properties`]).
//! Per document, [`DocumentPropertiesLoader`] adds built-in keys and then
//! applies every registered [`PropertyProvider`] in order.

use std::collections::HashMap;
use std::fmt;

use chrono::Datelike;
use tracing::{debug, warn};

use crate::document::Document;
use crate::error::ConfigError;

/// String key to string value mapping used for template substitution.
pub type PropertyMap = HashMap<String, String>;

/// Changes a provider wants applied: `Some` sets a key, `None` removes it.
pub type PropertyDelta = HashMap<String, Option<String>>;

/// Key holding the file name of the document being processed.
pub const FILE_NAME_KEY: &str = "file.name";

/// Key holding the configured inception year.
pub const INCEPTION_YEAR_KEY: &str = "inceptionYear";

/// Key set by [`CopyrightRangeProvider`] to the current year.
pub const CURRENT_YEAR_KEY: &str = "currentYear";

/// Key set by [`CopyrightRangeProvider`] to `inception-current`.
pub const COPYRIGHT_RANGE_KEY: &str = "copyrightRange";

/// A plugin that adjusts the property dictionary for a single document.
///
/// Providers are registered explicitly on the loader; nothing is discovered
/// at runtime. A provider that returns an error is logged and skipped.
pub trait PropertyProvider: Send + Sync {
  /// Name used in configuration and log output.
  fn name(&self) -> &str;

  /// Keys this provider may set, so templates referencing them pass the
  /// up-front placeholder validation.
  fn provided_keys(&self) -> Vec<String> {
    Vec::new()
  }

  /// Computes the property changes for `document`.
  ///
  /// # Errors
  ///
  /// Any error is logged by the loader and the provider's delta discarded.
  fn adjust_properties(&self, properties: &PropertyMap, document: &Document) -> anyhow::Result<PropertyDelta>;
}

/// Merges the layered property sources, lowest precedence first.
///
/// The process environment is the base, `initial` (caller/config supplied
/// values) overrides it, and `overrides` (command-line `-D key=value`)
/// overrides both.
pub fn merge_properties(initial: &PropertyMap, overrides: &PropertyMap) -> PropertyMap {
  let mut properties: PropertyMap = std::env::vars().collect();
  properties.extend(initial.iter().map(|(k, v)| (k.clone(), v.clone())));
  properties.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
  properties
}

/// Builds the property dictionary for each document.
pub struct DocumentPropertiesLoader {
  base: PropertyMap,
  inception_year: Option<i32>,
  providers: Vec<Box<dyn PropertyProvider>>,
}

impl fmt::Debug for DocumentPropertiesLoader {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("DocumentPropertiesLoader")
      .field("base", &format_args!("<{} properties>", self.base.len()))
      .field("inception_year", &self.inception_year)
      .field("providers", &self.providers.iter().map(|p| p.name()).collect::<Vec<_>>())
      .finish()
  }
}

impl DocumentPropertiesLoader {
  pub const fn new(base: PropertyMap) -> Self {
    Self {
      base,
      inception_year: None,
      providers: Vec::new(),
    }
  }

  #[must_use]
  pub fn with_inception_year(mut self, year: Option<i32>) -> Self {
    self.inception_year = year;
    self
  }

  #[must_use]
  pub fn with_provider(mut self, provider: Box<dyn PropertyProvider>) -> Self {
    self.providers.push(provider);
    self
  }

  pub fn base(&self) -> &PropertyMap {
    &self.base
  }

  /// Properties known before any document is seen.
  ///
  /// Per-document keys and provider keys are present with empty values, so
  /// a template can be validated against this map before the scan starts.
  pub fn preflight_properties(&self) -> PropertyMap {
    let mut properties = self.base.clone();
    properties.insert(FILE_NAME_KEY.to_string(), String::new());
    if let Some(year) = self.inception_year {
      properties.insert(INCEPTION_YEAR_KEY.to_string(), year.to_string());
    }
    for provider in &self.providers {
      for key in provider.provided_keys() {
        properties.entry(key).or_default();
      }
    }
    properties
  }

  /// Assembles the dictionary for `document`.
  pub fn load(&self, document: &Document) -> PropertyMap {
    let mut properties = self.base.clone();

    let file_name = document
      .path()
      .file_name()
      .map(|name| name.to_string_lossy().into_owned())
      .unwrap_or_default();
    properties.insert(FILE_NAME_KEY.to_string(), file_name);

    if let Some(year) = self.inception_year {
      properties.insert(INCEPTION_YEAR_KEY.to_string(), year.to_string());
    }

    for provider in &self.providers {
      match provider.adjust_properties(&properties, document) {
        Ok(delta) => {
          debug!("provider: {} brought new properties {:?}", provider.name(), delta);
          apply_delta(&mut properties, delta);
        }
        Err(e) => {
          warn!("failure occurred while calling provider {}: {:#}", provider.name(), e);
        }
      }
    }

    properties
  }
}

fn apply_delta(properties: &mut PropertyMap, delta: PropertyDelta) {
  for (key, value) in delta {
    match value {
      Some(value) => {
        properties.insert(key, value);
      }
      None => {
        properties.remove(&key);
      }
    }
  }
}

/// Derives a copyright year range from the inception year.
///
/// Sets `currentYear`, and `copyrightRange` to `"<inception>-<current>"`, or
/// to the bare year when the project started this year. Without an
/// `inceptionYear` property the range is just the current year.
#[derive(Debug, Clone)]
pub struct CopyrightRangeProvider {
  current_year: i32,
}

impl CopyrightRangeProvider {
  /// Registered name of this provider.
  pub const NAME: &'static str = "copyright-range";

  /// Uses the local calendar year.
  pub fn new() -> Self {
    Self::with_current_year(chrono::Local::now().year())
  }

  pub const fn with_current_year(current_year: i32) -> Self {
    Self { current_year }
  }
}

impl Default for CopyrightRangeProvider {
  fn default() -> Self {
    Self::new()
  }
}

impl PropertyProvider for CopyrightRangeProvider {
  fn name(&self) -> &str {
    Self::NAME
  }

  fn provided_keys(&self) -> Vec<String> {
    vec![CURRENT_YEAR_KEY.to_string(), COPYRIGHT_RANGE_KEY.to_string()]
  }

  fn adjust_properties(&self, properties: &PropertyMap, _document: &Document) -> anyhow::Result<PropertyDelta> {
    let current = self.current_year.to_string();

    let range = match properties.get(INCEPTION_YEAR_KEY) {
      Some(inception) => {
        let inception: i32 = inception
          .trim()
          .parse()
          .map_err(|e| anyhow::anyhow!("invalid {INCEPTION_YEAR_KEY} '{inception}': {e}"))?;
        if inception >= self.current_year {
          current.clone()
        } else {
          format!("{inception}-{current}")
        }
      }
      None => current.clone(),
    };

    let mut delta = PropertyDelta::new();
    delta.insert(CURRENT_YEAR_KEY.to_string(), Some(current));
    delta.insert(COPYRIGHT_RANGE_KEY.to_string(), Some(range));
    Ok(delta)
  }
}

/// Instantiates a built-in provider by its configured name.
///
/// # Errors
///
/// Returns [`ConfigError::UnknownProvider`] for names with no built-in
/// provider.
pub fn provider_by_name(name: &str) -> Result<Box<dyn PropertyProvider>, ConfigError> {
  match name.trim().to_lowercase().as_str() {
    CopyrightRangeProvider::NAME => Ok(Box::new(CopyrightRangeProvider::new())),
    _ => Err(ConfigError::UnknownProvider { name: name.to_string() }),
  }
}
