#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use headerwarden::processor::{Processor, ProcessorConfig};
use headerwarden::properties::{DocumentPropertiesLoader, PropertyMap};
use headerwarden::templates::TemplateSource;

/// Writes `content` to `root/relative`, creating parent directories.
pub fn write_file(root: &Path, relative: &str, content: impl AsRef<[u8]>) -> Result<PathBuf> {
  let path = root.join(relative);
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
  }
  fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
  Ok(path)
}

/// Builds a property map from key/value pairs.
pub fn properties(pairs: &[(&str, &str)]) -> PropertyMap {
  pairs
    .iter()
    .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
    .collect()
}

/// Config for the canonical header `Copyright ${year} Acme` with `year=2024`.
pub fn acme_config(root: &Path) -> ProcessorConfig {
  ProcessorConfig {
    properties: DocumentPropertiesLoader::new(properties(&[("year", "2024")])),
    ..ProcessorConfig::new(root.to_path_buf(), TemplateSource::parse("Copyright ${year} Acme"))
  }
}

/// Processor for the canonical Acme header.
pub fn acme_processor(root: &Path) -> Result<Processor> {
  Ok(Processor::new(acme_config(root))?)
}

/// Reads a file as UTF-8.
pub fn read(path: &Path) -> Result<String> {
  fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}
