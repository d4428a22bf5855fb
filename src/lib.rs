//! # headerwarden
//!
//! A tool that checks and repairs license headers across a source tree.
//!
//! Every file is classified by its comment syntax, its leading comment block
//! is compared against a canonical header (and any accepted alternates), and
//! an outcome policy decides what to do: the check policy records files whose
//! header is missing, the format policy inserts or replaces the header.
//! Files are processed in parallel on a bounded worker pool.
//!
//! ## Features
//!
//! * Line and block comment styles for common languages, plus custom styles
//! * `${placeholder}` templates filled from layered properties and providers
//! * Whitespace-tolerant or strict header comparison, with dynamic sections
//! * Shebangs, XML declarations and similar prologs stay above the header
//! * Dry-run previews written to sibling `.licensed` files
//!
//! ## Usage as a Library
//!
//! ```rust,no_run
//! use std::path::PathBuf;
//!
//! use headerwarden::callback::CheckPolicy;
//! use headerwarden::processor::{FileCollector, Processor, ProcessorConfig};
//! use headerwarden::properties::{DocumentPropertiesLoader, PropertyMap};
//! use headerwarden::templates::TemplateSource;
//!
//! fn main() -> anyhow::Result<()> {
//!     let root = PathBuf::from(".");
//!     let mut properties = PropertyMap::new();
//!     properties.insert("year".to_string(), "2024".to_string());
//!
//!     let processor = Processor::new(ProcessorConfig {
//!         properties: DocumentPropertiesLoader::new(properties),
//!         ..ProcessorConfig::new(root.clone(), TemplateSource::parse("Copyright ${year} Acme"))
//!     })?;
//!
//!     let files = FileCollector::new(root).collect(&["src".to_string()])?;
//!     let outcome = processor.run(&files, &CheckPolicy::default())?;
//!
//!     if outcome.had_failure {
//!         println!("{} files are missing license headers", outcome.missing_header_files.len());
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! * [`processor`] - Concurrent scan orchestration and file collection
//! * [`document`] - Loading, parsing and rewriting source files
//! * [`matching`] - Comparing a file's header against the templates
//! * [`callback`] - The check and format outcome policies
//! * [`templates`] - Header templates and placeholder resolution
//! * [`comment_styles`] - Comment syntaxes and the extension mapping
//! * [`config`] - TOML configuration file
//!
//! [`processor`]: crate::processor
//! [`document`]: crate::document
//! [`matching`]: crate::matching
//! [`callback`]: crate::callback
//! [`templates`]: crate::templates
//! [`comment_styles`]: crate::comment_styles
//! [`config`]: crate::config

pub mod callback;
pub mod classifier;
pub mod cli;
pub mod comment_styles;
pub mod config;
pub mod document;
pub mod error;
pub mod logging;
pub mod matching;
pub mod output;
pub mod processor;
pub mod properties;
pub mod report;
pub mod templates;
