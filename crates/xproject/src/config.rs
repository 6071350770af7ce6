//! Projector configuration.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;
use xproject_dom::{ParseOptions, WriteOptions};

use crate::convert::ConverterRegistry;
use crate::error::ConfigError;
use crate::io::{DocumentLoader, FileDocumentLoader, Transformer, XmlTransformer};

/// Plain-data settings, e.g. read from a JSON file.
///
/// ```
/// use xproject::ProjectorOptions;
///
/// let options = ProjectorOptions::from_json(r#"{"indent": 2, "keep_whitespace": true}"#).unwrap();
/// assert_eq!(options.indent, Some(2));
/// assert!(!options.xml_declaration);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectorOptions {
    /// Indentation width used by `to_string`.
    pub indent: Option<usize>,
    pub xml_declaration: bool,
    /// Keep whitespace-only text when parsing.
    pub keep_whitespace: bool,
    /// Directory `resource://` URIs resolve against.
    pub resource_root: Option<PathBuf>,
}

impl ProjectorOptions {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Options(e.to_string()))
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        serde_json::from_value(value).map_err(|e| ConfigError::Options(e.to_string()))
    }
}

/// Collaborators and settings shared by every projection of a projector.
#[derive(Clone)]
pub struct ProjectorConfig {
    converters: ConverterRegistry,
    transformer: Arc<dyn Transformer>,
    loader: Arc<dyn DocumentLoader>,
    parse_options: ParseOptions,
}

impl Default for ProjectorConfig {
    fn default() -> Self {
        Self::from_options(&ProjectorOptions::default())
    }
}

impl ProjectorConfig {
    pub fn from_options(options: &ProjectorOptions) -> Self {
        let transformer = XmlTransformer::new(WriteOptions {
            indent: options.indent,
            xml_declaration: options.xml_declaration,
        });
        let loader = match &options.resource_root {
            Some(root) => FileDocumentLoader::with_resource_root(root),
            None => FileDocumentLoader::new(),
        };
        Self {
            converters: ConverterRegistry::standard(),
            transformer: Arc::new(transformer),
            loader: Arc::new(loader),
            parse_options: ParseOptions {
                keep_whitespace: options.keep_whitespace,
                keep_comments: false,
            },
        }
    }

    pub fn with_converters(mut self, converters: ConverterRegistry) -> Self {
        self.converters = converters;
        self
    }

    pub fn with_transformer(mut self, transformer: Arc<dyn Transformer>) -> Self {
        self.transformer = transformer;
        self
    }

    pub fn with_loader(mut self, loader: Arc<dyn DocumentLoader>) -> Self {
        self.loader = loader;
        self
    }

    pub fn with_parse_options(mut self, parse_options: ParseOptions) -> Self {
        self.parse_options = parse_options;
        self
    }

    pub fn converters(&self) -> &ConverterRegistry {
        &self.converters
    }

    pub fn transformer(&self) -> &dyn Transformer {
        self.transformer.as_ref()
    }

    pub fn loader(&self) -> &dyn DocumentLoader {
        self.loader.as_ref()
    }

    pub fn parse_options(&self) -> &ParseOptions {
        &self.parse_options
    }
}

impl fmt::Debug for ProjectorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProjectorConfig")
            .field("converters", &self.converters)
            .field("parse_options", &self.parse_options)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_defaults() {
        let options = ProjectorOptions::from_json("{}").unwrap();
        assert_eq!(options, ProjectorOptions::default());
    }

    #[test]
    fn test_options_reject_unknown_fields() {
        assert!(matches!(
            ProjectorOptions::from_json(r#"{"indnet": 2}"#),
            Err(ConfigError::Options(_))
        ));
    }

    #[test]
    fn test_options_from_value() {
        let options = ProjectorOptions::from_value(serde_json::json!({
            "resource_root": "/srv/xml",
            "xml_declaration": true
        }))
        .unwrap();
        assert_eq!(options.resource_root, Some(PathBuf::from("/srv/xml")));
        assert!(options.xml_declaration);
    }

    #[test]
    fn test_config_threads_parse_options() {
        let options = ProjectorOptions {
            keep_whitespace: true,
            ..Default::default()
        };
        let config = ProjectorConfig::from_options(&options);
        assert!(config.parse_options().keep_whitespace);
        assert!(config.converters().is_registered(crate::ScalarType::Int));
    }
}
