//! Document loading and serialization collaborators.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;
use xproject_dom::{Document, Node, ParseOptions, WriteOptions};

use crate::contract::ContractId;
use crate::error::{LoadError, ProjectionError, TransformError};
use crate::projection::Projection;
use crate::projector::Projector;

/// Everything a loader gets to know about one load.
#[derive(Debug, Clone)]
pub struct LoadRequest<'a> {
    pub uri: &'a str,
    pub params: &'a BTreeMap<String, String>,
    /// Contract the loaded document is projected onto.
    pub contract: &'a ContractId,
    pub parse_options: &'a ParseOptions,
}

pub trait DocumentLoader: Send + Sync {
    fn load(&self, request: &LoadRequest<'_>) -> Result<Document, LoadError>;
}

/// Loads documents from the local file system.
///
/// Accepts plain paths, `file:` URIs and `resource://` URIs, the latter
/// resolved below the configured resource root.
#[derive(Debug, Clone, Default)]
pub struct FileDocumentLoader {
    resource_root: Option<PathBuf>,
}

impl FileDocumentLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resource_root(root: impl Into<PathBuf>) -> Self {
        Self {
            resource_root: Some(root.into()),
        }
    }

    pub fn resource_root(&self) -> Option<&Path> {
        self.resource_root.as_deref()
    }

    /// File system path a URI refers to.
    pub fn resolve(&self, uri: &str) -> Result<PathBuf, LoadError> {
        if let Some(resource) = uri.strip_prefix("resource://") {
            let root = self
                .resource_root
                .as_ref()
                .ok_or_else(|| LoadError::NoResourceRoot(uri.to_string()))?;
            return Ok(root.join(resource.trim_start_matches('/')));
        }
        if let Some(rest) = uri.strip_prefix("file:") {
            // file:///abs, file:/abs and file:relative all occur in the wild.
            let path = rest.strip_prefix("//").unwrap_or(rest);
            return Ok(PathBuf::from(path));
        }
        match uri.split_once("://") {
            Some(_) => Err(LoadError::UnsupportedScheme(uri.to_string())),
            None => Ok(PathBuf::from(uri)),
        }
    }
}

impl DocumentLoader for FileDocumentLoader {
    fn load(&self, request: &LoadRequest<'_>) -> Result<Document, LoadError> {
        let path = self.resolve(request.uri)?;
        debug!(uri = request.uri, path = %path.display(), "loading document");
        let text = std::fs::read_to_string(&path).map_err(|source| LoadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Document::parse_with(&text, request.parse_options).map_err(|source| LoadError::Parse {
            uri: request.uri.to_string(),
            source,
        })
    }
}

/// Renders a node as text; used by `to_string` on projections.
pub trait Transformer: Send + Sync {
    fn transform(&self, node: &Node) -> Result<String, TransformError>;
}

/// Serializes nodes as XML.
#[derive(Debug, Clone, Default)]
pub struct XmlTransformer {
    options: WriteOptions,
}

impl XmlTransformer {
    pub fn new(options: WriteOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &WriteOptions {
        &self.options
    }
}

impl Transformer for XmlTransformer {
    fn transform(&self, node: &Node) -> Result<String, TransformError> {
        Ok(node.to_xml_with(&self.options)?)
    }
}

/// Reads projections from URIs, sending a set of request parameters to
/// the loader.
pub struct UrlIo<'p> {
    projector: &'p Projector,
    params: BTreeMap<String, String>,
}

impl<'p> UrlIo<'p> {
    pub fn new(projector: &'p Projector) -> Self {
        let mut params = BTreeMap::new();
        params.insert("Content-Type".to_string(), "text/xml".to_string());
        Self { projector, params }
    }

    pub fn add_request_param(mut self, name: &str, value: &str) -> Self {
        self.params.insert(name.to_string(), value.to_string());
        self
    }

    pub fn add_request_params<K, V>(mut self, params: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.params
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn request_params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    /// Loads the document at `uri` and projects it onto `contract`.
    pub fn read_from_url(
        &self,
        uri: &str,
        contract: impl Into<ContractId>,
    ) -> Result<Projection, ProjectionError> {
        let contract = contract.into();
        let config = self.projector.config();
        let request = LoadRequest {
            uri,
            params: &self.params,
            contract: &contract,
            parse_options: config.parse_options(),
        };
        let document = config.loader().load(&request)?;
        self.projector.project_document(&document, contract)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_schemes() {
        let loader = FileDocumentLoader::with_resource_root("/srv/xml");
        assert_eq!(
            loader.resolve("resource://books/a.xml").unwrap(),
            PathBuf::from("/srv/xml/books/a.xml")
        );
        assert_eq!(
            loader.resolve("file:///tmp/a.xml").unwrap(),
            PathBuf::from("/tmp/a.xml")
        );
        assert_eq!(loader.resolve("data/a.xml").unwrap(), PathBuf::from("data/a.xml"));
        assert!(matches!(
            loader.resolve("http://example.com/a.xml"),
            Err(LoadError::UnsupportedScheme(_))
        ));
    }

    #[test]
    fn test_resource_needs_root() {
        assert!(matches!(
            FileDocumentLoader::new().resolve("resource://a.xml"),
            Err(LoadError::NoResourceRoot(_))
        ));
    }

    #[test]
    fn test_xml_transformer_uses_options() {
        let doc = Document::parse("<a><b/></a>").unwrap();
        let transformer = XmlTransformer::new(WriteOptions {
            indent: Some(1),
            xml_declaration: false,
        });
        let out = transformer.transform(&doc.node()).unwrap();
        assert!(out.contains("\n <b/>"), "{out}");
    }
}
