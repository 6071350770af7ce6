//! The projector: registered contracts, their dispatch tables, and the
//! factory methods creating projections.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;
use xproject_dom::{Document, Node, ParseOptions};

use crate::config::{ProjectorConfig, ProjectorOptions};
use crate::contract::{Contract, ContractId};
use crate::convert::ConverterRegistry;
use crate::dispatch::{build_table, DispatchEntry, DispatchTable, MixinMap};
use crate::error::{ConfigError, ProjectionError};
use crate::io::{DocumentLoader, Transformer, UrlIo};
use crate::mixin::Mixin;
use crate::projection::Projection;

struct ProjectorInner {
    config: ProjectorConfig,
    contracts: HashMap<ContractId, Contract>,
    tables: HashMap<ContractId, DispatchTable>,
}

/// Creates projections. Immutable once built and cheap to clone; every
/// projection keeps a handle on the projector that created it.
///
/// ```
/// use xproject::{Contract, Operation, Projector, ScalarType};
///
/// let projector = Projector::builder()
///     .contract(
///         Contract::new("Greeting")
///             .operation(Operation::read("text", "/greeting").returns(ScalarType::String))
///             .operation(Operation::write("set_text", "/greeting").param("text")),
///     )
///     .build()
///     .unwrap();
///
/// let greeting = projector.project_empty_document("Greeting").unwrap();
/// greeting.set("set_text", "hello").unwrap();
/// assert_eq!(greeting.get("text").unwrap().as_str(), Some("hello"));
/// assert_eq!(greeting.to_xml().unwrap(), "<greeting>hello</greeting>");
/// ```
#[derive(Clone)]
pub struct Projector {
    inner: Arc<ProjectorInner>,
}

impl Projector {
    pub fn builder() -> ProjectorBuilder {
        ProjectorBuilder::new()
    }

    pub fn config(&self) -> &ProjectorConfig {
        &self.inner.config
    }

    pub fn contract(&self, id: &ContractId) -> Option<&Contract> {
        self.inner.contracts.get(id)
    }

    pub fn has_contract(&self, id: &ContractId) -> bool {
        self.inner.contracts.contains_key(id)
    }

    pub(crate) fn entry(&self, contract: &ContractId, operation: &str) -> Result<&DispatchEntry, ConfigError> {
        let table = self
            .inner
            .tables
            .get(contract)
            .ok_or_else(|| ConfigError::UnknownContract(contract.clone()))?;
        table
            .get(operation)
            .ok_or_else(|| ConfigError::UnknownOperation {
                contract: contract.clone(),
                operation: operation.to_string(),
            })
    }

    /// Binds `node` to `contract`. The node is shared, not copied.
    pub fn project(&self, node: &Node, contract: impl Into<ContractId>) -> Result<Projection, ProjectionError> {
        let contract = contract.into();
        if !self.has_contract(&contract) {
            return Err(ConfigError::UnknownContract(contract).into());
        }
        Ok(Projection::new(node.clone(), contract, self.clone()))
    }

    /// Binds the document node of `document`.
    pub fn project_document(
        &self,
        document: &Document,
        contract: impl Into<ContractId>,
    ) -> Result<Projection, ProjectionError> {
        self.project(&document.node(), contract)
    }

    /// Projection of a new document without a root element.
    pub fn project_empty_document(&self, contract: impl Into<ContractId>) -> Result<Projection, ProjectionError> {
        self.project_document(&Document::new(), contract)
    }

    /// Projection of the root element `name` of a new document.
    pub fn project_empty_element(
        &self,
        name: &str,
        contract: impl Into<ContractId>,
    ) -> Result<Projection, ProjectionError> {
        let document = Document::new();
        let element = document.create_element(name)?;
        let root = document.set_root_element(&element)?;
        self.project(&root, contract)
    }

    /// Parses `xml` with the configured parse options and binds the
    /// resulting document.
    pub fn project_xml_string(&self, xml: &str, contract: impl Into<ContractId>) -> Result<Projection, ProjectionError> {
        let document = Document::parse_with(xml, self.config().parse_options())?;
        self.project_document(&document, contract)
    }

    /// URI based reading with request parameters.
    pub fn io(&self) -> UrlIo<'_> {
        UrlIo::new(self)
    }
}

impl fmt::Debug for Projector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut contracts: Vec<_> = self.inner.contracts.keys().collect();
        contracts.sort();
        f.debug_struct("Projector")
            .field("contracts", &contracts)
            .field("config", &self.inner.config)
            .finish()
    }
}

/// Collects contracts, mixins and configuration for a [`Projector`].
#[derive(Default)]
pub struct ProjectorBuilder {
    config: ProjectorConfig,
    contracts: Vec<Contract>,
    mixins: MixinMap,
}

impl ProjectorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: ProjectorConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the configuration with one derived from `options`.
    pub fn options(mut self, options: &ProjectorOptions) -> Self {
        self.config = ProjectorConfig::from_options(options);
        self
    }

    pub fn converters(mut self, converters: ConverterRegistry) -> Self {
        self.config = self.config.with_converters(converters);
        self
    }

    pub fn transformer(mut self, transformer: Arc<dyn Transformer>) -> Self {
        self.config = self.config.with_transformer(transformer);
        self
    }

    pub fn loader(mut self, loader: Arc<dyn DocumentLoader>) -> Self {
        self.config = self.config.with_loader(loader);
        self
    }

    pub fn parse_options(mut self, parse_options: ParseOptions) -> Self {
        self.config = self.config.with_parse_options(parse_options);
        self
    }

    pub fn contract(mut self, contract: Contract) -> Self {
        self.contracts.push(contract);
        self
    }

    /// Routes the operations `declaring` contributes to projections of
    /// `projection_contract` to `mixin`.
    pub fn mixin(
        mut self,
        projection_contract: impl Into<ContractId>,
        declaring: impl Into<ContractId>,
        mixin: Arc<dyn Mixin>,
    ) -> Self {
        self.mixins
            .insert((projection_contract.into(), declaring.into()), mixin);
        self
    }

    pub fn build(self) -> Result<Projector, ConfigError> {
        let mut contracts = HashMap::new();
        for contract in self.contracts {
            if contract.id().is_reserved() {
                return Err(ConfigError::ReservedContract(contract.id().clone()));
            }
            let id = contract.id().clone();
            if contracts.insert(id.clone(), contract).is_some() {
                return Err(ConfigError::DuplicateContract(id));
            }
        }
        let mut tables = HashMap::new();
        for contract in contracts.values() {
            let table = build_table(contract, &contracts, &self.mixins)?;
            debug!(contract = %contract.id(), operations = table.len(), "built dispatch table");
            tables.insert(contract.id().clone(), table);
        }
        Ok(Projector {
            inner: Arc::new(ProjectorInner {
                config: self.config,
                contracts,
                tables,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::Operation;
    use crate::ScalarType;

    fn projector() -> Projector {
        Projector::builder()
            .contract(Contract::new("Item").operation(Operation::read("name", "@name").returns(ScalarType::String)))
            .build()
            .unwrap()
    }

    #[test]
    fn test_duplicate_and_reserved_contracts() {
        let duplicate = Projector::builder()
            .contract(Contract::new("A"))
            .contract(Contract::new("A"))
            .build();
        assert_eq!(duplicate.err(), Some(ConfigError::DuplicateContract(ContractId::new("A"))));
        let reserved = Projector::builder().contract(Contract::new("Object")).build();
        assert!(matches!(reserved, Err(ConfigError::ReservedContract(_))));
    }

    #[test]
    fn test_unknown_contract_and_operation() {
        let projector = projector();
        let doc = Document::new();
        assert!(matches!(
            projector.project_document(&doc, "Nope"),
            Err(ProjectionError::Config(ConfigError::UnknownContract(_)))
        ));
        let item = projector.project_document(&doc, "Item").unwrap();
        assert!(matches!(
            item.get("missing"),
            Err(ProjectionError::Config(ConfigError::UnknownOperation { .. }))
        ));
    }

    #[test]
    fn test_empty_element_is_root_of_new_document() {
        let item = projector().project_empty_element("item", "Item").unwrap();
        let node = item.xml_node();
        assert_eq!(node.owner_document().root_element().as_ref(), Some(node));
    }

    #[test]
    fn test_project_xml_string() {
        let item = projector()
            .project_xml_string(r#"<item name="x"/>"#, "Item")
            .unwrap();
        assert!(item.xml_node().is_document());
        assert!(matches!(
            projector().project_xml_string("<broken>", "Item"),
            Err(ProjectionError::Dom(_))
        ));
    }

    #[test]
    fn test_projector_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Projector>();
        assert_send_sync::<Projection>();
    }
}
