//! Per-contract dispatch tables and the read, write and delete algorithms.
//!
//! Every contract gets one table, built with the projector, mapping each
//! operation name (own, inherited and built-in) to a [`Route`]. Calls look
//! up their route and never inspect the operation shape again.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Arc;

use tracing::{debug, trace};
use xproject_dom::{Document, Node};
use xproject_xpath::XPath;

use crate::contract::{Contract, ContractId, ElementType, Operation, ReturnType, Role};
use crate::convert::ScalarType;
use crate::ensure::ensure_element;
use crate::error::{ConfigError, ProjectionError};
use crate::io::LoadRequest;
use crate::legality::SetterPath;
use crate::mixin::Mixin;
use crate::projection::Projection;
use crate::template::substitute;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SelfOperation {
    XmlNode,
    ProjectionContract,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BaseOperation {
    ToString,
    Equals,
    HashCode,
}

#[derive(Clone)]
pub(crate) enum Route {
    SelfMetadata(SelfOperation),
    BaseObject(BaseOperation),
    Extension(Arc<dyn Mixin>),
    Delete,
    Write,
    Read,
    /// Raised when the operation is called.
    Invalid(ConfigError),
}

impl Route {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Route::SelfMetadata(_) => "self-metadata",
            Route::BaseObject(_) => "base-object",
            Route::Extension(_) => "extension",
            Route::Delete => "delete",
            Route::Write => "write",
            Route::Read => "read",
            Route::Invalid(_) => "invalid",
        }
    }
}

pub(crate) struct DispatchEntry {
    pub(crate) operation: Operation,
    pub(crate) declaring: ContractId,
    pub(crate) route: Route,
}

pub(crate) type DispatchTable = HashMap<String, DispatchEntry>;

pub(crate) type MixinMap = HashMap<(ContractId, ContractId), Arc<dyn Mixin>>;

fn built_in_entries() -> DispatchTable {
    let projection = ContractId::new(ContractId::PROJECTION);
    let object = ContractId::new(ContractId::OBJECT);
    let entries = [
        (
            Operation::new("xml_node").returns(ReturnType::Other("Node".to_string())),
            &projection,
            Route::SelfMetadata(SelfOperation::XmlNode),
        ),
        (
            Operation::new("projection_contract").returns(ReturnType::Other("ContractId".to_string())),
            &projection,
            Route::SelfMetadata(SelfOperation::ProjectionContract),
        ),
        (
            Operation::new("to_string").returns(ScalarType::String),
            &object,
            Route::BaseObject(BaseOperation::ToString),
        ),
        (
            Operation::new("equals").param("other").returns(ScalarType::Bool),
            &object,
            Route::BaseObject(BaseOperation::Equals),
        ),
        (
            Operation::new("hash_code").returns(ScalarType::Long),
            &object,
            Route::BaseObject(BaseOperation::HashCode),
        ),
    ];
    entries
        .into_iter()
        .map(|(operation, declaring, route)| {
            let entry = DispatchEntry {
                operation: operation.clone(),
                declaring: declaring.clone(),
                route,
            };
            (operation.name, entry)
        })
        .collect()
}

pub(crate) fn is_built_in(operation: &str) -> bool {
    matches!(
        operation,
        "xml_node" | "projection_contract" | "to_string" | "equals" | "hash_code"
    )
}

/// `contract` followed by its ancestors, nearest first.
fn lineage<'c>(
    contract: &'c Contract,
    contracts: &'c HashMap<ContractId, Contract>,
) -> Result<Vec<&'c Contract>, ConfigError> {
    let mut order = vec![contract];
    let mut seen = HashSet::from([contract.id()]);
    let mut queue: VecDeque<&Contract> = VecDeque::from([contract]);
    while let Some(current) = queue.pop_front() {
        for parent_id in current.parents() {
            if parent_id == contract.id() {
                return Err(ConfigError::InheritanceCycle(contract.id().clone()));
            }
            let parent = contracts
                .get(parent_id)
                .ok_or_else(|| ConfigError::UnknownParent {
                    contract: current.id().clone(),
                    parent: parent_id.clone(),
                })?;
            if seen.insert(parent.id()) {
                order.push(parent);
                queue.push_back(parent);
            }
        }
    }
    Ok(order)
}

fn classify(contract: &ContractId, declaring: &ContractId, operation: &Operation, mixins: &MixinMap) -> Route {
    if let Some(mixin) = mixins.get(&(contract.clone(), declaring.clone())) {
        return Route::Extension(Arc::clone(mixin));
    }
    if operation.role == Some(Role::Delete) {
        return Route::Delete;
    }
    let returns_nothing = operation.returns == ReturnType::Void;
    if returns_nothing && operation.params.is_empty() {
        return Route::Invalid(ConfigError::AmbiguousOperation {
            contract: declaring.clone(),
            operation: operation.name.clone(),
        });
    }
    if returns_nothing || operation.is_setter_named() {
        Route::Write
    } else {
        Route::Read
    }
}

/// Builds the table of `contract`. Operations of nearer contracts shadow
/// same-named operations of their ancestors.
pub(crate) fn build_table(
    contract: &Contract,
    contracts: &HashMap<ContractId, Contract>,
    mixins: &MixinMap,
) -> Result<DispatchTable, ConfigError> {
    let mut table = built_in_entries();
    for declaring in lineage(contract, contracts)? {
        for operation in declaring.operations() {
            if is_built_in(&operation.name) {
                return Err(ConfigError::ReservedOperation {
                    contract: declaring.id().clone(),
                    operation: operation.name.clone(),
                });
            }
            if table.contains_key(&operation.name) {
                continue;
            }
            let route = classify(contract.id(), declaring.id(), operation, mixins);
            trace!(
                contract = %contract.id(),
                operation = %operation.name,
                route = route.as_str(),
                "classified operation"
            );
            table.insert(
                operation.name.clone(),
                DispatchEntry {
                    operation: operation.clone(),
                    declaring: declaring.id().clone(),
                    route,
                },
            );
        }
    }
    Ok(table)
}

pub(crate) fn invoke(me: &Projection, name: &str, args: &[Value]) -> Result<Value, ProjectionError> {
    let entry = me.projector().entry(me.contract(), name)?;
    debug!(
        contract = %me.contract(),
        operation = name,
        route = entry.route.as_str(),
        "dispatching call"
    );
    match &entry.route {
        Route::SelfMetadata(SelfOperation::XmlNode) => Ok(Value::Node(me.xml_node().clone())),
        Route::SelfMetadata(SelfOperation::ProjectionContract) => {
            Ok(Value::Contract(me.contract().clone()))
        }
        Route::BaseObject(BaseOperation::ToString) => Ok(Value::from(me.to_xml()?)),
        Route::BaseObject(BaseOperation::Equals) => {
            let equal = args.first().and_then(Value::as_projection) == Some(me);
            Ok(Value::from(equal))
        }
        Route::BaseObject(BaseOperation::HashCode) => Ok(Value::from(me.hash_code())),
        Route::Extension(mixin) => mixin.invoke(me, name, args),
        Route::Delete => {
            check_args(&entry.operation, args)?;
            delete(me, entry, args)
        }
        Route::Write => {
            check_args(&entry.operation, args)?;
            write(me, entry, args)
        }
        Route::Read => {
            check_args(&entry.operation, args)?;
            read(me, entry, args)
        }
        Route::Invalid(err) => Err(err.clone().into()),
    }
}

fn check_args(operation: &Operation, args: &[Value]) -> Result<(), ProjectionError> {
    if args.len() < operation.params.len() {
        return Err(ProjectionError::ArgumentShape(format!(
            "{} expects {} argument(s), got {}",
            operation.name,
            operation.params.len(),
            args.len()
        )));
    }
    Ok(())
}

fn bound_path<'o>(operation: &'o Operation, role: Role) -> Result<&'o str, ConfigError> {
    operation.path_for(role).ok_or_else(|| ConfigError::MissingPath {
        operation: operation.name.clone(),
        role,
    })
}

fn unsupported_return(operation: &Operation) -> ConfigError {
    ConfigError::UnsupportedReturnType {
        operation: operation.name.clone(),
        returns: operation.returns.to_string(),
    }
}

/// The bound node, or the document named by the operation's document
/// source.
fn context_node(me: &Projection, operation: &Operation, args: &[Value]) -> Result<Node, ProjectionError> {
    let Some(template) = &operation.document_source else {
        return Ok(me.xml_node().clone());
    };
    let uri = substitute(template, args)?;
    let config = me.projector().config();
    let params = BTreeMap::new();
    let request = LoadRequest {
        uri: &uri,
        params: &params,
        contract: me.contract(),
        parse_options: config.parse_options(),
    };
    Ok(config.loader().load(&request)?.node())
}

/// Write and delete results: nothing, or the calling projection for
/// operations returning their own contract.
fn chained_result(me: &Projection, entry: &DispatchEntry) -> Result<Value, ConfigError> {
    match &entry.operation.returns {
        ReturnType::Void => Ok(Value::Void),
        ReturnType::Contract(id) if *id == entry.declaring => Ok(Value::Projection(me.clone())),
        _ => Err(unsupported_return(&entry.operation)),
    }
}

fn read(me: &Projection, entry: &DispatchEntry, args: &[Value]) -> Result<Value, ProjectionError> {
    let operation = &entry.operation;
    let path = substitute(bound_path(operation, Role::Read)?, args)?;
    let context = context_node(me, operation, args)?;
    trace!(path = %path, "compiled read path");
    let xpath = XPath::compile(&path)?;
    let projector = me.projector();
    match &operation.returns {
        ReturnType::Scalar(ty) => {
            let conversion = projector
                .config()
                .converters()
                .get(*ty)
                .ok_or_else(|| unsupported_return(operation))?;
            let text = xpath.evaluate_string(&context)?;
            conversion
                .convert(&text)
                .map(Value::Scalar)
                .map_err(|source| ProjectionError::Conversion { path, source })
        }
        ReturnType::List => {
            let element = operation
                .element_type
                .as_ref()
                .ok_or_else(|| ConfigError::MissingElementType {
                    operation: operation.name.clone(),
                })?;
            let nodes = xpath.evaluate_node_set(&context)?;
            Ok(Value::List(map_elements(me, operation, element, &path, nodes)?))
        }
        ReturnType::Array(component) => {
            let element = operation.element_type.as_ref().unwrap_or(component);
            let nodes = xpath.evaluate_node_set(&context)?;
            let items = map_elements(me, operation, element, &path, nodes)?;
            Ok(Value::Array(items.into_boxed_slice()))
        }
        // Single sub-projections share the matched node.
        ReturnType::Contract(target) => match xpath.evaluate_node(&context)? {
            Some(node) => Ok(Value::Projection(projector.project(&node, target)?)),
            None => Ok(Value::Null),
        },
        ReturnType::Void | ReturnType::Other(_) => Err(unsupported_return(operation).into()),
    }
}

/// Maps list members: scalars are converted, contract members are
/// projected onto deep copies of the matched nodes, each in a fresh
/// document so the source arena does not grow with every read.
fn map_elements(
    me: &Projection,
    operation: &Operation,
    element: &ElementType,
    path: &str,
    nodes: Vec<Node>,
) -> Result<Vec<Value>, ProjectionError> {
    let projector = me.projector();
    let unsupported = || ConfigError::UnsupportedElementType {
        operation: operation.name.clone(),
        element: element.to_string(),
    };
    match element {
        ElementType::Scalar(ty) => {
            let conversion = projector
                .config()
                .converters()
                .get(*ty)
                .ok_or_else(unsupported)?;
            nodes
                .iter()
                .map(|node| {
                    conversion
                        .convert(&node.text_content())
                        .map(Value::Scalar)
                        .map_err(|source| ProjectionError::Conversion {
                            path: path.to_string(),
                            source,
                        })
                })
                .collect()
        }
        ElementType::Contract(target) => {
            if !projector.has_contract(target) {
                return Err(ConfigError::UnknownContract(target.clone()).into());
            }
            nodes
                .iter()
                .map(|node| {
                    projector
                        .project(&standalone_copy(node), target)
                        .map(Value::Projection)
                })
                .collect()
        }
        ElementType::Other(_) => Err(unsupported().into()),
    }
}

/// Deep copy of `node` in a new document. Elements become its root element.
fn standalone_copy(node: &Node) -> Node {
    let document = Document::new();
    if node.is_element() {
        if let Ok(root) = document.set_root_element(node) {
            return root;
        }
    }
    document.import(node)
}

/// Element carried by a projection or node value. Documents stand for
/// their root element.
fn bound_element(value: &Value) -> Result<Option<Node>, ProjectionError> {
    let node = match value {
        Value::Projection(projection) => projection.xml_node(),
        Value::Node(node) => node,
        _ => return Ok(None),
    };
    if !node.is_document() {
        return Ok(Some(node.clone()));
    }
    node.owner_document()
        .root_element()
        .map(Some)
        .ok_or_else(|| ProjectionError::ArgumentShape("projected document is empty".to_string()))
}

fn write(me: &Projection, entry: &DispatchEntry, args: &[Value]) -> Result<Value, ProjectionError> {
    let operation = &entry.operation;
    let path = substitute(bound_path(operation, Role::Write)?, args)?;
    let setter = SetterPath::parse(&path)?;
    let result = chained_result(me, entry)?;
    let value = args.get(operation.value_index()).ok_or_else(|| {
        ProjectionError::ArgumentShape(format!("{} needs a value to write", operation.name))
    })?;
    let document = context_node(me, operation, args)?.owner_document();

    match setter {
        SetterPath::RootElement => {
            let element = bound_element(value)?.ok_or_else(|| {
                ProjectionError::ArgumentShape(format!(
                    "{path} replaces the root element and needs a projection"
                ))
            })?;
            debug!(path = %path, "replacing root element");
            document.set_root_element(&element)?;
        }
        SetterPath::Element {
            segments,
            attribute,
        } => {
            let target = ensure_element(&document, &segments)?;
            if let Some(attribute) = attribute {
                debug!(path = %path, "setting attribute");
                target.set_attribute(&attribute, &value.text()?)?;
            } else if let Some(node) = bound_element(value)? {
                let removed = target.remove_children_named(&node.node_name());
                debug!(path = %path, removed, "replacing child element");
                target.append_child(&node)?;
            } else if let Some(items) = value.as_list() {
                let nodes = items
                    .iter()
                    .map(|item| -> Result<Node, ProjectionError> {
                        bound_element(item)?.ok_or_else(|| {
                            ProjectionError::ArgumentShape(format!(
                                "{path} only accepts lists of projections"
                            ))
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                let mut names: Vec<String> = Vec::new();
                for node in &nodes {
                    let name = node.node_name();
                    if !names.contains(&name) {
                        names.push(name);
                    }
                }
                let removed: usize = names
                    .iter()
                    .map(|name| target.remove_children_named(name))
                    .sum();
                debug!(path = %path, removed, appended = nodes.len(), "replacing child elements");
                for node in &nodes {
                    target.append_child(node)?;
                }
            } else if value.is_null() {
                return Err(ProjectionError::ArgumentShape(format!(
                    "cannot write null to {path}"
                )));
            } else {
                debug!(path = %path, "setting text content");
                target.set_text_content(&value.text()?);
            }
        }
    }
    Ok(result)
}

fn delete(me: &Projection, entry: &DispatchEntry, args: &[Value]) -> Result<Value, ProjectionError> {
    let operation = &entry.operation;
    let path = substitute(bound_path(operation, Role::Delete)?, args)?;
    let result = chained_result(me, entry)?;
    let context = context_node(me, operation, args)?;
    trace!(path = %path, "compiled delete path");
    let nodes = XPath::compile(&path)?.evaluate_node_set(&context)?;
    for node in &nodes {
        node.detach();
    }
    debug!(path = %path, removed = nodes.len(), "deleted nodes");
    Ok(result)
}
