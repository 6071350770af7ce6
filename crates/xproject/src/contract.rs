//! Contract declarations: named sets of operations bound to path templates.
//!
//! ```
//! use xproject::{Contract, Operation, ReturnType, ScalarType};
//!
//! let person = Contract::new("Person")
//!     .operation(Operation::read("name", "/person/name").returns(ScalarType::String))
//!     .operation(Operation::write("set_name", "/person/name").param("name"));
//! assert_eq!(person.operations().len(), 2);
//! assert_eq!(person.operations()[1].returns, ReturnType::Void);
//! ```

use std::fmt;
use std::sync::Arc;

use crate::convert::ScalarType;

/// Name of a contract. Cheap to clone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContractId(Arc<str>);

impl ContractId {
    /// Built-in contract exposing `xml_node` and `projection_contract`.
    pub const PROJECTION: &'static str = "Projection";
    /// Built-in contract exposing `to_string`, `equals` and `hash_code`.
    pub const OBJECT: &'static str = "Object";

    pub fn new(name: &str) -> Self {
        Self(Arc::from(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_reserved(&self) -> bool {
        self.as_str() == Self::PROJECTION || self.as_str() == Self::OBJECT
    }
}

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContractId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ContractId {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

impl From<&ContractId> for ContractId {
    fn from(id: &ContractId) -> Self {
        id.clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Read,
    Write,
    Delete,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Read => "read",
            Role::Write => "write",
            Role::Delete => "delete",
        })
    }
}

/// Type of the elements of a list or array result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementType {
    Scalar(ScalarType),
    Contract(ContractId),
    Other(String),
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementType::Scalar(ty) => write!(f, "{ty}"),
            ElementType::Contract(id) => write!(f, "{id}"),
            ElementType::Other(name) => f.write_str(name),
        }
    }
}

impl ElementType {
    pub fn contract(name: impl Into<ContractId>) -> Self {
        ElementType::Contract(name.into())
    }
}

impl From<ScalarType> for ElementType {
    fn from(ty: ScalarType) -> Self {
        ElementType::Scalar(ty)
    }
}

/// Declared return type of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnType {
    Void,
    Scalar(ScalarType),
    /// Growable list; the element type comes from
    /// [`Operation::element_type`].
    List,
    /// Fixed-size array of the component type.
    Array(ElementType),
    Contract(ContractId),
    /// Anything the projector has no mapping for.
    Other(String),
}

impl ReturnType {
    pub fn contract(name: impl Into<ContractId>) -> Self {
        ReturnType::Contract(name.into())
    }
}

impl fmt::Display for ReturnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReturnType::Void => f.write_str("()"),
            ReturnType::Scalar(ty) => write!(f, "{ty}"),
            ReturnType::List => f.write_str("Vec<_>"),
            ReturnType::Array(component) => write!(f, "[{component}]"),
            ReturnType::Contract(id) => write!(f, "{id}"),
            ReturnType::Other(name) => f.write_str(name),
        }
    }
}

impl From<ScalarType> for ReturnType {
    fn from(ty: ScalarType) -> Self {
        ReturnType::Scalar(ty)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    /// Marks the argument written by a setter.
    pub is_value: bool,
}

/// One declared operation of a contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub name: String,
    pub role: Option<Role>,
    /// Path template with `{0}`, `{1}`, ... placeholders.
    pub path: Option<String>,
    pub params: Vec<Param>,
    pub returns: ReturnType,
    pub element_type: Option<ElementType>,
    /// URI template of a document to evaluate against instead of the bound
    /// node.
    pub document_source: Option<String>,
}

impl Operation {
    /// Operation without a path binding, e.g. one served by a mixin.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            role: None,
            path: None,
            params: Vec::new(),
            returns: ReturnType::Void,
            element_type: None,
            document_source: None,
        }
    }

    fn bound(name: &str, role: Role, path: &str) -> Self {
        Self {
            role: Some(role),
            path: Some(path.to_string()),
            ..Self::new(name)
        }
    }

    pub fn read(name: &str, path: &str) -> Self {
        Self::bound(name, Role::Read, path)
    }

    pub fn write(name: &str, path: &str) -> Self {
        Self::bound(name, Role::Write, path)
    }

    pub fn delete(name: &str, path: &str) -> Self {
        Self::bound(name, Role::Delete, path)
    }

    pub fn param(mut self, name: &str) -> Self {
        self.params.push(Param {
            name: name.to_string(),
            is_value: false,
        });
        self
    }

    /// Adds the parameter holding the value to write.
    pub fn value_param(mut self, name: &str) -> Self {
        self.params.push(Param {
            name: name.to_string(),
            is_value: true,
        });
        self
    }

    pub fn returns(mut self, returns: impl Into<ReturnType>) -> Self {
        self.returns = returns.into();
        self
    }

    pub fn element_type(mut self, element: impl Into<ElementType>) -> Self {
        self.element_type = Some(element.into());
        self
    }

    pub fn document_source(mut self, uri: &str) -> Self {
        self.document_source = Some(uri.to_string());
        self
    }

    /// Setter naming convention: `set...` with at least one parameter.
    pub fn is_setter_named(&self) -> bool {
        self.name.starts_with("set") && !self.params.is_empty()
    }

    /// Index of the argument a setter writes.
    pub fn value_index(&self) -> usize {
        self.params.iter().position(|p| p.is_value).unwrap_or(0)
    }

    /// The path template, if this operation is bound for `role`.
    pub fn path_for(&self, role: Role) -> Option<&str> {
        match self.role {
            Some(bound) if bound == role => self.path.as_deref(),
            _ => None,
        }
    }
}

/// A named set of operations, optionally extending other contracts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contract {
    id: ContractId,
    extends: Vec<ContractId>,
    operations: Vec<Operation>,
}

impl Contract {
    pub fn new(name: impl Into<ContractId>) -> Self {
        Self {
            id: name.into(),
            extends: Vec::new(),
            operations: Vec::new(),
        }
    }

    pub fn extends(mut self, parent: impl Into<ContractId>) -> Self {
        self.extends.push(parent.into());
        self
    }

    pub fn operation(mut self, operation: Operation) -> Self {
        self.operations.push(operation);
        self
    }

    pub fn id(&self) -> &ContractId {
        &self.id
    }

    pub fn parents(&self) -> &[ContractId] {
        &self.extends
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setter_naming() {
        assert!(Operation::write("set_name", "/a").param("v").is_setter_named());
        assert!(!Operation::write("set_name", "/a").is_setter_named());
        assert!(!Operation::read("settings", "/a").is_setter_named());
    }

    #[test]
    fn test_value_index() {
        let op = Operation::write("set_item", "/a/{0}")
            .param("name")
            .value_param("value");
        assert_eq!(op.value_index(), 1);
        assert_eq!(Operation::write("set", "/a").param("v").value_index(), 0);
    }

    #[test]
    fn test_path_for_role() {
        let op = Operation::read("name", "/a");
        assert_eq!(op.path_for(Role::Read), Some("/a"));
        assert_eq!(op.path_for(Role::Write), None);
        assert_eq!(Operation::new("x").path_for(Role::Read), None);
    }

    #[test]
    fn test_reserved_names() {
        assert!(ContractId::new("Projection").is_reserved());
        assert!(ContractId::new("Object").is_reserved());
        assert!(!ContractId::new("Person").is_reserved());
    }
}
