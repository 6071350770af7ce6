//! A contract bound to a node.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use xproject_dom::Node;

use crate::contract::ContractId;
use crate::dispatch;
use crate::error::ProjectionError;
use crate::projector::Projector;
use crate::value::Value;

/// A node seen through a contract.
///
/// Projections do not own their node: several projections, of the same or
/// different contracts, may share one node, and changes made through any of
/// them are visible to all.
#[derive(Clone)]
pub struct Projection {
    node: Node,
    contract: ContractId,
    projector: Projector,
}

fn hash_of<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

impl Projection {
    pub(crate) fn new(node: Node, contract: ContractId, projector: Projector) -> Self {
        Self {
            node,
            contract,
            projector,
        }
    }

    /// Calls `operation` with positional `args`.
    pub fn invoke(&self, operation: &str, args: &[Value]) -> Result<Value, ProjectionError> {
        dispatch::invoke(self, operation, args)
    }

    /// Calls an operation without arguments.
    pub fn get(&self, operation: &str) -> Result<Value, ProjectionError> {
        self.invoke(operation, &[])
    }

    /// Calls a single-argument operation.
    pub fn set(&self, operation: &str, value: impl Into<Value>) -> Result<Value, ProjectionError> {
        self.invoke(operation, &[value.into()])
    }

    pub fn xml_node(&self) -> &Node {
        &self.node
    }

    pub fn contract(&self) -> &ContractId {
        &self.contract
    }

    pub fn projector(&self) -> &Projector {
        &self.projector
    }

    /// The bound node rendered by the configured transformer.
    pub fn to_xml(&self) -> Result<String, ProjectionError> {
        Ok(self.projector.config().transformer().transform(&self.node)?)
    }

    /// `31 * hash(contract) + 27 * hash(node)`, wrapping.
    pub fn hash_code(&self) -> i64 {
        let contract = hash_of(&self.contract) as i64;
        let node = hash_of(&self.node) as i64;
        contract.wrapping_mul(31).wrapping_add(node.wrapping_mul(27))
    }
}

impl PartialEq for Projection {
    fn eq(&self, other: &Self) -> bool {
        self.contract == other.contract && self.node == other.node
    }
}

impl Eq for Projection {}

impl Hash for Projection {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash_code().hash(state);
    }
}

impl fmt::Debug for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Projection")
            .field("contract", &self.contract)
            .field("node", &self.node)
            .finish()
    }
}

/// Renders through the configured transformer. If it fails, falls back to
/// plain XML of the bound node, then to the `Debug` form.
impl fmt::Display for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_xml() {
            Ok(text) => f.write_str(&text),
            Err(err) => {
                tracing::debug!(error = %err, "transformer failed, displaying plain xml");
                match self.node.to_xml() {
                    Ok(text) => f.write_str(&text),
                    Err(_) => write!(f, "{self:?}"),
                }
            }
        }
    }
}
