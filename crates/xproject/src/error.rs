use thiserror::Error;
use xproject_dom::DomError;
use xproject_xpath::XPathError;

use crate::contract::{ContractId, Role};
use crate::convert::ScalarType;

/// Contract declarations or operation shapes the projector cannot act on.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("contract {0} is not registered")]
    UnknownContract(ContractId),

    #[error("contract {0} is registered twice")]
    DuplicateContract(ContractId),

    #[error("contract name {0} is reserved")]
    ReservedContract(ContractId),

    #[error("contract {contract} extends unknown contract {parent}")]
    UnknownParent {
        contract: ContractId,
        parent: ContractId,
    },

    #[error("contract {0} inherits from itself")]
    InheritanceCycle(ContractId),

    #[error("{contract}.{operation} redeclares a reserved operation")]
    ReservedOperation {
        contract: ContractId,
        operation: String,
    },

    #[error("{contract} has no operation {operation}")]
    UnknownOperation {
        contract: ContractId,
        operation: String,
    },

    #[error("{contract}.{operation} returns nothing and takes no parameters")]
    AmbiguousOperation {
        contract: ContractId,
        operation: String,
    },

    #[error("{operation} declares no {role} path")]
    MissingPath { operation: String, role: Role },

    #[error("{operation} cannot return {returns}")]
    UnsupportedReturnType { operation: String, returns: String },

    #[error("{operation} returns a list but declares no element type")]
    MissingElementType { operation: String },

    #[error("{operation} cannot map list elements to {element}")]
    UnsupportedElementType { operation: String, element: String },

    #[error("{path:?} is not a writable path")]
    IllegalSetterPath { path: String },

    #[error("malformed placeholder in {template:?}")]
    MalformedTemplate { template: String },

    #[error("invalid projector options: {0}")]
    Options(String),
}

/// Text that does not parse as the requested scalar type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot convert {input:?} to {target}")]
pub struct ConversionError {
    pub target: ScalarType,
    pub input: String,
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("unsupported URI scheme in {0:?}")]
    UnsupportedScheme(String),

    #[error("{0:?} needs a configured resource root")]
    NoResourceRoot(String),

    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse document from {uri}: {source}")]
    Parse {
        uri: String,
        #[source]
        source: DomError,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    #[error("serialization failed: {0}")]
    Dom(#[from] DomError),
}

/// Error of a projection call.
#[derive(Error, Debug)]
pub enum ProjectionError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{source} (path {path:?})")]
    Conversion {
        path: String,
        #[source]
        source: ConversionError,
    },

    #[error("invalid argument: {0}")]
    ArgumentShape(String),

    #[error(transparent)]
    Path(#[from] XPathError),

    #[error(transparent)]
    Dom(#[from] DomError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    /// Never raised by the library itself; [`Mixin`](crate::Mixin)
    /// implementations return it to report their own failures, and it
    /// reaches the caller unchanged.
    #[error("extension failed: {0}")]
    Extension(String),
}
