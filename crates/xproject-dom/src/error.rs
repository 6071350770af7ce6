//! DOM error type.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomError {
    #[error("malformed XML: {0}")]
    Parse(String),
    #[error("XML serialization failed: {0}")]
    Write(String),
    #[error("invalid XML name: {0:?}")]
    InvalidName(String),
    #[error("hierarchy violation: {0}")]
    HierarchyRequest(&'static str),
    #[error("operation requires {expected} node, found {found}")]
    WrongKind {
        expected: &'static str,
        found: &'static str,
    },
    #[error("node is not a child of this node")]
    NotAChild,
}
