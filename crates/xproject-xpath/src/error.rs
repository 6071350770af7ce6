use thiserror::Error;

use crate::parser::ParseError;

/// Type errors raised while evaluating a well-formed expression.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvalError {
    #[error("{0} requires a node-set operand")]
    NotANodeSet(&'static str),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum XPathError {
    #[error("cannot compile {expression:?}: {source}")]
    Parse {
        expression: String,
        #[source]
        source: ParseError,
    },
    #[error("cannot evaluate {expression:?}: {source}")]
    Eval {
        expression: String,
        #[source]
        source: EvalError,
    },
    #[error("{expression:?} does not evaluate to a node-set")]
    NotANodeSet { expression: String },
}
