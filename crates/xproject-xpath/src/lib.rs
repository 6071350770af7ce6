//! XPath 1.0 subset for `xproject-dom` trees.
//!
//! Supports location paths with all axes except `namespace`, name/kind node
//! tests, predicates, the usual operators, unions, and the core function
//! library minus `id()`, `lang()` and the namespace functions.
//!
//! # Example
//!
//! ```
//! use xproject_dom::Document;
//! use xproject_xpath::XPath;
//!
//! let doc = Document::parse(r#"<shop><item price="3"/><item price="5"/></shop>"#).unwrap();
//! let expensive = XPath::compile("/shop/item[@price > 4]").unwrap();
//! let nodes = expensive.evaluate_node_set(&doc.node()).unwrap();
//! assert_eq!(nodes.len(), 1);
//! assert_eq!(nodes[0].attribute("price").as_deref(), Some("5"));
//! ```

mod error;
pub use error::{EvalError, XPathError};

pub mod types;
pub use types::*;

mod parser;
pub use parser::{ParseError, XPathParser};

mod eval;
pub use eval::{evaluate, Context, Value};

mod functions;

pub mod util;

use xproject_dom::{Node, NodeId, Tree};

/// Result of [`XPath::evaluate`], with node-sets as [`Node`] handles.
#[derive(Debug, Clone, PartialEq)]
pub enum XPathResult {
    NodeSet(Vec<Node>),
    String(String),
    Number(f64),
    Boolean(bool),
}

/// A compiled expression.
#[derive(Debug, Clone, PartialEq)]
pub struct XPath {
    source: String,
    expr: Expr,
}

impl XPath {
    pub fn compile(source: &str) -> Result<Self, XPathError> {
        let expr = XPathParser::parse(source).map_err(|source_err| XPathError::Parse {
            expression: source.to_string(),
            source: source_err,
        })?;
        Ok(Self {
            source: source.to_string(),
            expr,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Evaluates against `context` inside an already locked tree.
    pub fn evaluate_in(&self, tree: &Tree, context: NodeId) -> Result<Value, XPathError> {
        evaluate(&self.expr, &Context::new(tree, context)).map_err(|source| XPathError::Eval {
            expression: self.source.clone(),
            source,
        })
    }

    pub fn evaluate(&self, context: &Node) -> Result<XPathResult, XPathError> {
        let doc = context.document();
        let tree = doc.read();
        let value = self.evaluate_in(&tree, context.id())?;
        Ok(match value {
            Value::NodeSet(ids) => {
                XPathResult::NodeSet(ids.into_iter().map(|id| doc.node_at(id)).collect())
            }
            Value::String(s) => XPathResult::String(s),
            Value::Number(n) => XPathResult::Number(n),
            Value::Boolean(b) => XPathResult::Boolean(b),
        })
    }

    /// `string()` of the result.
    pub fn evaluate_string(&self, context: &Node) -> Result<String, XPathError> {
        let tree = context.document().read();
        Ok(self.evaluate_in(&tree, context.id())?.to_string_value(&tree))
    }

    /// `number()` of the result.
    pub fn evaluate_number(&self, context: &Node) -> Result<f64, XPathError> {
        let tree = context.document().read();
        Ok(self.evaluate_in(&tree, context.id())?.to_number(&tree))
    }

    /// `boolean()` of the result.
    pub fn evaluate_boolean(&self, context: &Node) -> Result<bool, XPathError> {
        let tree = context.document().read();
        Ok(self.evaluate_in(&tree, context.id())?.to_boolean())
    }

    /// Matching nodes in document order. Fails for non node-set results.
    pub fn evaluate_node_set(&self, context: &Node) -> Result<Vec<Node>, XPathError> {
        match self.evaluate(context)? {
            XPathResult::NodeSet(nodes) => Ok(nodes),
            _ => Err(XPathError::NotANodeSet {
                expression: self.source.clone(),
            }),
        }
    }

    /// First matching node in document order.
    pub fn evaluate_node(&self, context: &Node) -> Result<Option<Node>, XPathError> {
        Ok(self.evaluate_node_set(context)?.into_iter().next())
    }
}

impl std::fmt::Display for XPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use xproject_dom::Document;

    use super::*;

    #[test]
    fn test_compile_error_carries_expression() {
        let err = XPath::compile("/a[").unwrap_err();
        assert!(matches!(err, XPathError::Parse { ref expression, .. } if expression == "/a["));
    }

    #[test]
    fn test_evaluate_node_requires_node_set() {
        let doc = Document::parse("<a/>").unwrap();
        let path = XPath::compile("1 + 1").unwrap();
        assert_eq!(
            path.evaluate_node(&doc.node()),
            Err(XPathError::NotANodeSet {
                expression: "1 + 1".to_string()
            })
        );
        assert_eq!(path.evaluate_string(&doc.node()).unwrap(), "2");
    }
}
