//! Expression evaluation over a [`Tree`].

use xproject_dom::{NodeId, NodeKind, Tree};

use crate::error::EvalError;
use crate::functions::call_function;
use crate::types::*;
use crate::util::{format_number, parse_number};

/// Result of evaluating an expression. Node-sets are kept in document
/// order without duplicates.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    NodeSet(Vec<NodeId>),
    String(String),
    Number(f64),
    Boolean(bool),
}

impl Value {
    pub fn to_string_value(&self, tree: &Tree) -> String {
        match self {
            Value::NodeSet(nodes) => nodes
                .first()
                .map(|id| tree.text_content(*id))
                .unwrap_or_default(),
            Value::String(s) => s.clone(),
            Value::Number(n) => format_number(*n),
            Value::Boolean(b) => b.to_string(),
        }
    }

    pub fn to_number(&self, tree: &Tree) -> f64 {
        match self {
            Value::Number(n) => *n,
            Value::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            other => parse_number(&other.to_string_value(tree)),
        }
    }

    pub fn to_boolean(&self) -> bool {
        match self {
            Value::NodeSet(nodes) => !nodes.is_empty(),
            Value::String(s) => !s.is_empty(),
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Boolean(b) => *b,
        }
    }

    pub(crate) fn into_node_set(self, operation: &'static str) -> Result<Vec<NodeId>, EvalError> {
        match self {
            Value::NodeSet(nodes) => Ok(nodes),
            _ => Err(EvalError::NotANodeSet(operation)),
        }
    }
}

/// Evaluation context: the tree, the context node, and its position within
/// the current node list (1-based).
#[derive(Clone, Copy)]
pub struct Context<'t> {
    pub tree: &'t Tree,
    pub node: NodeId,
    pub position: usize,
    pub size: usize,
}

impl<'t> Context<'t> {
    pub fn new(tree: &'t Tree, node: NodeId) -> Self {
        Self {
            tree,
            node,
            position: 1,
            size: 1,
        }
    }

    fn at(&self, node: NodeId, position: usize, size: usize) -> Self {
        Self {
            tree: self.tree,
            node,
            position,
            size,
        }
    }
}

pub fn evaluate(expr: &Expr, ctx: &Context<'_>) -> Result<Value, EvalError> {
    match expr {
        Expr::Literal(s) => Ok(Value::String(s.clone())),
        Expr::Number(n) => Ok(Value::Number(*n)),
        Expr::Negate(inner) => Ok(Value::Number(-evaluate(inner, ctx)?.to_number(ctx.tree))),
        Expr::Path(path) => evaluate_path(path, ctx).map(Value::NodeSet),
        Expr::Filter {
            primary,
            predicates,
            steps,
        } => {
            let mut nodes = evaluate(primary, ctx)?.into_node_set("a filter expression")?;
            for predicate in predicates {
                nodes = apply_predicate(predicate, ctx, nodes)?;
            }
            if !steps.is_empty() {
                nodes = apply_steps(steps, ctx, nodes)?;
            }
            Ok(Value::NodeSet(nodes))
        }
        Expr::Function { name, args } => {
            let args = args
                .iter()
                .map(|arg| evaluate(arg, ctx))
                .collect::<Result<Vec<_>, _>>()?;
            call_function(name, ctx, args)
        }
        Expr::Binary {
            operator,
            left,
            right,
        } => evaluate_binary(*operator, left, right, ctx),
    }
}

fn evaluate_binary(
    operator: BinaryOperator,
    left: &Expr,
    right: &Expr,
    ctx: &Context<'_>,
) -> Result<Value, EvalError> {
    let tree = ctx.tree;
    match operator {
        BinaryOperator::Or => {
            let result = evaluate(left, ctx)?.to_boolean() || evaluate(right, ctx)?.to_boolean();
            Ok(Value::Boolean(result))
        }
        BinaryOperator::And => {
            let result = evaluate(left, ctx)?.to_boolean() && evaluate(right, ctx)?.to_boolean();
            Ok(Value::Boolean(result))
        }
        BinaryOperator::Union => {
            let mut nodes = evaluate(left, ctx)?.into_node_set("union")?;
            nodes.extend(evaluate(right, ctx)?.into_node_set("union")?);
            tree.sort_document_order(&mut nodes);
            Ok(Value::NodeSet(nodes))
        }
        BinaryOperator::Equal
        | BinaryOperator::NotEqual
        | BinaryOperator::Less
        | BinaryOperator::LessEqual
        | BinaryOperator::Greater
        | BinaryOperator::GreaterEqual => {
            let l = evaluate(left, ctx)?;
            let r = evaluate(right, ctx)?;
            Ok(Value::Boolean(compare(operator, l, r, tree)))
        }
        BinaryOperator::Add
        | BinaryOperator::Subtract
        | BinaryOperator::Multiply
        | BinaryOperator::Divide
        | BinaryOperator::Modulo => {
            let l = evaluate(left, ctx)?.to_number(tree);
            let r = evaluate(right, ctx)?.to_number(tree);
            Ok(Value::Number(match operator {
                BinaryOperator::Add => l + r,
                BinaryOperator::Subtract => l - r,
                BinaryOperator::Multiply => l * r,
                BinaryOperator::Divide => l / r,
                _ => l % r,
            }))
        }
    }
}

/// Comparison with the existential node-set semantics of XPath 1.0.
fn compare(operator: BinaryOperator, left: Value, right: Value, tree: &Tree) -> bool {
    let string_of = |id: &NodeId| Value::String(tree.text_content(*id));
    match (left, right) {
        (Value::NodeSet(l), Value::NodeSet(r)) => l.iter().any(|a| {
            let a = string_of(a);
            r.iter()
                .any(|b| compare_atoms(operator, a.clone(), string_of(b), tree))
        }),
        (Value::NodeSet(l), Value::Boolean(b)) => {
            compare_atoms(operator, Value::Boolean(!l.is_empty()), Value::Boolean(b), tree)
        }
        (Value::Boolean(b), Value::NodeSet(r)) => {
            compare_atoms(operator, Value::Boolean(b), Value::Boolean(!r.is_empty()), tree)
        }
        (Value::NodeSet(l), other) => l
            .iter()
            .any(|a| compare_atoms(operator, string_of(a), other.clone(), tree)),
        (other, Value::NodeSet(r)) => r
            .iter()
            .any(|b| compare_atoms(operator, other.clone(), string_of(b), tree)),
        (l, r) => compare_atoms(operator, l, r, tree),
    }
}

fn compare_atoms(operator: BinaryOperator, left: Value, right: Value, tree: &Tree) -> bool {
    match operator {
        BinaryOperator::Equal | BinaryOperator::NotEqual => {
            let equal = match (&left, &right) {
                (Value::Boolean(_), _) | (_, Value::Boolean(_)) => left.to_boolean() == right.to_boolean(),
                (Value::Number(_), _) | (_, Value::Number(_)) => left.to_number(tree) == right.to_number(tree),
                _ => left.to_string_value(tree) == right.to_string_value(tree),
            };
            equal == (operator == BinaryOperator::Equal)
        }
        _ => {
            let l = left.to_number(tree);
            let r = right.to_number(tree);
            match operator {
                BinaryOperator::Less => l < r,
                BinaryOperator::LessEqual => l <= r,
                BinaryOperator::Greater => l > r,
                _ => l >= r,
            }
        }
    }
}

fn evaluate_path(path: &LocationPath, ctx: &Context<'_>) -> Result<Vec<NodeId>, EvalError> {
    let start = if path.absolute {
        ctx.tree.root_of(ctx.node)
    } else {
        ctx.node
    };
    apply_steps(&path.steps, ctx, vec![start])
}

fn apply_steps(steps: &[Step], ctx: &Context<'_>, mut nodes: Vec<NodeId>) -> Result<Vec<NodeId>, EvalError> {
    for step in steps {
        let mut next = Vec::new();
        for node in &nodes {
            next.extend(apply_step(step, ctx, *node)?);
        }
        ctx.tree.sort_document_order(&mut next);
        nodes = next;
    }
    Ok(nodes)
}

/// Nodes selected by one step from one context node, in axis order.
fn apply_step(step: &Step, ctx: &Context<'_>, node: NodeId) -> Result<Vec<NodeId>, EvalError> {
    let tree = ctx.tree;
    let mut selected: Vec<NodeId> = axis_nodes(tree, step.axis, node)
        .into_iter()
        .filter(|id| matches_test(tree, step.axis, &step.test, *id))
        .collect();
    for predicate in &step.predicates {
        selected = apply_predicate(predicate, ctx, selected)?;
    }
    Ok(selected)
}

fn apply_predicate(predicate: &Expr, ctx: &Context<'_>, nodes: Vec<NodeId>) -> Result<Vec<NodeId>, EvalError> {
    let size = nodes.len();
    let mut kept = Vec::with_capacity(size);
    for (index, node) in nodes.into_iter().enumerate() {
        let position = index + 1;
        let inner = ctx.at(node, position, size);
        let keep = match evaluate(predicate, &inner)? {
            Value::Number(n) => n == position as f64,
            other => other.to_boolean(),
        };
        if keep {
            kept.push(node);
        }
    }
    Ok(kept)
}

fn axis_nodes(tree: &Tree, axis: Axis, node: NodeId) -> Vec<NodeId> {
    let is_attribute = tree.kind(node) == NodeKind::Attribute;
    match axis {
        Axis::Child => tree.children(node).to_vec(),
        Axis::Descendant => tree.descendants(node),
        Axis::DescendantOrSelf => {
            let mut out = vec![node];
            out.extend(tree.descendants(node));
            out
        }
        Axis::SelfAxis => vec![node],
        Axis::Parent => tree.parent(node).into_iter().collect(),
        Axis::Ancestor | Axis::AncestorOrSelf => {
            let mut out = Vec::new();
            if axis == Axis::AncestorOrSelf {
                out.push(node);
            }
            let mut current = tree.parent(node);
            while let Some(parent) = current {
                out.push(parent);
                current = tree.parent(parent);
            }
            out
        }
        Axis::Attribute => tree.attributes(node).to_vec(),
        Axis::FollowingSibling | Axis::PrecedingSibling => {
            if is_attribute {
                return Vec::new();
            }
            let Some(parent) = tree.parent(node) else {
                return Vec::new();
            };
            let siblings = tree.children(parent);
            let Some(index) = siblings.iter().position(|s| *s == node) else {
                return Vec::new();
            };
            if axis == Axis::FollowingSibling {
                siblings[index + 1..].to_vec()
            } else {
                siblings[..index].iter().rev().copied().collect()
            }
        }
        Axis::Following => {
            let mut out = Vec::new();
            let mut current = node;
            if is_attribute {
                if let Some(owner) = tree.parent(node) {
                    out.extend(tree.descendants(owner));
                    current = owner;
                }
            }
            while let Some(parent) = tree.parent(current) {
                let siblings = tree.children(parent);
                if let Some(index) = siblings.iter().position(|s| *s == current) {
                    for sibling in &siblings[index + 1..] {
                        out.push(*sibling);
                        out.extend(tree.descendants(*sibling));
                    }
                }
                current = parent;
            }
            out
        }
        Axis::Preceding => {
            let mut out = Vec::new();
            let mut current = if is_attribute {
                tree.parent(node).unwrap_or(node)
            } else {
                node
            };
            while let Some(parent) = tree.parent(current) {
                let siblings = tree.children(parent);
                if let Some(index) = siblings.iter().position(|s| *s == current) {
                    for sibling in siblings[..index].iter().rev() {
                        let mut subtree = vec![*sibling];
                        subtree.extend(tree.descendants(*sibling));
                        out.extend(subtree.into_iter().rev());
                    }
                }
                current = parent;
            }
            out
        }
    }
}

fn matches_test(tree: &Tree, axis: Axis, test: &NodeTest, id: NodeId) -> bool {
    let principal = if axis == Axis::Attribute {
        NodeKind::Attribute
    } else {
        NodeKind::Element
    };
    let kind = tree.kind(id);
    match test {
        NodeTest::Node => true,
        NodeTest::Text => kind == NodeKind::Text,
        NodeTest::Comment => kind == NodeKind::Comment,
        NodeTest::Wildcard => kind == principal,
        NodeTest::Name(expected) => {
            if kind != principal {
                return false;
            }
            let Some(name) = tree.name(id) else {
                return false;
            };
            match expected.strip_suffix(":*") {
                Some(prefix) => name
                    .split_once(':')
                    .is_some_and(|(actual, _)| actual == prefix),
                None => name == expected,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use xproject_dom::Document;

    use super::*;
    use crate::parser::XPathParser;

    fn eval(doc: &Document, context: NodeId, source: &str) -> Value {
        let expr = XPathParser::parse(source).unwrap();
        let tree = doc.read();
        evaluate(&expr, &Context::new(&tree, context)).unwrap()
    }

    fn names(doc: &Document, value: Value) -> Vec<String> {
        let tree = doc.read();
        match value {
            Value::NodeSet(nodes) => nodes
                .iter()
                .map(|id| tree.node_name(*id).to_string())
                .collect(),
            other => panic!("expected node-set, got {other:?}"),
        }
    }

    #[test]
    fn test_reverse_axis_positions_are_nearest_first() {
        let doc = Document::parse("<a><b/><c/><d/></a>").unwrap();
        let d = doc.read().descendants(NodeId::DOCUMENT)[3];
        let value = eval(&doc, d, "preceding-sibling::*[1]");
        assert_eq!(names(&doc, value), vec!["c"]);
        let value = eval(&doc, d, "ancestor-or-self::*[last()]");
        assert_eq!(names(&doc, value), vec!["a"]);
    }

    #[test]
    fn test_following_and_preceding() {
        let doc = Document::parse("<r><a><x/></a><b><y/></b><c/></r>").unwrap();
        let b = doc.root_element().unwrap().child_elements()[1].id();
        let value = eval(&doc, b, "following::*");
        assert_eq!(names(&doc, value), vec!["c"]);
        let value = eval(&doc, b, "preceding::*");
        assert_eq!(names(&doc, value), vec!["a", "x"]);
    }

    #[test]
    fn test_existential_comparison() {
        let doc = Document::parse("<r><n>1</n><n>5</n></r>").unwrap();
        let root = NodeId::DOCUMENT;
        assert_eq!(eval(&doc, root, "/r/n = 5"), Value::Boolean(true));
        assert_eq!(eval(&doc, root, "/r/n != 5"), Value::Boolean(true));
        assert_eq!(eval(&doc, root, "/r/n > 4"), Value::Boolean(true));
        assert_eq!(eval(&doc, root, "/r/n > 5"), Value::Boolean(false));
        assert_eq!(eval(&doc, root, "/r/missing = ''"), Value::Boolean(false));
    }

    #[test]
    fn test_arithmetic() {
        let doc = Document::new();
        let root = NodeId::DOCUMENT;
        assert_eq!(eval(&doc, root, "1 + 2 * 3"), Value::Number(7.0));
        assert_eq!(eval(&doc, root, "7 mod 3"), Value::Number(1.0));
        assert_eq!(eval(&doc, root, "-(4 div 2)"), Value::Number(-2.0));
    }

    #[test]
    fn test_union_requires_node_sets() {
        let doc = Document::new();
        let expr = XPathParser::parse("1 | 2").unwrap();
        let tree = doc.read();
        assert_eq!(
            evaluate(&expr, &Context::new(&tree, NodeId::DOCUMENT)),
            Err(EvalError::NotANodeSet("union"))
        );
    }

    #[test]
    fn test_prefix_wildcard() {
        let doc = Document::parse("<r><ns:a/><b/><ns:c/></r>").unwrap();
        let value = eval(&doc, NodeId::DOCUMENT, "/r/ns:*");
        assert_eq!(names(&doc, value), vec!["ns:a", "ns:c"]);
    }
}
