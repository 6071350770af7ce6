//! Core function library.

use xproject_dom::{NodeId, Tree};

use crate::error::EvalError;
use crate::eval::{Context, Value};
use crate::parser::ParseError;
use crate::util::round_half_up;

/// `(name, min args, max args)`; `None` means variadic.
const FUNCTIONS: &[(&str, usize, Option<usize>)] = &[
    ("last", 0, Some(0)),
    ("position", 0, Some(0)),
    ("count", 1, Some(1)),
    ("name", 0, Some(1)),
    ("local-name", 0, Some(1)),
    ("string", 0, Some(1)),
    ("concat", 2, None),
    ("starts-with", 2, Some(2)),
    ("contains", 2, Some(2)),
    ("substring", 2, Some(3)),
    ("substring-before", 2, Some(2)),
    ("substring-after", 2, Some(2)),
    ("string-length", 0, Some(1)),
    ("normalize-space", 0, Some(1)),
    ("translate", 3, Some(3)),
    ("not", 1, Some(1)),
    ("true", 0, Some(0)),
    ("false", 0, Some(0)),
    ("boolean", 1, Some(1)),
    ("number", 0, Some(1)),
    ("sum", 1, Some(1)),
    ("floor", 1, Some(1)),
    ("ceiling", 1, Some(1)),
    ("round", 1, Some(1)),
];

/// Checks that `name` is a known function taking `got` arguments.
pub fn check_arity(name: &str, got: usize) -> Result<(), ParseError> {
    let Some((_, min, max)) = FUNCTIONS.iter().find(|(n, _, _)| *n == name) else {
        return Err(ParseError::UnknownFunction(name.to_string()));
    };
    if got < *min || max.is_some_and(|max| got > max) {
        return Err(ParseError::Arity {
            name: name.to_string(),
            got,
        });
    }
    Ok(())
}

fn node_name(tree: &Tree, id: NodeId) -> &str {
    tree.name(id).unwrap_or("")
}

fn local_name(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}

/// Calls a function already validated by [`check_arity`].
pub fn call_function(name: &str, ctx: &Context<'_>, args: Vec<Value>) -> Result<Value, EvalError> {
    let tree = ctx.tree;
    let mut args = args.into_iter();
    let string_arg = |args: &mut std::vec::IntoIter<Value>| match args.next() {
        Some(value) => value.to_string_value(tree),
        None => tree.text_content(ctx.node),
    };
    let value = match name {
        "last" => Value::Number(ctx.size as f64),
        "position" => Value::Number(ctx.position as f64),
        "count" => {
            let nodes = next_node_set(&mut args, "count()")?;
            Value::Number(nodes.len() as f64)
        }
        "name" | "local-name" => {
            let target = match args.next() {
                Some(value) => value.into_node_set("name()")?.first().copied(),
                None => Some(ctx.node),
            };
            let full = target.map(|id| node_name(tree, id)).unwrap_or("");
            let result = if name == "name" { full } else { local_name(full) };
            Value::String(result.to_string())
        }
        "string" => Value::String(string_arg(&mut args)),
        "concat" => Value::String(args.map(|arg| arg.to_string_value(tree)).collect()),
        "starts-with" | "contains" | "substring-before" | "substring-after" => {
            let haystack = string_arg(&mut args);
            let needle = string_arg(&mut args);
            match name {
                "starts-with" => Value::Boolean(haystack.starts_with(&needle)),
                "contains" => Value::Boolean(haystack.contains(&needle)),
                "substring-before" => Value::String(
                    haystack
                        .split_once(&needle)
                        .map(|(before, _)| before.to_string())
                        .unwrap_or_default(),
                ),
                _ => Value::String(
                    haystack
                        .split_once(&needle)
                        .map(|(_, after)| after.to_string())
                        .unwrap_or_default(),
                ),
            }
        }
        "substring" => {
            let text = string_arg(&mut args);
            let start = round_half_up(next_number(&mut args, tree));
            let end = match args.next() {
                Some(length) => start + round_half_up(length.to_number(tree)),
                None => f64::INFINITY,
            };
            let result = text
                .chars()
                .enumerate()
                .filter(|(index, _)| {
                    let position = (*index + 1) as f64;
                    position >= start && position < end
                })
                .map(|(_, c)| c)
                .collect();
            Value::String(result)
        }
        "string-length" => Value::Number(string_arg(&mut args).chars().count() as f64),
        "normalize-space" => {
            let text = string_arg(&mut args);
            Value::String(text.split_whitespace().collect::<Vec<_>>().join(" "))
        }
        "translate" => {
            let text = string_arg(&mut args);
            let from: Vec<char> = string_arg(&mut args).chars().collect();
            let to: Vec<char> = string_arg(&mut args).chars().collect();
            let result = text
                .chars()
                .filter_map(|c| match from.iter().position(|f| *f == c) {
                    Some(index) => to.get(index).copied(),
                    None => Some(c),
                })
                .collect();
            Value::String(result)
        }
        "not" => Value::Boolean(!next_boolean(&mut args)),
        "true" => Value::Boolean(true),
        "false" => Value::Boolean(false),
        "boolean" => Value::Boolean(next_boolean(&mut args)),
        "number" => match args.next() {
            Some(value) => Value::Number(value.to_number(tree)),
            None => Value::Number(Value::String(tree.text_content(ctx.node)).to_number(tree)),
        },
        "sum" => {
            let nodes = next_node_set(&mut args, "sum()")?;
            let total = nodes
                .iter()
                .map(|id| Value::String(tree.text_content(*id)).to_number(tree))
                .sum();
            Value::Number(total)
        }
        "floor" => Value::Number(next_number(&mut args, tree).floor()),
        "ceiling" => Value::Number(next_number(&mut args, tree).ceil()),
        _ => Value::Number(round_half_up(next_number(&mut args, tree))),
    };
    Ok(value)
}

fn next_node_set(
    args: &mut std::vec::IntoIter<Value>,
    operation: &'static str,
) -> Result<Vec<NodeId>, EvalError> {
    args.next()
        .ok_or(EvalError::NotANodeSet(operation))?
        .into_node_set(operation)
}

fn next_number(args: &mut std::vec::IntoIter<Value>, tree: &Tree) -> f64 {
    args.next().map_or(f64::NAN, |value| value.to_number(tree))
}

fn next_boolean(args: &mut std::vec::IntoIter<Value>) -> bool {
    args.next().is_some_and(|value| value.to_boolean())
}
