//! XML text to [`Document`], driven by `quick-xml` pull events.

use std::borrow::Cow;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::node::Document;
use crate::tree::{NodeData, NodeId, NodeKind, Tree};
use crate::DomError;

/// Parser switches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Keep text nodes consisting only of whitespace.
    pub keep_whitespace: bool,
    /// Keep comment nodes.
    pub keep_comments: bool,
}

fn parse_err(err: impl std::fmt::Display) -> DomError {
    DomError::Parse(err.to_string())
}

/// Parses `input` into a new document. The input must contain exactly one
/// root element.
pub fn parse_document(input: &str, options: &ParseOptions) -> Result<Document, DomError> {
    let mut tree = Tree::new();
    let mut stack = vec![NodeId::DOCUMENT];
    let mut reader = Reader::from_str(input);

    loop {
        match reader.read_event().map_err(parse_err)? {
            Event::Start(start) => {
                let element = open_element(&mut tree, &start)?;
                attach(&mut tree, &stack, element)?;
                stack.push(element);
            }
            Event::Empty(start) => {
                let element = open_element(&mut tree, &start)?;
                attach(&mut tree, &stack, element)?;
            }
            Event::End(_) => {
                if stack.len() <= 1 {
                    return Err(DomError::Parse("unexpected closing tag".to_string()));
                }
                stack.pop();
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(parse_err)?;
                push_text(&mut tree, &stack, text, options.keep_whitespace)?;
            }
            Event::CData(data) => {
                let bytes = data.into_inner();
                let text = std::str::from_utf8(&bytes).map_err(parse_err)?;
                push_text(&mut tree, &stack, Cow::Borrowed(text), true)?;
            }
            Event::Comment(comment) if options.keep_comments => {
                let text = String::from_utf8_lossy(&comment).into_owned();
                let node = tree.create(NodeData::Comment(text));
                attach(&mut tree, &stack, node)?;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if stack.len() > 1 {
        let open = stack
            .last()
            .and_then(|id| tree.name(*id))
            .unwrap_or_default()
            .to_string();
        return Err(DomError::Parse(format!("unclosed element <{open}>")));
    }
    if tree.root_element().is_none() {
        return Err(DomError::Parse("document has no root element".to_string()));
    }
    Ok(Document::from_tree(tree))
}

fn open_element(tree: &mut Tree, start: &BytesStart<'_>) -> Result<NodeId, DomError> {
    let name = std::str::from_utf8(start.name().as_ref())
        .map_err(parse_err)?
        .to_string();
    let element = tree.create_element(&name)?;
    for attr in start.attributes() {
        let attr = attr.map_err(parse_err)?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(parse_err)?
            .to_string();
        let value = attr.unescape_value().map_err(parse_err)?;
        tree.set_attribute(element, &key, &value)?;
    }
    Ok(element)
}

fn attach(tree: &mut Tree, stack: &[NodeId], node: NodeId) -> Result<(), DomError> {
    let parent = stack.last().copied().unwrap_or(NodeId::DOCUMENT);
    tree.append(parent, node).map_err(|err| match err {
        DomError::HierarchyRequest(_) if parent == NodeId::DOCUMENT => {
            DomError::Parse("multiple root elements".to_string())
        }
        other => other,
    })
}

fn push_text(
    tree: &mut Tree,
    stack: &[NodeId],
    text: Cow<'_, str>,
    keep_whitespace: bool,
) -> Result<(), DomError> {
    let blank = text.trim().is_empty();
    let parent = stack.last().copied().unwrap_or(NodeId::DOCUMENT);
    if tree.kind(parent) == NodeKind::Document {
        if blank {
            return Ok(());
        }
        return Err(DomError::Parse("text outside the root element".to_string()));
    }
    if blank && !keep_whitespace {
        return Ok(());
    }
    let node = tree.create(NodeData::Text(text.into_owned()));
    tree.append(parent, node)
}
