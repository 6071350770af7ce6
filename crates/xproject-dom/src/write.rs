//! Tree to XML text, through the `quick-xml` writer.

use std::io::Write;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::tree::{NodeData, NodeId, NodeKind, Tree};
use crate::DomError;

/// Serializer switches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Indent nested elements by this many spaces.
    pub indent: Option<usize>,
    /// Emit `<?xml version="1.0" encoding="UTF-8"?>` before a document.
    pub xml_declaration: bool,
}

fn write_err(err: impl std::fmt::Display) -> DomError {
    DomError::Write(err.to_string())
}

/// Serializes the subtree at `id`. Attribute nodes serialize to their
/// value, matching what an identity transform produces for them.
pub fn write_node(tree: &Tree, id: NodeId, options: &WriteOptions) -> Result<String, DomError> {
    if tree.kind(id) == NodeKind::Attribute {
        return Ok(tree.text_content(id));
    }
    let mut writer = match options.indent {
        Some(width) => Writer::new_with_indent(Vec::new(), b' ', width),
        None => Writer::new(Vec::new()),
    };
    if options.xml_declaration && tree.kind(id) == NodeKind::Document {
        emit(
            &mut writer,
            Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
        )?;
    }
    write_subtree(&mut writer, tree, id)?;
    String::from_utf8(writer.into_inner()).map_err(write_err)
}

fn write_subtree<W: Write>(writer: &mut Writer<W>, tree: &Tree, id: NodeId) -> Result<(), DomError> {
    match tree.data(id) {
        NodeData::Document => {
            for child in tree.children(id) {
                write_subtree(writer, tree, *child)?;
            }
        }
        NodeData::Element { name } => {
            let mut start = BytesStart::new(name.as_str());
            for attr in tree.attributes(id) {
                if let NodeData::Attribute { name, value } = tree.data(*attr) {
                    start.push_attribute((name.as_str(), value.as_str()));
                }
            }
            let children = tree.children(id);
            if children.is_empty() {
                emit(writer, Event::Empty(start))?;
            } else {
                emit(writer, Event::Start(start))?;
                for child in children {
                    write_subtree(writer, tree, *child)?;
                }
                emit(writer, Event::End(BytesEnd::new(name.as_str())))?;
            }
        }
        NodeData::Text(text) => emit(writer, Event::Text(BytesText::new(text)))?,
        NodeData::Comment(text) => {
            emit(writer, Event::Comment(BytesText::from_escaped(text.as_str())))?
        }
        NodeData::Attribute { value, .. } => emit(writer, Event::Text(BytesText::new(value)))?,
    }
    Ok(())
}

fn emit<W: Write>(writer: &mut Writer<W>, event: Event<'_>) -> Result<(), DomError> {
    writer.write_event(event).map_err(write_err)
}
