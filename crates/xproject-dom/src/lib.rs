//! Mutable XML document model.
//!
//! Documents are arena-backed trees ([`Tree`]) shared through cheap
//! [`Document`] / [`Node`] handles. Several handles may point at the same
//! node; mutations through one are visible through all of them.
//!
//! # Example
//!
//! ```
//! use xproject_dom::Document;
//!
//! let doc = Document::parse("<root><child>value</child></root>").unwrap();
//! let child = doc.root_element().unwrap().child_elements()[0].clone();
//! assert_eq!(child.text_content(), "value");
//!
//! child.set_attribute("id", "7").unwrap();
//! assert_eq!(doc.to_xml().unwrap(), r#"<root><child id="7">value</child></root>"#);
//! ```

mod error;
pub use error::DomError;

pub mod tree;
pub use tree::{is_valid_name, Fragment, NodeData, NodeId, NodeKind, Tree};

mod node;
pub use node::{Document, Node};

mod parse;
pub use parse::{parse_document, ParseOptions};

mod write;
pub use write::{write_node, WriteOptions};
