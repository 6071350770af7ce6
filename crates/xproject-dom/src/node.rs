//! Shared handles onto a [`Tree`].
//!
//! A [`Document`] owns its tree behind an `Arc<RwLock<_>>`; a [`Node`] is a
//! `(document, id)` pair. Handles are cheap to clone, and every clone refers
//! to the same underlying node. Each method takes the lock for the duration
//! of one primitive operation only.
//!
//! Every live [`Node`] pins its id. Mutations through a handle that may
//! leave nodes unreachable sweep the arena once enough garbage piled up,
//! freeing detached subtrees that no handle points into. Lock order is
//! always tree before pins.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::parse::{parse_document, ParseOptions};
use crate::tree::{NodeData, NodeId, NodeKind, Tree};
use crate::write::{write_node, WriteOptions};
use crate::DomError;

#[derive(Default)]
struct Shared {
    tree: RwLock<Tree>,
    pins: Mutex<HashMap<NodeId, usize>>,
}

/// Handle on a whole document tree.
#[derive(Clone, Default)]
pub struct Document {
    shared: Arc<Shared>,
}

impl Document {
    /// Empty document: a document node without a root element.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tree(tree: Tree) -> Self {
        Self {
            shared: Arc::new(Shared {
                tree: RwLock::new(tree),
                pins: Mutex::default(),
            }),
        }
    }

    pub fn parse(input: &str) -> Result<Self, DomError> {
        parse_document(input, &ParseOptions::default())
    }

    pub fn parse_with(input: &str, options: &ParseOptions) -> Result<Self, DomError> {
        parse_document(input, options)
    }

    /// Read access to the arena, e.g. for path evaluation.
    ///
    /// Raw ids taken from the guard stay meaningful only while the guard is
    /// held or a [`Node`] for them is alive; a later mutation through a
    /// handle may free and reuse the slot of an unreferenced detached node.
    pub fn read(&self) -> RwLockReadGuard<'_, Tree> {
        self.shared.tree.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tree> {
        self.shared.tree.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn pins(&self) -> MutexGuard<'_, HashMap<NodeId, usize>> {
        self.shared.pins.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn pin(&self, id: NodeId) {
        *self.pins().entry(id).or_insert(0) += 1;
    }

    fn unpin(&self, id: NodeId) {
        let mut pins = self.pins();
        if let Some(count) = pins.get_mut(&id) {
            *count -= 1;
            if *count == 0 {
                pins.remove(&id);
            }
        }
    }

    /// Runs `op` under the write lock, then sweeps unreachable nodes when
    /// the arena has grown enough since the last sweep.
    fn mutate<R>(&self, op: impl FnOnce(&mut Tree) -> R) -> R {
        let mut tree = self.write();
        let result = op(&mut *tree);
        if tree.needs_sweep() {
            let pinned: Vec<NodeId> = self.pins().keys().copied().collect();
            let freed = tree.collect_garbage(pinned);
            tracing::trace!(freed, used = tree.used(), "swept detached nodes");
        }
        result
    }

    pub fn ptr_eq(&self, other: &Document) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    /// The document node itself.
    pub fn node(&self) -> Node {
        self.node_at(NodeId::DOCUMENT)
    }

    /// Handle on `id`. Callers must hold a lock on the tree while the id is
    /// not yet pinned by another handle.
    pub fn node_at(&self, id: NodeId) -> Node {
        self.pin(id);
        Node {
            doc: self.clone(),
            id,
        }
    }

    pub fn root_element(&self) -> Option<Node> {
        let tree = self.read();
        let root = tree.root_element()?;
        Some(self.node_at(root))
    }

    /// Creates a detached element owned by this document.
    pub fn create_element(&self, name: &str) -> Result<Node, DomError> {
        let mut tree = self.write();
        let id = tree.create_element(name)?;
        Ok(self.node_at(id))
    }

    /// Deep copy of `node` (from any document) as a detached node of this
    /// document.
    pub fn import(&self, node: &Node) -> Node {
        if self.ptr_eq(&node.doc) {
            let mut tree = self.write();
            let id = tree.deep_clone(node.id);
            return self.node_at(id);
        }
        let fragment = node.doc.read().extract(node.id);
        let mut tree = self.write();
        let id = tree.insert_fragment(&fragment);
        self.node_at(id)
    }

    /// Makes `element` the root element, replacing the current one in place.
    /// Elements of other documents are imported first. Returns the node now
    /// acting as root.
    pub fn set_root_element(&self, element: &Node) -> Result<Node, DomError> {
        let kind = element.kind();
        if kind != NodeKind::Element {
            return Err(DomError::WrongKind {
                expected: "element",
                found: kind.as_str(),
            });
        }
        let imported;
        let element = if self.ptr_eq(&element.doc) {
            element
        } else {
            imported = self.import(element);
            &imported
        };
        let id = element.id;
        self.mutate(|tree| -> Result<(), DomError> {
            match tree.root_element() {
                Some(old) if old == id => {}
                Some(old) => {
                    let position = tree
                        .children(NodeId::DOCUMENT)
                        .iter()
                        .position(|c| *c == old);
                    tree.detach(old);
                    tree.insert(NodeId::DOCUMENT, position, id)?;
                }
                None => tree.append(NodeId::DOCUMENT, id)?,
            }
            Ok(())
        })?;
        Ok(element.clone())
    }

    pub fn to_xml(&self) -> Result<String, DomError> {
        self.node().to_xml()
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Document {}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Document({:p})", Arc::as_ptr(&self.shared))
    }
}

/// Handle on one node of a [`Document`].
///
/// Equality and hashing follow node identity: two handles are equal iff they
/// point at the same slot of the same document arena. A node stays allocated
/// while any handle on it, or on another node of its subtree or tree, is
/// alive.
pub struct Node {
    doc: Document,
    id: NodeId,
}

impl Node {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn owner_document(&self) -> Document {
        self.doc.clone()
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn is_same_node(&self, other: &Node) -> bool {
        self.doc.ptr_eq(&other.doc) && self.id == other.id
    }

    pub fn kind(&self) -> NodeKind {
        self.doc.read().kind(self.id)
    }

    pub fn is_element(&self) -> bool {
        self.kind() == NodeKind::Element
    }

    pub fn is_document(&self) -> bool {
        self.id == NodeId::DOCUMENT
    }

    /// Element or attribute name.
    pub fn name(&self) -> Option<String> {
        self.doc.read().name(self.id).map(str::to_string)
    }

    /// DOM-style node name (`#document`, `#text`, ... for unnamed nodes).
    pub fn node_name(&self) -> String {
        self.doc.read().node_name(self.id).to_string()
    }

    pub fn parent(&self) -> Option<Node> {
        let tree = self.doc.read();
        let parent = tree.parent(self.id)?;
        Some(self.doc.node_at(parent))
    }

    pub fn children(&self) -> Vec<Node> {
        let tree = self.doc.read();
        tree.children(self.id)
            .iter()
            .map(|id| self.doc.node_at(*id))
            .collect()
    }

    pub fn child_elements(&self) -> Vec<Node> {
        let tree = self.doc.read();
        tree.children(self.id)
            .iter()
            .filter(|id| tree.kind(**id) == NodeKind::Element)
            .map(|id| self.doc.node_at(*id))
            .collect()
    }

    /// Element descendants named `name`, in document order, excluding self.
    pub fn descendants_named(&self, name: &str) -> Vec<Node> {
        let tree = self.doc.read();
        tree.descendants(self.id)
            .into_iter()
            .filter(|id| tree.kind(*id) == NodeKind::Element && tree.name(*id) == Some(name))
            .map(|id| self.doc.node_at(id))
            .collect()
    }

    pub fn attributes(&self) -> Vec<Node> {
        let tree = self.doc.read();
        tree.attributes(self.id)
            .iter()
            .map(|id| self.doc.node_at(*id))
            .collect()
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        self.doc
            .read()
            .attribute_value(self.id, name)
            .map(str::to_string)
    }

    pub fn set_attribute(&self, name: &str, value: &str) -> Result<(), DomError> {
        self.doc.write().set_attribute(self.id, name, value)?;
        Ok(())
    }

    pub fn remove_attribute(&self, name: &str) -> bool {
        self.doc.mutate(|tree| tree.remove_attribute(self.id, name))
    }

    pub fn text_content(&self) -> String {
        self.doc.read().text_content(self.id)
    }

    /// Replaces the children of an element with one text node, or the value
    /// of any other node.
    pub fn set_text_content(&self, text: &str) {
        self.doc.mutate(|tree| tree.set_text_content(self.id, text));
    }

    /// Appends `child`. A child of the same document is moved; a child of
    /// another document is imported as a deep copy. Returns the appended
    /// node.
    pub fn append_child(&self, child: &Node) -> Result<Node, DomError> {
        if self.doc.ptr_eq(&child.doc) {
            self.doc.mutate(|tree| tree.append(self.id, child.id))?;
            return Ok(child.clone());
        }
        let fragment = child.doc.read().extract(child.id);
        let appended = {
            let mut tree = self.doc.write();
            let id = tree.insert_fragment(&fragment);
            self.doc.node_at(id)
        };
        self.doc.mutate(|tree| tree.append(self.id, appended.id))?;
        Ok(appended)
    }

    pub fn remove_child(&self, child: &Node) -> Result<(), DomError> {
        if !self.doc.ptr_eq(&child.doc) {
            return Err(DomError::NotAChild);
        }
        self.doc.mutate(|tree| {
            if tree.parent(child.id) != Some(self.id) || tree.kind(child.id) == NodeKind::Attribute {
                return Err(DomError::NotAChild);
            }
            tree.detach(child.id);
            Ok(())
        })
    }

    /// Unlinks this node from its parent; attributes are removed from their
    /// owner element.
    pub fn detach(&self) {
        self.doc.mutate(|tree| tree.detach(self.id));
    }

    /// Removes every direct child whose node name equals `name`. Returns the
    /// number of removed children.
    pub fn remove_children_named(&self, name: &str) -> usize {
        self.doc.mutate(|tree| {
            let doomed: Vec<NodeId> = tree
                .children(self.id)
                .iter()
                .copied()
                .filter(|id| tree.node_name(*id) == name)
                .collect();
            for id in &doomed {
                tree.detach(*id);
            }
            doomed.len()
        })
    }

    /// Detached deep copy inside the same document.
    pub fn deep_clone(&self) -> Node {
        self.doc.import(self)
    }

    pub fn to_xml(&self) -> Result<String, DomError> {
        self.to_xml_with(&WriteOptions::default())
    }

    pub fn to_xml_with(&self, options: &WriteOptions) -> Result<String, DomError> {
        write_node(&self.doc.read(), self.id, options)
    }

    /// Payload snapshot of this node.
    pub fn data(&self) -> NodeData {
        self.doc.read().data(self.id).clone()
    }
}

impl Clone for Node {
    fn clone(&self) -> Self {
        self.doc.node_at(self.id)
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        self.doc.unpin(self.id);
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.is_same_node(other)
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.doc.shared) as usize).hash(state);
        self.id.hash(state);
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Node({:p}#{})",
            Arc::as_ptr(&self.doc.shared),
            self.id.index()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_share_identity() {
        let doc = Document::parse("<a><b/></a>").unwrap();
        let b1 = doc.root_element().unwrap().child_elements()[0].clone();
        let b2 = doc.root_element().unwrap().child_elements()[0].clone();
        assert_eq!(b1, b2);
        b1.set_text_content("x");
        assert_eq!(b2.text_content(), "x");
    }

    #[test]
    fn test_append_moves_within_document() {
        let doc = Document::parse("<a><b/><c/></a>").unwrap();
        let root = doc.root_element().unwrap();
        let b = root.child_elements()[0].clone();
        let c = root.child_elements()[1].clone();
        c.append_child(&b).unwrap();
        assert_eq!(root.child_elements(), vec![c.clone()]);
        assert_eq!(b.parent(), Some(c));
    }

    #[test]
    fn test_append_imports_across_documents() {
        let target = Document::parse("<a/>").unwrap();
        let source = Document::parse("<b x=\"1\"><c/></b>").unwrap();
        let b = source.root_element().unwrap();
        let appended = target.root_element().unwrap().append_child(&b).unwrap();
        assert_ne!(appended, b);
        assert_eq!(appended.attribute("x").as_deref(), Some("1"));
        assert_eq!(b.parent(), Some(source.node()));
        assert_eq!(target.to_xml().unwrap(), "<a><b x=\"1\"><c/></b></a>");
    }

    #[test]
    fn test_set_root_element_replaces_in_place() {
        let doc = Document::parse("<old><keep/></old>").unwrap();
        let other = Document::parse("<new/>").unwrap();
        let root = doc.set_root_element(&other.root_element().unwrap()).unwrap();
        assert_eq!(root.name().as_deref(), Some("new"));
        assert_eq!(doc.to_xml().unwrap(), "<new/>");
    }

    #[test]
    fn test_set_root_element_on_empty_document() {
        let doc = Document::new();
        let element = doc.create_element("fresh").unwrap();
        doc.set_root_element(&element).unwrap();
        assert_eq!(doc.root_element(), Some(element));
    }

    #[test]
    fn test_remove_children_named() {
        let doc = Document::parse("<a><i/><j/><i/></a>").unwrap();
        let root = doc.root_element().unwrap();
        assert_eq!(root.remove_children_named("i"), 2);
        assert_eq!(doc.to_xml().unwrap(), "<a><j/></a>");
    }

    #[test]
    fn test_handles_pin_nodes_across_sweeps() {
        let doc = Document::parse("<a><b><c/></b></a>").unwrap();
        let root = doc.root_element().unwrap();
        let c = root.descendants_named("c").remove(0);
        root.set_text_content("");
        for i in 0..500 {
            root.set_text_content(&i.to_string());
        }
        assert!(doc.read().len() < 200);
        assert_eq!(c.parent().and_then(|b| b.name()).as_deref(), Some("b"));
        assert_eq!(c.name().as_deref(), Some("c"));
        assert_eq!(doc.to_xml().unwrap(), "<a>499</a>");
    }

    #[test]
    fn test_dropped_handles_release_pins() {
        let doc = Document::parse("<a/>").unwrap();
        let root = doc.root_element().unwrap();
        let copy = root.clone();
        assert_eq!(doc.pins().get(&root.id()), Some(&2));
        drop(copy);
        assert_eq!(doc.pins().get(&root.id()), Some(&1));
        drop(root);
        assert!(doc.pins().is_empty());
    }

    #[test]
    fn test_remove_child_requires_parent() {
        let doc = Document::parse("<a><b/></a>").unwrap();
        let root = doc.root_element().unwrap();
        let b = root.child_elements()[0].clone();
        assert_eq!(b.remove_child(&root), Err(DomError::NotAChild));
        root.remove_child(&b).unwrap();
        assert!(root.children().is_empty());
    }
}
