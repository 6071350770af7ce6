//! Arena storage for one XML document.
//!
//! Every node of a document lives in a single `Vec`-backed arena and is
//! addressed by a [`NodeId`]. Links (parent, children, attributes) are
//! indices, never pointers. Detached nodes (removed nodes, deep clones)
//! stay in the arena without a parent until [`Tree::collect_garbage`] frees
//! the ones nothing refers to anymore; freed slots are reused by later
//! allocations.

use std::cmp::Ordering;

use crate::DomError;

/// Index of a node inside its [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// The document node; always the first slot of a tree.
    pub const DOCUMENT: NodeId = NodeId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Document,
    Element,
    Attribute,
    Text,
    Comment,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Document => "document",
            NodeKind::Element => "element",
            NodeKind::Attribute => "attribute",
            NodeKind::Text => "text",
            NodeKind::Comment => "comment",
        }
    }
}

/// Payload of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Document,
    Element { name: String },
    Attribute { name: String, value: String },
    Text(String),
    Comment(String),
}

impl NodeData {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeData::Document => NodeKind::Document,
            NodeData::Element { .. } => NodeKind::Element,
            NodeData::Attribute { .. } => NodeKind::Attribute,
            NodeData::Text(_) => NodeKind::Text,
            NodeData::Comment(_) => NodeKind::Comment,
        }
    }
}

/// Owned copy of a subtree. Used to clone within a tree and to move
/// content between trees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub data: NodeData,
    pub attributes: Vec<Fragment>,
    pub children: Vec<Fragment>,
}

#[derive(Debug, Clone)]
struct Slot {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    attributes: Vec<NodeId>,
}

impl Slot {
    fn new(data: NodeData) -> Self {
        Self {
            data,
            parent: None,
            children: Vec::new(),
            attributes: Vec::new(),
        }
    }
}

/// Used slots allowed on top of twice the live count of the last sweep.
const SWEEP_SLACK: usize = 64;

/// Arena holding all nodes of one document.
#[derive(Debug, Clone)]
pub struct Tree {
    slots: Vec<Slot>,
    free: Vec<NodeId>,
    live_after_sweep: usize,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns `true` when `name` is usable as an element or attribute name.
///
/// Accepts qualified names (`prefix:local`); does not check namespace
/// bindings.
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'))
}

impl Tree {
    pub fn new() -> Self {
        Self {
            slots: vec![Slot::new(NodeData::Document)],
            free: Vec::new(),
            live_after_sweep: 1,
        }
    }

    /// Number of slots, including detached nodes and freed slots awaiting
    /// reuse.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Slots currently holding a node, attached or not.
    pub fn used(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// `true` when the tree holds nothing but the document node.
    pub fn is_empty(&self) -> bool {
        self.used() == 1
    }

    fn slot(&self, id: NodeId) -> &Slot {
        &self.slots[id.0]
    }

    fn slot_mut(&mut self, id: NodeId) -> &mut Slot {
        &mut self.slots[id.0]
    }

    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.slot(id).data
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.slot(id).data.kind()
    }

    /// Element or attribute name.
    pub fn name(&self, id: NodeId) -> Option<&str> {
        match &self.slot(id).data {
            NodeData::Element { name } | NodeData::Attribute { name, .. } => Some(name),
            _ => None,
        }
    }

    /// DOM-style node name: the tag or attribute name, `#document`, `#text`
    /// or `#comment`.
    pub fn node_name(&self, id: NodeId) -> &str {
        match &self.slot(id).data {
            NodeData::Element { name } | NodeData::Attribute { name, .. } => name,
            NodeData::Document => "#document",
            NodeData::Text(_) => "#text",
            NodeData::Comment(_) => "#comment",
        }
    }

    /// Parent link. For attributes this is the owner element.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slot(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.slot(id).children
    }

    pub fn attributes(&self, id: NodeId) -> &[NodeId] {
        &self.slot(id).attributes
    }

    pub fn attribute(&self, element: NodeId, name: &str) -> Option<NodeId> {
        self.slot(element)
            .attributes
            .iter()
            .copied()
            .find(|attr| self.name(*attr) == Some(name))
    }

    pub fn attribute_value(&self, element: NodeId, name: &str) -> Option<&str> {
        match &self.slot(self.attribute(element, name)?).data {
            NodeData::Attribute { value, .. } => Some(value),
            _ => None,
        }
    }

    /// The single element child of the document node, if any.
    pub fn root_element(&self) -> Option<NodeId> {
        self.children(NodeId::DOCUMENT)
            .iter()
            .copied()
            .find(|child| self.kind(*child) == NodeKind::Element)
    }

    /// Topmost ancestor of `id` (the document node for attached nodes).
    pub fn root_of(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current
    }

    pub fn is_ancestor_or_self(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// DOM `textContent`: concatenated descendant text for documents and
    /// elements, the value for attributes, text and comments.
    pub fn text_content(&self, id: NodeId) -> String {
        match &self.slot(id).data {
            NodeData::Attribute { value, .. } => value.clone(),
            NodeData::Text(text) | NodeData::Comment(text) => text.clone(),
            NodeData::Document | NodeData::Element { .. } => {
                let mut out = String::new();
                self.collect_text(id, &mut out);
                out
            }
        }
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        for child in self.children(id) {
            match &self.slot(*child).data {
                NodeData::Text(text) => out.push_str(text),
                NodeData::Element { .. } => self.collect_text(*child, out),
                _ => {}
            }
        }
    }

    /// Descendants of `id` (children first, depth-first) in document order,
    /// excluding `id` itself and attributes.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_descendants(id, &mut out);
        out
    }

    fn collect_descendants(&self, id: NodeId, out: &mut Vec<NodeId>) {
        for child in self.children(id) {
            out.push(*child);
            self.collect_descendants(*child, out);
        }
    }

    fn order_key(&self, id: NodeId) -> (NodeId, Vec<usize>) {
        let mut key = Vec::new();
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            let slot = self.slot(parent);
            let position = match slot.attributes.iter().position(|a| *a == current) {
                Some(attr_pos) => attr_pos,
                None => {
                    slot.attributes.len()
                        + slot
                            .children
                            .iter()
                            .position(|c| *c == current)
                            .unwrap_or_default()
                }
            };
            key.push(position);
            current = parent;
        }
        key.reverse();
        (current, key)
    }

    /// Compares two nodes by document order. Nodes of different detached
    /// subtrees are ordered by their subtree roots.
    pub fn document_order(&self, a: NodeId, b: NodeId) -> Ordering {
        if a == b {
            return Ordering::Equal;
        }
        self.order_key(a).cmp(&self.order_key(b))
    }

    /// Sorts `ids` into document order and removes duplicates.
    pub fn sort_document_order(&self, ids: &mut Vec<NodeId>) {
        let mut keyed: Vec<_> = ids.iter().map(|id| (self.order_key(*id), *id)).collect();
        keyed.sort_by(|a, b| a.0.cmp(&b.0));
        keyed.dedup_by(|a, b| a.1 == b.1);
        *ids = keyed.into_iter().map(|(_, id)| id).collect();
    }

    pub fn create(&mut self, data: NodeData) -> NodeId {
        if let Some(id) = self.free.pop() {
            self.slots[id.0] = Slot::new(data);
            return id;
        }
        let id = NodeId(self.slots.len());
        self.slots.push(Slot::new(data));
        id
    }

    pub fn create_element(&mut self, name: &str) -> Result<NodeId, DomError> {
        if !is_valid_name(name) {
            return Err(DomError::InvalidName(name.to_string()));
        }
        Ok(self.create(NodeData::Element {
            name: name.to_string(),
        }))
    }

    fn check_insert(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        let parent_kind = self.kind(parent);
        if !matches!(parent_kind, NodeKind::Document | NodeKind::Element) {
            return Err(DomError::HierarchyRequest(
                "only documents and elements have children",
            ));
        }
        match self.kind(child) {
            NodeKind::Document | NodeKind::Attribute => {
                return Err(DomError::HierarchyRequest(
                    "documents and attributes cannot be inserted as children",
                ))
            }
            NodeKind::Text if parent_kind == NodeKind::Document => {
                return Err(DomError::HierarchyRequest(
                    "text is not allowed at document level",
                ))
            }
            NodeKind::Element if parent_kind == NodeKind::Document => {
                if self.root_element().is_some_and(|root| root != child) {
                    return Err(DomError::HierarchyRequest(
                        "document already has a root element",
                    ));
                }
            }
            _ => {}
        }
        if self.is_ancestor_or_self(child, parent) {
            return Err(DomError::HierarchyRequest(
                "a node cannot be inserted below itself",
            ));
        }
        Ok(())
    }

    /// Inserts `child` below `parent` at `index` (appends when `None`),
    /// detaching it from its previous parent first.
    pub fn insert(
        &mut self,
        parent: NodeId,
        index: Option<usize>,
        child: NodeId,
    ) -> Result<(), DomError> {
        self.check_insert(parent, child)?;
        self.detach(child);
        let children = &mut self.slot_mut(parent).children;
        match index {
            Some(index) if index < children.len() => children.insert(index, child),
            _ => children.push(child),
        }
        self.slot_mut(child).parent = Some(parent);
        Ok(())
    }

    pub fn append(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.insert(parent, None, child)
    }

    /// Unlinks `id` from its parent (or owner element). No-op when detached.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.slot(id).parent else {
            return;
        };
        let slot = self.slot_mut(parent);
        slot.children.retain(|c| *c != id);
        slot.attributes.retain(|a| *a != id);
        self.slot_mut(id).parent = None;
    }

    pub fn set_attribute(
        &mut self,
        element: NodeId,
        name: &str,
        value: &str,
    ) -> Result<NodeId, DomError> {
        if self.kind(element) != NodeKind::Element {
            return Err(DomError::WrongKind {
                expected: "element",
                found: self.kind(element).as_str(),
            });
        }
        if let Some(attr) = self.attribute(element, name) {
            if let NodeData::Attribute { value: current, .. } = &mut self.slot_mut(attr).data {
                *current = value.to_string();
            }
            return Ok(attr);
        }
        if !is_valid_name(name) {
            return Err(DomError::InvalidName(name.to_string()));
        }
        let attr = self.create(NodeData::Attribute {
            name: name.to_string(),
            value: value.to_string(),
        });
        self.slot_mut(element).attributes.push(attr);
        self.slot_mut(attr).parent = Some(element);
        Ok(attr)
    }

    pub fn remove_attribute(&mut self, element: NodeId, name: &str) -> bool {
        match self.attribute(element, name) {
            Some(attr) => {
                self.detach(attr);
                true
            }
            None => false,
        }
    }

    /// Replaces the content of `id`. Elements lose all children and get a
    /// single text child (none for empty text); documents are left as is.
    pub fn set_text_content(&mut self, id: NodeId, text: &str) {
        if self.kind(id) == NodeKind::Element {
            let children = std::mem::take(&mut self.slot_mut(id).children);
            for child in children {
                self.slot_mut(child).parent = None;
            }
            if !text.is_empty() {
                let text_node = self.create(NodeData::Text(text.to_string()));
                self.slot_mut(id).children.push(text_node);
                self.slot_mut(text_node).parent = Some(id);
            }
            return;
        }
        match &mut self.slot_mut(id).data {
            NodeData::Attribute { value, .. } => *value = text.to_string(),
            NodeData::Text(data) | NodeData::Comment(data) => *data = text.to_string(),
            NodeData::Document | NodeData::Element { .. } => {}
        }
    }

    /// Owned copy of the subtree rooted at `id`.
    pub fn extract(&self, id: NodeId) -> Fragment {
        let slot = self.slot(id);
        Fragment {
            data: slot.data.clone(),
            attributes: slot.attributes.iter().map(|a| self.extract(*a)).collect(),
            children: slot.children.iter().map(|c| self.extract(*c)).collect(),
        }
    }

    /// Materializes `fragment` as a new detached subtree and returns its
    /// root.
    pub fn insert_fragment(&mut self, fragment: &Fragment) -> NodeId {
        let id = self.create(fragment.data.clone());
        for attr in &fragment.attributes {
            let attr_id = self.insert_fragment(attr);
            self.slot_mut(attr_id).parent = Some(id);
            self.slot_mut(id).attributes.push(attr_id);
        }
        for child in &fragment.children {
            let child_id = self.insert_fragment(child);
            self.slot_mut(child_id).parent = Some(id);
            self.slot_mut(id).children.push(child_id);
        }
        id
    }

    /// Deep copy of `id`, detached, inside this tree.
    pub fn deep_clone(&mut self, id: NodeId) -> NodeId {
        let fragment = self.extract(id);
        self.insert_fragment(&fragment)
    }

    /// Whether enough nodes were allocated since the last sweep to make
    /// another one worthwhile.
    pub fn needs_sweep(&self) -> bool {
        self.used() > 2 * self.live_after_sweep + SWEEP_SLACK
    }

    /// Frees every node that is neither reachable from the document node
    /// nor part of a detached subtree containing one of `pinned`. Returns
    /// the number of freed slots.
    ///
    /// Ids of freed nodes are handed out again by later allocations, so
    /// callers must pin every id they still intend to use.
    pub fn collect_garbage(&mut self, pinned: impl IntoIterator<Item = NodeId>) -> usize {
        let mut marked = vec![false; self.slots.len()];
        for id in &self.free {
            marked[id.0] = true;
        }
        let mut stack = vec![NodeId::DOCUMENT];
        stack.extend(
            pinned
                .into_iter()
                .filter(|id| id.0 < self.slots.len())
                .map(|id| self.root_of(id)),
        );
        while let Some(id) = stack.pop() {
            if marked[id.0] {
                continue;
            }
            marked[id.0] = true;
            let slot = self.slot(id);
            stack.extend(slot.attributes.iter().chain(&slot.children).copied());
        }
        let mut freed = 0;
        for (index, live) in marked.into_iter().enumerate() {
            if !live {
                self.slots[index] = Slot::new(NodeData::Text(String::new()));
                self.free.push(NodeId(index));
                freed += 1;
            }
        }
        self.live_after_sweep = self.used();
        freed
    }
}
