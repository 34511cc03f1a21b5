//! Retained in-memory document.
//!
//! Host elements and every node a picker builds live here. Writes only record
//! a [`Mutation`] when they change something, which is what lets backends
//! mirror the tree incrementally and what makes repeated renders free.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

pub mod class {
    pub const CALENDAR: &str = "dp-calendar";
    pub const HIDDEN: &str = "dp-hidden";
    pub const NO_TRANSITION: &str = "dp-no-transition";
    pub const OVERLAY_OPEN: &str = "dp-overlay-open";
    pub const OVERLAY_HIDDEN: &str = "dp-overlay-hidden";
    pub const DAY: &str = "dp-day";
    pub const EMPTY: &str = "dp-empty";
    pub const OUTSIDE_MONTH: &str = "dp-outside-month";
    pub const DISABLED: &str = "dp-disabled";
    pub const SELECTED: &str = "dp-selected";
    pub const RANGE_START: &str = "dp-range-start";
    pub const RANGE_END: &str = "dp-range-end";
    pub const RANGE_MIDDLE: &str = "dp-range-middle";
    pub const TODAY: &str = "dp-today";
    pub const WEEKEND: &str = "dp-weekend";
    pub const EVENT: &str = "dp-event";
}

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

pub fn is_void_tag(tag: &str) -> bool {
    VOID_TAGS.contains(&tag)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NodeKind {
    Element,
    ShadowRoot,
}

#[derive(Debug, Clone)]
struct Node {
    tag: String,
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    classes: BTreeSet<String>,
    attrs: BTreeMap<String, String>,
    text: String,
    value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Mutation {
    Created { node: NodeId, tag: String },
    Appended { parent: NodeId, child: NodeId },
    Detached { node: NodeId },
    ClassAdded { node: NodeId, class: String },
    ClassRemoved { node: NodeId, class: String },
    TextSet { node: NodeId, text: String },
    ValueSet { node: NodeId, value: String },
    AttrSet { node: NodeId, name: String, value: String },
    AttrRemoved { node: NodeId, name: String },
    Destroyed { nodes: Vec<NodeId> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Id(String),
    Class(String),
    Tag(String),
}

impl Selector {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if let Some(id) = raw.strip_prefix('#') {
            (!id.is_empty()).then(|| Selector::Id(id.to_string()))
        } else if let Some(class) = raw.strip_prefix('.') {
            (!class.is_empty()).then(|| Selector::Class(class.to_string()))
        } else if raw.is_empty() {
            None
        } else {
            Some(Selector::Tag(raw.to_ascii_lowercase()))
        }
    }
}

/// Retained element tree. Slots of destroyed nodes are reused, so a
/// `NodeId` is only meaningful while its node is alive.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Option<Node>>,
    free: Vec<u32>,
    body: NodeId,
    revision: u64,
    log: Option<Vec<Mutation>>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            free: Vec::new(),
            body: NodeId(0),
            revision: 0,
            log: None,
        };
        doc.body = doc.push_node("body", NodeKind::Element);
        doc.revision = 0;
        doc
    }

    /// A document that keeps every change until `take_mutations` drains it.
    /// Backends mirroring the tree onto a real page build on this.
    pub fn with_mutation_log() -> Self {
        Self {
            log: Some(Vec::new()),
            ..Self::new()
        }
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index()).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index()).and_then(Option::as_mut)
    }

    fn record(&mut self, mutation: Mutation) {
        self.revision += 1;
        if let Some(log) = &mut self.log {
            log.push(mutation);
        }
    }

    fn push_node(&mut self, tag: &str, kind: NodeKind) -> NodeId {
        let node = Node {
            tag: tag.to_ascii_lowercase(),
            kind,
            parent: None,
            children: Vec::new(),
            classes: BTreeSet::new(),
            attrs: BTreeMap::new(),
            text: String::new(),
            value: String::new(),
        };
        let id = match self.free.pop() {
            Some(slot) => {
                self.nodes[slot as usize] = Some(node);
                NodeId(slot)
            }
            None => {
                self.nodes.push(Some(node));
                NodeId(self.nodes.len() as u32 - 1)
            }
        };
        self.record(Mutation::Created {
            node: id,
            tag: tag.to_ascii_lowercase(),
        });
        id
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push_node(tag, NodeKind::Element)
    }

    /// Creates a shadow root attached under `host`.
    pub fn attach_shadow(&mut self, host: NodeId) -> NodeId {
        let root = self.push_node("#shadow-root", NodeKind::ShadowRoot);
        self.append_child(host, root);
        root
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if !self.exists(parent) || !self.exists(child) {
            return;
        }
        self.unlink(child);
        if let Some(p) = self.node_mut(parent) {
            p.children.push(child);
        }
        if let Some(c) = self.node_mut(child) {
            c.parent = Some(parent);
        }
        self.record(Mutation::Appended { parent, child });
    }

    /// Removes `node` (and with it its subtree) from its parent.
    pub fn detach(&mut self, node: NodeId) {
        if self.unlink(node) {
            self.record(Mutation::Detached { node });
        }
    }

    /// Detaches `node` and frees it along with everything below it.
    pub fn destroy(&mut self, node: NodeId) {
        if node == self.body || !self.exists(node) {
            return;
        }
        self.detach(node);

        let mut freed = Vec::new();
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            if let Some(gone) = self.nodes.get_mut(id.index()).and_then(Option::take) {
                stack.extend(gone.children);
                self.free.push(id.0);
                freed.push(id);
            }
        }
        self.record(Mutation::Destroyed { nodes: freed });
    }

    fn unlink(&mut self, node: NodeId) -> bool {
        let Some(parent) = self.node(node).and_then(|n| n.parent) else {
            return false;
        };
        if let Some(p) = self.node_mut(parent) {
            p.children.retain(|c| *c != node);
        }
        if let Some(n) = self.node_mut(node) {
            n.parent = None;
        }
        true
    }

    pub fn tag(&self, node: NodeId) -> Option<&str> {
        self.node(node).map(|n| n.tag.as_str())
    }

    pub fn kind(&self, node: NodeId) -> Option<NodeKind> {
        self.node(node).map(|n| n.kind)
    }

    pub fn exists(&self, node: NodeId) -> bool {
        self.node(node).is_some()
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).and_then(|n| n.parent)
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.node(node)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    /// True when `node` is `ancestor` or lies somewhere below it.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    pub fn is_connected(&self, node: NodeId) -> bool {
        self.contains(self.body, node)
    }

    /// Adds or removes `class`; returns whether anything changed.
    pub fn set_class(&mut self, node: NodeId, class: &str, on: bool) -> bool {
        let Some(n) = self.node_mut(node) else {
            return false;
        };
        let changed = if on {
            n.classes.insert(class.to_string())
        } else {
            n.classes.remove(class)
        };
        if changed {
            let class = class.to_string();
            self.record(if on {
                Mutation::ClassAdded { node, class }
            } else {
                Mutation::ClassRemoved { node, class }
            });
        }
        changed
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.node(node).is_some_and(|n| n.classes.contains(class))
    }

    pub fn classes(&self, node: NodeId) -> BTreeSet<String> {
        self.node(node)
            .map(|n| n.classes.clone())
            .unwrap_or_default()
    }

    pub fn set_text(&mut self, node: NodeId, text: &str) -> bool {
        let Some(n) = self.node_mut(node) else {
            return false;
        };
        if n.text == text {
            return false;
        }
        n.text = text.to_string();
        self.record(Mutation::TextSet {
            node,
            text: text.to_string(),
        });
        true
    }

    pub fn text(&self, node: NodeId) -> &str {
        self.node(node).map(|n| n.text.as_str()).unwrap_or("")
    }

    pub fn set_value(&mut self, node: NodeId, value: &str) -> bool {
        let Some(n) = self.node_mut(node) else {
            return false;
        };
        if n.value == value {
            return false;
        }
        n.value = value.to_string();
        self.record(Mutation::ValueSet {
            node,
            value: value.to_string(),
        });
        true
    }

    pub fn value(&self, node: NodeId) -> &str {
        self.node(node).map(|n| n.value.as_str()).unwrap_or("")
    }

    pub fn set_attr(&mut self, node: NodeId, name: &str, value: &str) -> bool {
        let Some(n) = self.node_mut(node) else {
            return false;
        };
        if n.attrs.get(name).map(String::as_str) == Some(value) {
            return false;
        }
        n.attrs.insert(name.to_string(), value.to_string());
        self.record(Mutation::AttrSet {
            node,
            name: name.to_string(),
            value: value.to_string(),
        });
        true
    }

    pub fn remove_attr(&mut self, node: NodeId, name: &str) -> bool {
        let Some(n) = self.node_mut(node) else {
            return false;
        };
        if n.attrs.remove(name).is_none() {
            return false;
        }
        self.record(Mutation::AttrRemoved {
            node,
            name: name.to_string(),
        });
        true
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        self.node(node)
            .and_then(|n| n.attrs.get(name))
            .map(String::as_str)
    }

    /// First connected node, in document order, matching `selector`.
    pub fn query(&self, selector: &Selector) -> Option<NodeId> {
        let mut stack = vec![self.body];
        while let Some(node) = stack.pop() {
            if self.matches(node, selector) {
                return Some(node);
            }
            stack.extend(self.children(node).iter().rev().copied());
        }
        None
    }

    fn matches(&self, node: NodeId, selector: &Selector) -> bool {
        let Some(n) = self.node(node) else {
            return false;
        };
        if n.kind != NodeKind::Element {
            return false;
        }
        match selector {
            Selector::Id(id) => n.attrs.get("id") == Some(id),
            Selector::Class(class) => n.classes.contains(class),
            Selector::Tag(tag) => &n.tag == tag,
        }
    }

    /// Bumped by every write that changed the tree.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Drains the change log. Always empty unless the document was built
    /// with [`Document::with_mutation_log`].
    pub fn take_mutations(&mut self) -> Vec<Mutation> {
        self.log.as_mut().map(std::mem::take).unwrap_or_default()
    }

    pub fn pending_mutations(&self) -> usize {
        self.log.as_ref().map_or(0, Vec::len)
    }

    /// Live nodes, body included.
    pub fn node_count(&self) -> usize {
        self.nodes.len() - self.free.len()
    }
}
