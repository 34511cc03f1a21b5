//! Replays core document mutations onto real DOM elements.

use std::collections::HashMap;

use datepick_core::dom::Document as CoreDocument;
use datepick_core::{Mutation, NodeId};
use tracing::{debug, trace};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Element, HtmlInputElement};

/// Attribute tying a real element back to its core node.
pub const NODE_ATTR: &str = "data-dp-node";

pub struct Mirror {
    document: Document,
    elements: HashMap<NodeId, Element>,
    by_index: HashMap<usize, NodeId>,
}

impl Mirror {
    pub fn new(document: Document, body: Element, core_body: NodeId) -> Result<Self, JsValue> {
        let mut mirror = Self {
            document,
            elements: HashMap::new(),
            by_index: HashMap::new(),
        };
        mirror.bind(core_body, body)?;
        Ok(mirror)
    }

    fn bind(&mut self, node: NodeId, element: Element) -> Result<(), JsValue> {
        element.set_attribute(NODE_ATTR, &node.index().to_string())?;
        self.by_index.insert(node.index(), node);
        self.elements.insert(node, element);
        Ok(())
    }

    pub fn element(&self, node: NodeId) -> Option<&Element> {
        self.elements.get(&node)
    }

    /// Core node for an element already present in the page. Its ancestors
    /// up to the body are adopted too so calendars land next to the host.
    pub fn adopt(&mut self, core: &mut CoreDocument, element: &Element) -> Result<NodeId, JsValue> {
        if let Some(node) = self.node_of(element) {
            return Ok(node);
        }
        let parent = match element.parent_element() {
            Some(parent) => self.adopt(core, &parent)?,
            None => core.body(),
        };
        let tag = element.tag_name().to_ascii_lowercase();
        let node = core.create_element(&tag);
        if let Some(id) = element.get_attribute("id") {
            core.set_attr(node, "id", &id);
        }
        core.append_child(parent, node);
        self.bind(node, element.clone())?;
        debug!(?node, %tag, "adopted page element");
        Ok(node)
    }

    /// Core node of `element` or its nearest mirrored ancestor.
    pub fn node_of(&self, element: &Element) -> Option<NodeId> {
        let owner = element
            .closest(&format!("[{NODE_ATTR}]"))
            .ok()
            .flatten()?;
        let index: usize = owner.get_attribute(NODE_ATTR)?.parse().ok()?;
        self.by_index.get(&index).copied()
    }

    fn get(&self, node: NodeId) -> Result<&Element, JsValue> {
        self.elements
            .get(&node)
            .ok_or_else(|| JsValue::from_str(&format!("no element mirrors {node:?}")))
    }

    pub fn apply(&mut self, mutations: Vec<Mutation>) -> Result<(), JsValue> {
        for mutation in mutations {
            trace!(?mutation, "mirroring");
            match mutation {
                Mutation::Created { node, tag } => {
                    let element = self.document.create_element(&tag)?;
                    self.bind(node, element)?;
                }
                Mutation::Appended { parent, child } => {
                    let child = self.get(child)?.clone();
                    self.get(parent)?.append_child(&child)?;
                }
                Mutation::Detached { node } => self.get(node)?.remove(),
                Mutation::ClassAdded { node, class } => self.get(node)?.class_list().add_1(&class)?,
                Mutation::ClassRemoved { node, class } => {
                    self.get(node)?.class_list().remove_1(&class)?;
                }
                Mutation::TextSet { node, text } => self.get(node)?.set_text_content(Some(&text)),
                Mutation::ValueSet { node, value } => {
                    if let Some(input) = self.get(node)?.dyn_ref::<HtmlInputElement>() {
                        input.set_value(&value);
                    }
                }
                Mutation::AttrSet { node, name, value } => {
                    self.get(node)?.set_attribute(&name, &value)?;
                }
                Mutation::AttrRemoved { node, name } => self.get(node)?.remove_attribute(&name)?,
                Mutation::Destroyed { nodes } => {
                    for node in nodes {
                        self.elements.remove(&node);
                        self.by_index.remove(&node.index());
                    }
                }
            }
        }
        Ok(())
    }
}
