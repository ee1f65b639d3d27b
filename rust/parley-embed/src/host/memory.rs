use std::{
    cell::RefCell,
    collections::{BTreeMap, BTreeSet},
    rc::Rc,
};

use serde_json::Value;

use crate::{Host, ParleyEmbedError};

/// Handle to an element of a [`MemoryHost`] document
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MemoryNode(usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Parent {
    Body,
    Node(MemoryNode),
}

/// A snapshot of one element of a [`MemoryHost`] document
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemoryElement {
    /// Lowercase tag name
    pub tag: String,
    /// Attributes by name
    pub attributes: BTreeMap<String, String>,
    /// Inline style properties by name
    pub styles: BTreeMap<String, String>,
    /// Child elements in document order
    pub children: Vec<MemoryNode>,
    parent: Option<Parent>,
}

impl MemoryElement {
    /// The value of attribute `name`, if set
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// The value of inline style property `property`, if set
    pub fn style(&self, property: &str) -> Option<&str> {
        self.styles.get(property).map(String::as_str)
    }
}

/// How a [`PostedMessage`] was delivered
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Delivery {
    /// `contentWindow.postMessage` restricted to `target_origin`
    Frame {
        /// The origin the message was restricted to
        target_origin: String,
    },
    /// A command event dispatched on a custom element
    Element,
}

/// A message the loader sent to a transport
#[derive(Clone, Debug, PartialEq)]
pub struct PostedMessage {
    /// The transport element
    pub target: MemoryNode,
    /// The decoded message
    pub message: Value,
    /// How it was delivered
    pub delivery: Delivery,
}

#[derive(Debug)]
struct MemoryDocument {
    elements: Vec<MemoryElement>,
    body: Option<Vec<MemoryNode>>,
    listening: bool,
    posted: Vec<PostedMessage>,
    scripts: Vec<String>,
    pending_script: Option<u64>,
    defined: BTreeSet<String>,
    web_components: bool,
    viewport_width: Option<f64>,
    script_source: Option<String>,
    mutations: usize,
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self {
            elements: Vec::new(),
            body: Some(Vec::new()),
            listening: false,
            posted: Vec::new(),
            scripts: Vec::new(),
            pending_script: None,
            defined: BTreeSet::new(),
            web_components: true,
            viewport_width: Some(1280.0),
            script_source: None,
            mutations: 0,
        }
    }
}

impl MemoryDocument {
    fn element(&self, node: &MemoryNode) -> Result<&MemoryElement, ParleyEmbedError> {
        self.elements
            .get(node.0)
            .ok_or_else(|| ParleyEmbedError::Host(format!("unknown node {}", node.0)))
    }

    fn is_attached(&self, node: &MemoryNode) -> bool {
        let mut current = *node;

        loop {
            match self.elements.get(current.0).and_then(|element| element.parent) {
                Some(Parent::Body) => return true,
                Some(Parent::Node(parent)) => current = parent,
                None => return false,
            }
        }
    }

    fn detach(&mut self, node: &MemoryNode) {
        let Some(parent) = self.elements.get_mut(node.0).and_then(|e| e.parent.take()) else {
            return;
        };

        match parent {
            Parent::Body => {
                if let Some(body) = self.body.as_mut() {
                    body.retain(|child| child != node);
                }
            }
            Parent::Node(parent) => {
                if let Some(parent) = self.elements.get_mut(parent.0) {
                    parent.children.retain(|child| child != node);
                }
            }
        }

        self.mutations += 1;
    }

    fn post(
        &mut self,
        target: &MemoryNode,
        message: &str,
        delivery: Delivery,
    ) -> Result<(), ParleyEmbedError> {
        if !self.is_attached(target) {
            return Err(ParleyEmbedError::DetachedTransport(format!(
                "node {} is not in the document",
                target.0
            )));
        }

        self.posted.push(PostedMessage {
            target: *target,
            message: serde_json::from_str(message)?,
            delivery,
        });

        Ok(())
    }
}

/// A [`Host`] backed by an in-memory document. Clones share the same
/// document, so a test can keep one clone for inspection while the loader
/// drives another.
#[derive(Clone, Debug, Default)]
pub struct MemoryHost {
    document: Rc<RefCell<MemoryDocument>>,
}

impl MemoryHost {
    /// A page whose `document.body` has not been parsed yet
    pub fn without_body(self) -> Self {
        self.document.borrow_mut().body = None;
        self
    }

    /// A page whose runtime lacks custom elements or shadow DOM
    pub fn without_web_components(self) -> Self {
        self.document.borrow_mut().web_components = false;
        self
    }

    /// A page with the given viewport width
    pub fn with_viewport_width(self, width: f64) -> Self {
        self.document.borrow_mut().viewport_width = Some(width);
        self
    }

    /// A page that loaded the loader from `src`
    pub fn with_script_source(self, src: &str) -> Self {
        self.document.borrow_mut().script_source = Some(src.to_string());
        self
    }

    /// Simulate the body becoming available
    pub fn attach_body(&self) {
        let mut document = self.document.borrow_mut();
        if document.body.is_none() {
            document.body = Some(Vec::new());
        }
    }

    /// Simulate a script defining the custom element `tag`
    pub fn define_element(&self, tag: &str) {
        self.document.borrow_mut().defined.insert(tag.to_string());
    }

    /// A snapshot of an element
    pub fn element(&self, node: &MemoryNode) -> Option<MemoryElement> {
        self.document.borrow().elements.get(node.0).cloned()
    }

    /// The elements directly under `document.body`
    pub fn body_children(&self) -> Vec<MemoryNode> {
        self.document.borrow().body.clone().unwrap_or_default()
    }

    /// How many attached elements carry the id `id`
    pub fn count_by_id(&self, id: &str) -> usize {
        let document = self.document.borrow();
        (0..document.elements.len())
            .map(MemoryNode)
            .filter(|node| {
                document.elements[node.0].attribute("id") == Some(id) && document.is_attached(node)
            })
            .count()
    }

    /// Whether `node` is reachable from `document.body`
    pub fn is_attached(&self, node: &MemoryNode) -> bool {
        self.document.borrow().is_attached(node)
    }

    /// Every message posted to a transport so far
    pub fn posted(&self) -> Vec<PostedMessage> {
        self.document.borrow().posted.clone()
    }

    /// Just the decoded messages posted so far
    pub fn posted_messages(&self) -> Vec<Value> {
        self.posted().into_iter().map(|posted| posted.message).collect()
    }

    /// Whether the cross-document message listener is registered
    pub fn is_listening(&self) -> bool {
        self.document.borrow().listening
    }

    /// The `src` of every script inserted into the page
    pub fn injected_scripts(&self) -> Vec<String> {
        self.document.borrow().scripts.clone()
    }

    /// The generation the most recent [`Host::load_script`] call is waiting
    /// to report, if its load has not been simulated yet
    pub fn pending_script(&self) -> Option<u64> {
        self.document.borrow().pending_script
    }

    /// Simulate the pending script finishing: defines `tag` and returns the
    /// generation to pass to [`crate::Widget::script_loaded`]
    pub fn finish_script(&self, tag: &str) -> Option<u64> {
        let mut document = self.document.borrow_mut();
        document.defined.insert(tag.to_string());
        document.pending_script.take()
    }

    /// The number of attribute, style and tree mutations applied so far
    pub fn mutations(&self) -> usize {
        self.document.borrow().mutations
    }
}

impl Host for MemoryHost {
    type Node = MemoryNode;

    fn script_source(&self) -> Option<String> {
        self.document.borrow().script_source.clone()
    }

    fn has_body(&self) -> bool {
        self.document.borrow().body.is_some()
    }

    fn find_by_id(&self, id: &str) -> Option<Self::Node> {
        let document = self.document.borrow();
        (0..document.elements.len()).map(MemoryNode).find(|node| {
            document.elements[node.0].attribute("id") == Some(id) && document.is_attached(node)
        })
    }

    fn create_element(&mut self, tag: &str) -> Result<Self::Node, ParleyEmbedError> {
        let mut document = self.document.borrow_mut();
        document.elements.push(MemoryElement {
            tag: tag.to_ascii_lowercase(),
            ..Default::default()
        });
        Ok(MemoryNode(document.elements.len() - 1))
    }

    fn set_attribute(&mut self, node: &Self::Node, name: &str, value: &str) {
        let mut document = self.document.borrow_mut();
        if let Some(element) = document.elements.get_mut(node.0) {
            element.attributes.insert(name.to_string(), value.to_string());
            document.mutations += 1;
        }
    }

    fn set_style(&mut self, node: &Self::Node, property: &str, value: &str) {
        let mut document = self.document.borrow_mut();
        if let Some(element) = document.elements.get_mut(node.0) {
            element.styles.insert(property.to_string(), value.to_string());
            document.mutations += 1;
        }
    }

    fn append_child(
        &mut self,
        parent: &Self::Node,
        child: &Self::Node,
    ) -> Result<(), ParleyEmbedError> {
        let mut document = self.document.borrow_mut();
        document.element(parent)?;
        document.element(child)?;
        document.detach(child);
        document.elements[parent.0].children.push(*child);
        document.elements[child.0].parent = Some(Parent::Node(*parent));
        document.mutations += 1;
        Ok(())
    }

    fn append_to_body(&mut self, node: &Self::Node) -> Result<(), ParleyEmbedError> {
        let mut document = self.document.borrow_mut();
        document.element(node)?;
        if document.body.is_none() {
            return Err(ParleyEmbedError::MissingBody);
        }
        document.detach(node);
        if let Some(body) = document.body.as_mut() {
            body.push(*node);
        }
        document.elements[node.0].parent = Some(Parent::Body);
        document.mutations += 1;
        Ok(())
    }

    fn remove(&mut self, node: &Self::Node) {
        self.document.borrow_mut().detach(node);
    }

    fn listen(&mut self) {
        self.document.borrow_mut().listening = true;
    }

    fn unlisten(&mut self) {
        self.document.borrow_mut().listening = false;
    }

    fn post_to_frame(
        &mut self,
        frame: &Self::Node,
        message: &str,
        target_origin: &str,
    ) -> Result<(), ParleyEmbedError> {
        self.document.borrow_mut().post(
            frame,
            message,
            Delivery::Frame {
                target_origin: target_origin.to_string(),
            },
        )
    }

    fn post_to_element(
        &mut self,
        element: &Self::Node,
        message: &str,
    ) -> Result<(), ParleyEmbedError> {
        self.document
            .borrow_mut()
            .post(element, message, Delivery::Element)
    }

    fn supports_web_components(&self) -> bool {
        self.document.borrow().web_components
    }

    fn is_element_defined(&self, tag: &str) -> bool {
        self.document.borrow().defined.contains(tag)
    }

    fn load_script(
        &mut self,
        _id: &str,
        src: &str,
        generation: u64,
    ) -> Result<(), ParleyEmbedError> {
        let mut document = self.document.borrow_mut();
        if !document.scripts.iter().any(|script| script == src) {
            document.scripts.push(src.to_string());
        }
        document.pending_script = Some(generation);
        Ok(())
    }

    fn viewport_width(&self) -> Option<f64> {
        self.document.borrow().viewport_width
    }
}
