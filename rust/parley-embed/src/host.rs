//! The page the widget is embedded into, as seen by the loader.
//!
//! [`Host`] is the only way the loader touches the page. The browser binding
//! implements it over `web-sys`; [`MemoryHost`] implements it over a small
//! in-memory document so the whole lifecycle can be exercised in native
//! tests.
//!
//! Host operations are infallible where the DOM operation they stand for
//! cannot meaningfully fail, and return [`ParleyEmbedError`] otherwise.
//! Events flowing the other way (cross-document messages, script `load`
//! events) are not delivered through this trait: the host forwards them to
//! [`crate::Widget::deliver`] and [`crate::Widget::script_loaded`].

use crate::ParleyEmbedError;

mod memory;
pub use memory::*;

/// A facade over the document the widget is embedded into
pub trait Host {
    /// A handle to an element of the document
    type Node: Clone + PartialEq + std::fmt::Debug;

    /// The URL of the script that loaded the widget loader, if it can be
    /// located
    fn script_source(&self) -> Option<String>;

    /// Whether `document.body` exists yet
    fn has_body(&self) -> bool;

    /// Look up an attached element by its id
    fn find_by_id(&self, id: &str) -> Option<Self::Node>;

    /// Create a detached element
    fn create_element(&mut self, tag: &str) -> Result<Self::Node, ParleyEmbedError>;

    /// Set an attribute on an element
    fn set_attribute(&mut self, node: &Self::Node, name: &str, value: &str);

    /// Set an inline style property on an element
    fn set_style(&mut self, node: &Self::Node, property: &str, value: &str);

    /// Append `child` as the last child of `parent`
    fn append_child(&mut self, parent: &Self::Node, child: &Self::Node)
    -> Result<(), ParleyEmbedError>;

    /// Append `node` as the last child of `document.body`
    fn append_to_body(&mut self, node: &Self::Node) -> Result<(), ParleyEmbedError>;

    /// Detach an element (and its subtree) from the document
    fn remove(&mut self, node: &Self::Node);

    /// Start forwarding cross-document messages to the loader. Calling this
    /// while already listening has no effect.
    fn listen(&mut self);

    /// Stop forwarding cross-document messages
    fn unlisten(&mut self);

    /// Post `message` (a JSON object) to the content window of the iframe
    /// `frame`, restricted to `target_origin`
    fn post_to_frame(
        &mut self,
        frame: &Self::Node,
        message: &str,
        target_origin: &str,
    ) -> Result<(), ParleyEmbedError>;

    /// Deliver `message` (a JSON object) to the custom element `element` as
    /// a [`crate::COMMAND_EVENT`] event
    fn post_to_element(&mut self, element: &Self::Node, message: &str)
    -> Result<(), ParleyEmbedError>;

    /// Whether custom elements and shadow DOM are available
    fn supports_web_components(&self) -> bool;

    /// Whether a custom element named `tag` has already been defined
    fn is_element_defined(&self, tag: &str) -> bool;

    /// Make sure the script `src` (with element id `id`) is on the page and
    /// arrange for [`crate::Widget::script_loaded`] to be called with
    /// `generation` once it has loaded. The script is inserted at most once
    /// per page.
    fn load_script(&mut self, id: &str, src: &str, generation: u64)
    -> Result<(), ParleyEmbedError>;

    /// The viewport width in CSS pixels, if known
    fn viewport_width(&self) -> Option<f64>;
}
