//! [`Host`] over the live browser document.

use std::{
    cell::Cell,
    rc::{Rc, Weak},
};

use js_sys::{JSON, Reflect};
use parley_embed::{
    COMMAND_EVENT, Host, LOADER_SCRIPT_PATH, ParleyEmbedError, WIDGET_SCRIPT_ID, Widget,
    config::is_loader_source,
};
use serde_json::Value;
use tracing::{trace, warn};
use wasm_bindgen::{JsCast, prelude::*};
use web_sys::{
    CustomEvent, CustomEventInit, Document, Element, Event, HtmlElement, HtmlIFrameElement,
    HtmlScriptElement, MessageEvent, Window,
};

fn host_error(error: JsValue) -> ParleyEmbedError {
    ParleyEmbedError::Host(format!("{error:?}"))
}

/// Convert message data posted by the widget into JSON. Widgets may post
/// either structured objects or JSON-encoded strings.
pub fn decode_message(data: &JsValue) -> Value {
    if let Some(text) = data.as_string() {
        return serde_json::from_str(&text).unwrap_or(Value::String(text));
    }

    JSON::stringify(data)
        .ok()
        .and_then(|json| json.as_string())
        .and_then(|json| serde_json::from_str(&json).ok())
        .unwrap_or(Value::Null)
}

/// The URL of the loader script on `document`.
///
/// `document.currentScript` is only trusted when it is the loader itself:
/// while a page script calls `init`, it names that page script instead.
pub fn loader_source(document: &Document) -> Option<String> {
    let current = document
        .current_script()
        .and_then(|script| script.dyn_into::<HtmlScriptElement>().ok())
        .map(|script| script.src())
        .filter(|src| is_loader_source(src));

    if current.is_some() {
        return current;
    }

    let scripts = document
        .query_selector_all(&format!(r#"script[src*="{LOADER_SCRIPT_PATH}"]"#))
        .ok()?;

    (0..scripts.length())
        .filter_map(|index| scripts.item(index))
        .filter_map(|node| node.dyn_into::<HtmlScriptElement>().ok())
        .map(|script| script.src())
        .find(|src| is_loader_source(src))
}

/// A [`Host`] backed by `web-sys`.
///
/// Page events are forwarded to the owning [`Widget`] through a weak
/// reference, so the host never keeps its widget alive. The loader's own
/// script URL is captured when the host is created.
pub struct WebHost {
    window: Window,
    document: Document,
    loader_source: Option<String>,
    on_message: Closure<dyn FnMut(MessageEvent)>,
    on_script_load: Closure<dyn FnMut(Event)>,
    script_generation: Rc<Cell<u64>>,
    listening: bool,
}

impl WebHost {
    /// A host for `document` that reports events to `inbox`
    pub fn new(window: Window, document: Document, inbox: Weak<Widget<WebHost>>) -> Self {
        let on_message = {
            let inbox = inbox.clone();
            Closure::<dyn FnMut(MessageEvent)>::new(move |event: MessageEvent| {
                if let Some(widget) = inbox.upgrade() {
                    widget.deliver(event.origin(), decode_message(&event.data()));
                }
            })
        };

        let script_generation = Rc::new(Cell::new(0));
        let on_script_load = {
            let generation = script_generation.clone();
            Closure::<dyn FnMut(Event)>::new(move |_: Event| {
                if let Some(widget) = inbox.upgrade() {
                    widget.script_loaded(generation.get());
                }
            })
        };

        let loader_source = loader_source(&document);
        trace!(source = ?loader_source, "Located the loader script");

        Self {
            window,
            document,
            loader_source,
            on_message,
            on_script_load,
            script_generation,
            listening: false,
        }
    }

    /// The browser window this host embeds into
    pub fn window(&self) -> &Window {
        &self.window
    }

    /// Whether the `message` listener is registered on the window
    pub fn is_listening(&self) -> bool {
        self.listening
    }

    fn has_property(target: &JsValue, path: &[&str]) -> bool {
        let mut current = target.clone();

        for key in path {
            match Reflect::get(&current, &JsValue::from_str(key)) {
                Ok(value) if !value.is_undefined() && !value.is_null() => current = value,
                _ => return false,
            }
        }

        true
    }
}

impl Host for WebHost {
    type Node = Element;

    fn script_source(&self) -> Option<String> {
        self.loader_source
            .clone()
            .or_else(|| loader_source(&self.document))
    }

    fn has_body(&self) -> bool {
        self.document.body().is_some()
    }

    fn find_by_id(&self, id: &str) -> Option<Element> {
        self.document.get_element_by_id(id)
    }

    fn create_element(&mut self, tag: &str) -> Result<Element, ParleyEmbedError> {
        self.document.create_element(tag).map_err(host_error)
    }

    fn set_attribute(&mut self, node: &Element, name: &str, value: &str) {
        if let Err(error) = node.set_attribute(name, value) {
            warn!(name, "Could not set attribute: {error:?}");
        }
    }

    fn set_style(&mut self, node: &Element, property: &str, value: &str) {
        let Some(element) = node.dyn_ref::<HtmlElement>() else {
            return;
        };

        if let Err(error) = element.style().set_property(property, value) {
            warn!(property, "Could not set style: {error:?}");
        }
    }

    fn append_child(
        &mut self,
        parent: &Element,
        child: &Element,
    ) -> Result<(), ParleyEmbedError> {
        parent.append_child(child).map(drop).map_err(host_error)
    }

    fn append_to_body(&mut self, node: &Element) -> Result<(), ParleyEmbedError> {
        self.document
            .body()
            .ok_or(ParleyEmbedError::MissingBody)?
            .append_child(node)
            .map(drop)
            .map_err(host_error)
    }

    fn remove(&mut self, node: &Element) {
        node.remove();
    }

    fn listen(&mut self) {
        if self.listening {
            return;
        }

        match self
            .window
            .add_event_listener_with_callback("message", self.on_message.as_ref().unchecked_ref())
        {
            Ok(()) => self.listening = true,
            Err(error) => warn!("Could not listen for widget messages: {error:?}"),
        }
    }

    fn unlisten(&mut self) {
        if !self.listening {
            return;
        }

        if let Err(error) = self.window.remove_event_listener_with_callback(
            "message",
            self.on_message.as_ref().unchecked_ref(),
        ) {
            warn!("Could not stop listening for widget messages: {error:?}");
        }
        self.listening = false;
    }

    fn post_to_frame(
        &mut self,
        frame: &Element,
        message: &str,
        target_origin: &str,
    ) -> Result<(), ParleyEmbedError> {
        let target = frame
            .dyn_ref::<HtmlIFrameElement>()
            .and_then(|frame| frame.content_window())
            .ok_or_else(|| {
                ParleyEmbedError::DetachedTransport("iframe has no content window".into())
            })?;

        let message = JSON::parse(message).map_err(host_error)?;
        target
            .post_message(&message, target_origin)
            .map_err(host_error)
    }

    fn post_to_element(
        &mut self,
        element: &Element,
        message: &str,
    ) -> Result<(), ParleyEmbedError> {
        if !element.is_connected() {
            return Err(ParleyEmbedError::DetachedTransport(
                "widget element is not in the document".into(),
            ));
        }

        let init = CustomEventInit::new();
        init.set_detail(&JSON::parse(message).map_err(host_error)?);

        let event =
            CustomEvent::new_with_event_init_dict(COMMAND_EVENT, &init).map_err(host_error)?;
        element.dispatch_event(&event).map(drop).map_err(host_error)
    }

    fn supports_web_components(&self) -> bool {
        let window: &JsValue = self.window.as_ref();

        Self::has_property(window, &["customElements"])
            && Self::has_property(window, &["Element", "prototype", "attachShadow"])
            && Self::has_property(window, &["Node", "prototype", "getRootNode"])
    }

    fn is_element_defined(&self, tag: &str) -> bool {
        !self.window.custom_elements().get(tag).is_undefined()
    }

    fn load_script(
        &mut self,
        id: &str,
        src: &str,
        generation: u64,
    ) -> Result<(), ParleyEmbedError> {
        self.script_generation.set(generation);

        if self.document.get_element_by_id(id).is_some() {
            trace!(src, "Widget script already on the page");
            return Ok(());
        }

        let script = self
            .document
            .create_element("script")
            .map_err(host_error)?
            .dyn_into::<HtmlScriptElement>()
            .map_err(|element| host_error(element.into()))?;

        script.set_id(id);
        script.set_src(src);
        script.set_async(true);
        script
            .add_event_listener_with_callback("load", self.on_script_load.as_ref().unchecked_ref())
            .map_err(host_error)?;

        let parent: Element = match self.document.head() {
            Some(head) => head.into(),
            None => self
                .document
                .body()
                .ok_or(ParleyEmbedError::MissingBody)?
                .into(),
        };

        parent.append_child(&script).map(drop).map_err(host_error)
    }

    fn viewport_width(&self) -> Option<f64> {
        self.window
            .inner_width()
            .ok()
            .and_then(|width| width.as_f64())
    }
}

impl Drop for WebHost {
    fn drop(&mut self) {
        self.unlisten();

        if let Some(script) = self.document.get_element_by_id(WIDGET_SCRIPT_ID) {
            let _ = script.remove_event_listener_with_callback(
                "load",
                self.on_script_load.as_ref().unchecked_ref(),
            );
        }
    }
}
