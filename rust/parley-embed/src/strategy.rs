//! The two ways of putting the widget on the page.
//!
//! The iframe variant points a cross-origin `<iframe>` at the hosted embed
//! page. The web-component variant inserts the widget host's custom
//! element, injecting its defining script first when the page has not
//! defined it yet; the element is only attached once that script has
//! loaded. Either way the result is a [`Transport`] handed to the
//! [`crate::MessageBridge`], which does not care which variant produced it.

use tracing::{debug, warn};

use crate::{
    COLLAPSED_SIZE, Dimension, EDGE_OFFSET, EmbedType, Endpoint, FRAME_PERMISSIONS, FRAME_TITLE,
    Host, PILL_RADIUS, ParleyEmbedError, Position, TOP_LAYER, WIDGET_ELEMENT, WIDGET_SCRIPT_ID,
    WidgetConfig,
};

/// The embed technique chosen for one `init`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    /// Embed through an `<iframe>`
    Iframe,
    /// Embed through the widget's custom element
    WebComponent,
}

impl Strategy {
    /// Honor the requested embed type when the page can support it;
    /// otherwise fall back to [`Strategy::Iframe`]
    pub fn select<H: Host>(host: &H, requested: EmbedType) -> Self {
        match requested {
            EmbedType::Iframe => Strategy::Iframe,
            EmbedType::WebComponent if host.supports_web_components() => Strategy::WebComponent,
            EmbedType::WebComponent => {
                warn!("Custom elements are unavailable; embedding the widget in an iframe");
                Strategy::Iframe
            }
        }
    }
}

/// The element hosting the embedded widget
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transport<N> {
    /// An `<iframe>`; commands are posted to its content window
    Frame(N),
    /// The custom element; commands are dispatched to it as events
    Component(N),
}

impl<N> Transport<N> {
    /// The underlying element
    pub fn node(&self) -> &N {
        match self {
            Transport::Frame(node) | Transport::Component(node) => node,
        }
    }

    /// The strategy that produced this transport
    pub fn strategy(&self) -> Strategy {
        match self {
            Transport::Frame(_) => Strategy::Iframe,
            Transport::Component(_) => Strategy::WebComponent,
        }
    }
}

/// What [`embed`] produced
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Embed<N> {
    /// The transport is in the container
    Attached(Transport<N>),
    /// The custom element is built but waits for its defining script; pass
    /// it to [`attach_component`] once the script has loaded
    AwaitingScript(N),
}

/// Inline styles of the collapsed launcher anchored at `position`
pub fn collapsed_styles(position: Position) -> Vec<(&'static str, String)> {
    let (vertical, horizontal) = position.edges();
    let size = Dimension::Pixels(COLLAPSED_SIZE).to_css();

    vec![
        ("position", "fixed".to_string()),
        (vertical, EDGE_OFFSET.to_string()),
        (horizontal, EDGE_OFFSET.to_string()),
        ("width", size.clone()),
        ("height", size),
        ("border", "none".to_string()),
        ("border-radius", PILL_RADIUS.to_string()),
        ("z-index", TOP_LAYER.to_string()),
    ]
}

/// Materialize the widget inside `container`
pub fn embed<H: Host>(
    host: &mut H,
    container: &H::Node,
    strategy: Strategy,
    config: &WidgetConfig,
    endpoint: &Endpoint,
    generation: u64,
) -> Result<Embed<H::Node>, ParleyEmbedError> {
    match strategy {
        Strategy::Iframe => frame(host, container, config, endpoint).map(Embed::Attached),
        Strategy::WebComponent => component(host, container, config, endpoint, generation),
    }
}

/// Attach a custom element built by [`embed`] after its script loaded
pub fn attach_component<H: Host>(
    host: &mut H,
    container: &H::Node,
    element: H::Node,
) -> Result<Transport<H::Node>, ParleyEmbedError> {
    host.append_child(container, &element)?;
    debug!("Attached widget element");
    Ok(Transport::Component(element))
}

fn frame<H: Host>(
    host: &mut H,
    container: &H::Node,
    config: &WidgetConfig,
    endpoint: &Endpoint,
) -> Result<Transport<H::Node>, ParleyEmbedError> {
    let src = endpoint.frame_url(config)?;
    let frame = host.create_element("iframe")?;

    for (property, value) in collapsed_styles(config.position) {
        host.set_style(&frame, property, &value);
    }

    for (name, value) in [
        ("src", src.as_str()),
        ("loading", "lazy"),
        ("title", FRAME_TITLE),
        ("aria-label", FRAME_TITLE),
        ("role", "region"),
        ("aria-live", "polite"),
        ("allow", FRAME_PERMISSIONS),
    ] {
        host.set_attribute(&frame, name, value);
    }

    host.append_child(container, &frame)?;
    debug!(src = %src, "Attached widget iframe");

    Ok(Transport::Frame(frame))
}

fn component<H: Host>(
    host: &mut H,
    container: &H::Node,
    config: &WidgetConfig,
    endpoint: &Endpoint,
    generation: u64,
) -> Result<Embed<H::Node>, ParleyEmbedError> {
    let element = host.create_element(WIDGET_ELEMENT)?;

    for (property, value) in collapsed_styles(config.position) {
        host.set_style(&element, property, &value);
    }

    for (name, value) in config.attributes() {
        host.set_attribute(&element, &name, &value);
    }
    host.set_attribute(&element, "base-url", endpoint.base().as_str());
    host.set_attribute(&element, "aria-label", FRAME_TITLE);
    host.set_attribute(&element, "role", "region");

    if host.is_element_defined(WIDGET_ELEMENT) {
        return attach_component(host, container, element).map(Embed::Attached);
    }

    let src = endpoint.script_url()?;
    host.load_script(WIDGET_SCRIPT_ID, src.as_str(), generation)?;
    debug!(src = %src, "Waiting for the widget element script");

    Ok(Embed::AwaitingScript(element))
}
