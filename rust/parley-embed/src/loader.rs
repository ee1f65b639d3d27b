use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::{
    Command, CommandQueue, Endpoint, Host, Inbound, MOBILE_BREAKPOINT, MessageBridge,
    OriginPolicy, PartialConfig, Strategy, Transport, WidgetConfig,
    container::{ensure_container, remove_container},
    strategy::{Embed, attach_component, embed},
};

/// Whether the embedded widget last reported itself expanded
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visibility {
    /// Expanded
    Open,
    /// Collapsed
    Closed,
}

/// Where the loader is in the embed lifecycle
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum State {
    /// `init` has not been called, or the last `init` could not mount
    #[default]
    Uninitialized,
    /// The transport is being materialized; commands are queued
    Mounting,
    /// The embedded widget reported ready; commands run immediately
    Ready(Visibility),
    /// The last instance was torn down by `destroy`
    Destroyed,
}

impl State {
    /// Whether commands currently run immediately
    pub fn is_ready(&self) -> bool {
        matches!(self, State::Ready(_))
    }
}

/// Callback fired the first time the embedded widget reports it is ready
pub type OnLoad = Box<dyn FnOnce()>;

struct Instance<N> {
    generation: u64,
    config: WidgetConfig,
    endpoint: Endpoint,
    container: N,
    bridge: MessageBridge<N>,
    awaiting_script: Option<N>,
    queue: CommandQueue,
    on_load: Option<OnLoad>,
    state: State,
}

impl<N> Instance<N>
where
    N: Clone + PartialEq + std::fmt::Debug,
{
    fn run<H>(&self, host: &mut H, command: Command)
    where
        H: Host<Node = N>,
    {
        let name = command.name();

        if let Err(error) = self.bridge.send(host, &command.into()) {
            warn!(command = name, "Could not deliver command to the widget: {error}");
        }
    }
}

/// Owns at most one embed instance and drives it through its lifecycle.
///
/// Every operation absorbs its own failures: the worst outcome of misuse or
/// of a hostile page is a logged warning and an unchanged state.
pub struct Loader<H: Host> {
    host: H,
    instance: Option<Instance<H::Node>>,
    idle: State,
    generation: u64,
}

impl<H: Host> Loader<H> {
    /// A loader for `host` with no embed instance
    pub fn new(host: H) -> Self {
        Self {
            host,
            instance: None,
            idle: State::Uninitialized,
            generation: 0,
        }
    }

    /// The current lifecycle state
    pub fn state(&self) -> State {
        self.instance
            .as_ref()
            .map(|instance| instance.state)
            .unwrap_or(self.idle)
    }

    /// The number of times `init` has been called
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The resolved configuration of the live instance
    pub fn config(&self) -> Option<&WidgetConfig> {
        self.instance.as_ref().map(|instance| &instance.config)
    }

    /// The widget host the live instance talks to
    pub fn endpoint(&self) -> Option<&Endpoint> {
        self.instance.as_ref().map(|instance| &instance.endpoint)
    }

    /// The live instance's mount container
    pub fn container(&self) -> Option<&H::Node> {
        self.instance.as_ref().map(|instance| &instance.container)
    }

    /// The live instance's transport, once attached
    pub fn transport(&self) -> Option<&Transport<H::Node>> {
        self.instance
            .as_ref()
            .and_then(|instance| instance.bridge.transport())
    }

    /// The number of commands waiting for the widget to become ready
    pub fn queued(&self) -> usize {
        self.instance
            .as_ref()
            .map(|instance| instance.queue.len())
            .unwrap_or_default()
    }

    /// The page this loader embeds into
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Mutable access to the page this loader embeds into
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Embed the widget described by `partial`, replacing any live instance
    pub fn init(&mut self, partial: PartialConfig, on_load: Option<OnLoad>) {
        self.destroy();
        self.generation += 1;

        let config = WidgetConfig::resolve(partial);
        let script_source = self.host.script_source();
        let endpoint = Endpoint::resolve(config.base_url.as_deref(), script_source.as_deref());
        let policy = OriginPolicy::new(endpoint.origin(), &config.allowed_origins);

        debug!(
            widget_id = %config.widget_id,
            generation = self.generation,
            origin = policy.trusted_origin(),
            "Initializing widget"
        );

        let Some(container) = ensure_container(&mut self.host, config.container_class.as_deref())
        else {
            self.idle = State::Uninitialized;
            return;
        };

        if config.hide_on_mobile
            && self
                .host
                .viewport_width()
                .is_some_and(|width| width < MOBILE_BREAKPOINT)
        {
            debug!("Narrow viewport; hiding the widget");
            self.host.set_style(&container, "display", "none");
        }

        // The listener goes in before the transport so no early message is missed
        self.host.listen();

        let strategy = Strategy::select(&self.host, config.embed_type);
        let mut bridge = MessageBridge::new(policy);
        let mut awaiting_script = None;

        match embed(
            &mut self.host,
            &container,
            strategy,
            &config,
            &endpoint,
            self.generation,
        ) {
            Ok(Embed::Attached(transport)) => bridge.attach(transport),
            Ok(Embed::AwaitingScript(element)) => awaiting_script = Some(element),
            Err(error) => warn!("Could not embed the widget: {error}"),
        }

        self.instance = Some(Instance {
            generation: self.generation,
            config,
            endpoint,
            container,
            bridge,
            awaiting_script,
            queue: CommandQueue::default(),
            on_load,
            state: State::Mounting,
        });
    }

    /// Ask the widget to expand
    pub fn open(&mut self) {
        self.enqueue_or_run(Command::Open);
    }

    /// Ask the widget to collapse
    pub fn close(&mut self) {
        self.enqueue_or_run(Command::Close);
    }

    /// Ask the widget to flip between expanded and collapsed
    pub fn toggle(&mut self) {
        self.enqueue_or_run(Command::Toggle);
    }

    /// Send a chat message on the visitor's behalf
    pub fn send_message(&mut self, text: impl Into<String>) {
        self.enqueue_or_run(Command::SendMessage(text.into()));
    }

    /// Run `command` now if the widget is ready, queue it if it is still
    /// mounting, and drop it if there is no instance at all
    pub fn enqueue_or_run(&mut self, command: Command) {
        let Some(instance) = self.instance.as_mut() else {
            debug!(
                command = command.name(),
                "Widget is not initialized; ignoring"
            );
            return;
        };

        if instance.state.is_ready() {
            instance.run(&mut self.host, command);
        } else {
            trace!(command = command.name(), "Queueing until the widget is ready");
            instance.queue.push(command);
        }
    }

    /// Handle a cross-document message that claims to come from `origin`
    pub fn receive(&mut self, origin: &str, data: &Value) {
        let Some(instance) = self.instance.as_mut() else {
            trace!(origin, "No widget instance; ignoring message");
            return;
        };

        let Some(message) = instance.bridge.receive(&mut self.host, origin, data) else {
            return;
        };

        trace!(kind = message.kind(), "Widget message");

        match message {
            Inbound::Resize { .. } => (),
            Inbound::Loaded | Inbound::Ready => self.become_ready(),
            Inbound::Open => self.observe(Visibility::Open),
            Inbound::Close => self.observe(Visibility::Closed),
        }
    }

    /// The script defining the custom element finished loading. Events from
    /// an earlier `init` are ignored.
    pub fn script_loaded(&mut self, generation: u64) {
        let Some(instance) = self.instance.as_mut() else {
            debug!(generation, "Widget script loaded after destroy; ignoring");
            return;
        };

        if instance.generation != generation {
            debug!(
                generation,
                current = instance.generation,
                "Ignoring a stale widget script load"
            );
            return;
        }

        let Some(element) = instance.awaiting_script.take() else {
            return;
        };

        match attach_component(&mut self.host, &instance.container, element) {
            Ok(transport) => instance.bridge.attach(transport),
            Err(error) => warn!("Could not attach the widget element: {error}"),
        }
    }

    /// Tear down the live instance: stop listening, remove the container
    /// and drop queued commands without running them
    pub fn destroy(&mut self) {
        let Some(mut instance) = self.instance.take() else {
            return;
        };

        self.host.unlisten();
        remove_container(&mut self.host, &instance.container);

        let dropped = instance.queue.clear();
        if dropped > 0 {
            debug!(dropped, "Dropped queued widget commands");
        }

        self.idle = State::Destroyed;
        debug!(generation = instance.generation, "Destroyed widget");
    }

    fn become_ready(&mut self) {
        let Some(instance) = self.instance.as_mut() else {
            return;
        };

        if instance.bridge.transport().is_none() {
            debug!("Widget reported ready before its transport was attached");
            return;
        }

        if let Some(on_load) = instance.on_load.take() {
            on_load();
        }

        if instance.state == State::Mounting {
            instance.state = State::Ready(Visibility::Closed);
            debug!("Widget is ready");
        }

        for command in instance.queue.drain() {
            instance.run(&mut self.host, command);
        }
    }

    fn observe(&mut self, visibility: Visibility) {
        if let Some(instance) = self.instance.as_mut()
            && instance.state.is_ready()
        {
            instance.state = State::Ready(visibility);
        }
    }
}

impl<H: Host + std::fmt::Debug> std::fmt::Debug for Loader<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Loader")
            .field("host", &self.host)
            .field("state", &self.state())
            .field("generation", &self.generation)
            .field("queued", &self.queued())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CONTAINER_ID, MemoryHost, WIDGET_ELEMENT, host::Delivery};
    use serde_json::json;
    use std::{cell::Cell, rc::Rc};
    use testresult::TestResult;

    const TRUSTED: &str = "https://widget.parley.chat";

    fn loader() -> (MemoryHost, Loader<MemoryHost>) {
        let host = MemoryHost::default();
        (host.clone(), Loader::new(host))
    }

    #[test]
    fn it_mounts_and_listens_on_init() {
        let (host, mut loader) = loader();

        loader.init(PartialConfig::default(), None);

        assert_eq!(loader.state(), State::Mounting);
        assert_eq!(loader.generation(), 1);
        assert!(host.is_listening());
        assert_eq!(host.count_by_id(CONTAINER_ID), 1);
        assert!(matches!(loader.transport(), Some(Transport::Frame(_))));
    }

    #[test]
    fn it_stays_uninitialized_without_a_body() {
        let host = MemoryHost::default().without_body();
        let mut loader = Loader::new(host.clone());

        loader.init(PartialConfig::default(), None);
        loader.open();

        assert_eq!(loader.state(), State::Uninitialized);
        assert!(!host.is_listening());
        assert!(host.posted().is_empty());
    }

    #[test]
    fn it_fires_on_load_before_replaying_the_queue() -> TestResult {
        let (host, mut loader) = loader();
        let fired = Rc::new(Cell::new(0));
        let seen = fired.clone();
        let observer = host.clone();

        loader.init(
            PartialConfig::default(),
            Some(Box::new(move || {
                assert!(observer.posted().is_empty());
                seen.set(seen.get() + 1);
            })),
        );
        loader.open();
        assert_eq!(loader.queued(), 1);

        loader.receive(TRUSTED, &json!({ "type": "loaded" }));
        loader.receive(TRUSTED, &json!({ "type": "ready" }));

        assert_eq!(fired.get(), 1);
        assert_eq!(loader.queued(), 0);
        assert_eq!(host.posted_messages(), vec![json!({ "type": "open" })]);
        Ok(())
    }

    #[test]
    fn it_tracks_reported_visibility_once_ready() {
        let (_, mut loader) = loader();
        loader.init(PartialConfig::default(), None);

        loader.receive(TRUSTED, &json!({ "type": "open" }));
        assert_eq!(loader.state(), State::Mounting);

        loader.receive(TRUSTED, &json!({ "type": "ready" }));
        loader.receive(TRUSTED, &json!({ "type": "open" }));
        assert_eq!(loader.state(), State::Ready(Visibility::Open));

        loader.receive(TRUSTED, &json!({ "type": "close" }));
        assert_eq!(loader.state(), State::Ready(Visibility::Closed));
    }

    #[test]
    fn it_hides_the_container_on_narrow_viewports() -> TestResult {
        let host = MemoryHost::default().with_viewport_width(375.0);
        let mut loader = Loader::new(host.clone());

        loader.init(
            PartialConfig::from_value(json!({ "hideOnMobile": true })),
            None,
        );

        let container = loader.container().ok_or("no container")?;
        let element = host.element(container).ok_or("missing container")?;
        assert_eq!(element.style("display"), Some("none"));
        assert_eq!(loader.state(), State::Mounting);
        Ok(())
    }

    #[test]
    fn it_trusts_the_origin_of_the_loader_script() {
        let host =
            MemoryHost::default().with_script_source("https://chat.example.com:8443/js/loader.js");
        let mut loader = Loader::new(host);
        loader.init(PartialConfig::default(), None);

        loader.receive(TRUSTED, &json!({ "type": "ready" }));
        assert_eq!(loader.state(), State::Mounting);

        loader.receive("https://chat.example.com:8443", &json!({ "type": "ready" }));
        assert!(loader.state().is_ready());
    }

    #[test]
    fn it_does_not_trust_the_page_script_that_calls_init() -> TestResult {
        let host = MemoryHost::default().with_script_source("https://customer.example/js/app.js");
        let mut loader = Loader::new(host.clone());
        loader.init(PartialConfig::from_value(json!({ "widgetId": "demo" })), None);

        assert_eq!(
            loader.endpoint().map(Endpoint::origin).as_deref(),
            Some(TRUSTED)
        );

        loader.receive("https://customer.example", &json!({ "type": "ready" }));
        assert_eq!(loader.state(), State::Mounting);

        loader.receive(TRUSTED, &json!({ "type": "ready" }));
        assert!(loader.state().is_ready());

        loader.open();
        let posted = host.posted();
        let last = posted.last().ok_or("nothing posted")?;
        assert_eq!(
            last.delivery,
            Delivery::Frame {
                target_origin: TRUSTED.to_string()
            }
        );
        Ok(())
    }

    #[test]
    fn it_ignores_script_loads_from_an_earlier_init() -> TestResult {
        let (host, mut loader) = loader();
        let web_component = json!({ "embedType": "web-component" });

        loader.init(PartialConfig::from_value(web_component.clone()), None);
        loader.init(PartialConfig::from_value(web_component), None);
        assert_eq!(host.injected_scripts().len(), 1);

        loader.script_loaded(1);
        assert!(loader.transport().is_none());

        let generation = host.finish_script(WIDGET_ELEMENT).ok_or("nothing pending")?;
        assert_eq!(generation, 2);
        loader.script_loaded(generation);
        assert!(matches!(loader.transport(), Some(Transport::Component(_))));
        Ok(())
    }

    #[test]
    fn it_releases_everything_on_destroy() {
        let (host, mut loader) = loader();
        loader.init(PartialConfig::default(), None);
        loader.toggle();

        loader.destroy();

        assert_eq!(loader.state(), State::Destroyed);
        assert_eq!(loader.queued(), 0);
        assert!(!host.is_listening());
        assert_eq!(host.count_by_id(CONTAINER_ID), 0);
    }
}
