use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
};

use serde_json::Value;
use tracing::trace;

use crate::{Command, Host, Loader, OnLoad, PartialConfig, State};

/// One unit of work for a [`Widget`]: a host call, a cross-document
/// message or a script load event
pub enum Envelope {
    /// `init(config)`, with the optional `onLoad` callback
    Init(PartialConfig, Option<OnLoad>),
    /// `open`, `close`, `toggle` or `sendMessage`
    Command(Command),
    /// `destroy()`
    Destroy,
    /// A cross-document message
    Message {
        /// The origin the platform reported for the sender
        origin: String,
        /// The message data
        data: Value,
    },
    /// The custom element script loaded for the given `init` generation
    ScriptLoaded(u64),
}

impl std::fmt::Debug for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Envelope::Init(config, on_load) => f
                .debug_tuple("Init")
                .field(config)
                .field(&on_load.is_some())
                .finish(),
            Envelope::Command(command) => f.debug_tuple("Command").field(command).finish(),
            Envelope::Destroy => f.write_str("Destroy"),
            Envelope::Message { origin, data } => f
                .debug_struct("Message")
                .field("origin", origin)
                .field("data", data)
                .finish(),
            Envelope::ScriptLoaded(generation) => {
                f.debug_tuple("ScriptLoaded").field(generation).finish()
            }
        }
    }
}

/// The host-facing widget API.
///
/// A `Widget` is a mailbox in front of a [`Loader`]: every call is turned
/// into an [`Envelope`] and processed strictly in arrival order, one at a
/// time. A call made while another envelope is being processed (for
/// example `open()` from inside an `onLoad` callback) is appended to the
/// mailbox and runs once the current envelope completes, so the loader is
/// never re-entered.
///
/// Every method returns `&Self` so calls chain the way the page-level API
/// does: `widget.init(config).open()`.
pub struct Widget<H: Host> {
    loader: RefCell<Loader<H>>,
    mailbox: RefCell<VecDeque<Envelope>>,
    state: Cell<State>,
}

impl<H: Host> Widget<H> {
    /// A widget embedding into `host`
    pub fn new(host: H) -> Self {
        Self {
            loader: RefCell::new(Loader::new(host)),
            mailbox: RefCell::new(VecDeque::new()),
            state: Cell::new(State::Uninitialized),
        }
    }

    /// Embed the widget, replacing any live instance
    pub fn init(&self, config: PartialConfig) -> &Self {
        self.post(Envelope::Init(config, None))
    }

    /// Like [`Self::init`], calling `on_load` once the widget first reports
    /// ready
    pub fn init_with(&self, config: PartialConfig, on_load: impl FnOnce() + 'static) -> &Self {
        self.post(Envelope::Init(config, Some(Box::new(on_load))))
    }

    /// Expand the widget
    pub fn open(&self) -> &Self {
        self.post(Envelope::Command(Command::Open))
    }

    /// Collapse the widget
    pub fn close(&self) -> &Self {
        self.post(Envelope::Command(Command::Close))
    }

    /// Flip the widget between expanded and collapsed
    pub fn toggle(&self) -> &Self {
        self.post(Envelope::Command(Command::Toggle))
    }

    /// Send a chat message on the visitor's behalf
    pub fn send_message(&self, text: impl Into<String>) -> &Self {
        self.post(Envelope::Command(Command::SendMessage(text.into())))
    }

    /// Tear the widget down
    pub fn destroy(&self) -> &Self {
        self.post(Envelope::Destroy)
    }

    /// Hand a cross-document message to the widget
    pub fn deliver(&self, origin: impl Into<String>, data: Value) -> &Self {
        self.post(Envelope::Message {
            origin: origin.into(),
            data,
        })
    }

    /// Report that the custom element script requested by the `init` with
    /// the given generation has loaded
    pub fn script_loaded(&self, generation: u64) -> &Self {
        self.post(Envelope::ScriptLoaded(generation))
    }

    /// The lifecycle state as of the last processed envelope
    pub fn state(&self) -> State {
        self.state.get()
    }

    /// Inspect the loader. Returns `None` while an envelope is being
    /// processed.
    pub fn inspect<T>(&self, inspect: impl FnOnce(&Loader<H>) -> T) -> Option<T> {
        self.loader.try_borrow().ok().map(|loader| inspect(&loader))
    }

    /// Enqueue an envelope and process the mailbox
    pub fn post(&self, envelope: Envelope) -> &Self {
        self.mailbox.borrow_mut().push_back(envelope);
        self.pump();
        self
    }

    fn pump(&self) {
        let Ok(mut loader) = self.loader.try_borrow_mut() else {
            trace!("Widget busy; deferring call");
            return;
        };

        loop {
            let Some(envelope) = self.mailbox.borrow_mut().pop_front() else {
                break;
            };

            dispatch(&mut loader, envelope);
            self.state.set(loader.state());
        }
    }
}

fn dispatch<H: Host>(loader: &mut Loader<H>, envelope: Envelope) {
    match envelope {
        Envelope::Init(config, on_load) => loader.init(config, on_load),
        Envelope::Command(command) => loader.enqueue_or_run(command),
        Envelope::Destroy => loader.destroy(),
        Envelope::Message { origin, data } => loader.receive(&origin, &data),
        Envelope::ScriptLoaded(generation) => loader.script_loaded(generation),
    }
}
