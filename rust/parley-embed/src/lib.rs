#![warn(missing_docs)]

//! Loader core for the embeddable Parley chat widget.
//!
//! `parley-embed` contains everything the widget loader does that is not
//! tied to a particular page runtime: resolving caller configuration,
//! deciding which cross-document messages to trust, materializing the
//! widget as an iframe or a custom element, and relaying commands to it.
//! All interaction with the page happens through the [`Host`] trait, so the
//! same state machine drives both the browser binding (`parley-loader`)
//! and the in-memory [`MemoryHost`] used by tests.
//!
//! # Lifecycle
//!
//! ```text
//! uninitialized ──init──▸ mounting ──ready msg──▸ ready(closed) ⇄ ready(open)
//!        ▲                    │                          │
//!        └──── init ──────────┴──────── destroy ─────────┴──▸ destroyed
//! ```
//!
//! Commands issued while `mounting` are queued and replayed in order once
//! the embedded widget reports `ready`. Nothing in this crate surfaces an
//! error to the host page: failures are logged through [`tracing`] and
//! absorbed.
//!
//! # Example
//!
//! ```rust
//! use parley_embed::{MemoryHost, PartialConfig, State, Widget};
//! use serde_json::json;
//!
//! let host = MemoryHost::default();
//! let widget = Widget::new(host.clone());
//!
//! widget
//!     .init(PartialConfig::from_value(json!({ "widgetId": "demo" })))
//!     .open();
//!
//! // `open` waits in the queue until the embedded frame says it is ready
//! assert_eq!(widget.state(), State::Mounting);
//!
//! widget.deliver("https://widget.parley.chat", json!({ "type": "ready" }));
//! assert_eq!(host.posted().len(), 1);
//! ```

mod constants;
pub use constants::*;

mod error;
pub use error::*;

pub mod config;
pub use config::{
    Dimension, EmbedType, Endpoint, PartialConfig, Position, Theme, WidgetConfig, WidgetStyle,
};

pub mod origin;
pub use origin::{OriginPolicy, Verdict};

pub mod protocol;
pub use protocol::{Inbound, Outbound};

pub mod queue;
pub use queue::{Command, CommandQueue};

pub mod host;
pub use host::{Host, MemoryHost, MemoryNode};

pub mod container;

pub mod strategy;
pub use strategy::{Strategy, Transport};

pub mod bridge;
pub use bridge::MessageBridge;

mod loader;
pub use loader::*;

mod widget;
pub use widget::*;

pub mod snippet;
