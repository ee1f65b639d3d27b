//! Browser binding for the embeddable Parley chat widget.
//!
//! Compiled to WebAssembly, this crate installs `window.ParleyWidget`, the
//! object host pages use to embed and drive the widget:
//!
//! ```ignore
//! // This is JavaScript code that uses the WASM bindings, not a Rust doctest
//! window.addEventListener("parley:loaded", () => {
//!   ParleyWidget
//!     .init({ widgetId: "support", position: "bottom-left", onLoad: () => console.log("ready") })
//!     .open();
//! });
//! ```
//!
//! All behavior lives in [`parley_embed`]; this crate only supplies
//! [`WebHost`], the `web-sys` implementation of [`parley_embed::Host`], and
//! the JavaScript-facing entry points. On targets other than
//! `wasm32-unknown-unknown` it compiles to an empty library.

#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
mod web;
#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
pub use web::*;

#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
mod binding;
#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
pub use binding::*;
