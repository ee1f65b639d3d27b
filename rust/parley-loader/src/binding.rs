//! The JavaScript entry points: `window.ParleyWidget` and the exported
//! `ParleyWidget` class.

use std::{cell::OnceCell, rc::Rc};

use js_sys::{Function, JSON, Reflect};
use parley_embed::{GLOBAL_NAME, LOADER_READY_EVENT, PartialConfig, Widget};
use tracing::{debug, warn};
use wasm_bindgen::{JsCast, prelude::*};
use web_sys::Event;

use crate::WebHost;

#[wasm_bindgen(typescript_custom_section)]
const WIDGET_OPTIONS: &'static str = r#"
/**
 * Options accepted by `ParleyWidget.init`. Every option is optional; values
 * that cannot be understood fall back to their defaults.
 */
interface WidgetOptions {
  widgetId?: string;
  theme?: "light" | "dark" | "system";
  position?: "bottom-right" | "bottom-left" | "top-right" | "top-left";
  autoOpen?: boolean;
  hideOnMobile?: boolean;
  width?: string | number;
  height?: string | number;
  apiKey?: string;
  embedType?: "iframe" | "web-component";
  containerClass?: string;
  baseUrl?: string;
  allowedOrigins?: string[];
  primaryColor?: string;
  secondaryColor?: string;
  title?: string;
  subtitle?: string;
  borderRadius?: string | number;
  spacing?: string | number;
  fontFamily?: string;
  onLoad?: () => void;
}
"#;

thread_local! {
    static WIDGET: OnceCell<Rc<Widget<WebHost>>> = const { OnceCell::new() };
    static HANDLE: OnceCell<JsValue> = const { OnceCell::new() };
}

/// The one JavaScript object installed as `window.ParleyWidget`. Chained
/// calls return it instead of allocating a fresh wrapper each time.
pub fn page_handle() -> JsValue {
    HANDLE.with(|cell| cell.get_or_init(|| JsValue::from(ParleyWidget)).clone())
}

/// The page-wide widget, created on first use
pub fn page_widget() -> Option<Rc<Widget<WebHost>>> {
    WIDGET.with(|cell| {
        if let Some(widget) = cell.get() {
            return Some(widget.clone());
        }

        let window = web_sys::window()?;
        let document = window.document()?;
        let widget =
            Rc::new_cyclic(|inbox| Widget::new(WebHost::new(window, document, inbox.clone())));

        Some(cell.get_or_init(|| widget).clone())
    })
}

/// Read `init` options from a JavaScript object. `onLoad` is returned
/// separately; every other option goes through JSON.
pub fn read_options(options: &JsValue) -> (PartialConfig, Option<Function>) {
    if options.is_undefined() || options.is_null() {
        return (PartialConfig::default(), None);
    }

    let on_load = Reflect::get(options, &JsValue::from_str("onLoad"))
        .ok()
        .and_then(|callback| callback.dyn_into::<Function>().ok());

    let config = match JSON::stringify(options).ok().and_then(|json| json.as_string()) {
        Some(json) => PartialConfig::from_json(&json),
        None => {
            warn!("Widget options could not be serialized; using defaults");
            PartialConfig::default()
        }
    };

    (config, on_load)
}

/// The host API. Every method returns [`page_handle`] so calls can be
/// chained.
#[wasm_bindgen]
#[derive(Clone, Copy, Debug, Default)]
pub struct ParleyWidget;

#[wasm_bindgen]
impl ParleyWidget {
    /// A handle to the page-wide widget
    #[wasm_bindgen(constructor)]
    pub fn new() -> ParleyWidget {
        ParleyWidget
    }

    /// Embed the widget, replacing any previous embed on the page
    #[wasm_bindgen(unchecked_return_type = "ParleyWidget")]
    pub fn init(
        &self,
        #[wasm_bindgen(unchecked_param_type = "WidgetOptions")] options: JsValue,
    ) -> JsValue {
        let (config, on_load) = read_options(&options);

        if let Some(widget) = page_widget() {
            match on_load {
                Some(callback) => widget.init_with(config, move || {
                    if let Err(error) = callback.call0(&JsValue::UNDEFINED) {
                        warn!("onLoad callback threw: {error:?}");
                    }
                }),
                None => widget.init(config),
            };
        }

        page_handle()
    }

    /// Expand the widget
    #[wasm_bindgen(unchecked_return_type = "ParleyWidget")]
    pub fn open(&self) -> JsValue {
        self.with(|widget| widget.open())
    }

    /// Collapse the widget
    #[wasm_bindgen(unchecked_return_type = "ParleyWidget")]
    pub fn close(&self) -> JsValue {
        self.with(|widget| widget.close())
    }

    /// Flip the widget between expanded and collapsed
    #[wasm_bindgen(unchecked_return_type = "ParleyWidget")]
    pub fn toggle(&self) -> JsValue {
        self.with(|widget| widget.toggle())
    }

    /// Send a chat message on the visitor's behalf
    #[wasm_bindgen(js_name = "sendMessage", unchecked_return_type = "ParleyWidget")]
    pub fn send_message(&self, text: String) -> JsValue {
        self.with(|widget| widget.send_message(text))
    }

    /// Remove the widget from the page
    #[wasm_bindgen(unchecked_return_type = "ParleyWidget")]
    pub fn destroy(&self) -> JsValue {
        self.with(|widget| widget.destroy())
    }
}

impl ParleyWidget {
    fn with(&self, call: impl FnOnce(&Widget<WebHost>) -> &Widget<WebHost>) -> JsValue {
        if let Some(widget) = page_widget() {
            call(&widget);
        }
        page_handle()
    }
}

/// Install `window.ParleyWidget` and announce it with a `parley:loaded`
/// event
#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    let _ = tracing_wasm::try_set_as_global_default();

    let Some(window) = web_sys::window() else {
        return;
    };

    // Creating the widget now pins the loader's script URL before any page
    // script gets to call `init`
    if page_widget().is_none() {
        warn!("No document to embed into");
        return;
    }

    if let Err(error) = Reflect::set(&window, &JsValue::from_str(GLOBAL_NAME), &page_handle()) {
        warn!("Could not install window.{GLOBAL_NAME}: {error:?}");
        return;
    }

    match Event::new(LOADER_READY_EVENT) {
        Ok(event) => {
            let _ = window.dispatch_event(&event);
            debug!("Installed window.{GLOBAL_NAME}");
        }
        Err(error) => warn!("Could not announce the widget loader: {error:?}"),
    }
}
