/// The fixed element id of the single mount container on a page
pub const CONTAINER_ID: &str = "parley-widget-container";

/// Tag name of the custom element used by the web-component embed
pub const WIDGET_ELEMENT: &str = "parley-chat-widget";

/// Element id given to the script that defines [`WIDGET_ELEMENT`]
pub const WIDGET_SCRIPT_ID: &str = "parley-widget-script";

/// Path (relative to the widget base URL) of the script that defines
/// [`WIDGET_ELEMENT`]
pub const WIDGET_SCRIPT_PATH: &str = "widget.js";

/// Path (relative to the widget base URL) of the loader script itself
pub const LOADER_SCRIPT_PATH: &str = "loader.js";

/// Widget host used when neither an explicit base URL nor the loader's own
/// script URL is available
pub const DEFAULT_BASE_URL: &str = "https://widget.parley.chat";

/// Widget id used when the caller omits one
pub const DEFAULT_WIDGET_ID: &str = "default";

/// Width and height, in CSS pixels, of the collapsed launcher
pub const COLLAPSED_SIZE: f64 = 60.0;

/// Distance between the collapsed launcher and the viewport edges
pub const EDGE_OFFSET: &str = "20px";

/// Border radius of the collapsed (circular) launcher
pub const PILL_RADIUS: &str = "50%";

/// Border radius of the expanded panel
pub const PANEL_RADIUS: &str = "12px";

/// Viewports narrower than this are treated as mobile for `hideOnMobile`
pub const MOBILE_BREAKPOINT: f64 = 768.0;

/// Name of the DOM event used to deliver commands to the custom element
pub const COMMAND_EVENT: &str = "parley:command";

/// Permissions the embedded widget page may request
pub const FRAME_PERMISSIONS: &str = "microphone; camera; clipboard-write";

/// Accessible name of the embedded widget
pub const FRAME_TITLE: &str = "Chat widget";

/// Stacking order that keeps the launcher above host page content
pub const TOP_LAYER: &str = "2147483647";

/// Name of the window event dispatched once `window.ParleyWidget` exists
pub const LOADER_READY_EVENT: &str = "parley:loaded";

/// Name of the page global exposing the host API
pub const GLOBAL_NAME: &str = "ParleyWidget";
