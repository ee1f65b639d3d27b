use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use parley_embed::PartialConfig;
use serde_json::{Map, Value};

/// Environment variable consulted for the widget host when neither the
/// configuration file nor `--base-url` names one
pub const BASE_URL_VARIABLE: &str = "PARLEY_BASE_URL";

/// Command line of `parley-snippet`
#[derive(Debug, Parser)]
#[command(name = "parley-snippet")]
#[command(bin_name = "parley-snippet")]
#[command(about = "Print the HTML embed code for a Parley chat widget", long_about = None)]
pub struct SnippetCli {
    /// Which embed code to print
    #[command(subcommand)]
    pub format: Format,
}

/// The kind of embed code to print
#[derive(Debug, Subcommand)]
pub enum Format {
    /// The loader script plus an inline `ParleyWidget.init` call
    Script(WidgetArgs),
    /// A static iframe, for pages that cannot run third-party script
    Iframe(WidgetArgs),
}

impl Format {
    /// The widget options shared by every format
    pub fn widget(&self) -> &WidgetArgs {
        match self {
            Format::Script(widget) | Format::Iframe(widget) => widget,
        }
    }
}

/// Widget options, from a file and/or individual flags
#[derive(Debug, Default, Args)]
pub struct WidgetArgs {
    /// JSON file with widget options (camelCase keys, as passed to `init`)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Which hosted widget to load
    #[arg(long)]
    pub widget_id: Option<String>,

    /// Color scheme
    #[arg(long, value_parser = ["light", "dark", "system"])]
    pub theme: Option<String>,

    /// Corner the launcher is anchored to
    #[arg(long, value_parser = ["bottom-right", "bottom-left", "top-right", "top-left"])]
    pub position: Option<String>,

    /// Open the widget as soon as it has loaded
    #[arg(long)]
    pub auto_open: bool,

    /// Hide the widget on viewports narrower than 768px
    #[arg(long)]
    pub hide_on_mobile: bool,

    /// Expanded width (pixels or any CSS length)
    #[arg(long)]
    pub width: Option<String>,

    /// Expanded height (pixels or any CSS length)
    #[arg(long)]
    pub height: Option<String>,

    /// Key forwarded to the widget host
    #[arg(long)]
    pub api_key: Option<String>,

    /// Embed technique used by the loader
    #[arg(long, value_parser = ["iframe", "web-component"])]
    pub embed_type: Option<String>,

    /// Extra CSS class for the mount container
    #[arg(long)]
    pub container_class: Option<String>,

    /// Widget host; defaults to $PARLEY_BASE_URL, then the public host
    #[arg(long)]
    pub base_url: Option<String>,

    /// Primary brand color
    #[arg(long)]
    pub primary_color: Option<String>,

    /// Secondary brand color
    #[arg(long)]
    pub secondary_color: Option<String>,

    /// Header title
    #[arg(long)]
    pub title: Option<String>,

    /// Header subtitle
    #[arg(long)]
    pub subtitle: Option<String>,

    /// Corner radius of the chat panel
    #[arg(long)]
    pub border_radius: Option<String>,

    /// Inner spacing of the chat panel
    #[arg(long)]
    pub spacing: Option<String>,

    /// Font stack used inside the widget
    #[arg(long)]
    pub font_family: Option<String>,
}

impl WidgetArgs {
    /// The options given as individual flags. Flags that were not passed
    /// are absent, so they never override the configuration file.
    pub fn overrides(&self) -> PartialConfig {
        let mut options = Map::new();

        let strings = [
            ("widgetId", &self.widget_id),
            ("theme", &self.theme),
            ("position", &self.position),
            ("width", &self.width),
            ("height", &self.height),
            ("apiKey", &self.api_key),
            ("embedType", &self.embed_type),
            ("containerClass", &self.container_class),
            ("baseUrl", &self.base_url),
            ("primaryColor", &self.primary_color),
            ("secondaryColor", &self.secondary_color),
            ("title", &self.title),
            ("subtitle", &self.subtitle),
            ("borderRadius", &self.border_radius),
            ("spacing", &self.spacing),
            ("fontFamily", &self.font_family),
        ];

        for (key, value) in strings {
            if let Some(value) = value {
                options.insert(key.to_string(), Value::String(value.clone()));
            }
        }

        for (key, flag) in [
            ("autoOpen", self.auto_open),
            ("hideOnMobile", self.hide_on_mobile),
        ] {
            if flag {
                options.insert(key.to_string(), Value::Bool(true));
            }
        }

        PartialConfig::from_value(Value::Object(options))
    }
}
