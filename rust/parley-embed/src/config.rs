//! Widget configuration: caller-supplied options, their defaults, and the
//! two boundary serializations (iframe query string and custom element
//! attributes).
//!
//! Callers hand the loader a [`PartialConfig`], typically parsed from a
//! JavaScript object. [`WidgetConfig::resolve`] merges it over the documented
//! defaults. Resolution never fails: a value of the wrong shape (an unknown
//! theme, a number where a string was expected) is logged and replaced by
//! the field's default so that a typo on a host page cannot stop the widget
//! from loading.

use std::{fmt::Display, iter};

use convert_case::{Case, Casing};
use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::{
    DEFAULT_BASE_URL, DEFAULT_WIDGET_ID, LOADER_SCRIPT_PATH, ParleyEmbedError, WIDGET_SCRIPT_PATH,
};

/// Color scheme requested from the embedded widget
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Theme {
    /// Light color scheme
    Light,
    /// Dark color scheme
    Dark,
    /// Follow the visitor's system preference
    #[default]
    System,
}

impl Theme {
    /// The wire name of this theme
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::System => "system",
        }
    }
}

impl Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The viewport corner the widget is anchored to
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Position {
    /// Anchored to the bottom and right edges
    #[default]
    BottomRight,
    /// Anchored to the bottom and left edges
    BottomLeft,
    /// Anchored to the top and right edges
    TopRight,
    /// Anchored to the top and left edges
    TopLeft,
}

impl Position {
    /// The wire name of this position
    pub fn as_str(&self) -> &'static str {
        match self {
            Position::BottomRight => "bottom-right",
            Position::BottomLeft => "bottom-left",
            Position::TopRight => "top-right",
            Position::TopLeft => "top-left",
        }
    }

    /// The two CSS offset properties (vertical, horizontal) that pin the
    /// widget to this corner
    pub fn edges(&self) -> (&'static str, &'static str) {
        match self {
            Position::BottomRight => ("bottom", "right"),
            Position::BottomLeft => ("bottom", "left"),
            Position::TopRight => ("top", "right"),
            Position::TopLeft => ("top", "left"),
        }
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The technique used to put the widget on the page
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmbedType {
    /// A cross-origin `<iframe>`
    #[default]
    Iframe,
    /// A custom element defined by a script served from the widget host
    WebComponent,
}

impl EmbedType {
    /// The wire name of this embed type
    pub fn as_str(&self) -> &'static str {
        match self {
            EmbedType::Iframe => "iframe",
            EmbedType::WebComponent => "web-component",
        }
    }
}

impl Display for EmbedType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A length given either as a bare number of pixels or as a CSS string
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Dimension {
    /// A number of CSS pixels
    Pixels(f64),
    /// Any CSS length (`"380px"`, `"50vh"`), or a number written as a string
    Css(String),
}

impl Dimension {
    /// The length in pixels, if it is expressed in pixels at all
    ///
    /// `60`, `"60"` and `"60px"` all yield `Some(60.0)`; `"50vh"` yields
    /// `None`.
    pub fn as_pixels(&self) -> Option<f64> {
        match self {
            Dimension::Pixels(value) => Some(*value).filter(|value| value.is_finite()),
            Dimension::Css(value) => parse_number(value.trim().strip_suffix("px").unwrap_or(value)),
        }
    }

    /// The value to assign to a CSS length property
    pub fn to_css(&self) -> String {
        match self {
            Dimension::Pixels(value) => format!("{}px", format_number(*value)),
            Dimension::Css(value) => match parse_number(value) {
                Some(number) => format!("{}px", format_number(number)),
                None => value.trim().to_string(),
            },
        }
    }
}

impl Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dimension::Pixels(value) => f.write_str(&format_number(*value)),
            Dimension::Css(value) => f.write_str(value),
        }
    }
}

impl From<f64> for Dimension {
    fn from(value: f64) -> Self {
        Dimension::Pixels(value)
    }
}

impl From<&str> for Dimension {
    fn from(value: &str) -> Self {
        Dimension::Css(value.to_string())
    }
}

fn parse_number(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// Caller-supplied widget options. Every field is optional; absent fields
/// take their defaults during [`WidgetConfig::resolve`].
///
/// Deserialization is lenient field by field: a value that cannot be
/// interpreted is logged and treated as absent.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[allow(missing_docs)]
pub struct PartialConfig {
    #[serde(deserialize_with = "lenient")]
    pub widget_id: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub theme: Option<Theme>,
    #[serde(deserialize_with = "lenient")]
    pub position: Option<Position>,
    #[serde(deserialize_with = "lenient_flag")]
    pub auto_open: Option<bool>,
    #[serde(deserialize_with = "lenient_flag")]
    pub hide_on_mobile: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    pub width: Option<Dimension>,
    #[serde(deserialize_with = "lenient")]
    pub height: Option<Dimension>,
    #[serde(deserialize_with = "lenient")]
    pub api_key: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub embed_type: Option<EmbedType>,
    #[serde(deserialize_with = "lenient")]
    pub container_class: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub base_url: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub allowed_origins: Option<Vec<String>>,
    #[serde(deserialize_with = "lenient")]
    pub primary_color: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub secondary_color: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub title: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub subtitle: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub border_radius: Option<Dimension>,
    #[serde(deserialize_with = "lenient")]
    pub spacing: Option<Dimension>,
    #[serde(deserialize_with = "lenient")]
    pub font_family: Option<String>,
}

impl PartialConfig {
    /// Interpret a JSON value as widget options. Anything other than an
    /// object yields the empty configuration.
    pub fn from_value(value: Value) -> Self {
        if value.is_null() {
            return Self::default();
        }

        serde_json::from_value(value).unwrap_or_else(|error| {
            warn!("Widget options must be an object; using defaults ({error})");
            Self::default()
        })
    }

    /// Parse widget options from a JSON document
    pub fn from_json(json: &str) -> Self {
        match serde_json::from_str::<Value>(json) {
            Ok(value) => Self::from_value(value),
            Err(error) => {
                warn!("Widget options are not valid JSON; using defaults ({error})");
                Self::default()
            }
        }
    }

    /// Shallow merge: every option present in `overrides` replaces the one
    /// in `self`
    pub fn merge(self, overrides: PartialConfig) -> PartialConfig {
        PartialConfig {
            widget_id: overrides.widget_id.or(self.widget_id),
            theme: overrides.theme.or(self.theme),
            position: overrides.position.or(self.position),
            auto_open: overrides.auto_open.or(self.auto_open),
            hide_on_mobile: overrides.hide_on_mobile.or(self.hide_on_mobile),
            width: overrides.width.or(self.width),
            height: overrides.height.or(self.height),
            api_key: overrides.api_key.or(self.api_key),
            embed_type: overrides.embed_type.or(self.embed_type),
            container_class: overrides.container_class.or(self.container_class),
            base_url: overrides.base_url.or(self.base_url),
            allowed_origins: overrides.allowed_origins.or(self.allowed_origins),
            primary_color: overrides.primary_color.or(self.primary_color),
            secondary_color: overrides.secondary_color.or(self.secondary_color),
            title: overrides.title.or(self.title),
            subtitle: overrides.subtitle.or(self.subtitle),
            border_radius: overrides.border_radius.or(self.border_radius),
            spacing: overrides.spacing.or(self.spacing),
            font_family: overrides.font_family.or(self.font_family),
        }
    }
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;

    if value.is_null() {
        return Ok(None);
    }

    match serde_json::from_value::<T>(value.clone()) {
        Ok(parsed) => Ok(Some(parsed)),
        Err(error) => {
            warn!(%value, "Ignoring invalid widget option: {error}");
            Ok(None)
        }
    }
}

fn lenient_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;

    Ok(match &value {
        Value::Null => None,
        Value::Bool(flag) => Some(*flag),
        Value::String(text) if text == "true" => Some(true),
        Value::String(text) if text == "false" => Some(false),
        _ => {
            warn!(%value, "Ignoring invalid widget flag");
            None
        }
    })
}

/// Presentation options forwarded verbatim to the embedded widget
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct WidgetStyle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_radius: Option<Dimension>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spacing: Option<Dimension>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
}

/// A fully resolved widget configuration. Immutable for the lifetime of an
/// embed instance; changing it means calling `init` again.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetConfig {
    /// Which hosted widget to load
    pub widget_id: String,
    /// Requested color scheme
    pub theme: Theme,
    /// Corner the widget is anchored to
    pub position: Position,
    /// Ask the embedded widget to open itself once loaded
    pub auto_open: bool,
    /// Keep the widget hidden on narrow viewports
    pub hide_on_mobile: bool,
    /// Expanded-state width
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<Dimension>,
    /// Expanded-state height
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<Dimension>,
    /// Opaque credential forwarded to the widget host
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Requested embed technique
    pub embed_type: EmbedType,
    /// Extra CSS class for the mount container
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_class: Option<String>,
    /// Explicit widget host, overriding the one derived from the loader URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Additional origins whose messages are trusted
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub allowed_origins: Vec<String>,
    /// Presentation options
    #[serde(flatten)]
    pub style: WidgetStyle,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            widget_id: DEFAULT_WIDGET_ID.to_string(),
            theme: Theme::default(),
            position: Position::default(),
            auto_open: false,
            hide_on_mobile: false,
            width: None,
            height: None,
            api_key: None,
            embed_type: EmbedType::default(),
            container_class: None,
            base_url: None,
            allowed_origins: Vec::new(),
            style: WidgetStyle::default(),
        }
    }
}

impl From<PartialConfig> for WidgetConfig {
    fn from(value: PartialConfig) -> Self {
        WidgetConfig::resolve(value)
    }
}

impl WidgetConfig {
    /// Merge caller options over the defaults. Options present in `partial`
    /// win; everything else is the documented default.
    pub fn resolve(partial: PartialConfig) -> Self {
        let defaults = WidgetConfig::default();

        let widget_id = match partial.widget_id {
            Some(id) if !id.trim().is_empty() => id,
            Some(_) => {
                warn!("Blank widget id; loading the default widget");
                defaults.widget_id
            }
            None => defaults.widget_id,
        };

        WidgetConfig {
            widget_id,
            theme: partial.theme.unwrap_or(defaults.theme),
            position: partial.position.unwrap_or(defaults.position),
            auto_open: partial.auto_open.unwrap_or(defaults.auto_open),
            hide_on_mobile: partial.hide_on_mobile.unwrap_or(defaults.hide_on_mobile),
            width: partial.width,
            height: partial.height,
            api_key: partial.api_key,
            embed_type: partial.embed_type.unwrap_or(defaults.embed_type),
            container_class: partial.container_class,
            base_url: partial.base_url,
            allowed_origins: partial.allowed_origins.unwrap_or_default(),
            style: WidgetStyle {
                primary_color: partial.primary_color,
                secondary_color: partial.secondary_color,
                title: partial.title,
                subtitle: partial.subtitle,
                border_radius: partial.border_radius,
                spacing: partial.spacing,
                font_family: partial.font_family,
            },
        }
    }

    /// The options forwarded to the embedded widget, keyed by their
    /// camelCase names, in a stable order. `false` flags are omitted.
    pub fn parameters(&self) -> Vec<(&'static str, String)> {
        let mut parameters = vec![
            ("theme", self.theme.to_string()),
            ("position", self.position.to_string()),
        ];

        if self.auto_open {
            parameters.push(("autoOpen", "true".to_string()));
        }

        let optional: [(&'static str, Option<String>); 10] = [
            ("width", self.width.as_ref().map(|value| value.to_string())),
            ("height", self.height.as_ref().map(|value| value.to_string())),
            ("apiKey", self.api_key.clone()),
            ("primaryColor", self.style.primary_color.clone()),
            ("secondaryColor", self.style.secondary_color.clone()),
            ("title", self.style.title.clone()),
            ("subtitle", self.style.subtitle.clone()),
            (
                "borderRadius",
                self.style.border_radius.as_ref().map(|value| value.to_string()),
            ),
            (
                "spacing",
                self.style.spacing.as_ref().map(|value| value.to_string()),
            ),
            ("fontFamily", self.style.font_family.clone()),
        ];

        parameters.extend(
            optional
                .into_iter()
                .filter_map(|(key, value)| value.map(|value| (key, value))),
        );

        parameters
    }

    /// The [`Self::parameters`] as a percent-encoded query string
    pub fn query_string(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.parameters())
            .finish()
    }

    /// The attributes to set on the custom element: `widget-id` followed by
    /// the [`Self::parameters`] with kebab-case names
    pub fn attributes(&self) -> Vec<(String, String)> {
        iter::once(("widget-id".to_string(), self.widget_id.clone()))
            .chain(
                self.parameters()
                    .into_iter()
                    .map(|(key, value)| (key.to_case(Case::Kebab), value)),
            )
            .collect()
    }
}

/// The widget host that serves the embed page and the custom element
/// script. Its origin is the loader's trusted origin.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
    base: Url,
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            base: Url::parse(DEFAULT_BASE_URL).expect("default widget URL is valid"),
        }
    }
}

impl Endpoint {
    /// Pick the widget host: an explicit `baseUrl` wins, then the origin of
    /// the loader's own script, then [`DEFAULT_BASE_URL`].
    pub fn resolve(explicit: Option<&str>, script_source: Option<&str>) -> Self {
        if let Some(explicit) = explicit {
            match web_url(explicit) {
                Some(base) => return Self { base },
                None => warn!(base_url = explicit, "Ignoring unusable widget base URL"),
            }
        }

        match script_source.and_then(web_url) {
            Some(url) if is_loader_script(&url) => {
                if let Ok(base) = Url::parse(&url.origin().ascii_serialization()) {
                    return Self { base };
                }
            }
            Some(url) => debug!(script = %url, "Ignoring script that is not the loader"),
            None => (),
        }

        debug!("Loader script URL unavailable; using {DEFAULT_BASE_URL}");
        Self::default()
    }

    /// The base URL of the widget host
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// The origin of the widget host, e.g. `https://widget.parley.chat`
    pub fn origin(&self) -> String {
        self.base.origin().ascii_serialization()
    }

    /// `{base}/embed/{widgetId}?{query}`
    pub fn frame_url(&self, config: &WidgetConfig) -> Result<Url, ParleyEmbedError> {
        let mut url = self.resource(&["embed", &config.widget_id])?;
        url.set_query(Some(&config.query_string()));
        Ok(url)
    }

    /// The script that defines the widget's custom element
    pub fn script_url(&self) -> Result<Url, ParleyEmbedError> {
        self.resource(&[WIDGET_SCRIPT_PATH])
    }

    /// The loader script itself, as referenced by embed snippets
    pub fn loader_url(&self) -> Result<Url, ParleyEmbedError> {
        self.resource(&[LOADER_SCRIPT_PATH])
    }

    fn resource(&self, segments: &[&str]) -> Result<Url, ParleyEmbedError> {
        let mut url = self.base.clone();
        url.set_query(None);
        url.set_fragment(None);
        url.path_segments_mut()
            .map_err(|_| ParleyEmbedError::InvalidUrl(format!("{} cannot be a base", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

impl From<&WidgetConfig> for Endpoint {
    fn from(value: &WidgetConfig) -> Self {
        Endpoint::resolve(value.base_url.as_deref(), None)
    }
}

/// Whether `url` points at the loader script, i.e. its final path segment is
/// [`LOADER_SCRIPT_PATH`]
pub fn is_loader_script(url: &Url) -> bool {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .is_some_and(|last| last == LOADER_SCRIPT_PATH)
}

/// Whether `raw` is an http(s) URL of the loader script
pub fn is_loader_source(raw: &str) -> bool {
    web_url(raw).is_some_and(|url| is_loader_script(&url))
}

fn web_url(raw: &str) -> Option<Url> {
    Url::parse(raw.trim())
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
}
