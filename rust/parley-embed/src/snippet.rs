//! HTML embed codes for a resolved [`WidgetConfig`].
//!
//! Two forms are supported: the loader `<script>` followed by an inline
//! `init` call, and a static `<iframe>` for pages that cannot run
//! third-party script.

use crate::{
    Endpoint, FRAME_PERMISSIONS, FRAME_TITLE, GLOBAL_NAME, LOADER_READY_EVENT, ParleyEmbedError,
    WidgetConfig, strategy::collapsed_styles,
};

/// The loader `<script>` tag plus an inline script that initializes the
/// widget once the loader has installed its global
pub fn script_snippet(
    config: &WidgetConfig,
    endpoint: &Endpoint,
) -> Result<String, ParleyEmbedError> {
    let loader = endpoint.loader_url()?;
    let options = inline_json(config)?;

    Ok(format!(
        r#"<script src="{loader}" async></script>
<script>
  (function (init) {{
    if (window.{GLOBAL_NAME}) init(window.{GLOBAL_NAME});
    else window.addEventListener("{LOADER_READY_EVENT}", function () {{ init(window.{GLOBAL_NAME}); }}, {{ once: true }});
  }})(function (widget) {{
    widget.init({options});
  }});
</script>"#,
        loader = escape_attribute(loader.as_str()),
        options = indent(&options, "    "),
    ))
}

/// A static `<iframe>` showing the collapsed widget
pub fn iframe_snippet(
    config: &WidgetConfig,
    endpoint: &Endpoint,
) -> Result<String, ParleyEmbedError> {
    let src = endpoint.frame_url(config)?;
    let style = collapsed_styles(config.position)
        .into_iter()
        .map(|(property, value)| format!("{property}: {value}"))
        .collect::<Vec<_>>()
        .join("; ");

    let pairs = [
        ("src", src.as_str()),
        ("title", FRAME_TITLE),
        ("aria-label", FRAME_TITLE),
        ("role", "region"),
        ("aria-live", "polite"),
        ("loading", "lazy"),
        ("allow", FRAME_PERMISSIONS),
        ("style", style.as_str()),
    ];

    let attributes = pairs
        .into_iter()
        .map(|(name, value)| format!(r#" {name}="{}""#, escape_attribute(value)))
        .collect::<String>();

    Ok(format!("<iframe{attributes}></iframe>"))
}

fn inline_json(config: &WidgetConfig) -> Result<String, ParleyEmbedError> {
    // `<` can only occur inside JSON strings, where the escape reads the same
    Ok(serde_json::to_string_pretty(config)?.replace('<', "\\u003c"))
}

fn indent(text: &str, prefix: &str) -> String {
    text.lines()
        .enumerate()
        .map(|(index, line)| {
            if index == 0 {
                line.to_string()
            } else {
                format!("{prefix}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());

    for character in value.chars() {
        match character {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            other => escaped.push(other),
        }
    }

    escaped
}
