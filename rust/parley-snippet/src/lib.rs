#![cfg(not(target_arch = "wasm32"))]
#![warn(missing_docs)]

//! # Parley Snippet
//!
//! Generates the HTML a site owner pastes into their pages to embed a
//! Parley chat widget.
//!
//! ```bash
//! parley-snippet script --widget-id support --position bottom-left --auto-open
//! parley-snippet iframe --config widget.json --theme dark
//! ```
//!
//! Options are read from an optional JSON file (the same camelCase shape
//! `ParleyWidget.init` accepts) and overridden by individual flags. The
//! widget host falls back to `$PARLEY_BASE_URL` when neither names one.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use parley_embed::{
    Endpoint, PartialConfig, WidgetConfig,
    snippet::{iframe_snippet, script_snippet},
};
use tracing::debug;

pub mod cli;
use cli::{Format, SnippetCli};

/// Read widget options from a JSON file
pub fn read_config_file(path: &Path) -> Result<PartialConfig> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Could not read widget options from {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&json)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;

    anyhow::ensure!(
        value.is_object(),
        "{} must contain a JSON object of widget options",
        path.display()
    );

    Ok(PartialConfig::from_value(value))
}

/// Resolve the widget configuration described by `cli`.
/// `environment_base_url` is the value of [`cli::BASE_URL_VARIABLE`], if set.
pub fn resolve(cli: &SnippetCli, environment_base_url: Option<String>) -> Result<WidgetConfig> {
    let widget = cli.format.widget();

    let file = match &widget.config {
        Some(path) => read_config_file(path)?,
        None => PartialConfig::default(),
    };

    let mut partial = file.merge(widget.overrides());

    if partial.base_url.is_none() {
        partial.base_url = environment_base_url.filter(|url| !url.trim().is_empty());
    }

    Ok(WidgetConfig::resolve(partial))
}

/// Render the embed code requested by `cli`
pub fn render(cli: &SnippetCli, environment_base_url: Option<String>) -> Result<String> {
    let config = resolve(cli, environment_base_url)?;
    let endpoint = Endpoint::from(&config);
    debug!(base = %endpoint.base(), widget_id = %config.widget_id, "Rendering embed code");

    let snippet = match cli.format {
        Format::Script(_) => script_snippet(&config, &endpoint),
        Format::Iframe(_) => iframe_snippet(&config, &endpoint),
    };

    snippet.context("Could not render the embed code")
}
