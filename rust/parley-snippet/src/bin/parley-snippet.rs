use anyhow::Result;
use clap::Parser;
use parley_snippet::{
    cli::{BASE_URL_VARIABLE, SnippetCli},
    render,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = SnippetCli::parse();
    let snippet = render(&cli, std::env::var(BASE_URL_VARIABLE).ok())?;

    println!("{snippet}");
    Ok(())
}
