use crate::commands::read_input;
use crate::config::CliConfig;
use anyhow::{Context, Result};
use colored::Colorize;
use docshape_query::{PatternCatalog, QueryPipeline, RendererKind};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Execute the translate command
pub fn execute(
    config: &CliConfig,
    file: Option<PathBuf>,
    renderer: Option<RendererKind>,
    compact: bool,
    explain: bool,
) -> Result<()> {
    let input = read_input(file.as_deref())?;
    println!("{}", translate_input(config, &input, renderer, compact, explain)?);
    Ok(())
}

/// Translate raw descriptor text; flags override the `[render]` config.
pub fn translate_input(
    config: &CliConfig,
    input: &str,
    renderer: Option<RendererKind>,
    compact: bool,
    explain: bool,
) -> Result<String> {
    let mut options = config.render.clone();
    if let Some(renderer) = renderer {
        options.renderer = renderer;
    }
    options.compact |= compact;
    debug!(?options, "Building pipeline");

    let pipeline = QueryPipeline::builder()
        .with_catalog(Arc::new(PatternCatalog::from_options(&config.catalog)))
        .with_render_options(options)
        .build();
    let rendered = pipeline.run(input).context("Translation failed")?;

    if explain {
        Ok(format!(
            "{} {}\n{}",
            "rule:".dimmed(),
            rendered.rule_id.cyan(),
            rendered.query
        ))
    } else {
        Ok(rendered.query)
    }
}
