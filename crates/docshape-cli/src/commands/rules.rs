use crate::config::CliConfig;
use anyhow::Result;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Table};
use docshape_query::{PatternCatalog, PatternRule, Translator};
use std::sync::Arc;
use tracing::debug;

/// Execute the rules command
pub fn execute(config: &CliConfig, examples: bool) -> Result<()> {
    let catalog = Arc::new(PatternCatalog::from_options(&config.catalog));
    debug!(rules = catalog.len(), "Listing catalog");

    if examples {
        print!("{}", cheatsheet(catalog, config));
    } else {
        println!("{}", rules_table(&catalog));
    }
    Ok(())
}

/// One row per rule, in lookup order
pub fn rules_table(catalog: &PatternCatalog) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "Id".bold(),
        "Kind".bold(),
        "Placeholders".bold(),
        "Description".bold(),
    ]);
    for rule in catalog.rules() {
        let placeholders: Vec<&str> = rule.placeholders().into_iter().collect();
        table.add_row(vec![
            rule.id.clone(),
            rule.relational.kind().to_string(),
            placeholders.join(", "),
            rule.description.clone(),
        ]);
    }
    table
}

/// Every rule with its relational shape and a sample translation.
pub fn cheatsheet(catalog: Arc<PatternCatalog>, config: &CliConfig) -> String {
    let translator = Translator::new(Arc::clone(&catalog));
    let renderer = config.render.build();

    let mut out = String::new();
    for rule in catalog.rules() {
        out.push_str(&format!("{}  {}\n", rule.id.bold(), rule.description.dimmed()));
        out.push_str(&format!("  {}\n", rule.relational.notation()));
        match sample(rule, &translator, renderer.as_ref()) {
            Ok(query) => out.push_str(&format!("  {} {}\n\n", "=>".green(), query)),
            Err(e) => out.push_str(&format!("  {} {}\n\n", "!!".red(), e)),
        }
    }
    out
}

fn sample(
    rule: &PatternRule,
    translator: &Translator,
    renderer: &dyn docshape_query::QueryRenderer,
) -> Result<String> {
    let example = rule.example();
    let translated = translator.translate(&example.descriptor)?;
    Ok(renderer.render(&translated)?.query)
}
