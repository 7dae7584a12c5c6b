use crate::commands::read_input;
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Execute the parse command
pub fn execute(file: Option<PathBuf>) -> Result<()> {
    let input = read_input(file.as_deref())?;
    println!("{}", parse_input(&input)?);
    Ok(())
}

/// Normalized descriptor as pretty JSON
pub fn parse_input(input: &str) -> Result<String> {
    let descriptor = docshape_query::parse(input).context("Failed to parse descriptor")?;
    serde_json::to_string_pretty(&descriptor).context("Failed to serialize descriptor")
}
