pub mod parse;
pub mod rules;
pub mod translate;

use anyhow::{Context, Result};
use std::path::Path;

/// Read a descriptor from a file, or from stdin when no file is given.
pub fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read descriptor file: {}", path.display())),
        None => std::io::read_to_string(std::io::stdin())
            .context("Failed to read descriptor from stdin"),
    }
}
