//! Target renderers for translated queries.
//!
//! Renderers serialize a `TranslatedQuery` into the text a document store
//! accepts: mongo shell syntax or a JSON database command. Shape checks
//! shared by every renderer live here.

mod command;
mod shell;

pub use command::CommandRenderer;
pub use shell::ShellRenderer;

use crate::error::RenderError;
use crate::ir::{DocValue, Document, Projection, Stage, TranslatedQuery};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Output from rendering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedQuery {
    /// The generated query text
    pub query: String,
    /// Statement rule the query was produced by
    pub rule_id: String,
}

/// Trait for rendering translated queries to a target syntax.
pub trait QueryRenderer: Send + Sync {
    /// Unique name for this renderer
    fn name(&self) -> &str;

    /// Render the query
    fn render(&self, query: &TranslatedQuery) -> Result<RenderedQuery, RenderError>;
}

/// Available renderers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererKind {
    /// `db.coll.find({...})`
    #[default]
    Shell,
    /// `{"find": "coll", "filter": {...}}`
    Command,
}

/// Renderer configuration (the `[render]` config table).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    pub renderer: RendererKind,
    /// Omit optional whitespace
    pub compact: bool,
    /// Quote every document key, even identifier-like ones
    pub quote_keys: bool,
}

impl RenderOptions {
    /// Build the configured renderer
    pub fn build(&self) -> Arc<dyn QueryRenderer> {
        match self.renderer {
            RendererKind::Shell => Arc::new(ShellRenderer::new(self.compact, self.quote_keys)),
            RendererKind::Command => Arc::new(CommandRenderer::new(self.compact)),
        }
    }
}

// ============================================================================
// Shape checks
// ============================================================================

/// Pipeline stages in canonical order with empty filters dropped.
///
/// Fails if a filter on aggregated values has no group stage to follow.
pub(crate) fn ordered_stages(stages: &[Stage]) -> Result<Vec<&Stage>, RenderError> {
    let mut ordered: Vec<&Stage> = stages
        .iter()
        .filter(|s| match s {
            Stage::Match(doc) | Stage::HavingMatch(doc) => !doc.is_empty(),
            Stage::Group(_) => true,
        })
        .collect();
    ordered.sort_by_key(|s| s.rank());

    let has_group = ordered.iter().any(|s| matches!(s, Stage::Group(_)));
    if !has_group && ordered.iter().any(|s| matches!(s, Stage::HavingMatch(_))) {
        return Err(RenderError::unrenderable(
            "filter on aggregated values without a group stage",
        ));
    }
    Ok(ordered)
}

/// Reject projections that mix inclusion and exclusion (`_id` aside).
pub(crate) fn check_projection(projection: &Projection) -> Result<(), RenderError> {
    let includes = projection.fields.iter().any(|(_, included)| *included);
    let excludes = projection.fields.iter().any(|(_, included)| !*included);
    if includes && excludes {
        return Err(RenderError::unrenderable(
            "projection mixing included and excluded fields",
        ));
    }
    if projection.fields.iter().any(|(f, _)| f.is_empty()) {
        return Err(RenderError::unrenderable("projection with an empty field name"));
    }
    Ok(())
}

/// Reject empty keys anywhere in a document.
pub(crate) fn check_document(doc: &Document) -> Result<(), RenderError> {
    for (key, value) in doc.entries() {
        if key.is_empty() {
            return Err(RenderError::unrenderable("document with an empty key"));
        }
        check_value(value)?;
    }
    Ok(())
}

fn check_value(value: &DocValue) -> Result<(), RenderError> {
    match value {
        DocValue::Document(doc) => check_document(doc),
        DocValue::Array(items) => items.iter().try_for_each(check_value),
        DocValue::FieldRef(path) if path.is_empty() => {
            Err(RenderError::unrenderable("empty field reference"))
        }
        _ => Ok(()),
    }
}

pub(crate) fn check_update(update: &Document) -> Result<(), RenderError> {
    let empty = update.is_empty()
        || update
            .entries()
            .iter()
            .all(|(_, v)| v.as_document().is_some_and(Document::is_empty));
    if empty {
        return Err(RenderError::unrenderable("empty update document"));
    }
    check_document(update)
}

pub(crate) fn check_field(field: &str, construct: &str) -> Result<(), RenderError> {
    if field.is_empty() {
        return Err(RenderError::unrenderable(format!("{} with empty field", construct)));
    }
    Ok(())
}

/// Group key names for a compound `_id`: dots are not allowed in keys.
pub(crate) fn group_key_name(key: &str) -> String {
    key.replace('.', "_")
}
