//! Relational-to-document query translation.
//!
//! A query is described structurally (collection, predicate tree, field
//! selection, grouping, update assignments), matched against an ordered
//! catalog of pattern rules, and rendered as a document-store query:
//!
//! ```text
//! {"collection": "Products", "predicate": "like(description, \"BOOK\")"}
//!     → db.Products.find({description: /.*BOOK.*/})
//! ```
//!
//! Stages: [`syntax`] parses raw input, [`transform`] normalizes the
//! descriptor, [`translate`] applies catalog rules, [`render`] produces
//! text. [`QueryPipeline`] runs them all.

pub mod catalog;
pub mod descriptor;
pub mod error;
pub mod ir;
pub mod pipeline;
pub mod render;
pub mod syntax;
pub mod transform;
pub mod translate;

pub use catalog::{CatalogBuilder, CatalogOptions, PatternCatalog, PatternRule, RuleExample};
pub use descriptor::{Predicate, QueryDescriptor};
pub use error::{CatalogError, ParseError, QueryError, QueryResult, RenderError, TranslateError};
pub use ir::{DocOperation, TranslatedQuery};
pub use pipeline::{QueryPipeline, QueryPipelineBuilder};
pub use render::{QueryRenderer, RenderOptions, RenderedQuery, RendererKind};
pub use translate::Translator;

use render::ShellRenderer;
use syntax::DescriptorSyntaxRegistry;

/// Parse and normalize a JSON or YAML descriptor.
pub fn parse(raw: &str) -> Result<QueryDescriptor, ParseError> {
    DescriptorSyntaxRegistry::default()
        .parse(raw)
        .and_then(transform::normalize)
}

/// Translate a descriptor with the standard catalog.
pub fn translate(descriptor: &QueryDescriptor) -> Result<TranslatedQuery, TranslateError> {
    Translator::default().translate(descriptor)
}

/// Render a translated query as shell text.
pub fn render(query: &TranslatedQuery) -> Result<String, RenderError> {
    ShellRenderer::default().render(query).map(|r| r.query)
}
