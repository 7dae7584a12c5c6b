//! End-to-end query pipeline.
//!
//! `QueryPipeline` chains the stages: syntax registry → normalization
//! transforms → translator → renderer. Every stage is also callable on its
//! own. A pipeline holds only frozen, shareable state and can be used from
//! many threads at once.

use crate::catalog::PatternCatalog;
use crate::descriptor::QueryDescriptor;
use crate::error::{ParseError, QueryResult, RenderError, TranslateError};
use crate::ir::TranslatedQuery;
use crate::render::{QueryRenderer, RenderOptions, RenderedQuery};
use crate::syntax::DescriptorSyntaxRegistry;
use crate::transform::{default_transforms, DescriptorTransform};
use crate::translate::Translator;
use std::sync::Arc;
use tracing::debug;

/// Composed parse → normalize → translate → render pipeline.
pub struct QueryPipeline {
    syntaxes: DescriptorSyntaxRegistry,
    transforms: Vec<Arc<dyn DescriptorTransform>>,
    translator: Translator,
    renderer: Arc<dyn QueryRenderer>,
}

impl Default for QueryPipeline {
    fn default() -> Self {
        QueryPipelineBuilder::new().build()
    }
}

impl QueryPipeline {
    pub fn builder() -> QueryPipelineBuilder {
        QueryPipelineBuilder::new()
    }

    /// Parse and normalize raw input into a descriptor.
    pub fn parse(&self, input: &str) -> Result<QueryDescriptor, ParseError> {
        let descriptor = self.syntaxes.parse(input)?;
        self.transforms.iter().try_fold(descriptor, |d, t| {
            debug!(transform = t.name(), "Applying transform");
            t.transform(d)
        })
    }

    pub fn translate(&self, descriptor: &QueryDescriptor) -> Result<TranslatedQuery, TranslateError> {
        self.translator.translate(descriptor)
    }

    pub fn render(&self, query: &TranslatedQuery) -> Result<RenderedQuery, RenderError> {
        self.renderer.render(query)
    }

    /// Run every stage on raw input.
    pub fn run(&self, input: &str) -> QueryResult<RenderedQuery> {
        let descriptor = self.parse(input)?;
        let translated = self.translate(&descriptor)?;
        Ok(self.render(&translated)?)
    }

    pub fn catalog(&self) -> &PatternCatalog {
        self.translator.catalog()
    }

    pub fn renderer(&self) -> &dyn QueryRenderer {
        self.renderer.as_ref()
    }

    pub fn syntax_names(&self) -> Vec<&'static str> {
        self.syntaxes.syntax_names()
    }
}

/// Builder for `QueryPipeline`; unset parts fall back to the defaults.
#[derive(Default)]
pub struct QueryPipelineBuilder {
    syntaxes: Option<DescriptorSyntaxRegistry>,
    transforms: Option<Vec<Arc<dyn DescriptorTransform>>>,
    catalog: Option<Arc<PatternCatalog>>,
    render: RenderOptions,
    renderer: Option<Arc<dyn QueryRenderer>>,
}

impl QueryPipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_syntaxes(mut self, syntaxes: DescriptorSyntaxRegistry) -> Self {
        self.syntaxes = Some(syntaxes);
        self
    }

    /// Replace the normalization chain
    pub fn with_transforms(mut self, transforms: Vec<Arc<dyn DescriptorTransform>>) -> Self {
        self.transforms = Some(transforms);
        self
    }

    pub fn with_catalog(mut self, catalog: Arc<PatternCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn with_render_options(mut self, options: RenderOptions) -> Self {
        self.render = options;
        self
    }

    /// Use a custom renderer; takes precedence over render options
    pub fn with_renderer(mut self, renderer: impl QueryRenderer + 'static) -> Self {
        self.renderer = Some(Arc::new(renderer));
        self
    }

    pub fn build(self) -> QueryPipeline {
        QueryPipeline {
            syntaxes: self.syntaxes.unwrap_or_default(),
            transforms: self.transforms.unwrap_or_else(default_transforms),
            translator: Translator::new(self.catalog.unwrap_or_else(PatternCatalog::standard)),
            renderer: self.renderer.unwrap_or_else(|| self.render.build()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogBuilder, CatalogOptions};
    use crate::error::QueryError;
    use crate::render::{CommandRenderer, RendererKind};

    #[test]
    fn test_pipeline_defaults() {
        let pipeline = QueryPipeline::default();
        assert_eq!(pipeline.renderer().name(), "shell");
        assert_eq!(pipeline.syntax_names(), vec!["json", "yaml"]);
        assert_eq!(pipeline.catalog().len(), crate::catalog::standard_rules().len());
    }

    #[test]
    fn test_run_json_descriptor() {
        let rendered = QueryPipeline::default()
            .run(r#"{"collection": "Products", "predicate": "like(description, 'BOOK')"}"#)
            .unwrap();
        assert_eq!(rendered.query, "db.Products.find({description: /.*BOOK.*/})");
        assert_eq!(rendered.rule_id, "select");
    }

    #[test]
    fn test_parse_lifts_having() {
        let d = QueryPipeline::default()
            .parse("collection: orders\ngroupingKeys: [cust_id]\npredicate: \"and(eq(status, 'A'), having(count, gt, 1))\"\n")
            .unwrap();
        assert_eq!(d.having.len(), 1);
        assert!(d.predicate.is_some());
    }

    #[test]
    fn test_render_options_select_renderer() {
        let pipeline = QueryPipeline::builder()
            .with_render_options(RenderOptions {
                renderer: RendererKind::Command,
                compact: true,
                quote_keys: false,
            })
            .build();
        let rendered = pipeline.run(r#"{"collection": "t"}"#).unwrap();
        assert_eq!(rendered.query, r#"{"find":"t","filter":{}}"#);
    }

    #[test]
    fn test_custom_renderer_wins() {
        let pipeline = QueryPipeline::builder()
            .with_render_options(RenderOptions::default())
            .with_renderer(CommandRenderer::new(true))
            .build();
        assert_eq!(pipeline.renderer().name(), "command");
    }

    #[test]
    fn test_disabled_rule_changes_translation() {
        let catalog = PatternCatalog::from_options(&CatalogOptions {
            disabled_rules: vec!["and-disjoint".to_string()],
        });
        let pipeline = QueryPipeline::builder()
            .with_catalog(Arc::new(catalog))
            .build();
        let rendered = pipeline
            .run(r#"{"collection": "t", "predicate": "and(eq(a, 1), eq(b, 2))"}"#)
            .unwrap();
        assert_eq!(rendered.query, "db.t.find({$and: [{a: 1}, {b: 2}]})");
    }

    #[test]
    fn test_errors_carry_stage() {
        let pipeline = QueryPipeline::builder()
            .with_catalog(Arc::new(CatalogBuilder::new().build()))
            .build();
        assert!(matches!(
            pipeline.run(r#"{"collection": "t"}"#),
            Err(QueryError::Translate(TranslateError::NoMatchingPattern { .. }))
        ));
        assert!(matches!(
            pipeline.run("no mapping here"),
            Err(QueryError::Parse(ParseError::NoMatchingSyntax { .. }))
        ));
    }
}
