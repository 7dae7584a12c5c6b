//! Descriptor syntaxes.
//!
//! This module defines the `DescriptorSyntax` trait and
//! `DescriptorSyntaxRegistry`. Each syntax turns raw text into a
//! `QueryDescriptor`; the registry picks the first syntax (by priority)
//! whose `can_handle()` accepts the input.

mod common;
mod expression;
mod json;
mod raw;
mod yaml;

pub use expression::parse_predicate;
pub use json::JsonSyntax;
pub use raw::{RawAggregation, RawAssignment, RawDescriptor, RawNode, RawPredicate};
pub use yaml::YamlSyntax;

use crate::descriptor::QueryDescriptor;
use crate::error::ParseError;
use std::sync::Arc;
use tracing::debug;

/// Trait for descriptor syntaxes.
///
/// - `can_handle()` for fast detection
/// - `priority()` for ordering
/// - `parse()` for actual parsing
pub trait DescriptorSyntax: Send + Sync {
    /// Unique name for this syntax
    fn name(&self) -> &'static str;

    /// Fast check if this syntax might handle the input.
    ///
    /// Should be cheap (regex or prefix check). If false, the next syntax in
    /// priority order will be tried.
    fn can_handle(&self, input: &str) -> bool;

    /// Parse input into a descriptor, before normalization.
    fn parse(&self, input: &str) -> Result<QueryDescriptor, ParseError>;

    /// Priority (higher = tried first). Default: 50
    fn priority(&self) -> u8 {
        50
    }
}

/// Registry of descriptor syntaxes (sorted by priority descending).
pub struct DescriptorSyntaxRegistry {
    syntaxes: Vec<Arc<dyn DescriptorSyntax>>,
}

impl Default for DescriptorSyntaxRegistry {
    /// JSON, then YAML
    fn default() -> Self {
        DescriptorSyntaxRegistryBuilder::new()
            .with_syntax(JsonSyntax)
            .with_syntax(YamlSyntax)
            .build()
    }
}

impl DescriptorSyntaxRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            syntaxes: Vec::new(),
        }
    }

    /// Register a syntax (re-sorts by priority)
    pub fn register(&mut self, syntax: Arc<dyn DescriptorSyntax>) {
        self.syntaxes.push(syntax);
        self.syntaxes
            .sort_by_key(|s| std::cmp::Reverse(s.priority()));
    }

    /// Parse using first matching syntax
    pub fn parse(&self, input: &str) -> Result<QueryDescriptor, ParseError> {
        for syntax in &self.syntaxes {
            if syntax.can_handle(input) {
                debug!(syntax = syntax.name(), "Parsing descriptor");
                return syntax.parse(input);
            }
        }
        Err(ParseError::NoMatchingSyntax {
            input: input.to_string(),
            tried: self.syntax_names(),
        })
    }

    /// Get list of registered syntax names
    pub fn syntax_names(&self) -> Vec<&'static str> {
        self.syntaxes.iter().map(|s| s.name()).collect()
    }
}

/// Builder for ergonomic registry construction
#[derive(Default)]
pub struct DescriptorSyntaxRegistryBuilder {
    syntaxes: Vec<Arc<dyn DescriptorSyntax>>,
}

impl DescriptorSyntaxRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a syntax to the registry
    pub fn with_syntax(mut self, syntax: impl DescriptorSyntax + 'static) -> Self {
        self.syntaxes.push(Arc::new(syntax));
        self
    }

    /// Build the registry
    pub fn build(self) -> DescriptorSyntaxRegistry {
        let mut registry = DescriptorSyntaxRegistry::new();
        for syntax in self.syntaxes {
            registry.register(syntax);
        }
        registry
    }
}
