//! Pattern catalog.
//!
//! The catalog is an ordered registry of `PatternRule`s. It is assembled
//! with a `CatalogBuilder`, then frozen into a `PatternCatalog` that is only
//! ever read. Lookups scan rules in registration order and return the first
//! structural match, so translation is deterministic.

mod example;
mod shape;
mod standard;
mod template;

pub use example::RuleExample;
pub use shape::{ph, Placeholder, PredicateShape, RelationalShape, StatementShape};
pub use standard::standard_rules;
pub use template::{
    hole, keyed, operator, Bindings, Bound, DocumentShape, EntryTemplate, KeyTemplate,
    StageTemplate, Substituted, ValueTemplate,
};

use crate::descriptor::{Predicate, QueryDescriptor};
use crate::error::CatalogError;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// A translation rule: relational shape → document shape.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternRule {
    pub id: String,
    pub relational: RelationalShape,
    pub document: DocumentShape,
    /// One-line human description
    pub description: String,
}

impl PatternRule {
    pub fn new(id: impl Into<String>, relational: RelationalShape, document: DocumentShape) -> Self {
        Self {
            id: id.into(),
            relational,
            document,
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Placeholder names of the relational shape, sorted
    pub fn placeholders(&self) -> BTreeSet<&str> {
        self.relational
            .placeholders()
            .into_iter()
            .map(|p| p.name())
            .collect()
    }

    /// Check the rule's internal consistency.
    ///
    /// Both shapes must be of the same kind (predicate or statement), use
    /// exactly the same placeholder set, and the relational shape may not
    /// name a placeholder twice.
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.relational.kind() != self.document.kind() {
            return Err(CatalogError::ShapeKindMismatch {
                rule: self.id.clone(),
                relational: self.relational.kind(),
                document: self.document.kind(),
            });
        }

        let mut seen = BTreeSet::new();
        let mut repeated = BTreeSet::new();
        for p in self.relational.placeholders() {
            if !seen.insert(p.name()) {
                repeated.insert(p.name().to_string());
            }
        }

        let document: BTreeSet<&str> = self
            .document
            .placeholders()
            .into_iter()
            .map(|p| p.name())
            .collect();

        let relational_only: Vec<String> =
            seen.difference(&document).map(|s| s.to_string()).collect();
        let document_only: Vec<String> =
            document.difference(&seen).map(|s| s.to_string()).collect();

        if relational_only.is_empty() && document_only.is_empty() && repeated.is_empty() {
            Ok(())
        } else {
            Err(CatalogError::PlaceholderMismatch {
                rule: self.id.clone(),
                relational_only,
                document_only,
                repeated: repeated.into_iter().collect(),
            })
        }
    }

    pub fn is_predicate_rule(&self) -> bool {
        matches!(self.relational, RelationalShape::Predicate(_))
    }

    /// Does this rule structurally match the whole descriptor?
    pub fn matches_statement(&self, descriptor: &QueryDescriptor) -> bool {
        match &self.relational {
            RelationalShape::Statement(shape) => shape.matches(descriptor),
            RelationalShape::Predicate(_) => false,
        }
    }

    /// Does this rule structurally match the predicate node?
    pub fn matches_predicate(&self, predicate: &Predicate) -> bool {
        match &self.relational {
            RelationalShape::Predicate(shape) => shape.matches(predicate),
            RelationalShape::Statement(_) => false,
        }
    }
}

/// Catalog settings loaded from configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogOptions {
    /// Rule ids left out when building the catalog
    pub disabled_rules: Vec<String>,
}

/// Mutable staging area for a catalog.
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    rules: Vec<PatternRule>,
    ids: HashSet<String>,
    disabled: BTreeSet<String>,
    skipped: BTreeSet<String>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder preloaded with the standard rules
    pub fn standard() -> Self {
        let mut builder = Self::new();
        for rule in standard_rules() {
            // Standard rules are consistent; tested in `standard`.
            if let Err(e) = builder.register(rule) {
                warn!("Skipping invalid standard rule: {}", e);
            }
        }
        builder
    }

    /// Mark a rule id as disabled. Must be called before the rule is
    /// registered; already registered rules are removed.
    pub fn disable(&mut self, id: impl Into<String>) -> &mut Self {
        let id = id.into();
        if self.ids.remove(&id) {
            self.rules.retain(|r| r.id != id);
            self.skipped.insert(id.clone());
        }
        self.disabled.insert(id);
        self
    }

    /// Register a rule at the end of the lookup order.
    pub fn register(&mut self, rule: PatternRule) -> Result<(), CatalogError> {
        if self.ids.contains(&rule.id) {
            return Err(CatalogError::DuplicateRuleId(rule.id));
        }
        rule.validate()?;

        if self.disabled.contains(&rule.id) {
            debug!(rule = %rule.id, "Rule disabled, not registering");
            self.skipped.insert(rule.id);
            return Ok(());
        }

        debug!(rule = %rule.id, kind = rule.relational.kind(), "Registered rule");
        self.ids.insert(rule.id.clone());
        self.rules.push(rule);
        Ok(())
    }

    /// Chainable `register`
    pub fn with_rule(mut self, rule: PatternRule) -> Result<Self, CatalogError> {
        self.register(rule)?;
        Ok(self)
    }

    /// Freeze the catalog.
    pub fn build(self) -> PatternCatalog {
        for id in self.disabled.difference(&self.skipped) {
            warn!(rule = %id, "Disabled rule id does not match any registered rule");
        }
        PatternCatalog { rules: self.rules }
    }
}

static STANDARD: Lazy<Arc<PatternCatalog>> =
    Lazy::new(|| Arc::new(CatalogBuilder::standard().build()));

/// Frozen, read-only rule registry.
#[derive(Debug, Clone)]
pub struct PatternCatalog {
    rules: Vec<PatternRule>,
}

impl PatternCatalog {
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::new()
    }

    /// Process-wide standard catalog, built on first use
    pub fn standard() -> Arc<PatternCatalog> {
        Arc::clone(&STANDARD)
    }

    /// Standard catalog minus the rules disabled in `options`
    pub fn from_options(options: &CatalogOptions) -> PatternCatalog {
        let mut builder = CatalogBuilder::new();
        for id in &options.disabled_rules {
            builder.disable(id.clone());
        }
        for rule in standard_rules() {
            if let Err(e) = builder.register(rule) {
                warn!("Skipping invalid standard rule: {}", e);
            }
        }
        builder.build()
    }

    /// First statement rule matching the descriptor
    pub fn lookup(&self, descriptor: &QueryDescriptor) -> Option<&PatternRule> {
        self.rules.iter().find(|r| r.matches_statement(descriptor))
    }

    /// First predicate rule matching the predicate node
    pub fn lookup_predicate(&self, predicate: &Predicate) -> Option<&PatternRule> {
        self.rules.iter().find(|r| r.matches_predicate(predicate))
    }

    pub fn get(&self, id: &str) -> Option<&PatternRule> {
        self.rules.iter().find(|r| r.id == id)
    }

    /// Rules in lookup order
    pub fn rules(&self) -> &[PatternRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
