//! Translator: descriptor → document-store operation.
//!
//! The translator looks up the statement rule for a descriptor, extracts a
//! binding for each placeholder of the rule's relational shape and
//! substitutes them into the rule's document shape. Predicate sub-trees go
//! through the same lookup/bind/substitute cycle, one binding map per node.

use crate::catalog::{
    Bindings, Bound, PatternCatalog, PatternRule, PredicateShape, RelationalShape,
    StatementShape, Substituted,
};
use crate::descriptor::{AggregateFn, Aggregation, FieldSelection, Predicate, QueryDescriptor};
use crate::error::TranslateError;
use crate::ir::{DocValue, Document, GroupSpec, Projection, TranslatedQuery};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, trace};

/// Stateless translator over a frozen catalog.
#[derive(Debug, Clone)]
pub struct Translator {
    catalog: Arc<PatternCatalog>,
}

impl Default for Translator {
    fn default() -> Self {
        Self::new(PatternCatalog::standard())
    }
}

impl Translator {
    pub fn new(catalog: Arc<PatternCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &PatternCatalog {
        &self.catalog
    }

    /// Translate a whole descriptor.
    pub fn translate(&self, descriptor: &QueryDescriptor) -> Result<TranslatedQuery, TranslateError> {
        let rule = self
            .catalog
            .lookup(descriptor)
            .ok_or_else(|| TranslateError::NoMatchingPattern {
                subject: describe_statement(descriptor),
            })?;
        debug!(rule = %rule.id, collection = %descriptor.collection, "Matched statement rule");

        let RelationalShape::Statement(shape) = &rule.relational else {
            return Err(no_match(descriptor));
        };
        let bindings = self.statement_bindings(rule, shape, descriptor)?;
        trace!(rule = %rule.id, bindings = bindings.len(), "Extracted bindings");

        match rule.document.substitute(&rule.id, &bindings)? {
            Substituted::Operation(operation) => Ok(TranslatedQuery {
                collection: descriptor.collection.clone(),
                rule_id: rule.id.clone(),
                operation,
            }),
            Substituted::Filter(_) => Err(TranslateError::BindingKindMismatch {
                rule: rule.id.clone(),
                placeholder: String::new(),
                expected: "a statement template",
            }),
        }
    }

    /// Translate a single predicate tree into a filter document.
    pub fn translate_predicate(&self, predicate: &Predicate) -> Result<Document, TranslateError> {
        let rule = self
            .catalog
            .lookup_predicate(predicate)
            .ok_or_else(|| TranslateError::NoMatchingPattern {
                subject: format!("{} predicate", predicate.kind_name()),
            })?;
        trace!(rule = %rule.id, kind = predicate.kind_name(), "Matched predicate rule");

        let RelationalShape::Predicate(shape) = &rule.relational else {
            return Err(TranslateError::NoMatchingPattern {
                subject: format!("{} predicate", predicate.kind_name()),
            });
        };
        let bindings = self.predicate_bindings(rule, shape, predicate)?;

        match rule.document.substitute(&rule.id, &bindings)? {
            Substituted::Filter(doc) => Ok(doc),
            Substituted::Operation(_) => Err(TranslateError::BindingKindMismatch {
                rule: rule.id.clone(),
                placeholder: String::new(),
                expected: "a filter template",
            }),
        }
    }

    fn predicate_bindings(
        &self,
        rule: &PatternRule,
        shape: &PredicateShape,
        predicate: &Predicate,
    ) -> Result<Bindings, TranslateError> {
        let mut b = Bindings::new();
        match (shape, predicate) {
            (
                PredicateShape::Compare { field, value, .. },
                Predicate::Compare {
                    field: f, value: v, ..
                },
            ) => {
                b.bind(field, Bound::Path(f.clone()));
                b.bind(value, literal(v.clone()));
            }
            (PredicateShape::Like { field, pattern, .. }, Predicate::Like { field: f, pattern: p }) => {
                b.bind(field, Bound::Path(f.clone()));
                b.bind(pattern, literal(Value::String(p.regex_body())));
            }
            (PredicateShape::InList { field, values }, Predicate::InList { field: f, values: vs })
            | (
                PredicateShape::NotInList { field, values },
                Predicate::NotInList { field: f, values: vs },
            ) => {
                if vs.is_empty() {
                    return Err(arity(rule, values.name(), "at least one value", "an empty list"));
                }
                b.bind(field, Bound::Path(f.clone()));
                b.bind(values, literal(Value::Array(vs.clone())));
            }
            (PredicateShape::SizeEquals { field, size }, Predicate::SizeEquals { field: f, size: n }) => {
                b.bind(field, Bound::Path(f.clone()));
                b.bind(size, literal(Value::from(*n)));
            }
            (
                PredicateShape::ElementMatch { field, condition },
                Predicate::ExistsSubquery {
                    field: f,
                    condition: c,
                },
            ) => {
                b.bind(field, Bound::Path(f.clone()));
                let inner = self.translate_predicate(c)?;
                b.bind(condition, Bound::Value(DocValue::Document(inner)));
            }
            (PredicateShape::AllOf { operands, .. }, Predicate::And(children))
            | (PredicateShape::AnyOf { operands }, Predicate::Or(children)) => {
                if children.is_empty() {
                    return Err(arity(rule, operands.name(), "at least one operand", "none"));
                }
                let docs = children
                    .iter()
                    .map(|c| self.translate_predicate(c).map(DocValue::Document))
                    .collect::<Result<Vec<_>, _>>()?;
                b.bind(operands, Bound::Value(DocValue::Array(docs)));
            }
            _ => {
                return Err(TranslateError::NoMatchingPattern {
                    subject: format!("{} predicate", predicate.kind_name()),
                })
            }
        }
        Ok(b)
    }

    fn statement_bindings(
        &self,
        rule: &PatternRule,
        shape: &StatementShape,
        d: &QueryDescriptor,
    ) -> Result<Bindings, TranslateError> {
        let mut b = Bindings::new();
        let filter = match &d.predicate {
            Some(p) => self.translate_predicate(p)?,
            None => Document::new(),
        };

        match shape {
            StatementShape::Select { filter: f } => {
                b.bind(f, Bound::Value(filter.into()));
            }
            StatementShape::Projected {
                filter: f,
                projection,
            } => {
                b.bind(f, Bound::Value(filter.into()));
                b.bind(projection, Bound::Projection(projection_of(&d.projection)));
            }
            StatementShape::Distinct { field, filter: f } => {
                let [single] = d.projection.fields.as_slice() else {
                    return Err(arity(
                        rule,
                        field.name(),
                        "exactly one projected field",
                        &format!("{} fields", d.projection.fields.len()),
                    ));
                };
                b.bind(field, Bound::Path(single.clone()));
                b.bind(f, Bound::Value(filter.into()));
            }
            StatementShape::Grouped { filter: f, group } => {
                let (spec, _) = group_spec(rule, group.name(), d)?;
                b.bind(f, Bound::Value(filter.into()));
                b.bind(group, Bound::Group(spec));
            }
            StatementShape::GroupedHaving {
                filter: f,
                group,
                having,
            } => {
                let (spec, having_doc) = group_spec(rule, group.name(), d)?;
                b.bind(f, Bound::Value(filter.into()));
                b.bind(group, Bound::Group(spec));
                b.bind(having, Bound::Value(having_doc.into()));
            }
            StatementShape::Update {
                filter: f,
                assignments,
                ..
            } => {
                if d.update.is_empty() {
                    return Err(arity(rule, assignments.name(), "at least one assignment", "none"));
                }
                let set: Document = d
                    .update
                    .iter()
                    .map(|a| (a.update_path(), DocValue::Literal(a.value.clone())))
                    .collect();
                b.bind(f, Bound::Value(filter.into()));
                b.bind(assignments, Bound::Value(set.into()));
            }
        }
        Ok(b)
    }
}

fn literal(value: Value) -> Bound {
    Bound::Value(DocValue::Literal(value))
}

fn arity(rule: &PatternRule, placeholder: &str, expected: &str, found: &str) -> TranslateError {
    TranslateError::BindingArityMismatch {
        rule: rule.id.clone(),
        placeholder: placeholder.to_string(),
        expected: expected.to_string(),
        found: found.to_string(),
    }
}

fn no_match(d: &QueryDescriptor) -> TranslateError {
    TranslateError::NoMatchingPattern {
        subject: describe_statement(d),
    }
}

fn describe_statement(d: &QueryDescriptor) -> String {
    let mut features = Vec::new();
    if d.is_update() {
        if d.update_target().is_none() {
            features.push("update with mixed element targets");
        } else {
            features.push("update");
        }
    }
    if d.is_grouped() {
        features.push("grouping");
    }
    if d.distinct {
        features.push("distinct");
    }
    if !d.projection.is_empty() {
        features.push("projection");
    }
    if features.is_empty() {
        features.push("plain select");
    }
    format!("statement on '{}' ({})", d.collection, features.join(", "))
}

fn projection_of(selection: &FieldSelection) -> Projection {
    let fields = selection
        .fields
        .iter()
        .map(|f| (f.clone(), true))
        .chain(selection.excluded.iter().map(|f| (f.clone(), false)))
        .collect();
    Projection {
        include_id: selection.exclude_id.then_some(false),
        fields,
    }
}

fn accumulator(
    rule: &PatternRule,
    placeholder: &str,
    aggregation: &Aggregation,
) -> Result<Document, TranslateError> {
    let operator = match aggregation.function {
        AggregateFn::Count => return Ok(Document::single("$sum", Value::from(1))),
        AggregateFn::Sum => "$sum",
        AggregateFn::Avg => "$avg",
        AggregateFn::Min => "$min",
        AggregateFn::Max => "$max",
    };
    let field = aggregation.field.as_ref().ok_or_else(|| {
        arity(
            rule,
            placeholder,
            &format!("a field for {}", aggregation.function.name()),
            "none",
        )
    })?;
    Ok(Document::single(operator, DocValue::FieldRef(field.clone())))
}

/// Build the `$group` contents and the filter on aggregated values.
///
/// Having conditions reuse a declared aggregation computing the same value;
/// otherwise an accumulator is added under the condition's default name.
fn group_spec(
    rule: &PatternRule,
    placeholder: &str,
    d: &QueryDescriptor,
) -> Result<(GroupSpec, Document), TranslateError> {
    let mut accumulators = Document::new();
    for aggregation in &d.aggregation {
        accumulators.insert(
            aggregation.output_name(),
            accumulator(rule, placeholder, aggregation)?,
        );
    }

    let mut having = Document::new();
    for condition in &d.having {
        let name = match d
            .aggregation
            .iter()
            .find(|a| a.same_value(&condition.aggregate))
        {
            Some(declared) => declared.output_name(),
            None => implicit_accumulator(
                &mut accumulators,
                condition.aggregate.output_name(),
                accumulator(rule, placeholder, &condition.aggregate)?,
            ),
        };

        let mut ops = match having.get(&name) {
            Some(DocValue::Document(existing)) => existing.clone(),
            _ => Document::new(),
        };
        ops.insert(condition.op.operator(), condition.value.clone());
        having.insert(name, ops);
    }

    Ok((
        GroupSpec {
            keys: d.grouping_keys.clone(),
            accumulators,
        },
        having,
    ))
}

/// Name under which `expr` is accumulated, adding it if needed.
///
/// `base` is reused when it already holds the same expression; when a
/// different aggregate owns it, the first free `base_N` is taken.
fn implicit_accumulator(accumulators: &mut Document, base: String, expr: Document) -> String {
    let expr = DocValue::Document(expr);
    let mut name = base.clone();
    let mut suffix = 0;
    loop {
        match accumulators.get(&name) {
            None => {
                accumulators.insert(name.clone(), expr);
                return name;
            }
            Some(existing) if *existing == expr => return name,
            Some(_) => {
                suffix += 1;
                name = format!("{}_{}", base, suffix);
            }
        }
    }
}
