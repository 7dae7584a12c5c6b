//! Document shapes: the right-hand side of a pattern rule.
//!
//! Templates mirror the IR in `crate::ir` with placeholder holes.
//! `DocumentShape::substitute` fills every hole from a `Bindings` map and
//! returns plain IR; a hole without a binding is an error, so substituted
//! output never carries placeholders.

use crate::catalog::shape::Placeholder;
use crate::error::TranslateError;
use crate::ir::{DocOperation, DocValue, Document, GroupSpec, Projection, Stage};
use serde_json::Value;
use std::collections::BTreeMap;

/// Value bound to a placeholder for one rule application.
#[derive(Debug, Clone, PartialEq)]
pub enum Bound {
    /// Field path (`address.city`)
    Path(String),
    Value(DocValue),
    Projection(Projection),
    Group(GroupSpec),
}

impl Bound {
    fn describe(&self) -> &'static str {
        match self {
            Bound::Path(_) => "a field path",
            Bound::Value(DocValue::Document(_)) => "a document",
            Bound::Value(DocValue::Array(_)) => "an array",
            Bound::Value(_) => "a value",
            Bound::Projection(_) => "a projection",
            Bound::Group(_) => "a group spec",
        }
    }
}

/// Placeholder → bound value, unique per rule application.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    values: BTreeMap<Placeholder, Bound>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, placeholder: &Placeholder, value: Bound) {
        self.values.insert(placeholder.clone(), value);
    }

    pub fn with(mut self, placeholder: &Placeholder, value: Bound) -> Self {
        self.bind(placeholder, value);
        self
    }

    pub fn get(&self, placeholder: &Placeholder) -> Option<&Bound> {
        self.values.get(placeholder)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Placeholder, &Bound)> {
        self.values.iter()
    }
}

/// Document key, literal or bound to a field path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyTemplate {
    Const(String),
    Hole(Placeholder),
}

/// One entry of a document template.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryTemplate {
    Entry {
        key: KeyTemplate,
        value: ValueTemplate,
    },
    /// Splice in the entries of the bound document(s)
    Merge(Placeholder),
}

/// Value template.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueTemplate {
    Const(DocValue),
    /// Replaced by the bound value (a field path becomes a string literal)
    Hole(Placeholder),
    /// Regex literal wrapping the bound (already escaped) body
    Regex {
        prefix: String,
        body: Placeholder,
        suffix: String,
        flags: String,
    },
    Document(Vec<EntryTemplate>),
}

/// Aggregation stage template.
#[derive(Debug, Clone, PartialEq)]
pub enum StageTemplate {
    Match(ValueTemplate),
    Group(Placeholder),
    HavingMatch(ValueTemplate),
}

/// Right-hand side of a pattern rule.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentShape {
    /// Filter document for a predicate rule
    Filter(ValueTemplate),
    Find {
        filter: ValueTemplate,
        projection: Option<Placeholder>,
    },
    Distinct {
        field: Placeholder,
        filter: ValueTemplate,
    },
    Aggregate {
        stages: Vec<StageTemplate>,
    },
    UpdateMany {
        filter: ValueTemplate,
        update: ValueTemplate,
    },
}

/// Result of substituting bindings into a `DocumentShape`.
#[derive(Debug, Clone, PartialEq)]
pub enum Substituted {
    Filter(Document),
    Operation(DocOperation),
}

// ============================================================================
// Template construction helpers
// ============================================================================

/// `{<key>: <value>}` with the key bound to a placeholder
pub fn keyed(key: &Placeholder, value: ValueTemplate) -> ValueTemplate {
    ValueTemplate::Document(vec![EntryTemplate::Entry {
        key: KeyTemplate::Hole(key.clone()),
        value,
    }])
}

/// `{<operator>: <value>}` with a constant key
pub fn operator(op: &str, value: ValueTemplate) -> ValueTemplate {
    ValueTemplate::Document(vec![EntryTemplate::Entry {
        key: KeyTemplate::Const(op.to_string()),
        value,
    }])
}

pub fn hole(placeholder: &Placeholder) -> ValueTemplate {
    ValueTemplate::Hole(placeholder.clone())
}

impl DocumentShape {
    pub fn kind(&self) -> &'static str {
        match self {
            DocumentShape::Filter(_) => "predicate",
            _ => "statement",
        }
    }

    /// Every placeholder referenced by the template, in traversal order
    pub fn placeholders(&self) -> Vec<&Placeholder> {
        let mut out = Vec::new();
        match self {
            DocumentShape::Filter(value) => collect_value(value, &mut out),
            DocumentShape::Find { filter, projection } => {
                collect_value(filter, &mut out);
                out.extend(projection.iter());
            }
            DocumentShape::Distinct { field, filter } => {
                out.push(field);
                collect_value(filter, &mut out);
            }
            DocumentShape::Aggregate { stages } => {
                for stage in stages {
                    match stage {
                        StageTemplate::Match(v) | StageTemplate::HavingMatch(v) => {
                            collect_value(v, &mut out)
                        }
                        StageTemplate::Group(p) => out.push(p),
                    }
                }
            }
            DocumentShape::UpdateMany { filter, update } => {
                collect_value(filter, &mut out);
                collect_value(update, &mut out);
            }
        }
        out
    }

    /// Fill every hole from `bindings`.
    pub fn substitute(&self, rule: &str, bindings: &Bindings) -> Result<Substituted, TranslateError> {
        let ctx = Substitution { rule, bindings };
        let substituted = match self {
            DocumentShape::Filter(value) => Substituted::Filter(ctx.document(value)?),
            DocumentShape::Find { filter, projection } => {
                let projection = match projection {
                    Some(p) => Some(ctx.projection(p)?),
                    None => None,
                };
                Substituted::Operation(DocOperation::Find {
                    filter: ctx.document(filter)?,
                    projection,
                })
            }
            DocumentShape::Distinct { field, filter } => {
                Substituted::Operation(DocOperation::Distinct {
                    field: ctx.path(field)?,
                    filter: ctx.document(filter)?,
                })
            }
            DocumentShape::Aggregate { stages } => {
                let stages = stages
                    .iter()
                    .map(|stage| {
                        Ok(match stage {
                            StageTemplate::Match(v) => Stage::Match(ctx.document(v)?),
                            StageTemplate::Group(p) => Stage::Group(ctx.group(p)?),
                            StageTemplate::HavingMatch(v) => Stage::HavingMatch(ctx.document(v)?),
                        })
                    })
                    .collect::<Result<Vec<_>, TranslateError>>()?;
                Substituted::Operation(DocOperation::Aggregate { stages })
            }
            DocumentShape::UpdateMany { filter, update } => {
                Substituted::Operation(DocOperation::UpdateMany {
                    filter: ctx.document(filter)?,
                    update: ctx.document(update)?,
                })
            }
        };
        Ok(substituted)
    }
}

fn collect_value<'a>(value: &'a ValueTemplate, out: &mut Vec<&'a Placeholder>) {
    match value {
        ValueTemplate::Const(_) => {}
        ValueTemplate::Hole(p) => out.push(p),
        ValueTemplate::Regex { body, .. } => out.push(body),
        ValueTemplate::Document(entries) => {
            for entry in entries {
                match entry {
                    EntryTemplate::Entry { key, value } => {
                        if let KeyTemplate::Hole(p) = key {
                            out.push(p);
                        }
                        collect_value(value, out);
                    }
                    EntryTemplate::Merge(p) => out.push(p),
                }
            }
        }
    }
}

struct Substitution<'a> {
    rule: &'a str,
    bindings: &'a Bindings,
}

impl Substitution<'_> {
    fn lookup(&self, placeholder: &Placeholder) -> Result<&Bound, TranslateError> {
        self.bindings
            .get(placeholder)
            .ok_or_else(|| TranslateError::BindingArityMismatch {
                rule: self.rule.to_string(),
                placeholder: placeholder.to_string(),
                expected: "a bound value".to_string(),
                found: "nothing".to_string(),
            })
    }

    fn kind_mismatch(&self, placeholder: &Placeholder, expected: &'static str) -> TranslateError {
        TranslateError::BindingKindMismatch {
            rule: self.rule.to_string(),
            placeholder: placeholder.to_string(),
            expected,
        }
    }

    fn path(&self, placeholder: &Placeholder) -> Result<String, TranslateError> {
        match self.lookup(placeholder)? {
            Bound::Path(path) => Ok(path.clone()),
            Bound::Value(DocValue::Literal(Value::String(s))) => Ok(s.clone()),
            _ => Err(self.kind_mismatch(placeholder, "a field path")),
        }
    }

    fn projection(&self, placeholder: &Placeholder) -> Result<Projection, TranslateError> {
        match self.lookup(placeholder)? {
            Bound::Projection(p) => Ok(p.clone()),
            _ => Err(self.kind_mismatch(placeholder, "a projection")),
        }
    }

    fn group(&self, placeholder: &Placeholder) -> Result<GroupSpec, TranslateError> {
        match self.lookup(placeholder)? {
            Bound::Group(g) => Ok(g.clone()),
            _ => Err(self.kind_mismatch(placeholder, "a group spec")),
        }
    }

    fn document(&self, template: &ValueTemplate) -> Result<Document, TranslateError> {
        match self.value(template)? {
            DocValue::Document(doc) => Ok(doc),
            _ => match template {
                ValueTemplate::Hole(p) => Err(self.kind_mismatch(p, "a document")),
                _ => Err(TranslateError::BindingKindMismatch {
                    rule: self.rule.to_string(),
                    placeholder: String::new(),
                    expected: "a document",
                }),
            },
        }
    }

    fn value(&self, template: &ValueTemplate) -> Result<DocValue, TranslateError> {
        match template {
            ValueTemplate::Const(v) => Ok(v.clone()),
            ValueTemplate::Hole(p) => match self.lookup(p)? {
                Bound::Path(path) => Ok(DocValue::Literal(Value::String(path.clone()))),
                Bound::Value(v) => Ok(v.clone()),
                other => Err(self.kind_mismatch(p, other.describe())),
            },
            ValueTemplate::Regex {
                prefix,
                body,
                suffix,
                flags,
            } => match self.lookup(body)? {
                Bound::Value(DocValue::Literal(Value::String(s))) => Ok(DocValue::Regex {
                    body: format!("{}{}{}", prefix, s, suffix),
                    flags: flags.clone(),
                }),
                _ => Err(self.kind_mismatch(body, "a regex body string")),
            },
            ValueTemplate::Document(entries) => {
                let mut doc = Document::new();
                for entry in entries {
                    match entry {
                        EntryTemplate::Entry { key, value } => {
                            let key = match key {
                                KeyTemplate::Const(k) => k.clone(),
                                KeyTemplate::Hole(p) => self.path(p)?,
                            };
                            doc.insert(key, self.value(value)?);
                        }
                        EntryTemplate::Merge(p) => self.merge_into(p, &mut doc)?,
                    }
                }
                Ok(DocValue::Document(doc))
            }
        }
    }

    fn merge_into(&self, placeholder: &Placeholder, doc: &mut Document) -> Result<(), TranslateError> {
        let parts: Vec<&Document> = match self.lookup(placeholder)? {
            Bound::Value(DocValue::Document(d)) => vec![d],
            Bound::Value(DocValue::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_document()
                        .ok_or_else(|| self.kind_mismatch(placeholder, "documents to merge"))
                })
                .collect::<Result<_, _>>()?,
            _ => return Err(self.kind_mismatch(placeholder, "documents to merge")),
        };
        for part in parts {
            for (k, v) in part.entries() {
                doc.insert(k.clone(), v.clone());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::shape::ph;
    use serde_json::json;

    fn bindings() -> Bindings {
        Bindings::new()
            .with(&ph("field"), Bound::Path("address.city".to_string()))
            .with(&ph("value"), Bound::Value(json!("Paris").into()))
    }

    #[test]
    fn test_substitute_keyed_filter() {
        let shape = DocumentShape::Filter(keyed(&ph("field"), hole(&ph("value"))));
        let result = shape.substitute("equals", &bindings()).unwrap();
        assert_eq!(
            result,
            Substituted::Filter(Document::single("address.city", json!("Paris")))
        );
    }

    #[test]
    fn test_missing_binding_is_arity_mismatch() {
        let shape = DocumentShape::Filter(keyed(&ph("field"), hole(&ph("other"))));
        let err = shape.substitute("broken", &bindings()).unwrap_err();
        assert!(matches!(
            err,
            TranslateError::BindingArityMismatch { ref placeholder, .. } if placeholder == "other"
        ));
    }

    #[test]
    fn test_regex_template_wraps_body() {
        let shape = DocumentShape::Filter(keyed(
            &ph("field"),
            ValueTemplate::Regex {
                prefix: ".*".to_string(),
                body: ph("value"),
                suffix: ".*".to_string(),
                flags: String::new(),
            },
        ));
        let Substituted::Filter(doc) = shape.substitute("like", &bindings()).unwrap() else {
            panic!("expected filter");
        };
        assert_eq!(
            doc.get("address.city"),
            Some(&DocValue::Regex {
                body: ".*Paris.*".to_string(),
                flags: String::new()
            })
        );
    }

    #[test]
    fn test_merge_splices_documents() {
        let shape = DocumentShape::Filter(ValueTemplate::Document(vec![EntryTemplate::Merge(
            ph("operands"),
        )]));
        let operands = DocValue::Array(vec![
            Document::single("a", json!(1)).into(),
            Document::single("b", json!(2)).into(),
        ]);
        let b = Bindings::new().with(&ph("operands"), Bound::Value(operands));
        let Substituted::Filter(doc) = shape.substitute("and-disjoint", &b).unwrap() else {
            panic!("expected filter");
        };
        assert_eq!(doc.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_projection_kind_mismatch() {
        let shape = DocumentShape::Find {
            filter: ValueTemplate::Const(Document::new().into()),
            projection: Some(ph("field")),
        };
        let err = shape.substitute("select-projected", &bindings()).unwrap_err();
        assert!(matches!(err, TranslateError::BindingKindMismatch { .. }));
    }

    #[test]
    fn test_placeholders_in_traversal_order() {
        let shape = DocumentShape::Filter(keyed(
            &ph("field"),
            operator("$in", hole(&ph("values"))),
        ));
        let names: Vec<&str> = shape.placeholders().iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["field", "values"]);
    }
}
