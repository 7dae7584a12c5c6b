//! Sample instances of rules.
//!
//! `PatternRule::example` instantiates a rule's relational shape with fixed
//! sample values and returns the descriptor together with the bindings a
//! translator is expected to extract from it. The CLI prints these as a
//! cheatsheet; tests use them to check that translation of every rule
//! agrees with its own document shape.
//!
//! Sub-filter bindings (`condition`, `operands`, `filter`) are written in
//! the form the standard comparison rules produce.

use super::shape::{Placeholder, PredicateShape, RelationalShape, StatementShape};
use super::template::{Bindings, Bound};
use super::PatternRule;
use crate::descriptor::{
    AggregateFn, Aggregation, Assignment, CompareOp, ElementTarget, FieldSelection,
    HavingCondition, LikeClass, LikePattern, Predicate, QueryDescriptor,
};
use crate::ir::{DocValue, Document, GroupSpec, Projection};
use serde_json::{json, Value};

/// A rule instantiated with sample values.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleExample {
    pub descriptor: QueryDescriptor,
    /// Expected bindings for the rule's placeholders
    pub bindings: Bindings,
}

const SAMPLE_COLLECTION: &str = "inventory";

fn compare(op: CompareOp, field: &str, value: Value) -> Predicate {
    Predicate::Compare {
        op,
        field: field.to_string(),
        value,
    }
}

fn path(p: &str) -> Bound {
    Bound::Path(p.to_string())
}

fn literal(v: Value) -> Bound {
    Bound::Value(DocValue::Literal(v))
}

fn document(doc: Document) -> Bound {
    Bound::Value(DocValue::Document(doc))
}

fn documents(docs: Vec<Document>) -> Bound {
    Bound::Value(DocValue::Array(docs.into_iter().map(DocValue::Document).collect()))
}

/// `status = "A"` and its document form
fn sample_filter() -> (Predicate, Document) {
    (
        compare(CompareOp::Eq, "status", json!("A")),
        Document::single("status", json!("A")),
    )
}

impl PatternRule {
    /// Instantiate the rule with sample values.
    pub fn example(&self) -> RuleExample {
        match &self.relational {
            RelationalShape::Predicate(shape) => {
                let (predicate, bindings) = predicate_example(shape);
                RuleExample {
                    descriptor: QueryDescriptor::new(SAMPLE_COLLECTION).with_predicate(predicate),
                    bindings,
                }
            }
            RelationalShape::Statement(shape) => statement_example(shape),
        }
    }
}

fn predicate_example(shape: &PredicateShape) -> (Predicate, Bindings) {
    let mut b = Bindings::new();
    let predicate = match shape {
        PredicateShape::Compare { op, field, value } => {
            b.bind(field, path("qty"));
            b.bind(value, literal(json!(20)));
            compare(*op, "qty", json!(20))
        }
        PredicateShape::Like {
            class,
            field,
            pattern,
        } => {
            let raw = match class {
                LikeClass::Contains => "%BOOK%",
                LikeClass::Prefix => "BOOK%",
                LikeClass::Suffix => "%BOOK",
                LikeClass::General => "B_OK%S",
            };
            let like = LikePattern::classify(raw);
            b.bind(field, path("description"));
            b.bind(pattern, literal(Value::String(like.regex_body())));
            Predicate::Like {
                field: "description".to_string(),
                pattern: like,
            }
        }
        PredicateShape::InList { field, values } | PredicateShape::NotInList { field, values } => {
            let list = vec![json!("red"), json!("blank")];
            b.bind(field, path("tags"));
            b.bind(values, literal(Value::Array(list.clone())));
            if matches!(shape, PredicateShape::InList { .. }) {
                Predicate::InList {
                    field: "tags".to_string(),
                    values: list,
                }
            } else {
                Predicate::NotInList {
                    field: "tags".to_string(),
                    values: list,
                }
            }
        }
        PredicateShape::SizeEquals { field, size } => {
            b.bind(field, path("items"));
            b.bind(size, literal(json!(0)));
            Predicate::SizeEquals {
                field: "items".to_string(),
                size: 0,
            }
        }
        PredicateShape::ElementMatch { field, condition } => {
            b.bind(field, path("items"));
            b.bind(condition, document(Document::single("sku", json!("abc"))));
            Predicate::ExistsSubquery {
                field: "items".to_string(),
                condition: Box::new(compare(CompareOp::Eq, "sku", json!("abc"))),
            }
        }
        PredicateShape::AllOf { disjoint, operands } => {
            let (first, first_doc) = sample_filter();
            let (second, second_doc) = if *disjoint {
                (
                    compare(CompareOp::Lt, "qty", json!(30)),
                    Document::single("qty", Document::single("$lt", json!(30))),
                )
            } else {
                (
                    compare(CompareOp::Eq, "status", json!("D")),
                    Document::single("status", json!("D")),
                )
            };
            b.bind(operands, documents(vec![first_doc, second_doc]));
            Predicate::And(vec![first, second])
        }
        PredicateShape::AnyOf { operands } => {
            let (first, first_doc) = sample_filter();
            b.bind(
                operands,
                documents(vec![
                    first_doc,
                    Document::single("qty", Document::single("$lt", json!(30))),
                ]),
            );
            Predicate::Or(vec![first, compare(CompareOp::Lt, "qty", json!(30))])
        }
    };
    (predicate, b)
}

fn bind_filter(b: &mut Bindings, descriptor: &mut QueryDescriptor, filter: &Placeholder) {
    let (predicate, doc) = sample_filter();
    descriptor.predicate = Some(predicate);
    b.bind(filter, document(doc));
}

fn statement_example(shape: &StatementShape) -> RuleExample {
    let mut d = QueryDescriptor::new(SAMPLE_COLLECTION);
    let mut b = Bindings::new();

    match shape {
        StatementShape::Select { filter } => bind_filter(&mut b, &mut d, filter),
        StatementShape::Projected { filter, projection } => {
            bind_filter(&mut b, &mut d, filter);
            d.projection = FieldSelection {
                fields: vec!["item".to_string(), "status".to_string()],
                excluded: Vec::new(),
                exclude_id: true,
            };
            b.bind(
                projection,
                Bound::Projection(Projection {
                    include_id: Some(false),
                    fields: vec![("item".to_string(), true), ("status".to_string(), true)],
                }),
            );
        }
        StatementShape::Distinct { field, filter } => {
            bind_filter(&mut b, &mut d, filter);
            d.distinct = true;
            d.projection.fields = vec!["item".to_string()];
            b.bind(field, path("item"));
        }
        StatementShape::Grouped { filter, group } => {
            bind_filter(&mut b, &mut d, filter);
            d.grouping_keys = vec!["cust_id".to_string()];
            d.aggregation = vec![Aggregation {
                function: AggregateFn::Sum,
                field: Some("price".to_string()),
                alias: Some("total".to_string()),
            }];
            b.bind(
                group,
                Bound::Group(GroupSpec {
                    keys: vec!["cust_id".to_string()],
                    accumulators: Document::single(
                        "total",
                        Document::single("$sum", DocValue::FieldRef("price".to_string())),
                    ),
                }),
            );
        }
        StatementShape::GroupedHaving {
            filter,
            group,
            having,
        } => {
            bind_filter(&mut b, &mut d, filter);
            d.grouping_keys = vec!["cust_id".to_string()];
            d.having = vec![HavingCondition {
                aggregate: Aggregation {
                    function: AggregateFn::Count,
                    field: None,
                    alias: None,
                },
                op: CompareOp::Gt,
                value: json!(1),
            }];
            b.bind(
                group,
                Bound::Group(GroupSpec {
                    keys: vec!["cust_id".to_string()],
                    accumulators: Document::single("count", Document::single("$sum", json!(1))),
                }),
            );
            b.bind(
                having,
                document(Document::single(
                    "count",
                    Document::single("$gt", json!(1)),
                )),
            );
        }
        StatementShape::Update {
            target,
            filter,
            assignments,
        } => {
            bind_filter(&mut b, &mut d, filter);
            let assignment = match target {
                ElementTarget::Whole => Assignment {
                    array: None,
                    field: Some("status".to_string()),
                    value: json!("D"),
                    target: ElementTarget::Whole,
                },
                ElementTarget::Matched => Assignment {
                    array: Some("items".to_string()),
                    field: Some("qty".to_string()),
                    value: json!(5),
                    target: ElementTarget::Matched,
                },
                ElementTarget::All => Assignment {
                    array: Some("grades".to_string()),
                    field: None,
                    value: json!(0),
                    target: ElementTarget::All,
                },
            };
            b.bind(
                assignments,
                document(Document::single(
                    assignment.update_path(),
                    assignment.value.clone(),
                )),
            );
            d.update = vec![assignment];
        }
    }

    RuleExample {
        descriptor: d,
        bindings: b,
    }
}
