//! The standard rule set.
//!
//! Order matters: lookups return the first match, so narrower classes
//! (`and-disjoint`, `group-having`) are registered before the broader ones
//! they overlap with.

use super::shape::{ph, PredicateShape, RelationalShape, StatementShape};
use super::template::{hole, keyed, operator, DocumentShape, EntryTemplate, StageTemplate, ValueTemplate};
use super::PatternRule;
use crate::descriptor::{CompareOp, ElementTarget, LikeClass};

fn predicate(id: &str, shape: PredicateShape, filter: ValueTemplate) -> PatternRule {
    PatternRule::new(
        id,
        RelationalShape::Predicate(shape),
        DocumentShape::Filter(filter),
    )
}

fn statement(id: &str, shape: StatementShape, document: DocumentShape) -> PatternRule {
    PatternRule::new(id, RelationalShape::Statement(shape), document)
}

fn comparison(id: &str, op: CompareOp, description: &str) -> PatternRule {
    let (field, value) = (ph("field"), ph("value"));
    let filter = match op {
        CompareOp::Eq => keyed(&field, hole(&value)),
        other => keyed(&field, operator(other.operator(), hole(&value))),
    };
    predicate(id, PredicateShape::Compare { op, field, value }, filter).with_description(description)
}

fn like(id: &str, class: LikeClass, prefix: &str, suffix: &str, description: &str) -> PatternRule {
    let (field, pattern) = (ph("field"), ph("pattern"));
    let filter = keyed(
        &field,
        ValueTemplate::Regex {
            prefix: prefix.to_string(),
            body: pattern.clone(),
            suffix: suffix.to_string(),
            flags: String::new(),
        },
    );
    predicate(
        id,
        PredicateShape::Like {
            class,
            field,
            pattern,
        },
        filter,
    )
    .with_description(description)
}

fn update(id: &str, target: ElementTarget, description: &str) -> PatternRule {
    let (filter, assignments) = (ph("filter"), ph("assignments"));
    statement(
        id,
        StatementShape::Update {
            target,
            filter: filter.clone(),
            assignments: assignments.clone(),
        },
        DocumentShape::UpdateMany {
            filter: hole(&filter),
            update: operator("$set", hole(&assignments)),
        },
    )
    .with_description(description)
}

/// Standard rules in lookup order.
pub fn standard_rules() -> Vec<PatternRule> {
    let field = ph("field");
    let values = ph("values");
    let operands = ph("operands");
    let filter = ph("filter");
    let group = ph("group");

    vec![
        comparison("equals", CompareOp::Eq, "Equality on a (possibly nested) field"),
        comparison("not-equals", CompareOp::Ne, "Inequality"),
        comparison("greater-than", CompareOp::Gt, "Strictly greater than"),
        comparison("greater-or-equal", CompareOp::Gte, "Greater than or equal"),
        comparison("less-than", CompareOp::Lt, "Strictly less than"),
        comparison("less-or-equal", CompareOp::Lte, "Less than or equal"),
        like("like-contains", LikeClass::Contains, ".*", ".*", "Substring match"),
        like("like-prefix", LikeClass::Prefix, "^", ".*", "Prefix match"),
        like("like-suffix", LikeClass::Suffix, ".*", "$", "Suffix match"),
        like("like-pattern", LikeClass::General, "", "", "Arbitrary LIKE pattern"),
        predicate(
            "in-list",
            PredicateShape::InList {
                field: field.clone(),
                values: values.clone(),
            },
            keyed(&field, operator("$in", hole(&values))),
        )
        .with_description("Membership in a list or nested collection"),
        predicate(
            "not-in-list",
            PredicateShape::NotInList {
                field: field.clone(),
                values: values.clone(),
            },
            keyed(&field, operator("$nin", hole(&values))),
        )
        .with_description("Negated membership"),
        predicate(
            "size-equals",
            PredicateShape::SizeEquals {
                field: field.clone(),
                size: ph("size"),
            },
            keyed(&field, operator("$size", hole(&ph("size")))),
        )
        .with_description("Array length, including emptiness checks"),
        predicate(
            "element-match",
            PredicateShape::ElementMatch {
                field: field.clone(),
                condition: ph("condition"),
            },
            keyed(&field, operator("$elemMatch", hole(&ph("condition")))),
        )
        .with_description("EXISTS subquery over an embedded array"),
        predicate(
            "and-disjoint",
            PredicateShape::AllOf {
                disjoint: true,
                operands: operands.clone(),
            },
            ValueTemplate::Document(vec![EntryTemplate::Merge(operands.clone())]),
        )
        .with_description("Conjunction on distinct fields, merged into one document"),
        predicate(
            "and",
            PredicateShape::AllOf {
                disjoint: false,
                operands: operands.clone(),
            },
            operator("$and", hole(&operands)),
        )
        .with_description("General conjunction"),
        predicate(
            "or",
            PredicateShape::AnyOf {
                operands: operands.clone(),
            },
            operator("$or", hole(&operands)),
        )
        .with_description("Disjunction"),
        update("update-set", ElementTarget::Whole, "UPDATE with criteria"),
        update(
            "update-matched-element",
            ElementTarget::Matched,
            "Update the embedded array element matched by the filter",
        ),
        update(
            "update-all-elements",
            ElementTarget::All,
            "Update every element of an embedded array",
        ),
        statement(
            "group-having",
            StatementShape::GroupedHaving {
                filter: filter.clone(),
                group: group.clone(),
                having: ph("having"),
            },
            DocumentShape::Aggregate {
                stages: vec![
                    StageTemplate::Match(hole(&filter)),
                    StageTemplate::Group(group.clone()),
                    StageTemplate::HavingMatch(hole(&ph("having"))),
                ],
            },
        )
        .with_description("GROUP BY with HAVING"),
        statement(
            "group",
            StatementShape::Grouped {
                filter: filter.clone(),
                group: group.clone(),
            },
            DocumentShape::Aggregate {
                stages: vec![
                    StageTemplate::Match(hole(&filter)),
                    StageTemplate::Group(group),
                ],
            },
        )
        .with_description("GROUP BY / aggregate functions"),
        statement(
            "distinct",
            StatementShape::Distinct {
                field: field.clone(),
                filter: filter.clone(),
            },
            DocumentShape::Distinct {
                field,
                filter: hole(&filter),
            },
        )
        .with_description("SELECT DISTINCT on one field"),
        statement(
            "select-projected",
            StatementShape::Projected {
                filter: filter.clone(),
                projection: ph("projection"),
            },
            DocumentShape::Find {
                filter: hole(&filter),
                projection: Some(ph("projection")),
            },
        )
        .with_description("SELECT with a field list"),
        statement(
            "select",
            StatementShape::Select {
                filter: filter.clone(),
            },
            DocumentShape::Find {
                filter: hole(&filter),
                projection: None,
            },
        )
        .with_description("SELECT * with optional WHERE"),
    ]
}
