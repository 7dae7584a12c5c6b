//! Connective flattening.
//!
//! `and(a, and(b, c))` becomes `and(a, b, c)` (likewise for `or`), and a
//! connective with a single operand is replaced by that operand. Applies
//! inside exists-subquery conditions too.

use crate::descriptor::{Predicate, QueryDescriptor};
use crate::error::ParseError;
use crate::transform::DescriptorTransform;

pub struct FlattenTransform;

impl DescriptorTransform for FlattenTransform {
    fn name(&self) -> &'static str {
        "flatten"
    }

    fn transform(&self, mut descriptor: QueryDescriptor) -> Result<QueryDescriptor, ParseError> {
        descriptor.predicate = descriptor.predicate.map(flatten);
        Ok(descriptor)
    }
}

fn flatten(predicate: Predicate) -> Predicate {
    match predicate {
        Predicate::And(operands) => collapse(splice(operands, true), Predicate::And),
        Predicate::Or(operands) => collapse(splice(operands, false), Predicate::Or),
        Predicate::ExistsSubquery { field, condition } => Predicate::ExistsSubquery {
            field,
            condition: Box::new(flatten(*condition)),
        },
        leaf => leaf,
    }
}

/// Flatten operands, inlining children of the same connective.
fn splice(operands: Vec<Predicate>, conjunction: bool) -> Vec<Predicate> {
    let mut out = Vec::with_capacity(operands.len());
    for operand in operands.into_iter().map(flatten) {
        match operand {
            Predicate::And(inner) if conjunction => out.extend(inner),
            Predicate::Or(inner) if !conjunction => out.extend(inner),
            other => out.push(other),
        }
    }
    out
}

fn collapse(mut operands: Vec<Predicate>, wrap: fn(Vec<Predicate>) -> Predicate) -> Predicate {
    if operands.len() == 1 {
        if let Some(only) = operands.pop() {
            return only;
        }
    }
    wrap(operands)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::CompareOp;
    use serde_json::json;

    fn eq(field: &str) -> Predicate {
        Predicate::Compare {
            op: CompareOp::Eq,
            field: field.to_string(),
            value: json!(1),
        }
    }

    fn run(predicate: Predicate) -> Predicate {
        FlattenTransform
            .transform(QueryDescriptor::new("t").with_predicate(predicate))
            .unwrap()
            .predicate
            .unwrap()
    }

    #[test]
    fn test_nested_and_is_spliced() {
        let flat = run(Predicate::And(vec![
            eq("a"),
            Predicate::And(vec![eq("b"), Predicate::And(vec![eq("c")])]),
        ]));
        assert_eq!(flat, Predicate::And(vec![eq("a"), eq("b"), eq("c")]));
    }

    #[test]
    fn test_or_inside_and_is_kept() {
        let flat = run(Predicate::And(vec![
            eq("a"),
            Predicate::Or(vec![eq("b"), eq("c")]),
        ]));
        assert_eq!(
            flat,
            Predicate::And(vec![eq("a"), Predicate::Or(vec![eq("b"), eq("c")])])
        );
    }

    #[test]
    fn test_single_operand_collapses() {
        assert_eq!(run(Predicate::Or(vec![eq("a")])), eq("a"));
    }

    #[test]
    fn test_exists_condition_is_flattened() {
        let flat = run(Predicate::ExistsSubquery {
            field: "items".to_string(),
            condition: Box::new(Predicate::And(vec![eq("sku")])),
        });
        assert_eq!(
            flat,
            Predicate::ExistsSubquery {
                field: "items".to_string(),
                condition: Box::new(eq("sku")),
            }
        );
    }
}
