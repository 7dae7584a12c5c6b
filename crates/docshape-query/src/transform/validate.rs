//! Validation transform.
//!
//! Checks that a normalized descriptor is well-formed before translation.

use crate::descriptor::{Predicate, QueryDescriptor};
use crate::error::ParseError;
use crate::transform::DescriptorTransform;

/// Validation transform that checks descriptor consistency.
pub struct ValidateTransform;

impl DescriptorTransform for ValidateTransform {
    fn name(&self) -> &'static str {
        "validate"
    }

    fn transform(&self, descriptor: QueryDescriptor) -> Result<QueryDescriptor, ParseError> {
        if let Some(predicate) = &descriptor.predicate {
            check_predicate(predicate)?;
        }

        let mut names = descriptor
            .projection
            .fields
            .iter()
            .chain(&descriptor.projection.excluded)
            .chain(&descriptor.grouping_keys);
        if names.any(|f| f.trim().is_empty()) {
            return Err(ParseError::invalid("empty field name"));
        }

        Ok(descriptor)
    }
}

fn check_predicate(predicate: &Predicate) -> Result<(), ParseError> {
    match predicate {
        Predicate::GroupHaving(_) => Err(ParseError::UnsupportedPredicateShape {
            kind: predicate.kind_name().to_string(),
            detail: Some("group-having is only allowed as a top-level conjunct".to_string()),
        }),
        Predicate::And(operands) | Predicate::Or(operands) => {
            if operands.is_empty() {
                return Err(ParseError::invalid(format!(
                    "'{}' connective has no operands",
                    predicate.kind_name()
                )));
            }
            operands.iter().try_for_each(check_predicate)
        }
        Predicate::ExistsSubquery { field, condition } => {
            check_field(field)?;
            check_predicate(condition)
        }
        leaf => leaf.leaf_field().map_or(Ok(()), check_field),
    }
}

fn check_field(field: &str) -> Result<(), ParseError> {
    if field.trim().is_empty() {
        return Err(ParseError::invalid("empty field name"));
    }
    Ok(())
}
