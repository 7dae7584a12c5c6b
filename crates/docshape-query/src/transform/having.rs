//! Lifts group-having leaves out of the row predicate.
//!
//! A having leaf is accepted as the whole predicate or as a top-level
//! conjunct; it moves to `QueryDescriptor::having` and the remaining
//! conjuncts stay as the row filter. Having leaves anywhere else are left
//! in place for `ValidateTransform` to reject.

use crate::descriptor::{Predicate, QueryDescriptor};
use crate::error::ParseError;
use crate::transform::DescriptorTransform;

pub struct LiftHavingTransform;

impl DescriptorTransform for LiftHavingTransform {
    fn name(&self) -> &'static str {
        "lift-having"
    }

    fn transform(&self, mut descriptor: QueryDescriptor) -> Result<QueryDescriptor, ParseError> {
        descriptor.predicate = match descriptor.predicate.take() {
            Some(Predicate::GroupHaving(condition)) => {
                descriptor.having.push(condition);
                None
            }
            Some(Predicate::And(operands)) => {
                let mut rest = Vec::with_capacity(operands.len());
                for operand in operands {
                    match operand {
                        Predicate::GroupHaving(condition) => descriptor.having.push(condition),
                        other => rest.push(other),
                    }
                }
                match rest.len() {
                    0 => None,
                    1 => rest.pop(),
                    _ => Some(Predicate::And(rest)),
                }
            }
            other => other,
        };
        Ok(descriptor)
    }
}
