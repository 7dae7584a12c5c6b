//! Descriptor normalization.
//!
//! Transforms run in order after a syntax has produced a descriptor and
//! before translation. The default chain flattens connectives, lifts
//! having leaves out of the row predicate, then validates the result.

mod flatten;
mod having;
mod validate;

pub use flatten::FlattenTransform;
pub use having::LiftHavingTransform;
pub use validate::ValidateTransform;

use crate::descriptor::QueryDescriptor;
use crate::error::ParseError;
use std::sync::Arc;

/// A rewrite of a parsed descriptor.
pub trait DescriptorTransform: Send + Sync {
    fn name(&self) -> &'static str;

    fn transform(&self, descriptor: QueryDescriptor) -> Result<QueryDescriptor, ParseError>;
}

/// The normalization chain, in application order.
pub fn default_transforms() -> Vec<Arc<dyn DescriptorTransform>> {
    vec![
        Arc::new(FlattenTransform),
        Arc::new(LiftHavingTransform),
        Arc::new(ValidateTransform),
    ]
}

/// Apply the default chain.
pub fn normalize(descriptor: QueryDescriptor) -> Result<QueryDescriptor, ParseError> {
    default_transforms()
        .iter()
        .try_fold(descriptor, |d, t| t.transform(d))
}
