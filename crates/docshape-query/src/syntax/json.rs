//! JSON descriptor syntax.
//!
//! Priority: 50. Handles input whose first non-blank character is `{`.

use crate::descriptor::QueryDescriptor;
use crate::error::ParseError;
use crate::syntax::raw::RawDescriptor;
use crate::syntax::DescriptorSyntax;

pub struct JsonSyntax;

impl DescriptorSyntax for JsonSyntax {
    fn name(&self) -> &'static str {
        "json"
    }

    fn can_handle(&self, input: &str) -> bool {
        input.trim_start().starts_with('{')
    }

    fn parse(&self, input: &str) -> Result<QueryDescriptor, ParseError> {
        // Syntax errors stay JSON errors; shape and type errors are invalid descriptors
        let document: serde_json::Value = serde_json::from_str(input)?;
        let raw: RawDescriptor =
            serde_json::from_value(document).map_err(|e| ParseError::invalid(e.to_string()))?;
        raw.into_descriptor()
    }
}
