//! YAML descriptor syntax.
//!
//! Priority: 10 (fallback). Handles input that contains a top-level
//! `key:` mapping entry.

use crate::descriptor::QueryDescriptor;
use crate::error::ParseError;
use crate::syntax::raw::RawDescriptor;
use crate::syntax::DescriptorSyntax;
use once_cell::sync::Lazy;
use regex::Regex;

/// A mapping key at the start of a line
static MAPPING_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[A-Za-z_][A-Za-z0-9_]*\s*:").unwrap());

pub struct YamlSyntax;

impl DescriptorSyntax for YamlSyntax {
    fn name(&self) -> &'static str {
        "yaml"
    }

    fn can_handle(&self, input: &str) -> bool {
        MAPPING_KEY_RE.is_match(input)
    }

    fn parse(&self, input: &str) -> Result<QueryDescriptor, ParseError> {
        let document: serde_yaml::Value = serde_yaml::from_str(input)?;
        let raw: RawDescriptor =
            serde_yaml::from_value(document).map_err(|e| ParseError::invalid(e.to_string()))?;
        raw.into_descriptor()
    }

    fn priority(&self) -> u8 {
        10
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{AggregateFn, ElementTarget, Predicate};

    #[test]
    fn test_can_handle_mapping() {
        assert!(YamlSyntax.can_handle("collection: Accounts\n"));
        assert!(YamlSyntax.can_handle("---\ncollection: Accounts\n"));
        assert!(!YamlSyntax.can_handle("just some text"));
    }

    #[test]
    fn test_parse_projection() {
        let d = YamlSyntax
            .parse(
                "collection: Accounts\nprojectedFields: [createdAt, updatedAt]\nexcludeId: true\n",
            )
            .unwrap();
        assert_eq!(d.projection.fields, vec!["createdAt", "updatedAt"]);
        assert!(d.projection.exclude_id);
    }

    #[test]
    fn test_parse_nested_predicate_nodes() {
        let input = r#"
collection: inventory
predicate:
  kind: or
  operands:
    - kind: eq
      field: status
      value: A
    - "lt(qty, 30)"
"#;
        let d = YamlSyntax.parse(input).unwrap();
        let Some(Predicate::Or(operands)) = d.predicate else {
            panic!("expected or");
        };
        assert_eq!(operands.len(), 2);
    }

    #[test]
    fn test_parse_grouping_and_update() {
        let input = r#"
table: orders
groupingKeys: [cust_id]
aggregation:
  - function: sum
    field: price
    as: total
"#;
        let d = YamlSyntax.parse(input).unwrap();
        assert_eq!(d.grouping_keys, vec!["cust_id"]);
        assert_eq!(d.aggregation[0].function, AggregateFn::Sum);
        assert_eq!(d.aggregation[0].alias.as_deref(), Some("total"));

        let input = "collection: students\nupdate:\n  - array: grades\n    elements: all\n    value: 0\n";
        let d = YamlSyntax.parse(input).unwrap();
        assert_eq!(d.update[0].target, ElementTarget::All);
    }

    #[test]
    fn test_wrong_literal_type() {
        let result = YamlSyntax.parse("collection: x\ngroupingKeys: 3\n");
        assert!(matches!(result, Err(ParseError::InvalidDescriptor { .. })));
    }

    #[test]
    fn test_malformed_yaml() {
        let result = YamlSyntax.parse("collection: [unclosed\n");
        assert!(matches!(result, Err(ParseError::Yaml(_))));
    }
}
