//! Shared parser primitives.
//!
//! Reusable chumsky parsers for the literal and identifier forms that the
//! predicate expression syntax is built from.

use chumsky::extra;
use chumsky::prelude::*;
use serde_json::Value;

/// Extra type for parsers - uses Rich errors for better messages
pub type Extra<'src> = extra::Err<Rich<'src, char>>;

// ============================================================================
// Primitive parsers
// ============================================================================

/// Parser for identifiers: alphanumeric + underscore
pub fn ident<'src>() -> impl Parser<'src, &'src str, String, Extra<'src>> + Clone {
    any()
        .filter(|c: &char| c.is_alphanumeric() || *c == '_')
        .repeated()
        .at_least(1)
        .to_slice()
        .map(|s: &str| s.to_string())
        .labelled("identifier")
}

/// Parser for dotted field paths: `address.city`, `items.qty`
pub fn field_path<'src>() -> impl Parser<'src, &'src str, String, Extra<'src>> + Clone {
    ident()
        .separated_by(just('.'))
        .at_least(1)
        .collect::<Vec<_>>()
        .map(|parts| parts.join("."))
        .labelled("field path")
}

/// Parser for single-quoted string literals: 'value'
pub fn single_quoted_string<'src>() -> impl Parser<'src, &'src str, String, Extra<'src>> + Clone {
    just('\'')
        .ignore_then(
            none_of("'")
                .repeated()
                .to_slice()
                .map(|s: &str| s.to_string()),
        )
        .then_ignore(just('\''))
        .labelled("single-quoted string")
}

/// Parser for double-quoted string literals: "value"
pub fn double_quoted_string<'src>() -> impl Parser<'src, &'src str, String, Extra<'src>> + Clone {
    just('"')
        .ignore_then(
            none_of("\"")
                .repeated()
                .to_slice()
                .map(|s: &str| s.to_string()),
        )
        .then_ignore(just('"'))
        .labelled("double-quoted string")
}

/// Parser for string literals (single or double quoted)
pub fn string_literal<'src>() -> impl Parser<'src, &'src str, String, Extra<'src>> + Clone {
    single_quoted_string()
        .or(double_quoted_string())
        .labelled("string literal")
}

/// Parser for integer and float literals, with an optional minus sign
pub fn number<'src>() -> impl Parser<'src, &'src str, Value, Extra<'src>> + Clone {
    just('-')
        .or_not()
        .then(
            any()
                .filter(|c: &char| c.is_ascii_digit())
                .repeated()
                .at_least(1),
        )
        .then(
            just('.')
                .then(any().filter(|c: &char| c.is_ascii_digit()).repeated())
                .or_not(),
        )
        .to_slice()
        .try_map(|s: &str, span: SimpleSpan| {
            if s.contains('.') {
                let f: f64 = s
                    .parse()
                    .map_err(|_| Rich::custom(span, "invalid float literal"))?;
                serde_json::Number::from_f64(f)
                    .map(Value::Number)
                    .ok_or_else(|| Rich::custom(span, "invalid float (NaN or Infinity)"))
            } else {
                s.parse::<i64>()
                    .map(|n| Value::Number(n.into()))
                    .map_err(|_| Rich::custom(span, "integer overflow"))
            }
        })
        .labelled("number")
}

/// Keyword parser: matches a whole identifier equal to `keyword`
pub fn kw<'src>(keyword: &'static str) -> impl Parser<'src, &'src str, (), Extra<'src>> + Clone {
    text::keyword::<&str, _, Extra<'src>>(keyword).ignored()
}

/// Scalar literal: string, number, `true`, `false` or `null`
pub fn scalar<'src>() -> impl Parser<'src, &'src str, Value, Extra<'src>> + Clone {
    let boolean = choice((
        kw("true").to(Value::Bool(true)),
        kw("false").to(Value::Bool(false)),
    ));
    let null = kw("null").to(Value::Null);

    choice((
        string_literal().map(Value::String),
        number(),
        boolean,
        null,
    ))
    .labelled("literal")
}

// ============================================================================
// Error formatting
// ============================================================================

/// Format parse errors with line/column positions
pub fn format_errors(errs: &[Rich<'_, char>], input: &str) -> String {
    errs.iter()
        .map(|e| {
            let start = e.span().start;
            let line = input[..start].matches('\n').count() + 1;
            let col = start - input[..start].rfind('\n').map_or(0, |i| i + 1);

            let found = e
                .found()
                .map_or("end of input".to_string(), |c| format!("'{}'", c));

            format!(
                "Line {}, column {}: {} (found {})",
                line,
                col + 1,
                e.reason(),
                found
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // =========================================================================
    // Primitive parser tests
    // =========================================================================

    #[test]
    fn test_ident_simple() {
        let result = ident().parse("createdAt").into_result();
        assert_eq!(result.unwrap(), "createdAt");
    }

    #[test]
    fn test_ident_with_underscore() {
        let result = ident().parse("cust_id").into_result();
        assert_eq!(result.unwrap(), "cust_id");
    }

    #[test]
    fn test_field_path_nested() {
        let result = field_path().parse("address.city").into_result();
        assert_eq!(result.unwrap(), "address.city");
    }

    #[test]
    fn test_field_path_rejects_trailing_dot() {
        assert!(field_path().parse("address.").into_result().is_err());
    }

    #[test]
    fn test_single_quoted_string() {
        let result = single_quoted_string().parse("'BOOK'").into_result();
        assert_eq!(result.unwrap(), "BOOK");
    }

    #[test]
    fn test_double_quoted_string() {
        let result = double_quoted_string().parse("\"hello world\"").into_result();
        assert_eq!(result.unwrap(), "hello world");
    }

    #[test]
    fn test_string_literal_either() {
        assert!(string_literal().parse("'single'").into_result().is_ok());
        assert!(string_literal().parse("\"double\"").into_result().is_ok());
    }

    // =========================================================================
    // Literal tests
    // =========================================================================

    #[test]
    fn test_number_integer() {
        assert_eq!(number().parse("42").into_result().unwrap(), json!(42));
    }

    #[test]
    fn test_number_negative_float() {
        assert_eq!(number().parse("-1.5").into_result().unwrap(), json!(-1.5));
    }

    #[test]
    fn test_number_overflow() {
        assert!(number()
            .parse("99999999999999999999999")
            .into_result()
            .is_err());
    }

    #[test]
    fn test_scalar_keywords() {
        assert_eq!(scalar().parse("true").into_result().unwrap(), json!(true));
        assert_eq!(scalar().parse("false").into_result().unwrap(), json!(false));
        assert_eq!(scalar().parse("null").into_result().unwrap(), Value::Null);
    }

    #[test]
    fn test_scalar_rejects_keyword_prefix() {
        assert!(scalar().parse("trueish").into_result().is_err());
    }

    #[test]
    fn test_format_errors_reports_position() {
        let input = "'unterminated";
        let errs = string_literal().parse(input).into_result().unwrap_err();
        let message = format_errors(&errs, input);
        assert!(message.starts_with("Line 1, column"));
    }

    #[test]
    fn test_format_errors_line_after_newline() {
        let input = "1\n";
        let errs = scalar()
            .then_ignore(just('\n'))
            .then(scalar())
            .parse(input)
            .into_result()
            .unwrap_err();
        let message = format_errors(&errs, input);
        assert!(message.starts_with("Line 2, column 1:"), "{}", message);
    }
}
