//! Error types for each pipeline stage.

use thiserror::Error;

/// Errors produced while turning raw input into a `QueryDescriptor`.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("no syntax could handle input (tried: {tried:?})")]
    NoMatchingSyntax {
        input: String,
        tried: Vec<&'static str>,
    },

    #[error("unsupported predicate shape '{kind}'{}", detail_suffix(.detail))]
    UnsupportedPredicateShape { kind: String, detail: Option<String> },

    #[error("invalid descriptor: {message}")]
    InvalidDescriptor { message: String },

    #[error("predicate expression error:\n{errors}")]
    Expression { errors: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail
        .as_ref()
        .map(|d| format!(": {}", d))
        .unwrap_or_default()
}

impl ParseError {
    pub(crate) fn unsupported(kind: impl Into<String>) -> Self {
        ParseError::UnsupportedPredicateShape {
            kind: kind.into(),
            detail: None,
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        ParseError::InvalidDescriptor {
            message: message.into(),
        }
    }
}

/// Errors raised while registering rules in a catalog.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("rule '{0}' is already registered")]
    DuplicateRuleId(String),

    #[error(
        "rule '{rule}' has mismatched placeholders (relational only: {relational_only:?}, document only: {document_only:?}, repeated: {repeated:?})"
    )]
    PlaceholderMismatch {
        rule: String,
        relational_only: Vec<String>,
        document_only: Vec<String>,
        repeated: Vec<String>,
    },

    #[error("rule '{rule}' pairs a {relational} shape with a {document} template")]
    ShapeKindMismatch {
        rule: String,
        relational: &'static str,
        document: &'static str,
    },
}

/// Errors raised while translating a descriptor through the catalog.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TranslateError {
    #[error("no pattern matches {subject}")]
    NoMatchingPattern { subject: String },

    #[error("rule '{rule}' needs {expected} for placeholder '{placeholder}', got {found}")]
    BindingArityMismatch {
        rule: String,
        placeholder: String,
        expected: String,
        found: String,
    },

    #[error("rule '{rule}' expects {expected} in placeholder '{placeholder}'")]
    BindingKindMismatch {
        rule: String,
        placeholder: String,
        expected: &'static str,
    },
}

/// Errors raised by renderers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("cannot render {construct}")]
    UnrenderableShape { construct: String },
}

impl RenderError {
    pub(crate) fn unrenderable(construct: impl Into<String>) -> Self {
        RenderError::UnrenderableShape {
            construct: construct.into(),
        }
    }
}

/// Any failure of the end-to-end pipeline.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Translate(#[from] TranslateError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

pub type QueryResult<T> = Result<T, QueryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_message_includes_kind() {
        let err = ParseError::unsupported("FULL_TEXT_SEARCH");
        assert_eq!(
            err.to_string(),
            "unsupported predicate shape 'FULL_TEXT_SEARCH'"
        );
    }

    #[test]
    fn test_unsupported_message_with_detail() {
        let err = ParseError::UnsupportedPredicateShape {
            kind: "group-having".to_string(),
            detail: Some("only allowed as a top-level conjunct".to_string()),
        };
        assert!(err.to_string().ends_with(": only allowed as a top-level conjunct"));
    }

    #[test]
    fn test_query_error_is_transparent() {
        let err: QueryError = RenderError::unrenderable("empty key").into();
        assert_eq!(err.to_string(), "cannot render empty key");
    }
}
