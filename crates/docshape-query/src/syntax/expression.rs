//! Compact call-expression predicates.
//!
//! Parses predicate strings like:
//! - `like(description, "BOOK")`
//! - `inList("shoppingCartProducts", "5cd1a0475334fe0009133102")`
//! - `and(eq(status, "A"), lt(qty, 30))`
//! - `exists(items, eq(sku, "abc"))`
//! - `having(count, gt, 1)` / `having(sum, price, gte, 100)`
//!
//! Arguments are positional. Field arguments may be bare paths or string
//! literals. Each call is turned into a `RawNode` so that both predicate
//! forms share one conversion path.

use crate::descriptor::Predicate;
use crate::error::ParseError;
use crate::syntax::common::{field_path, format_errors, ident, scalar, Extra};
use crate::syntax::raw::{NodeKind, RawNode, RawPredicate};
use chumsky::prelude::*;
use serde_json::Value;

/// Parsed expression term (before conversion to nodes)
#[derive(Debug, Clone, PartialEq)]
enum Term {
    Call { name: String, args: Vec<Term> },
    Path(String),
    Literal(Value),
    List(Vec<Term>),
}

impl Term {
    fn describe(&self) -> String {
        match self {
            Term::Call { name, .. } => format!("call '{}(..)'", name),
            Term::Path(p) => format!("field path '{}'", p),
            Term::Literal(v) => format!("literal {}", v),
            Term::List(_) => "list".to_string(),
        }
    }
}

// ============================================================================
// Parser
// ============================================================================

fn term_parser<'src>() -> impl Parser<'src, &'src str, Term, Extra<'src>> {
    recursive(|term| {
        let args = term
            .separated_by(just(',').padded())
            .allow_trailing()
            .collect::<Vec<_>>();

        let list = args
            .clone()
            .delimited_by(just('[').padded(), just(']').padded())
            .map(Term::List);

        let call = ident()
            .then(args.delimited_by(just('(').padded(), just(')').padded()))
            .map(|(name, args)| Term::Call { name, args });

        choice((
            list,
            scalar().map(Term::Literal),
            call,
            field_path().map(Term::Path),
        ))
        .padded()
    })
}

/// Parse a predicate expression string.
pub fn parse_predicate(source: &str) -> Result<Predicate, ParseError> {
    let term = term_parser()
        .then_ignore(end())
        .parse(source)
        .into_result()
        .map_err(|errs| ParseError::Expression {
            errors: format_errors(&errs, source),
        })?;

    match term {
        Term::Call { name, args } => call_to_node(name, args)?.into_predicate(),
        other => Err(ParseError::invalid(format!(
            "predicate expression must be a call, found {}",
            other.describe()
        ))),
    }
}

// ============================================================================
// Node construction
// ============================================================================

fn call_to_node(name: String, args: Vec<Term>) -> Result<RawNode, ParseError> {
    let kind = NodeKind::from_name(&name).ok_or_else(|| ParseError::unsupported(name.clone()))?;
    let arity = args.len();
    let mut args = args.into_iter();
    let mut node = RawNode {
        kind: name.clone(),
        ..Default::default()
    };

    match kind {
        NodeKind::Compare(_) => {
            node.field = Some(field_arg(&name, args.next())?);
            node.value = Some(value_arg(&name, args.next())?);
        }
        NodeKind::Like => {
            node.field = Some(field_arg(&name, args.next())?);
            node.pattern = match value_arg(&name, args.next())? {
                Value::String(p) => Some(p),
                other => {
                    return Err(ParseError::invalid(format!(
                        "'{}' pattern must be a string, got {}",
                        name, other
                    )))
                }
            };
        }
        NodeKind::InList | NodeKind::NotInList => {
            node.field = Some(field_arg(&name, args.next())?);
            let rest: Vec<Term> = args.by_ref().collect();
            let values = match <[Term; 1]>::try_from(rest) {
                Ok([Term::List(items)]) => items,
                Ok([single]) => vec![single],
                Err(rest) => rest,
            };
            node.values = Some(
                values
                    .into_iter()
                    .map(|v| value_arg(&name, Some(v)))
                    .collect::<Result<Vec<_>, _>>()?,
            );
        }
        NodeKind::Exists => {
            node.field = Some(field_arg(&name, args.next())?);
            node.condition = Some(predicate_arg(&name, args.next())?);
        }
        NodeKind::Size => {
            node.field = Some(field_arg(&name, args.next())?);
            node.value = Some(value_arg(&name, args.next())?);
        }
        NodeKind::Having => {
            node.function = Some(field_arg(&name, args.next())?);
            if arity == 4 {
                node.field = Some(field_arg(&name, args.next())?);
            }
            node.op = Some(field_arg(&name, args.next())?);
            node.value = Some(value_arg(&name, args.next())?);
        }
        NodeKind::And | NodeKind::Or => {
            node.operands = args
                .by_ref()
                .map(|a| predicate_arg(&name, Some(a)))
                .collect::<Result<Vec<_>, _>>()?;
        }
    }

    if args.next().is_some() {
        return Err(ParseError::invalid(format!(
            "too many arguments to '{}' ({})",
            name, arity
        )));
    }
    Ok(node)
}

fn field_arg(call: &str, arg: Option<Term>) -> Result<String, ParseError> {
    match arg {
        Some(Term::Path(p)) | Some(Term::Literal(Value::String(p))) => Ok(p),
        Some(other) => Err(ParseError::invalid(format!(
            "'{}' expects a field name, found {}",
            call,
            other.describe()
        ))),
        None => Err(ParseError::invalid(format!(
            "'{}' is missing an argument",
            call
        ))),
    }
}

fn value_arg(call: &str, arg: Option<Term>) -> Result<Value, ParseError> {
    match arg {
        Some(Term::Literal(v)) => Ok(v),
        Some(Term::List(items)) => items
            .into_iter()
            .map(|i| value_arg(call, Some(i)))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Some(other) => Err(ParseError::invalid(format!(
            "'{}' expects a literal, found {}",
            call,
            other.describe()
        ))),
        None => Err(ParseError::invalid(format!(
            "'{}' is missing a value",
            call
        ))),
    }
}

fn predicate_arg(call: &str, arg: Option<Term>) -> Result<RawPredicate, ParseError> {
    match arg {
        Some(Term::Call { name, args }) => {
            Ok(RawPredicate::Node(Box::new(call_to_node(name, args)?)))
        }
        Some(other) => Err(ParseError::invalid(format!(
            "'{}' expects a predicate, found {}",
            call,
            other.describe()
        ))),
        None => Err(ParseError::invalid(format!(
            "'{}' is missing a predicate",
            call
        ))),
    }
}
