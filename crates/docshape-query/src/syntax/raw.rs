//! Serialized descriptor documents.
//!
//! `RawDescriptor` is the serde model shared by the JSON and YAML syntaxes.
//! `into_descriptor` validates it and builds a `QueryDescriptor`; predicate
//! nodes may be objects or call-expression strings, and both end up as
//! `RawNode`s before conversion.

use crate::descriptor::{
    AggregateFn, Aggregation, Assignment, CompareOp, ElementTarget, FieldSelection,
    HavingCondition, LikePattern, Predicate, QueryDescriptor,
};
use crate::error::ParseError;
use crate::syntax::expression;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// Top-level descriptor document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDescriptor {
    #[serde(default, alias = "table")]
    pub collection: Option<String>,
    #[serde(default)]
    pub predicate: Option<RawPredicate>,
    #[serde(default, alias = "fields")]
    pub projected_fields: Vec<String>,
    #[serde(default)]
    pub excluded_fields: Vec<String>,
    #[serde(default)]
    pub exclude_id: bool,
    #[serde(default)]
    pub distinct: bool,
    #[serde(default, alias = "groupBy")]
    pub grouping_keys: Vec<String>,
    #[serde(default)]
    pub aggregation: Vec<RawAggregation>,
    #[serde(default)]
    pub update: Vec<RawAssignment>,
}

/// A predicate node: call-expression string or object.
///
/// Objects are kept untyped until conversion so that the node's `kind` is
/// resolved before any attribute is read.
#[derive(Debug, Clone)]
pub enum RawPredicate {
    Expression(String),
    Object(Map<String, Value>),
    Node(Box<RawNode>),
}

impl<'de> Deserialize<'de> for RawPredicate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::String(source) => Ok(RawPredicate::Expression(source)),
            Value::Object(map) => Ok(RawPredicate::Object(map)),
            other => Err(D::Error::custom(format!(
                "predicate must be a string or an object, got {}",
                other
            ))),
        }
    }
}

/// Object form of a predicate node. Which fields are required depends on
/// `kind`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawNode {
    pub kind: String,
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub value: Option<Value>,
    #[serde(default)]
    pub values: Option<Vec<Value>>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub condition: Option<RawPredicate>,
    #[serde(default)]
    pub operands: Vec<RawPredicate>,
    /// Aggregate function of a having leaf
    #[serde(default)]
    pub function: Option<String>,
    /// Comparison operator of a having leaf
    #[serde(default)]
    pub op: Option<String>,
    #[serde(default, alias = "as")]
    pub alias: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAggregation {
    pub function: String,
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default, alias = "as")]
    pub alias: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAssignment {
    #[serde(default)]
    pub array: Option<String>,
    #[serde(default)]
    pub field: Option<String>,
    pub value: Value,
    /// `matched` or `all`; only meaningful with `array`
    #[serde(default)]
    pub elements: Option<String>,
}

/// Recognized predicate node kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NodeKind {
    Compare(CompareOp),
    Like,
    InList,
    NotInList,
    Exists,
    Size,
    Having,
    And,
    Or,
}

impl NodeKind {
    /// Resolve a kind name, ignoring case, `-` and `_`.
    pub(crate) fn from_name(name: &str) -> Option<Self> {
        let normalized: String = name
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .flat_map(char::to_lowercase)
            .collect();
        let kind = match normalized.as_str() {
            "eq" | "equals" => NodeKind::Compare(CompareOp::Eq),
            "ne" | "notequals" => NodeKind::Compare(CompareOp::Ne),
            "gt" | "greaterthan" => NodeKind::Compare(CompareOp::Gt),
            "gte" | "greaterorequal" | "greaterthanorequal" => NodeKind::Compare(CompareOp::Gte),
            "lt" | "lessthan" => NodeKind::Compare(CompareOp::Lt),
            "lte" | "lessorequal" | "lessthanorequal" => NodeKind::Compare(CompareOp::Lte),
            "like" => NodeKind::Like,
            "in" | "inlist" => NodeKind::InList,
            "notin" | "notinlist" => NodeKind::NotInList,
            "exists" | "existssubquery" => NodeKind::Exists,
            "size" | "sizeequals" => NodeKind::Size,
            "having" | "grouphaving" => NodeKind::Having,
            "and" => NodeKind::And,
            "or" => NodeKind::Or,
            _ => return None,
        };
        Some(kind)
    }
}

impl RawDescriptor {
    /// Validate and convert into a descriptor.
    ///
    /// The predicate is converted as written: connectives are not flattened
    /// and having leaves stay in the tree until the normalization
    /// transforms run.
    pub fn into_descriptor(self) -> Result<QueryDescriptor, ParseError> {
        let collection = self
            .collection
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| ParseError::invalid("missing collection"))?;

        let predicate = self.predicate.map(RawPredicate::into_predicate).transpose()?;

        let aggregation = self
            .aggregation
            .into_iter()
            .map(|a| aggregation(&a.function, a.field, a.alias))
            .collect::<Result<Vec<_>, _>>()?;

        let update = self
            .update
            .into_iter()
            .map(RawAssignment::into_assignment)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(QueryDescriptor {
            collection,
            predicate,
            projection: FieldSelection {
                fields: self.projected_fields,
                excluded: self.excluded_fields,
                exclude_id: self.exclude_id,
            },
            distinct: self.distinct,
            grouping_keys: self.grouping_keys,
            aggregation,
            having: Vec::new(),
            update,
        })
    }
}

impl RawPredicate {
    pub fn into_predicate(self) -> Result<Predicate, ParseError> {
        match self {
            RawPredicate::Expression(source) => expression::parse_predicate(&source),
            RawPredicate::Object(map) => RawNode::from_object(map)?.into_predicate(),
            RawPredicate::Node(node) => node.into_predicate(),
        }
    }
}

impl RawNode {
    /// Read a node object: resolve `kind`, then the attributes it needs.
    pub fn from_object(map: Map<String, Value>) -> Result<Self, ParseError> {
        let kind = match map.get("kind") {
            Some(Value::String(kind)) => kind.clone(),
            Some(other) => return Err(ParseError::unsupported(other.to_string())),
            None => return Err(ParseError::invalid("predicate node has no 'kind'")),
        };
        if NodeKind::from_name(&kind).is_none() {
            return Err(ParseError::unsupported(kind));
        }
        serde_json::from_value(Value::Object(map))
            .map_err(|e| ParseError::invalid(format!("'{}' node: {}", kind, e)))
    }

    pub fn into_predicate(self) -> Result<Predicate, ParseError> {
        let kind = NodeKind::from_name(&self.kind)
            .ok_or_else(|| ParseError::unsupported(self.kind.clone()))?;
        let name = self.kind.clone();

        let predicate = match kind {
            NodeKind::Compare(op) => Predicate::Compare {
                op,
                field: required_field(&name, self.field)?,
                value: self
                    .value
                    .ok_or_else(|| missing(&name, "value"))?,
            },
            NodeKind::Like => {
                let field = required_field(&name, self.field)?;
                let pattern = match (self.pattern, self.value) {
                    (Some(p), _) => p,
                    (None, Some(Value::String(p))) => p,
                    (None, Some(other)) => {
                        return Err(ParseError::invalid(format!(
                            "'{}' pattern must be a string, got {}",
                            name, other
                        )))
                    }
                    (None, None) => return Err(missing(&name, "pattern")),
                };
                Predicate::Like {
                    field,
                    pattern: LikePattern::classify(&pattern),
                }
            }
            NodeKind::InList | NodeKind::NotInList => {
                let field = required_field(&name, self.field)?;
                let values = match (self.values, self.value) {
                    (Some(vs), _) => vs,
                    (None, Some(Value::Array(vs))) => vs,
                    (None, Some(v)) => vec![v],
                    (None, None) => return Err(missing(&name, "values")),
                };
                if kind == NodeKind::InList {
                    Predicate::InList { field, values }
                } else {
                    Predicate::NotInList { field, values }
                }
            }
            NodeKind::Exists => Predicate::ExistsSubquery {
                field: required_field(&name, self.field)?,
                condition: Box::new(
                    self.condition
                        .ok_or_else(|| missing(&name, "condition"))?
                        .into_predicate()?,
                ),
            },
            NodeKind::Size => {
                let field = required_field(&name, self.field)?;
                let size = match (self.size, self.value) {
                    (Some(n), _) => n,
                    (None, Some(v)) => v.as_u64().ok_or_else(|| {
                        ParseError::invalid(format!(
                            "'{}' size must be a non-negative integer, got {}",
                            name, v
                        ))
                    })?,
                    (None, None) => return Err(missing(&name, "size")),
                };
                Predicate::SizeEquals { field, size }
            }
            NodeKind::Having => {
                let function = self.function.ok_or_else(|| missing(&name, "function"))?;
                let op = self.op.ok_or_else(|| missing(&name, "op"))?;
                Predicate::GroupHaving(HavingCondition {
                    aggregate: aggregation(&function, self.field, self.alias)?,
                    op: compare_op(&op)?,
                    value: self.value.ok_or_else(|| missing(&name, "value"))?,
                })
            }
            NodeKind::And | NodeKind::Or => {
                if self.operands.is_empty() {
                    return Err(ParseError::invalid(format!(
                        "'{}' connective has no operands",
                        name
                    )));
                }
                let operands = self
                    .operands
                    .into_iter()
                    .map(RawPredicate::into_predicate)
                    .collect::<Result<Vec<_>, _>>()?;
                if kind == NodeKind::And {
                    Predicate::And(operands)
                } else {
                    Predicate::Or(operands)
                }
            }
        };
        Ok(predicate)
    }
}

impl RawAssignment {
    fn into_assignment(self) -> Result<Assignment, ParseError> {
        let target = match (&self.array, self.elements.as_deref()) {
            (None, None) => ElementTarget::Whole,
            (None, Some(_)) => {
                return Err(ParseError::invalid(
                    "update 'elements' selector requires 'array'",
                ))
            }
            (Some(_), None) => ElementTarget::Matched,
            (Some(_), Some(selector)) => match selector.to_ascii_lowercase().as_str() {
                "matched" | "$" => ElementTarget::Matched,
                "all" | "$[]" => ElementTarget::All,
                other => {
                    return Err(ParseError::invalid(format!(
                        "unknown update elements selector '{}'",
                        other
                    )))
                }
            },
        };

        if self.array.is_none() && self.field.as_deref().map_or(true, str::is_empty) {
            return Err(ParseError::invalid("update assignment has no field"));
        }

        Ok(Assignment {
            array: self.array,
            field: self.field,
            value: self.value,
            target,
        })
    }
}

pub(crate) fn aggregation(
    function: &str,
    field: Option<String>,
    alias: Option<String>,
) -> Result<Aggregation, ParseError> {
    let function = AggregateFn::from_name(function).ok_or_else(|| {
        ParseError::invalid(format!("unknown aggregate function '{}'", function))
    })?;
    if function != AggregateFn::Count && field.is_none() {
        return Err(ParseError::invalid(format!(
            "aggregate '{}' requires a field",
            function.name()
        )));
    }
    Ok(Aggregation {
        function,
        field,
        alias,
    })
}

pub(crate) fn compare_op(token: &str) -> Result<CompareOp, ParseError> {
    CompareOp::from_token(token)
        .ok_or_else(|| ParseError::invalid(format!("unknown comparison operator '{}'", token)))
}

/// Keeps an explicit `null` distinct from an absent key.
fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

fn required_field(kind: &str, field: Option<String>) -> Result<String, ParseError> {
    field
        .filter(|f| !f.is_empty())
        .ok_or_else(|| missing(kind, "field"))
}

fn missing(kind: &str, what: &str) -> ParseError {
    ParseError::invalid(format!("'{}' node is missing {}", kind, what))
}
