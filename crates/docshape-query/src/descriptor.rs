//! Relational-side query description.
//!
//! A `QueryDescriptor` is the normalized form every input syntax produces.
//! It is owned by a single translation request and carries no placeholders:
//! all values are concrete literals and field paths.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// Comparison operator for scalar leaves and having conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CompareOp {
    /// Document-store operator for this comparison
    pub fn operator(&self) -> &'static str {
        match self {
            CompareOp::Eq => "$eq",
            CompareOp::Ne => "$ne",
            CompareOp::Gt => "$gt",
            CompareOp::Gte => "$gte",
            CompareOp::Lt => "$lt",
            CompareOp::Lte => "$lte",
        }
    }

    /// Parse an operator token (`gt`, `>=`, `$lte`, ...)
    pub fn from_token(token: &str) -> Option<Self> {
        let token = token.trim().trim_start_matches('$').to_ascii_lowercase();
        match token.as_str() {
            "eq" | "=" | "==" => Some(CompareOp::Eq),
            "ne" | "!=" | "<>" => Some(CompareOp::Ne),
            "gt" | ">" => Some(CompareOp::Gt),
            "gte" | ">=" => Some(CompareOp::Gte),
            "lt" | "<" => Some(CompareOp::Lt),
            "lte" | "<=" => Some(CompareOp::Lte),
            _ => None,
        }
    }
}

/// Where the wildcards sit in a LIKE pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LikeClass {
    /// `%x%` (or a bare literal)
    Contains,
    /// `x%`
    Prefix,
    /// `%x`
    Suffix,
    /// Wildcards anywhere else, or `_`
    General,
}

/// A classified LIKE pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikePattern {
    pub class: LikeClass,
    /// Literal text with the wrapping wildcards removed. For
    /// `LikeClass::General` this is the full original pattern.
    pub literal: String,
}

impl LikePattern {
    /// Classify a SQL LIKE pattern.
    ///
    /// A pattern without any wildcard is treated as wildcard-wrapped, which
    /// is how a "like" leaf is usually written in descriptors.
    pub fn classify(pattern: &str) -> Self {
        let leading = pattern.starts_with('%');
        let rest = if leading { &pattern[1..] } else { pattern };
        let trailing = rest.ends_with('%');
        let inner = if trailing {
            &rest[..rest.len() - 1]
        } else {
            rest
        };

        if inner.contains('%') || inner.contains('_') {
            return LikePattern {
                class: LikeClass::General,
                literal: pattern.to_string(),
            };
        }

        let class = match (leading, trailing) {
            (true, true) | (false, false) => LikeClass::Contains,
            (false, true) => LikeClass::Prefix,
            (true, false) => LikeClass::Suffix,
        };

        LikePattern {
            class,
            literal: inner.to_string(),
        }
    }

    /// Regex body for the pattern, with the literal part escaped.
    ///
    /// Contains/prefix/suffix classes return only the escaped literal; the
    /// anchors are supplied by the rule's document template. General
    /// patterns are converted whole and anchored at both ends.
    pub fn regex_body(&self) -> String {
        match self.class {
            LikeClass::General => {
                let mut body = String::from("^");
                let mut literal = String::new();
                for c in self.literal.chars() {
                    match c {
                        '%' | '_' => {
                            body.push_str(&regex::escape(&literal));
                            literal.clear();
                            body.push_str(if c == '%' { ".*" } else { "." });
                        }
                        other => literal.push(other),
                    }
                }
                body.push_str(&regex::escape(&literal));
                body.push('$');
                body
            }
            _ => regex::escape(&self.literal),
        }
    }
}

/// Aggregate function for grouping and having.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateFn {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFn {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "count" => Some(AggregateFn::Count),
            "sum" => Some(AggregateFn::Sum),
            "avg" | "average" => Some(AggregateFn::Avg),
            "min" => Some(AggregateFn::Min),
            "max" => Some(AggregateFn::Max),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AggregateFn::Count => "count",
            AggregateFn::Sum => "sum",
            AggregateFn::Avg => "avg",
            AggregateFn::Min => "min",
            AggregateFn::Max => "max",
        }
    }
}

/// `COUNT(*)`, `SUM(price) AS total`, ...
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregation {
    pub function: AggregateFn,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl Aggregation {
    /// Output name of the aggregate: the alias, or `count` / `sum_price`.
    pub fn output_name(&self) -> String {
        if let Some(alias) = &self.alias {
            return alias.clone();
        }
        match &self.field {
            Some(field) => format!("{}_{}", self.function.name(), field.replace('.', "_")),
            None => self.function.name().to_string(),
        }
    }

    /// Whether two aggregations compute the same value (alias ignored)
    pub fn same_value(&self, other: &Aggregation) -> bool {
        self.function == other.function && self.field == other.field
    }
}

/// `HAVING COUNT(*) > 1`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HavingCondition {
    pub aggregate: Aggregation,
    pub op: CompareOp,
    pub value: Value,
}

/// Predicate tree over rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "args", rename_all = "snake_case")]
pub enum Predicate {
    Compare {
        op: CompareOp,
        field: String,
        value: Value,
    },
    Like {
        field: String,
        pattern: LikePattern,
    },
    InList {
        field: String,
        values: Vec<Value>,
    },
    NotInList {
        field: String,
        values: Vec<Value>,
    },
    /// `EXISTS (SELECT 1 FROM <field> WHERE <condition>)` over an embedded array
    ExistsSubquery {
        field: String,
        condition: Box<Predicate>,
    },
    SizeEquals {
        field: String,
        size: u64,
    },
    /// Only present until normalization lifts it into `QueryDescriptor::having`
    GroupHaving(HavingCondition),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

impl Predicate {
    /// Top-level field a leaf filters on, if it is a single-field leaf
    pub fn leaf_field(&self) -> Option<&str> {
        match self {
            Predicate::Compare { field, .. }
            | Predicate::Like { field, .. }
            | Predicate::InList { field, .. }
            | Predicate::NotInList { field, .. }
            | Predicate::ExistsSubquery { field, .. }
            | Predicate::SizeEquals { field, .. } => Some(field),
            Predicate::GroupHaving(_) | Predicate::And(_) | Predicate::Or(_) => None,
        }
    }

    /// True for an AND whose operands are all leaves on pairwise distinct
    /// fields, so the translated filters can be merged into one document.
    pub fn is_disjoint_conjunction(&self) -> bool {
        let Predicate::And(operands) = self else {
            return false;
        };
        let mut seen = BTreeSet::new();
        operands
            .iter()
            .all(|p| p.leaf_field().is_some_and(|f| seen.insert(f)))
    }

    /// Short name of the node kind, used in error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Predicate::Compare { op, .. } => match op {
                CompareOp::Eq => "equals",
                CompareOp::Ne => "not-equals",
                CompareOp::Gt => "greater-than",
                CompareOp::Gte => "greater-or-equal",
                CompareOp::Lt => "less-than",
                CompareOp::Lte => "less-or-equal",
            },
            Predicate::Like { .. } => "like",
            Predicate::InList { .. } => "in-list",
            Predicate::NotInList { .. } => "not-in-list",
            Predicate::ExistsSubquery { .. } => "exists-subquery",
            Predicate::SizeEquals { .. } => "size-equals",
            Predicate::GroupHaving(_) => "group-having",
            Predicate::And(_) => "and",
            Predicate::Or(_) => "or",
        }
    }
}

/// Field selection of a SELECT.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSelection {
    /// Included fields, in declaration order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,
    /// Excluded fields
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excluded: Vec<String>,
    /// Suppress the implicit identity field
    #[serde(default)]
    pub exclude_id: bool,
}

impl FieldSelection {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.excluded.is_empty() && !self.exclude_id
    }
}

/// Which elements of an embedded array an assignment writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementTarget {
    /// The whole field (no array involved)
    Whole,
    /// The array element matched by the filter (`arr.$`)
    Matched,
    /// Every array element (`arr.$[]`)
    All,
}

/// `SET field = value`, optionally inside an embedded array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub value: Value,
    pub target: ElementTarget,
}

impl Assignment {
    /// Document-store update path for this assignment
    pub fn update_path(&self) -> String {
        let operator = match self.target {
            ElementTarget::Whole => None,
            ElementTarget::Matched => Some("$"),
            ElementTarget::All => Some("$[]"),
        };
        let parts: Vec<&str> = [self.array.as_deref(), operator, self.field.as_deref()]
            .into_iter()
            .flatten()
            .collect();
        parts.join(".")
    }
}

/// Normalized relational query description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryDescriptor {
    pub collection: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicate: Option<Predicate>,
    #[serde(default, skip_serializing_if = "FieldSelection::is_empty")]
    pub projection: FieldSelection,
    #[serde(default)]
    pub distinct: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub grouping_keys: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aggregation: Vec<Aggregation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub having: Vec<HavingCondition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub update: Vec<Assignment>,
}

impl QueryDescriptor {
    /// Plain `SELECT * FROM collection`
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            predicate: None,
            projection: FieldSelection::default(),
            distinct: false,
            grouping_keys: Vec::new(),
            aggregation: Vec::new(),
            having: Vec::new(),
            update: Vec::new(),
        }
    }

    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(predicate);
        self
    }

    pub fn is_grouped(&self) -> bool {
        !self.grouping_keys.is_empty() || !self.aggregation.is_empty() || !self.having.is_empty()
    }

    pub fn is_update(&self) -> bool {
        !self.update.is_empty()
    }

    /// Element target shared by every assignment, `None` if they disagree
    /// or there are no assignments.
    pub fn update_target(&self) -> Option<ElementTarget> {
        let first = self.update.first()?.target;
        self.update
            .iter()
            .all(|a| a.target == first)
            .then_some(first)
    }
}
