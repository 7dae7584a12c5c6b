//! Relational shapes: the left-hand side of a pattern rule.
//!
//! A shape describes a structural class of predicate or statement. Each
//! slot of a shape names the placeholder its concrete value is bound to;
//! the slot's position decides what gets extracted (field path, literal,
//! sub-filter, ...).

use crate::descriptor::{CompareOp, ElementTarget, LikeClass, Predicate, QueryDescriptor};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Named slot in a rule shape.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Placeholder(String);

impl Placeholder {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shorthand for `Placeholder::new`
pub fn ph(name: &str) -> Placeholder {
    Placeholder::new(name)
}

/// Structural class of a predicate node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PredicateShape {
    /// `field <op> value`
    Compare {
        op: CompareOp,
        field: Placeholder,
        value: Placeholder,
    },
    /// `field LIKE pattern` with wildcards in the given positions
    Like {
        class: LikeClass,
        field: Placeholder,
        pattern: Placeholder,
    },
    /// `field IN (values)`
    InList {
        field: Placeholder,
        values: Placeholder,
    },
    /// `field NOT IN (values)`
    NotInList {
        field: Placeholder,
        values: Placeholder,
    },
    /// Array length equals `size`
    SizeEquals {
        field: Placeholder,
        size: Placeholder,
    },
    /// EXISTS subquery over an embedded array
    ElementMatch {
        field: Placeholder,
        condition: Placeholder,
    },
    /// Conjunction. With `disjoint` set, only conjunctions of single-field
    /// leaves on distinct fields match.
    AllOf {
        disjoint: bool,
        operands: Placeholder,
    },
    /// Disjunction
    AnyOf { operands: Placeholder },
}

impl PredicateShape {
    /// Whether the predicate node belongs to this structural class.
    ///
    /// Literal values never take part in matching.
    pub fn matches(&self, predicate: &Predicate) -> bool {
        match (self, predicate) {
            (PredicateShape::Compare { op, .. }, Predicate::Compare { op: actual, .. }) => {
                op == actual
            }
            (PredicateShape::Like { class, .. }, Predicate::Like { pattern, .. }) => {
                *class == pattern.class
            }
            (PredicateShape::InList { .. }, Predicate::InList { .. }) => true,
            (PredicateShape::NotInList { .. }, Predicate::NotInList { .. }) => true,
            (PredicateShape::SizeEquals { .. }, Predicate::SizeEquals { .. }) => true,
            (PredicateShape::ElementMatch { .. }, Predicate::ExistsSubquery { .. }) => true,
            (PredicateShape::AllOf { disjoint, .. }, pred @ Predicate::And(_)) => {
                !disjoint || pred.is_disjoint_conjunction()
            }
            (PredicateShape::AnyOf { .. }, Predicate::Or(_)) => true,
            _ => false,
        }
    }

    /// Placeholders in slot order
    pub fn placeholders(&self) -> Vec<&Placeholder> {
        match self {
            PredicateShape::Compare { field, value, .. } => vec![field, value],
            PredicateShape::Like { field, pattern, .. } => vec![field, pattern],
            PredicateShape::InList { field, values } | PredicateShape::NotInList { field, values } => {
                vec![field, values]
            }
            PredicateShape::SizeEquals { field, size } => vec![field, size],
            PredicateShape::ElementMatch { field, condition } => vec![field, condition],
            PredicateShape::AllOf { operands, .. } | PredicateShape::AnyOf { operands } => {
                vec![operands]
            }
        }
    }

    /// Relational notation of the shape, e.g. `field LIKE '%pattern%'`
    pub fn notation(&self) -> String {
        match self {
            PredicateShape::Compare { op, field, value } => {
                let symbol = match op {
                    CompareOp::Eq => "=",
                    CompareOp::Ne => "<>",
                    CompareOp::Gt => ">",
                    CompareOp::Gte => ">=",
                    CompareOp::Lt => "<",
                    CompareOp::Lte => "<=",
                };
                format!("{{{}}} {} {{{}}}", field, symbol, value)
            }
            PredicateShape::Like {
                class,
                field,
                pattern,
            } => {
                let wrapped = match class {
                    LikeClass::Contains => format!("'%{{{}}}%'", pattern),
                    LikeClass::Prefix => format!("'{{{}}}%'", pattern),
                    LikeClass::Suffix => format!("'%{{{}}}'", pattern),
                    LikeClass::General => format!("'{{{}}}'", pattern),
                };
                format!("{{{}}} LIKE {}", field, wrapped)
            }
            PredicateShape::InList { field, values } => format!("{{{}}} IN ({{{}}})", field, values),
            PredicateShape::NotInList { field, values } => {
                format!("{{{}}} NOT IN ({{{}}})", field, values)
            }
            PredicateShape::SizeEquals { field, size } => {
                format!("(SELECT COUNT(*) FROM {{{}}}) = {{{}}}", field, size)
            }
            PredicateShape::ElementMatch { field, condition } => {
                format!("EXISTS (SELECT 1 FROM {{{}}} WHERE {{{}}})", field, condition)
            }
            PredicateShape::AllOf { disjoint, operands } => {
                if *disjoint {
                    format!("{{{}}} AND ... (distinct fields)", operands)
                } else {
                    format!("{{{}}} AND ...", operands)
                }
            }
            PredicateShape::AnyOf { operands } => format!("{{{}}} OR ...", operands),
        }
    }
}

/// Structural class of a whole statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementShape {
    /// `SELECT * FROM t WHERE filter`
    Select { filter: Placeholder },
    /// `SELECT a, b FROM t WHERE filter`
    Projected {
        filter: Placeholder,
        projection: Placeholder,
    },
    /// `SELECT DISTINCT field FROM t WHERE filter`
    Distinct {
        field: Placeholder,
        filter: Placeholder,
    },
    /// `SELECT keys, aggregates FROM t WHERE filter GROUP BY keys`
    Grouped {
        filter: Placeholder,
        group: Placeholder,
    },
    /// Grouped statement with a HAVING clause
    GroupedHaving {
        filter: Placeholder,
        group: Placeholder,
        having: Placeholder,
    },
    /// `UPDATE t SET assignments WHERE filter`, every assignment writing
    /// the same kind of target
    Update {
        target: ElementTarget,
        filter: Placeholder,
        assignments: Placeholder,
    },
}

impl StatementShape {
    pub fn matches(&self, descriptor: &QueryDescriptor) -> bool {
        let plain = !descriptor.is_update() && !descriptor.is_grouped();
        match self {
            StatementShape::Select { .. } => {
                plain && !descriptor.distinct && descriptor.projection.is_empty()
            }
            StatementShape::Projected { .. } => {
                plain && !descriptor.distinct && !descriptor.projection.is_empty()
            }
            StatementShape::Distinct { .. } => plain && descriptor.distinct,
            StatementShape::Grouped { .. } => {
                !descriptor.is_update()
                    && descriptor.is_grouped()
                    && descriptor.having.is_empty()
                    && descriptor.projection.is_empty()
                    && !descriptor.distinct
            }
            StatementShape::GroupedHaving { .. } => {
                !descriptor.is_update()
                    && !descriptor.having.is_empty()
                    && descriptor.projection.is_empty()
                    && !descriptor.distinct
            }
            StatementShape::Update { target, .. } => {
                descriptor.is_update()
                    && !descriptor.is_grouped()
                    && !descriptor.distinct
                    && descriptor.projection.is_empty()
                    && descriptor.update_target() == Some(*target)
            }
        }
    }

    pub fn placeholders(&self) -> Vec<&Placeholder> {
        match self {
            StatementShape::Select { filter } => vec![filter],
            StatementShape::Projected { filter, projection } => vec![filter, projection],
            StatementShape::Distinct { field, filter } => vec![field, filter],
            StatementShape::Grouped { filter, group } => vec![filter, group],
            StatementShape::GroupedHaving {
                filter,
                group,
                having,
            } => vec![filter, group, having],
            StatementShape::Update {
                filter,
                assignments,
                ..
            } => vec![filter, assignments],
        }
    }

    pub fn notation(&self) -> String {
        match self {
            StatementShape::Select { filter } => format!("SELECT * FROM t WHERE {{{}}}", filter),
            StatementShape::Projected { filter, projection } => {
                format!("SELECT {{{}}} FROM t WHERE {{{}}}", projection, filter)
            }
            StatementShape::Distinct { field, filter } => {
                format!("SELECT DISTINCT {{{}}} FROM t WHERE {{{}}}", field, filter)
            }
            StatementShape::Grouped { filter, group } => {
                format!("SELECT {{{}}} FROM t WHERE {{{}}} GROUP BY ...", group, filter)
            }
            StatementShape::GroupedHaving {
                filter,
                group,
                having,
            } => format!(
                "SELECT {{{}}} FROM t WHERE {{{}}} GROUP BY ... HAVING {{{}}}",
                group, filter, having
            ),
            StatementShape::Update {
                target,
                filter,
                assignments,
            } => {
                let scope = match target {
                    ElementTarget::Whole => "",
                    ElementTarget::Matched => " (matched array element)",
                    ElementTarget::All => " (all array elements)",
                };
                format!("UPDATE t SET {{{}}}{} WHERE {{{}}}", assignments, scope, filter)
            }
        }
    }
}

/// Left-hand side of a pattern rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationalShape {
    Predicate(PredicateShape),
    Statement(StatementShape),
}

impl RelationalShape {
    pub fn placeholders(&self) -> Vec<&Placeholder> {
        match self {
            RelationalShape::Predicate(shape) => shape.placeholders(),
            RelationalShape::Statement(shape) => shape.placeholders(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            RelationalShape::Predicate(_) => "predicate",
            RelationalShape::Statement(_) => "statement",
        }
    }

    pub fn notation(&self) -> String {
        match self {
            RelationalShape::Predicate(shape) => shape.notation(),
            RelationalShape::Statement(shape) => shape.notation(),
        }
    }
}
