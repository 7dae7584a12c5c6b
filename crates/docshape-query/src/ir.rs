//! Document-store intermediate representation.
//!
//! This is what the translator produces and what renderers consume. The
//! types have no placeholder variant: a `TranslatedQuery` is always fully
//! concrete.

use serde_json::Value;

/// A value in a document-store query.
#[derive(Debug, Clone, PartialEq)]
pub enum DocValue {
    /// Plain JSON literal (string, number, bool, null, array, object)
    Literal(Value),
    /// Regular expression literal: `/body/flags`
    Regex { body: String, flags: String },
    /// Reference to a field inside an aggregation: `"$path"`
    FieldRef(String),
    Document(Document),
    Array(Vec<DocValue>),
}

impl DocValue {
    pub fn as_document(&self) -> Option<&Document> {
        match self {
            DocValue::Document(doc) => Some(doc),
            _ => None,
        }
    }
}

impl From<Value> for DocValue {
    fn from(value: Value) -> Self {
        DocValue::Literal(value)
    }
}

impl From<Document> for DocValue {
    fn from(doc: Document) -> Self {
        DocValue::Document(doc)
    }
}

/// Ordered key/value document.
///
/// Key order is preserved exactly as built so rendering is deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    entries: Vec<(String, DocValue)>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Document with a single entry
    pub fn single(key: impl Into<String>, value: impl Into<DocValue>) -> Self {
        let mut doc = Self::new();
        doc.insert(key, value);
        doc
    }

    /// Append an entry, replacing the value if the key already exists
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<DocValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<DocValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&DocValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn entries(&self) -> &[(String, DocValue)] {
        &self.entries
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, DocValue)> for Document {
    fn from_iter<T: IntoIterator<Item = (String, DocValue)>>(iter: T) -> Self {
        let mut doc = Document::new();
        for (k, v) in iter {
            doc.insert(k, v);
        }
        doc
    }
}

/// Projection map for `find`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    /// `Some(false)` suppresses the identity field; `None` leaves it implicit
    pub include_id: Option<bool>,
    /// Field → included (`true`) or excluded (`false`)
    pub fields: Vec<(String, bool)>,
}

impl Projection {
    /// Nothing to project: every field, identity included
    pub fn is_empty(&self) -> bool {
        self.include_id.is_none() && self.fields.is_empty()
    }
}

/// `$group` stage contents.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupSpec {
    pub keys: Vec<String>,
    /// Output name → accumulator expression (`{$sum: 1}`)
    pub accumulators: Document,
}

/// One aggregation pipeline stage.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    /// Row filter, before grouping
    Match(Document),
    Group(GroupSpec),
    /// Filter on aggregated values, after grouping
    HavingMatch(Document),
}

impl Stage {
    /// Canonical position of the stage in a pipeline
    pub fn rank(&self) -> u8 {
        match self {
            Stage::Match(_) => 0,
            Stage::Group(_) => 1,
            Stage::HavingMatch(_) => 2,
        }
    }
}

/// Concrete document-store operation.
#[derive(Debug, Clone, PartialEq)]
pub enum DocOperation {
    Find {
        filter: Document,
        projection: Option<Projection>,
    },
    Distinct {
        field: String,
        filter: Document,
    },
    Aggregate {
        stages: Vec<Stage>,
    },
    UpdateMany {
        filter: Document,
        update: Document,
    },
}

impl DocOperation {
    /// Shell method name
    pub fn method(&self) -> &'static str {
        match self {
            DocOperation::Find { .. } => "find",
            DocOperation::Distinct { .. } => "distinct",
            DocOperation::Aggregate { .. } => "aggregate",
            DocOperation::UpdateMany { .. } => "updateMany",
        }
    }
}

/// Output of the translator.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslatedQuery {
    pub collection: String,
    /// Id of the statement rule that produced this query
    pub rule_id: String,
    pub operation: DocOperation,
}
