//! Database command renderer.
//!
//! Renders translated queries as JSON command documents (`find`,
//! `distinct`, `aggregate`, `update`). Regex values use the
//! `{"$regex": ..., "$options": ...}` form since JSON has no regex literal.

use crate::error::RenderError;
use crate::ir::{DocOperation, DocValue, Document, GroupSpec, Projection, Stage, TranslatedQuery};
use crate::render::{
    check_document, check_field, check_projection, check_update, group_key_name, ordered_stages,
    QueryRenderer, RenderedQuery,
};
use serde_json::{json, Map, Value};
use tracing::trace;

/// JSON command renderer.
#[derive(Debug, Clone, Default)]
pub struct CommandRenderer {
    /// Single-line output instead of pretty-printed
    pub compact: bool,
}

impl CommandRenderer {
    pub fn new(compact: bool) -> Self {
        Self { compact }
    }

    fn value(&self, value: &DocValue) -> Value {
        match value {
            DocValue::Literal(v) => v.clone(),
            DocValue::Regex { body, flags } => {
                let mut regex = Map::new();
                regex.insert("$regex".to_string(), Value::String(body.clone()));
                if !flags.is_empty() {
                    regex.insert("$options".to_string(), Value::String(flags.clone()));
                }
                Value::Object(regex)
            }
            DocValue::FieldRef(path) => Value::String(format!("${}", path)),
            DocValue::Document(doc) => self.document(doc),
            DocValue::Array(items) => Value::Array(items.iter().map(|v| self.value(v)).collect()),
        }
    }

    fn document(&self, doc: &Document) -> Value {
        Value::Object(
            doc.entries()
                .iter()
                .map(|(k, v)| (k.clone(), self.value(v)))
                .collect(),
        )
    }

    fn projection(&self, projection: &Projection) -> Value {
        let mut map = Map::new();
        if let Some(included) = projection.include_id {
            map.insert("_id".to_string(), Value::from(u8::from(included)));
        }
        for (field, included) in &projection.fields {
            map.insert(field.clone(), Value::from(u8::from(*included)));
        }
        Value::Object(map)
    }

    fn group(&self, group: &GroupSpec) -> Result<Value, RenderError> {
        for key in &group.keys {
            check_field(key, "group key")?;
        }
        check_document(&group.accumulators)?;

        let id = match group.keys.as_slice() {
            [] => Value::Null,
            [key] => Value::String(format!("${}", key)),
            keys => Value::Object(
                keys.iter()
                    .map(|k| (group_key_name(k), Value::String(format!("${}", k))))
                    .collect(),
            ),
        };
        let mut map = Map::new();
        map.insert("_id".to_string(), id);
        for (name, accumulator) in group.accumulators.entries() {
            map.insert(name.clone(), self.value(accumulator));
        }
        Ok(Value::Object(map))
    }

    fn stage(&self, stage: &Stage) -> Result<Value, RenderError> {
        Ok(match stage {
            Stage::Match(doc) | Stage::HavingMatch(doc) => {
                check_document(doc)?;
                json!({ "$match": self.document(doc) })
            }
            Stage::Group(group) => json!({ "$group": self.group(group)? }),
        })
    }

    fn command(&self, query: &TranslatedQuery) -> Result<Value, RenderError> {
        let collection = Value::String(query.collection.clone());
        let mut command = Map::new();

        match &query.operation {
            DocOperation::Find { filter, projection } => {
                check_document(filter)?;
                command.insert("find".to_string(), collection);
                command.insert("filter".to_string(), self.document(filter));
                if let Some(projection) = projection.as_ref().filter(|p| !p.is_empty()) {
                    check_projection(projection)?;
                    command.insert("projection".to_string(), self.projection(projection));
                }
            }
            DocOperation::Distinct { field, filter } => {
                check_field(field, "distinct")?;
                check_document(filter)?;
                command.insert("distinct".to_string(), collection);
                command.insert("key".to_string(), Value::String(field.clone()));
                if !filter.is_empty() {
                    command.insert("query".to_string(), self.document(filter));
                }
            }
            DocOperation::Aggregate { stages } => {
                let pipeline = ordered_stages(stages)?
                    .into_iter()
                    .map(|s| self.stage(s))
                    .collect::<Result<Vec<_>, _>>()?;
                command.insert("aggregate".to_string(), collection);
                command.insert("pipeline".to_string(), Value::Array(pipeline));
                command.insert("cursor".to_string(), json!({}));
            }
            DocOperation::UpdateMany { filter, update } => {
                check_document(filter)?;
                check_update(update)?;
                command.insert("update".to_string(), collection);
                command.insert(
                    "updates".to_string(),
                    json!([{
                        "q": self.document(filter),
                        "u": self.document(update),
                        "multi": true,
                    }]),
                );
            }
        }
        Ok(Value::Object(command))
    }
}

impl QueryRenderer for CommandRenderer {
    fn name(&self) -> &str {
        "command"
    }

    fn render(&self, query: &TranslatedQuery) -> Result<RenderedQuery, RenderError> {
        let command = self.command(query)?;
        let text = if self.compact {
            serde_json::to_string(&command)
        } else {
            serde_json::to_string_pretty(&command)
        }
        .map_err(|e| RenderError::unrenderable(format!("command document ({})", e)))?;

        trace!(renderer = "command", rule = %query.rule_id, "Rendered query");
        Ok(RenderedQuery {
            query: text,
            rule_id: query.rule_id.clone(),
        })
    }
}
