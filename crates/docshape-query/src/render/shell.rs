//! Mongo shell renderer.
//!
//! Renders translated queries as shell calls:
//! - `db.coll.find({...}, {...})`
//! - `db.coll.distinct("field", {...})`
//! - `db.coll.aggregate([...])`
//! - `db.coll.updateMany({...}, {...})`
//!
//! Identifier-like keys are written bare; dotted paths and anything else
//! are double-quoted. Regex values use the `/body/flags` literal form.

use crate::error::RenderError;
use crate::ir::{DocOperation, DocValue, Document, GroupSpec, Projection, Stage, TranslatedQuery};
use crate::render::{
    check_document, check_field, check_projection, check_update, group_key_name, ordered_stages,
    QueryRenderer, RenderedQuery,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::trace;

/// Keys that need no quoting: `status`, `_id`, `$in`
static BARE_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").unwrap());

/// Collection names usable as `db.<name>`
static BARE_COLLECTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// Shell syntax renderer.
#[derive(Debug, Clone, Default)]
pub struct ShellRenderer {
    /// Omit spaces after `:` and `,`
    pub compact: bool,
    /// Quote every key
    pub quote_keys: bool,
}

impl ShellRenderer {
    pub fn new(compact: bool, quote_keys: bool) -> Self {
        Self {
            compact,
            quote_keys,
        }
    }

    fn separator(&self) -> &'static str {
        if self.compact {
            ","
        } else {
            ", "
        }
    }

    fn colon(&self) -> &'static str {
        if self.compact {
            ":"
        } else {
            ": "
        }
    }

    fn key(&self, key: &str) -> String {
        if !self.quote_keys && BARE_KEY_RE.is_match(key) {
            key.to_string()
        } else {
            quote(key)
        }
    }

    fn entry(&self, key: &str, value: String) -> String {
        format!("{}{}{}", self.key(key), self.colon(), value)
    }

    fn object(&self, entries: Vec<String>) -> String {
        format!("{{{}}}", entries.join(self.separator()))
    }

    fn list(&self, items: Vec<String>) -> String {
        format!("[{}]", items.join(self.separator()))
    }

    fn collection(&self, name: &str) -> String {
        if BARE_COLLECTION_RE.is_match(name) {
            format!("db.{}", name)
        } else {
            format!("db.getCollection({})", quote(name))
        }
    }

    fn literal(&self, value: &Value) -> String {
        match value {
            Value::Array(items) => self.list(items.iter().map(|v| self.literal(v)).collect()),
            Value::Object(map) => self.object(
                map.iter()
                    .map(|(k, v)| self.entry(k, self.literal(v)))
                    .collect(),
            ),
            scalar => scalar.to_string(),
        }
    }

    fn value(&self, value: &DocValue) -> String {
        match value {
            DocValue::Literal(v) => self.literal(v),
            DocValue::Regex { body, flags } => format!("/{}/{}", body.replace('/', "\\/"), flags),
            DocValue::FieldRef(path) => quote(&format!("${}", path)),
            DocValue::Document(doc) => self.document(doc),
            DocValue::Array(items) => self.list(items.iter().map(|v| self.value(v)).collect()),
        }
    }

    fn document(&self, doc: &Document) -> String {
        self.object(
            doc.entries()
                .iter()
                .map(|(k, v)| self.entry(k, self.value(v)))
                .collect(),
        )
    }

    fn projection(&self, projection: &Projection) -> String {
        let id = projection
            .include_id
            .map(|included| self.entry("_id", flag(included)));
        let fields = projection
            .fields
            .iter()
            .map(|(field, included)| self.entry(field, flag(*included)));
        self.object(id.into_iter().chain(fields).collect())
    }

    fn group(&self, group: &GroupSpec) -> Result<String, RenderError> {
        for key in &group.keys {
            check_field(key, "group key")?;
        }
        check_document(&group.accumulators)?;

        let id = match group.keys.as_slice() {
            [] => "null".to_string(),
            [key] => quote(&format!("${}", key)),
            keys => self.object(
                keys.iter()
                    .map(|k| self.entry(&group_key_name(k), quote(&format!("${}", k))))
                    .collect(),
            ),
        };
        let accumulators = group
            .accumulators
            .entries()
            .iter()
            .map(|(k, v)| self.entry(k, self.value(v)));
        Ok(self.object(
            std::iter::once(self.entry("_id", id))
                .chain(accumulators)
                .collect(),
        ))
    }

    fn stage(&self, stage: &Stage) -> Result<String, RenderError> {
        let (operator, body) = match stage {
            Stage::Match(doc) | Stage::HavingMatch(doc) => {
                check_document(doc)?;
                ("$match", self.document(doc))
            }
            Stage::Group(group) => ("$group", self.group(group)?),
        };
        Ok(self.object(vec![self.entry(operator, body)]))
    }

    fn call(&self, query: &TranslatedQuery) -> Result<String, RenderError> {
        let args = match &query.operation {
            DocOperation::Find { filter, projection } => {
                check_document(filter)?;
                let mut args = vec![self.document(filter)];
                if let Some(projection) = projection.as_ref().filter(|p| !p.is_empty()) {
                    check_projection(projection)?;
                    args.push(self.projection(projection));
                }
                args
            }
            DocOperation::Distinct { field, filter } => {
                check_field(field, "distinct")?;
                check_document(filter)?;
                let mut args = vec![quote(field)];
                if !filter.is_empty() {
                    args.push(self.document(filter));
                }
                args
            }
            DocOperation::Aggregate { stages } => {
                let stages = ordered_stages(stages)?
                    .into_iter()
                    .map(|s| self.stage(s))
                    .collect::<Result<Vec<_>, _>>()?;
                vec![self.list(stages)]
            }
            DocOperation::UpdateMany { filter, update } => {
                check_document(filter)?;
                check_update(update)?;
                vec![self.document(filter), self.document(update)]
            }
        };

        Ok(format!(
            "{}.{}({})",
            self.collection(&query.collection),
            query.operation.method(),
            args.join(self.separator())
        ))
    }
}

fn quote(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

fn flag(included: bool) -> String {
    let flag = if included { "1" } else { "0" };
    flag.to_string()
}

impl QueryRenderer for ShellRenderer {
    fn name(&self) -> &str {
        "shell"
    }

    fn render(&self, query: &TranslatedQuery) -> Result<RenderedQuery, RenderError> {
        let text = self.call(query)?;
        trace!(renderer = "shell", rule = %query.rule_id, query = %text, "Rendered query");
        Ok(RenderedQuery {
            query: text,
            rule_id: query.rule_id.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn query(collection: &str, operation: DocOperation) -> TranslatedQuery {
        TranslatedQuery {
            collection: collection.to_string(),
            rule_id: "test".to_string(),
            operation,
        }
    }

    fn find(collection: &str, filter: Document) -> TranslatedQuery {
        query(
            collection,
            DocOperation::Find {
                filter,
                projection: None,
            },
        )
    }

    fn render(q: &TranslatedQuery) -> String {
        ShellRenderer::default().render(q).unwrap().query
    }

    // =========================================================================
    // Find
    // =========================================================================

    #[test]
    fn test_render_regex_filter() {
        let q = find(
            "Products",
            Document::single(
                "description",
                DocValue::Regex {
                    body: ".*BOOK.*".to_string(),
                    flags: String::new(),
                },
            ),
        );
        insta::assert_snapshot!(render(&q), @"db.Products.find({description: /.*BOOK.*/})");
    }

    #[test]
    fn test_render_in_list() {
        let q = find(
            "ShoppingCarts",
            Document::single(
                "shoppingCartProducts",
                Document::single("$in", json!(["5cd1a0475334fe0009133102"])),
            ),
        );
        insta::assert_snapshot!(
            render(&q),
            @r#"db.ShoppingCarts.find({shoppingCartProducts: {$in: ["5cd1a0475334fe0009133102"]}})"#
        );
    }

    #[test]
    fn test_render_projection_without_id() {
        let q = query(
            "Accounts",
            DocOperation::Find {
                filter: Document::new(),
                projection: Some(Projection {
                    include_id: Some(false),
                    fields: vec![
                        ("createdAt".to_string(), true),
                        ("updatedAt".to_string(), true),
                    ],
                }),
            },
        );
        insta::assert_snapshot!(render(&q), @"db.Accounts.find({}, {_id: 0, createdAt: 1, updatedAt: 1})");
    }

    #[test]
    fn test_render_dot_path_is_quoted() {
        let q = find("Users", Document::single("address.city", json!("Paris")));
        insta::assert_snapshot!(render(&q), @r#"db.Users.find({"address.city": "Paris"})"#);
    }

    #[test]
    fn test_render_regex_escapes_slash() {
        let q = find(
            "files",
            Document::single(
                "path",
                DocValue::Regex {
                    body: "^src/.*".to_string(),
                    flags: "i".to_string(),
                },
            ),
        );
        insta::assert_snapshot!(render(&q), @r"db.files.find({path: /^src\/.*/i})");
    }

    #[test]
    fn test_render_boolean_operators() {
        let q = find(
            "inventory",
            Document::single(
                "$or",
                DocValue::Array(vec![
                    Document::single("status", json!("A")).into(),
                    Document::single("qty", Document::single("$lt", json!(30))).into(),
                ]),
            ),
        );
        insta::assert_snapshot!(
            render(&q),
            @r#"db.inventory.find({$or: [{status: "A"}, {qty: {$lt: 30}}]})"#
        );
    }

    #[test]
    fn test_render_non_identifier_collection() {
        let q = find("order-items", Document::new());
        insta::assert_snapshot!(render(&q), @r#"db.getCollection("order-items").find({})"#);
    }

    #[test]
    fn test_render_compact() {
        let q = find(
            "t",
            Document::new()
                .with("a", json!(1))
                .with("b", Document::single("$in", json!([1, 2]))),
        );
        let rendered = ShellRenderer::new(true, false).render(&q).unwrap().query;
        insta::assert_snapshot!(rendered, @"db.t.find({a:1,b:{$in:[1,2]}})");
    }

    #[test]
    fn test_render_quote_keys() {
        let q = find("t", Document::single("a", json!(true)));
        let rendered = ShellRenderer::new(false, true).render(&q).unwrap().query;
        insta::assert_snapshot!(rendered, @r#"db.t.find({"a": true})"#);
    }

    #[test]
    fn test_mixed_projection_fails() {
        let q = query(
            "t",
            DocOperation::Find {
                filter: Document::new(),
                projection: Some(Projection {
                    include_id: None,
                    fields: vec![("a".to_string(), true), ("b".to_string(), false)],
                }),
            },
        );
        assert!(matches!(
            ShellRenderer::default().render(&q),
            Err(RenderError::UnrenderableShape { .. })
        ));
    }

    // =========================================================================
    // Distinct / aggregate / update
    // =========================================================================

    #[test]
    fn test_render_distinct_without_filter() {
        let q = query(
            "inventory",
            DocOperation::Distinct {
                field: "item".to_string(),
                filter: Document::new(),
            },
        );
        insta::assert_snapshot!(render(&q), @r#"db.inventory.distinct("item")"#);
    }

    #[test]
    fn test_render_distinct_empty_field_fails() {
        let q = query(
            "inventory",
            DocOperation::Distinct {
                field: String::new(),
                filter: Document::new(),
            },
        );
        assert!(ShellRenderer::default().render(&q).is_err());
    }

    #[test]
    fn test_render_group_having_pipeline() {
        let q = query(
            "orders",
            DocOperation::Aggregate {
                stages: vec![
                    Stage::Match(Document::single("status", json!("A"))),
                    Stage::Group(GroupSpec {
                        keys: vec!["cust_id".to_string()],
                        accumulators: Document::single(
                            "total",
                            Document::single("$sum", DocValue::FieldRef("price".to_string())),
                        ),
                    }),
                    Stage::HavingMatch(Document::single(
                        "total",
                        Document::single("$gt", json!(250)),
                    )),
                ],
            },
        );
        insta::assert_snapshot!(
            render(&q),
            @r#"db.orders.aggregate([{$match: {status: "A"}}, {$group: {_id: "$cust_id", total: {$sum: "$price"}}}, {$match: {total: {$gt: 250}}}])"#
        );
    }

    #[test]
    fn test_render_compound_group_key_without_filter() {
        let q = query(
            "orders",
            DocOperation::Aggregate {
                stages: vec![
                    Stage::Match(Document::new()),
                    Stage::Group(GroupSpec {
                        keys: vec!["cust_id".to_string(), "address.city".to_string()],
                        accumulators: Document::single("count", Document::single("$sum", json!(1))),
                    }),
                ],
            },
        );
        insta::assert_snapshot!(
            render(&q),
            @r#"db.orders.aggregate([{$group: {_id: {cust_id: "$cust_id", address_city: "$address.city"}, count: {$sum: 1}}}])"#
        );
    }

    #[test]
    fn test_render_update_all_elements() {
        let q = query(
            "students",
            DocOperation::UpdateMany {
                filter: Document::new(),
                update: Document::single("$set", Document::single("grades.$[]", json!(0))),
            },
        );
        insta::assert_snapshot!(render(&q), @r#"db.students.updateMany({}, {$set: {"grades.$[]": 0}})"#);
    }

    #[test]
    fn test_render_is_idempotent() {
        let q = find("t", Document::single("a", json!([1, "x", null])));
        let renderer = ShellRenderer::default();
        assert_eq!(renderer.render(&q).unwrap(), renderer.render(&q).unwrap());
    }
}
