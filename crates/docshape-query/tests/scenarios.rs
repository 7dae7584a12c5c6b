//! End-to-end translation scenarios through the public API.

use docshape_query::render::{CommandRenderer, ShellRenderer};
use docshape_query::{
    parse, render, translate, CatalogOptions, ParseError, PatternCatalog, QueryError,
    QueryPipeline, QueryRenderer, RenderOptions, RendererKind, TranslateError,
};
use std::sync::Arc;
use test_case::test_case;

fn shell(input: &str) -> String {
    let descriptor = parse(input).unwrap();
    let translated = translate(&descriptor).unwrap();
    render(&translated).unwrap()
}

// =============================================================================
// Reference scenarios
// =============================================================================

#[test]
fn test_regex_match() {
    let out = shell(
        r#"{"collection": "Products", "predicate": {"kind": "like", "field": "description", "pattern": "BOOK"}}"#,
    );
    insta::assert_snapshot!(out, @"db.Products.find({description: /.*BOOK.*/})");
}

#[test]
fn test_membership() {
    let out = shell(
        r#"{
            "collection": "ShoppingCarts",
            "predicate": {
                "kind": "inList",
                "field": "shoppingCartProducts",
                "values": ["5cd1a0475334fe0009133102"]
            }
        }"#,
    );
    insta::assert_snapshot!(
        out,
        @r#"db.ShoppingCarts.find({shoppingCartProducts: {$in: ["5cd1a0475334fe0009133102"]}})"#
    );
}

#[test]
fn test_unsupported_leaf_kind() {
    let err = parse(
        r#"{"collection": "Products", "predicate": {"kind": "FULL_TEXT_SEARCH", "field": "description"}}"#,
    )
    .unwrap_err();
    assert!(matches!(err, ParseError::UnsupportedPredicateShape { ref kind, .. } if kind == "FULL_TEXT_SEARCH"));
}

#[test]
fn test_projection_excluding_id() {
    let out = shell(
        r#"{"collection": "Accounts", "projectedFields": ["createdAt", "updatedAt"], "excludeId": true}"#,
    );
    insta::assert_snapshot!(out, @"db.Accounts.find({}, {_id: 0, createdAt: 1, updatedAt: 1})");
}

// =============================================================================
// Statement forms
// =============================================================================

#[test]
fn test_grouped_with_having_yaml() {
    let out = shell(
        "collection: orders\n\
         groupingKeys: [cust_id]\n\
         aggregation:\n  - function: sum\n    field: price\n    alias: total\n\
         predicate: \"and(eq(status, 'A'), having(sum, price, gt, 250))\"\n",
    );
    insta::assert_snapshot!(
        out,
        @r#"db.orders.aggregate([{$match: {status: "A"}}, {$group: {_id: "$cust_id", total: {$sum: "$price"}}}, {$match: {total: {$gt: 250}}}])"#
    );
}

#[test]
fn test_distinct_with_filter() {
    let out = shell(
        r#"{"collection": "inventory", "projectedFields": ["item"], "distinct": true, "predicate": "eq(dept, 'A')"}"#,
    );
    insta::assert_snapshot!(out, @r#"db.inventory.distinct("item", {dept: "A"})"#);
}

#[test]
fn test_update_matched_element() {
    let out = shell(
        r#"{
            "collection": "students",
            "predicate": "eq(grades, 85)",
            "update": [{"array": "grades", "value": 82}]
        }"#,
    );
    insta::assert_snapshot!(out, @r#"db.students.updateMany({grades: 85}, {$set: {"grades.$": 82}})"#);
}

#[test]
fn test_update_all_elements() {
    let out = shell(
        r#"{
            "collection": "students",
            "predicate": {"kind": "size", "field": "grades", "size": 3},
            "update": [{"array": "grades", "elements": "all", "value": 0}]
        }"#,
    );
    insta::assert_snapshot!(
        out,
        @r#"db.students.updateMany({grades: {$size: 3}}, {$set: {"grades.$[]": 0}})"#
    );
}

#[test]
fn test_exists_subquery_as_element_match() {
    let out = shell(r#"{"collection": "t", "predicate": "exists(items, eq(sku, 'abc'))"}"#);
    insta::assert_snapshot!(out, @r#"db.t.find({items: {$elemMatch: {sku: "abc"}}})"#);

    let out = shell(
        r#"{
            "collection": "t",
            "predicate": {
                "kind": "exists",
                "field": "items",
                "condition": {"kind": "gt", "field": "qty", "value": 5}
            }
        }"#,
    );
    insta::assert_snapshot!(out, @"db.t.find({items: {$elemMatch: {qty: {$gt: 5}}}})");
}

#[test]
fn test_unknown_kind_with_mistyped_attribute() {
    let err = parse(
        r#"{"collection": "Products", "predicate": {"kind": "FULL_TEXT_SEARCH", "field": "body", "values": "rust"}}"#,
    )
    .unwrap_err();
    assert!(matches!(err, ParseError::UnsupportedPredicateShape { ref kind, .. } if kind == "FULL_TEXT_SEARCH"));
}

#[test]
fn test_wrong_literal_type_is_invalid() {
    assert!(matches!(
        parse(r#"{"collection": "x", "distinct": "yes"}"#),
        Err(ParseError::InvalidDescriptor { .. })
    ));
}

#[test]
fn test_having_count_beside_sum_aliased_count() {
    let out = shell(
        r#"{
            "collection": "orders",
            "groupingKeys": ["cust_id"],
            "aggregation": [{"function": "sum", "field": "price", "alias": "count"}],
            "predicate": "having(count, gt, 1)"
        }"#,
    );
    insta::assert_snapshot!(
        out,
        @r#"db.orders.aggregate([{$group: {_id: "$cust_id", count: {$sum: "$price"}, count_1: {$sum: 1}}}, {$match: {count_1: {$gt: 1}}}])"#
    );
}

#[test_case("eq(qty, 20)", "db.t.find({qty: 20})" ; "equality")]
#[test_case("lt(qty, 30)", "db.t.find({qty: {$lt: 30}})" ; "less than")]
#[test_case("notin(status, 'A', 'D')", r#"db.t.find({status: {$nin: ["A", "D"]}})"# ; "not in list")]
#[test_case("size(tags, 3)", "db.t.find({tags: {$size: 3}})" ; "array size")]
#[test_case("or(eq(a, 1), eq(b, 2))", "db.t.find({$or: [{a: 1}, {b: 2}]})" ; "disjunction")]
#[test_case("and(eq(a, 1), eq(b, 2))", "db.t.find({a: 1, b: 2})" ; "disjoint conjunction")]
#[test_case("like(name, 'Jo%')", "db.t.find({name: /^Jo.*/})" ; "prefix like")]
fn test_predicate_forms(predicate: &str, expected: &str) {
    let input = format!(r#"{{"collection": "t", "predicate": "{}"}}"#, predicate.replace('"', "\\\""));
    assert_eq!(shell(&input), expected);
}

// =============================================================================
// Failures surface from the stage that detected them
// =============================================================================

#[test]
fn test_empty_in_list_fails_translation() {
    let err = QueryPipeline::default()
        .run(r#"{"collection": "t", "predicate": {"kind": "in", "field": "a", "values": []}}"#)
        .unwrap_err();
    assert!(matches!(
        err,
        QueryError::Translate(TranslateError::BindingArityMismatch { .. })
    ));
}

#[test]
fn test_nested_having_fails_parse() {
    let err = parse(r#"{"collection": "t", "predicate": "or(eq(a, 1), having(count, gt, 1))"}"#)
        .unwrap_err();
    assert!(matches!(err, ParseError::UnsupportedPredicateShape { .. }));
}

#[test]
fn test_missing_collection_is_invalid() {
    assert!(matches!(
        parse(r#"{"predicate": "eq(a, 1)"}"#),
        Err(ParseError::InvalidDescriptor { .. })
    ));
}

// =============================================================================
// Catalog examples, determinism, sharing
// =============================================================================

#[test]
fn test_every_rule_example_renders() {
    let catalog = PatternCatalog::standard();
    let shell = ShellRenderer::default();
    let command = CommandRenderer::default();
    for rule in catalog.rules() {
        let example = rule.example();
        let translated = translate(&example.descriptor).unwrap();
        let text = shell.render(&translated).unwrap().query;
        assert!(text.starts_with("db.inventory."), "rule {}: {}", rule.id, text);
        let json = command.render(&translated).unwrap().query;
        assert!(serde_json::from_str::<serde_json::Value>(&json).is_ok(), "rule {}", rule.id);
    }
}

#[test]
fn test_normalization_is_idempotent() {
    let once = parse(
        r#"{"collection": "t", "predicate": "and(and(eq(a, 1), eq(b, 2)), or(eq(c, 3)))"}"#,
    )
    .unwrap();
    let twice = docshape_query::transform::normalize(once.clone()).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn test_yaml_and_json_agree() {
    let json = parse(r#"{"collection": "inventory", "predicate": "gte(qty, 10)"}"#).unwrap();
    let yaml = parse("collection: inventory\npredicate: \"gte(qty, 10)\"\n").unwrap();
    assert_eq!(json, yaml);
}

#[test]
fn test_pipeline_is_shareable_across_threads() {
    let pipeline = Arc::new(QueryPipeline::default());
    let inputs = [
        r#"{"collection": "a", "predicate": "eq(x, 1)"}"#,
        r#"{"collection": "b", "predicate": "like(y, '%z')"}"#,
        r#"{"collection": "c", "groupingKeys": ["k"]}"#,
    ];
    let expected: Vec<String> = inputs
        .iter()
        .map(|i| pipeline.run(i).unwrap().query)
        .collect();

    std::thread::scope(|scope| {
        for _ in 0..4 {
            let pipeline = Arc::clone(&pipeline);
            let expected = &expected;
            scope.spawn(move || {
                for (input, want) in inputs.iter().zip(expected) {
                    assert_eq!(&pipeline.run(input).unwrap().query, want);
                }
            });
        }
    });
}

#[test]
fn test_command_renderer_through_pipeline() {
    let pipeline = QueryPipeline::builder()
        .with_render_options(RenderOptions {
            renderer: RendererKind::Command,
            compact: true,
            quote_keys: false,
        })
        .build();
    let out = pipeline
        .run(r#"{"collection": "Products", "predicate": "like(description, 'BOOK')"}"#)
        .unwrap();
    insta::assert_snapshot!(
        out.query,
        @r#"{"find":"Products","filter":{"description":{"$regex":".*BOOK.*"}}}"#
    );
}

#[test]
fn test_disabled_rule_is_skipped() {
    let catalog = PatternCatalog::from_options(&CatalogOptions {
        disabled_rules: vec!["select-projected".to_string()],
    });
    let pipeline = QueryPipeline::builder()
        .with_catalog(Arc::new(catalog))
        .build();
    assert!(pipeline
        .catalog()
        .rules()
        .iter()
        .all(|r| r.id != "select-projected"));
}
