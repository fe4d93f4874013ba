//! Reference-path comparisons: fused joins, inlined selects, sorts and
//! grouping through a reference, and the nesting bound.

use uuid::Uuid;

use entisql::catalog::{FieldInfo, FieldType, IndexModel, MappedKey};
use entisql::compiler::CompileError;
use entisql::{MemoryCatalog, MysqlVendor, Predicate, Query, QueryValue, Sorter, SqlCompiler};

fn author_type() -> Uuid {
    Uuid::parse_str("99999999-8888-7777-6666-555555555555").unwrap()
}

fn author_field() -> FieldInfo {
    FieldInfo::new("author", FieldType::Uuid)
}

/// Catalog where "author/name" traverses a reference to the author type and
/// continues on its "name" field.
fn catalog() -> MemoryCatalog {
    let shell = Query::new().with_type_id(author_type());
    MemoryCatalog::new()
        .with_key(
            "author/name",
            MappedKey::for_field(
                "article/author",
                author_field(),
                vec![IndexModel::new("k_author", ["author"], 3)],
            )
            .with_sub_query(shell, "name"),
        )
        .with_key(
            "author",
            MappedKey::for_field(
                "article/author",
                author_field(),
                vec![IndexModel::new("k_author", ["author"], 3)],
            ),
        )
        .with_field("name", FieldType::Text)
        .with_field("title", FieldType::Text)
}

#[test]
fn test_reference_comparison_fuses_child_query() {
    let catalog = catalog();
    let vendor = MysqlVendor::new();
    let query = Query::from_all()
        .with_predicate(Predicate::eq("author/name", QueryValue::text("Doe")));

    let sql = SqlCompiler::new(&catalog, &vendor, query)
        .select_statement()
        .unwrap();

    // Local join on the reference field, then the child scope spliced in.
    assert!(sql.contains("INNER JOIN `RecordUuid3` AS `i0`"));
    assert!(sql.contains("INNER JOIN `Record` AS `s0r` ON `i0`.`value` = `s0r`.`id`"));
    assert!(sql.contains("INNER JOIN `RecordString3` AS `s0i0`"));
    // The child's restrictions surface in the parent WHERE clause.
    assert!(sql.contains("`s0r`.`typeId` IN (X'99999999888877776666555555555555')"));
    assert!(sql.contains("`s0i0`.`value` = 'Doe'"));
}

#[test]
fn test_negated_reference_comparison_fuses_with_inequality() {
    let catalog = catalog();
    let vendor = MysqlVendor::new();
    let query = Query::from_all().with_predicate(Predicate::not_equals_all(
        "author/name",
        vec![QueryValue::text("Doe")],
    ));

    let mut compiler = SqlCompiler::new(&catalog, &vendor, query);
    let sql = compiler.select_statement().unwrap();

    assert!(sql.contains("INNER JOIN `Record` AS `s0r` ON `i0`.`value` != `s0r`.`id`"));
    assert!(compiler.report().unwrap().needs_distinct);
}

#[test]
fn test_direct_use_of_reference_field_inlines_the_child() {
    let catalog = catalog();
    let vendor = MysqlVendor::new();
    let author_id = Uuid::parse_str("aaaaaaaa-0000-0000-0000-000000000001").unwrap();
    let query = Query::from_all().with_predicate(Predicate::and(vec![
        Predicate::eq("author/name", QueryValue::text("Doe")),
        Predicate::eq("author", QueryValue::Uuid(author_id)),
    ]));

    let sql = SqlCompiler::new(&catalog, &vendor, query)
        .select_statement()
        .unwrap();

    assert!(sql.contains("`i0`.`value` IN (SELECT `s0r`.`id`\n"));
    // The direct comparison shares the same local join.
    assert!(sql.contains("`i0`.`value` = X'aaaaaaaa000000000000000000000001'"));
    // No fused child scope.
    assert!(!sql.contains("ON `i0`.`value` = `s0r`.`id`"));
}

#[test]
fn test_negated_inlined_child_uses_not_in() {
    let catalog = catalog();
    let vendor = MysqlVendor::new();
    let author_id = Uuid::parse_str("aaaaaaaa-0000-0000-0000-000000000001").unwrap();
    let query = Query::from_all().with_predicate(Predicate::and(vec![
        Predicate::not_equals_all("author/name", vec![QueryValue::text("Doe")]),
        Predicate::eq("author", QueryValue::Uuid(author_id)),
    ]));

    let sql = SqlCompiler::new(&catalog, &vendor, query)
        .select_statement()
        .unwrap();
    assert!(sql.contains("`i0`.`value` NOT IN (SELECT `s0r`.`id`\n"));
    assert!(sql.contains("SELECT DISTINCT `r`.`id`, `r`.`typeId`"));
}

#[test]
fn test_sort_through_reference_hoists_child_order() {
    let catalog = catalog();
    let vendor = MysqlVendor::new();
    let query = Query::from_all().with_sorter(Sorter::ascending("author/name"));

    let sql = SqlCompiler::new(&catalog, &vendor, query)
        .select_statement()
        .unwrap();

    assert!(sql.contains("INNER JOIN `Record` AS `s0r` ON `i0`.`value` = `s0r`.`id`"));
    // Records lacking an author name keep their place in the result set.
    assert!(sql.contains("LEFT OUTER JOIN `RecordString3` AS `s0i0`"));
    assert!(sql.ends_with("ORDER BY `s0i0`.`value`"));
}

#[test]
fn test_group_through_reference_hoists_child_columns() {
    let catalog = catalog();
    let vendor = MysqlVendor::new();
    let sql = SqlCompiler::new(&catalog, &vendor, Query::from_all())
        .group_statement(&["author/name"])
        .unwrap();

    assert!(sql.starts_with("SELECT COUNT(`r`.`id`) AS `_count`, `s0i0`.`value`\n"));
    assert!(sql.contains("INNER JOIN `Record` AS `s0r` ON `i0`.`value` = `s0r`.`id`"));
    assert!(sql.contains("LEFT OUTER JOIN `RecordString3` AS `s0i0`"));
    assert!(sql.ends_with("\nGROUP BY `s0i0`.`value`"));
}

#[test]
fn test_reference_cycles_hit_the_depth_bound() {
    // A key whose continuation lands back on itself.
    let shell = Query::from_all();
    let catalog = MemoryCatalog::new().with_key(
        "parent/loop",
        MappedKey::for_field(
            "node/parent",
            FieldInfo::new("parent", FieldType::Uuid),
            vec![IndexModel::new("k_parent", ["parent"], 3)],
        )
        .with_sub_query(shell, "parent/loop"),
    );
    let vendor = MysqlVendor::new();
    let query = Query::from_all()
        .with_predicate(Predicate::eq("parent/loop", QueryValue::text("x")));

    let err = SqlCompiler::new(&catalog, &vendor, query)
        .select_statement()
        .unwrap_err();
    assert!(matches!(err, CompileError::UnsupportedPredicate { .. }));
}
