use sealdb::collection::{order_by, FindOptions, SortOrder};
use sealdb::common::Value;
use sealdb::doc;
use sealdb::errors::ErrorKind;
use sealdb::index::{IndexDefinition, IndexDirection, IndexField};
use sealdb_int_test::test_util::{
    cleanup, create_memory_test_context, insert_numbered, insert_test_documents, run_test, sorted_ids,
};

#[test]
fn test_descending_index_range() {
    run_test(
        create_memory_test_context,
        |ctx| {
            let coll = ctx.db().collection("numbers")?;
            insert_numbered(&coll, 100)?;

            assert!(coll.ensure_index_document(&doc! { i: (-1) })?);
            assert_eq!(coll.select_index(&doc! { i: { "$gte": 90 } })?, Some("i".to_string()));

            let found = coll.find(&doc! { i: { "$gte": 90 } }, &FindOptions::new())?;
            assert_eq!(found.len(), 10);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_index_equivalence() {
    run_test(
        create_memory_test_context,
        |ctx| {
            let coll = ctx.db().collection("numbers")?;
            insert_numbered(&coll, 60)?;
            coll.save(doc! { s: "s1" })?;
            coll.save(doc! { i: "7", s: "s3" })?;

            let filters = vec![
                doc! { i: { "$gt": 10, "$lte": 40 } },
                doc! { i: 7 },
                doc! { i: "7" },
                doc! { i: { "$in": ["12", 30] } },
                doc! { i: { "$ne": 3 } },
                doc! { i: { "$regex": "^1" } },
                doc! { i: { "$in": [1, 2, 3] } },
                doc! { i: { "$nin": [1, 2, 3] } },
                doc! { i: { "$exists": true } },
                doc! { s: "s1", i: { "$lt": 20 } },
            ];

            let scanned: Vec<_> = filters
                .iter()
                .map(|f| coll.find(f, &FindOptions::new()).map(|d| sorted_ids(&d)))
                .collect::<Result<_, _>>()?;

            coll.ensure_index_document(&doc! { i: 1 })?;
            coll.ensure_index_document(&doc! { s: 1, i: (-1) })?;

            for (filter, expected) in filters.iter().zip(scanned) {
                let indexed = sorted_ids(&coll.find(filter, &FindOptions::new())?);
                assert_eq!(indexed, expected, "filter {}", filter);
            }
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_ensure_index_is_idempotent() {
    run_test(
        create_memory_test_context,
        |ctx| {
            let coll = ctx.db().collection("test")?;
            insert_test_documents(&coll)?;

            assert!(coll.ensure_index_document(&doc! { last_name: 1, age: 1 })?);
            assert!(!coll.ensure_index_document(&doc! { age: 1, last_name: 1 })?);
            assert!(!coll.ensure_index(IndexDefinition::new(vec![
                IndexField::new("last_name", IndexDirection::Descending),
                IndexField::new("age", IndexDirection::Ascending),
            ])?)?);
            assert_eq!(coll.index_names(), vec!["age_last_name".to_string()]);

            assert_eq!(
                coll.select_index(&doc! { last_name: "ln2", age: { "$gt": 20 } })?,
                Some("age_last_name".to_string())
            );
            assert_eq!(coll.select_index(&doc! { last_name: "ln2" })?, None);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_drop_index_falls_back_to_scan() {
    run_test(
        create_memory_test_context,
        |ctx| {
            let coll = ctx.db().collection("test")?;
            insert_test_documents(&coll)?;
            coll.ensure_index_document(&doc! { age: 1 })?;

            assert!(coll.drop_index_document(&doc! { age: 1 })?);
            assert!(!coll.drop_index_document(&doc! { age: 1 })?);
            assert!(coll.index_names().is_empty());
            assert_eq!(coll.count(&doc! { age: { "$gt": 20 } })?, 2);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_index_follows_writes() {
    run_test(
        create_memory_test_context,
        |ctx| {
            let coll = ctx.db().collection("test")?;
            coll.ensure_index_document(&doc! { age: 1 })?;
            let ids = coll.save_many(vec![doc! { age: 10 }, doc! { age: 20 }, doc! { name: "no age" }])?;

            coll.update(&doc! { age: 10 }, &doc! { "$set": { age: 30 } }, &FindOptions::new(), false)?;
            assert_eq!(coll.count(&doc! { age: 10 })?, 0);
            assert_eq!(coll.count(&doc! { age: 30 })?, 1);

            coll.update(&doc! { "$id": (ids[2].as_str()) }, &doc! { "$set": { age: 25 } }, &FindOptions::new(), false)?;
            let sorted = coll.find(&doc! { age: { "$gt": 0 } }, &order_by("age", SortOrder::Ascending))?;
            let ages: Vec<_> = sorted.iter().filter_map(|d| d.get("age").and_then(Value::as_i64)).collect();
            assert_eq!(ages, vec![20, 25, 30]);

            coll.remove(&doc! { age: 20 }, &FindOptions::new())?;
            assert_eq!(coll.count(&doc! { age: { "$lt": 100 } })?, 2);

            coll.clear()?;
            assert_eq!(coll.index_names(), vec!["age".to_string()]);
            assert_eq!(coll.count(&doc! { age: 30 })?, 0);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_invalid_index_spec() {
    run_test(
        create_memory_test_context,
        |ctx| {
            let coll = ctx.db().collection("test")?;
            let err = coll.ensure_index_document(&doc! { age: "up" }).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::IndexingError);
            let err = coll.ensure_index_document(&doc! {}).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::IndexingError);
            Ok(())
        },
        cleanup,
    )
}
