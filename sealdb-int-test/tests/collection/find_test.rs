use sealdb::collection::{limit_to, order_by, FindOptions, SortOrder};
use sealdb::common::Value;
use sealdb::doc;
use sealdb::errors::ErrorKind;
use sealdb_int_test::test_util::{
    cleanup, create_memory_test_context, create_test_context, insert_numbered, insert_test_documents,
    run_test, sorted_ids,
};

#[test]
fn test_find_all() {
    run_test(
        create_test_context,
        |ctx| {
            let coll = ctx.db().collection("test")?;
            insert_test_documents(&coll)?;

            let all = coll.find(&doc! {}, &FindOptions::new())?;
            assert_eq!(all.len(), 3);
            assert_eq!(coll.get_all().len(), 3);
            assert_eq!(coll.size(), 3);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_find_with_comparisons() {
    run_test(
        create_memory_test_context,
        |ctx| {
            let coll = ctx.db().collection("test")?;
            insert_test_documents(&coll)?;

            assert_eq!(coll.count(&doc! { age: { "$gt": 32 } })?, 1);
            assert_eq!(coll.count(&doc! { age: { "$gte": 32 } })?, 2);
            assert_eq!(coll.count(&doc! { age: { "$lt": 32 } })?, 1);
            assert_eq!(coll.count(&doc! { age: { "$lte": 41, "$gt": 19 } })?, 2);
            assert_eq!(coll.count(&doc! { score: { "$gt": 5 } })?, 1);
            assert_eq!(coll.count(&doc! { age: { "$gt": "20" } })?, 0);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_find_nested_fields() {
    run_test(
        create_memory_test_context,
        |ctx| {
            let coll = ctx.db().collection("test")?;
            insert_test_documents(&coll)?;

            let paris = coll.find(&doc! { "address.city": "Paris" }, &order_by("age", SortOrder::Ascending))?;
            assert_eq!(paris.len(), 2);
            assert_eq!(paris[0].get("first_name"), Some(&Value::from("fn3")));

            assert_eq!(coll.count(&doc! { "address.zip": { "$regex": "^750" } })?, 2);
            assert_eq!(coll.count(&doc! { "address.country": { "$exists": false } })?, 3);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_find_arrays() {
    run_test(
        create_memory_test_context,
        |ctx| {
            let coll = ctx.db().collection("test")?;
            insert_test_documents(&coll)?;

            assert_eq!(coll.count(&doc! { tags: "blue" })?, 1);
            assert_eq!(coll.count(&doc! { tags: { "$size": 0 } })?, 1);
            assert_eq!(coll.count(&doc! { tags: { "$size": 2 } })?, 1);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_in_and_nin_are_distinct() {
    run_test(
        create_memory_test_context,
        |ctx| {
            let coll = ctx.db().collection("test")?;
            insert_test_documents(&coll)?;

            let inside = coll.find(&doc! { first_name: { "$in": ["fn1", "fn3"] } }, &FindOptions::new())?;
            let outside = coll.find(&doc! { first_name: { "$nin": ["fn1", "fn3"] } }, &FindOptions::new())?;
            assert_eq!(inside.len(), 2);
            assert_eq!(outside.len(), 1);
            assert_eq!(outside[0].get("first_name"), Some(&Value::from("fn2")));

            // absent fields are never "in", always "not in"
            assert_eq!(coll.count(&doc! { nickname: { "$in": ["x"] } })?, 0);
            assert_eq!(coll.count(&doc! { nickname: { "$nin": ["x"] } })?, 3);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_equality_is_loose() {
    run_test(
        create_memory_test_context,
        |ctx| {
            let coll = ctx.db().collection("test")?;
            insert_test_documents(&coll)?;
            coll.save(doc! { first_name: "fn4", age: "30", active: true })?;

            assert_eq!(coll.count(&doc! { age: "32" })?, 1);
            assert_eq!(coll.count(&doc! { age: 30 })?, 1);
            assert_eq!(coll.count(&doc! { age: { "$in": ["41", 19] } })?, 2);
            assert_eq!(coll.count(&doc! { age: { "$ne": "32" } })?, 3);
            assert_eq!(coll.count(&doc! { active: 1 })?, 1);
            assert_eq!(coll.count(&doc! { age: "thirty" })?, 0);

            coll.ensure_index_document(&doc! { age: 1 })?;
            assert_eq!(coll.count(&doc! { age: "32" })?, 1);
            assert_eq!(coll.count(&doc! { age: 30 })?, 1);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_find_with_or() {
    run_test(
        create_memory_test_context,
        |ctx| {
            let coll = ctx.db().collection("test")?;
            insert_test_documents(&coll)?;

            let found = coll.find(
                &doc! { "$or": { first_name: "fn1", age: { "$lt": 20 } } },
                &FindOptions::new(),
            )?;
            assert_eq!(found.len(), 2);

            let nested = coll.find(&doc! { "$or": { "$or": { a: 1 } } }, &FindOptions::new());
            assert_eq!(nested.unwrap_err().kind(), &ErrorKind::FilterError);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_find_by_id() {
    run_test(
        create_memory_test_context,
        |ctx| {
            let coll = ctx.db().collection("test")?;
            let ids = insert_test_documents(&coll)?;

            let found = coll.find(&doc! { "$id": (ids[1].as_str()) }, &FindOptions::new())?;
            assert_eq!(found.len(), 1);
            assert_eq!(found[0].get("first_name"), Some(&Value::from("fn2")));

            let missing = coll.find(&doc! { "$id": (ids[1].as_str()), age: 1 }, &FindOptions::new())?;
            assert!(missing.is_empty());

            assert_eq!(coll.find_one(&doc! { "$id": "nope" })?, None);
            assert!(coll.get_by_id(&ids[0]).is_some());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_sort_and_limit() {
    run_test(
        create_memory_test_context,
        |ctx| {
            let coll = ctx.db().collection("numbers")?;
            insert_numbered(&coll, 20)?;

            let top = coll.find(&doc! {}, &order_by("i", SortOrder::Descending).limit(3))?;
            let values: Vec<_> = top.iter().filter_map(|d| d.get("i").and_then(Value::as_i64)).collect();
            assert_eq!(values, vec![19, 18, 17]);

            let chained = coll.find(
                &doc! { i: { "$lt": 8 } },
                &order_by("s", SortOrder::Descending).then_order_by("i", SortOrder::Ascending),
            )?;
            let values: Vec<_> = chained.iter().filter_map(|d| d.get("i").and_then(Value::as_i64)).collect();
            assert_eq!(values, vec![3, 7, 2, 6, 1, 5, 0, 4]);

            assert_eq!(coll.find(&doc! {}, &limit_to(5))?.len(), 5);

            let options = FindOptions::from_document(&doc! { "$sort": { i: 1 }, "$limit": 2 })?;
            let first = coll.find(&doc! {}, &options)?;
            assert_eq!(first[0].get("i"), Some(&Value::I64(0)));
            assert_eq!(first.len(), 2);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_random_order_keeps_all() {
    run_test(
        create_memory_test_context,
        |ctx| {
            let coll = ctx.db().collection("numbers")?;
            insert_numbered(&coll, 10)?;

            let plain = coll.find(&doc! {}, &FindOptions::new())?;
            let shuffled = coll.find(&doc! {}, &order_by("i", SortOrder::Random))?;
            assert_eq!(sorted_ids(&plain), sorted_ids(&shuffled));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_distinct() {
    run_test(
        create_memory_test_context,
        |ctx| {
            let coll = ctx.db().collection("numbers")?;
            insert_numbered(&coll, 100)?;

            let counts = coll.distinct("s", &doc! { i: { "$lte": 10 } })?;
            assert_eq!(counts.values().sum::<usize>(), 11);
            assert_eq!(counts.len(), 4);

            let absent = coll.distinct("missing", &doc! {})?;
            assert!(absent.is_empty());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_invalid_filter() {
    run_test(
        create_memory_test_context,
        |ctx| {
            let coll = ctx.db().collection("test")?;
            let err = coll.find(&doc! { a: { "$near": 1 } }, &FindOptions::new()).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::FilterError);

            let err = coll.count(&doc! { a: { "$in": 3 } }).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::FilterError);

            let err = coll.count(&doc! { a: { "$regex": "(" } }).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::FilterError);
            Ok(())
        },
        cleanup,
    )
}
