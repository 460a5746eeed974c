use sealdb::collection::{order_by, FindOptions, SortOrder};
use sealdb::common::Value;
use sealdb::doc;
use sealdb_int_test::test_util::{
    cleanup, create_memory_test_context, insert_numbered, insert_test_documents, run_test, sorted_ids,
};

#[test]
fn test_remove_matching() {
    run_test(
        create_memory_test_context,
        |ctx| {
            let coll = ctx.db().collection("test")?;
            insert_test_documents(&coll)?;
            coll.ensure_index_document(&doc! { last_name: 1 })?;

            let doomed = sorted_ids(&coll.find(&doc! { last_name: "ln2" }, &FindOptions::new())?);
            assert_eq!(coll.remove(&doc! { last_name: "ln2" }, &FindOptions::new())?, 2);

            for id in &doomed {
                assert!(coll.get_by_id(id).is_none());
            }
            assert!(coll.find(&doc! { last_name: "ln2" }, &FindOptions::new())?.is_empty());
            assert_eq!(coll.size(), 1);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_remove_missing_is_silent() {
    run_test(
        create_memory_test_context,
        |ctx| {
            let coll = ctx.db().collection("test")?;
            insert_test_documents(&coll)?;
            assert_eq!(coll.remove(&doc! { last_name: "nobody" }, &FindOptions::new())?, 0);
            assert_eq!(coll.remove(&doc! { "$id": "nope" }, &FindOptions::new())?, 0);
            assert_eq!(coll.size(), 3);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_remove_with_limit() {
    run_test(
        create_memory_test_context,
        |ctx| {
            let coll = ctx.db().collection("numbers")?;
            insert_numbered(&coll, 10)?;

            let removed = coll.remove(&doc! {}, &order_by("i", SortOrder::Ascending).limit(3))?;
            assert_eq!(removed, 3);
            let first = coll.find(&doc! {}, &order_by("i", SortOrder::Ascending).limit(1))?;
            assert_eq!(first[0].get("i"), Some(&Value::I64(3)));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_clear() {
    run_test(
        create_memory_test_context,
        |ctx| {
            let coll = ctx.db().collection("numbers")?;
            insert_numbered(&coll, 10)?;
            coll.clear()?;
            assert_eq!(coll.size(), 0);

            let reopened = ctx.reopen()?.collection("numbers")?;
            assert_eq!(reopened.size(), 0);
            Ok(())
        },
        cleanup,
    )
}
