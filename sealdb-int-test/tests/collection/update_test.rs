use sealdb::collection::{limit_to, order_by, FindOptions, SortOrder};
use sealdb::common::Value;
use sealdb::doc;
use sealdb::errors::ErrorKind;
use sealdb_int_test::test_util::{
    cleanup, create_memory_test_context, create_test_context, insert_numbered, insert_test_documents, run_test,
};

#[test]
fn test_inc_without_upsert_leaves_field_absent() {
    run_test(
        create_memory_test_context,
        |ctx| {
            let coll = ctx.db().collection("numbers")?;
            insert_numbered(&coll, 100)?;

            let count = coll.update(&doc! { i: { "$gte": 90 } }, &doc! { "$inc": { n: 1 } }, &FindOptions::new(), false)?;
            assert_eq!(count, 10);
            assert_eq!(coll.count(&doc! { n: { "$exists": true } })?, 0);

            coll.update(&doc! { i: { "$gte": 90 } }, &doc! { "$inc": { n: 1 } }, &FindOptions::new(), true)?;
            assert_eq!(coll.count(&doc! { n: 1 })?, 10);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_inc_equals_read_add_set() {
    run_test(
        create_memory_test_context,
        |ctx| {
            let coll = ctx.db().collection("test")?;
            let a = coll.save(doc! { n: 5, m: 2.5 })?;
            let b = coll.save(doc! { n: 5, m: 2.5 })?;

            coll.update(&doc! { "$id": (a.as_str()) }, &doc! { "$inc": { n: 3, m: 0.5 } }, &FindOptions::new(), false)?;
            coll.update(&doc! { "$id": (b.as_str()) }, &doc! { "$set": { n: 8, m: 3.0 } }, &FindOptions::new(), false)?;

            let a = coll.get_by_id(&a).unwrap();
            let b = coll.get_by_id(&b).unwrap();
            assert_eq!(a.get("n"), b.get("n"));
            assert_eq!(a.get("m"), b.get("m"));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_set_is_idempotent_inc_is_not() {
    run_test(
        create_memory_test_context,
        |ctx| {
            let coll = ctx.db().collection("test")?;
            let id = coll.save(doc! { n: 1, label: "x" })?;
            let filter = doc! { "$id": (id.as_str()) };

            for _ in 0..2 {
                coll.update(&filter, &doc! { "$set": { label: "y" } }, &FindOptions::new(), false)?;
                coll.update(&filter, &doc! { "$inc": { n: 1 } }, &FindOptions::new(), false)?;
            }
            let doc = coll.get_by_id(&id).unwrap();
            assert_eq!(doc.get("label"), Some(&Value::from("y")));
            assert_eq!(doc.get("n"), Some(&Value::I64(3)));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_nested_set_and_unset() {
    run_test(
        create_memory_test_context,
        |ctx| {
            let coll = ctx.db().collection("test")?;
            insert_test_documents(&coll)?;

            let count = coll.update(
                &doc! { "address.city": "Paris" },
                &doc! { "$set": { "address.zip": "75000" }, "$unset": { tags: 1 } },
                &FindOptions::new(),
                false,
            )?;
            assert_eq!(count, 2);
            assert_eq!(coll.count(&doc! { "address.zip": "75000" })?, 2);
            assert_eq!(coll.count(&doc! { tags: { "$exists": false } })?, 2);

            // a missing parent is never created
            coll.update(&doc! {}, &doc! { "$set": { "meta.by": "admin" } }, &FindOptions::new(), true)?;
            assert_eq!(coll.count(&doc! { meta: { "$exists": true } })?, 0);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_update_honours_options() {
    run_test(
        create_memory_test_context,
        |ctx| {
            let coll = ctx.db().collection("numbers")?;
            insert_numbered(&coll, 10)?;

            let count = coll.update(
                &doc! {},
                &doc! { "$set": { top: true } },
                &order_by("i", SortOrder::Descending).limit(2),
                true,
            )?;
            assert_eq!(count, 2);
            let top = coll.find(&doc! { top: true }, &order_by("i", SortOrder::Ascending))?;
            let values: Vec<_> = top.iter().filter_map(|d| d.get("i").and_then(Value::as_i64)).collect();
            assert_eq!(values, vec![8, 9]);

            assert_eq!(coll.update(&doc! { i: 100 }, &doc! { "$set": { x: 1 } }, &limit_to(1), true)?, 0);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_invalid_updates_change_nothing() {
    run_test(
        create_test_context,
        |ctx| {
            let coll = ctx.db().collection("test")?;
            let id = coll.save(doc! { n: 1 })?;

            let err = coll
                .update(&doc! {}, &doc! { "$set": { "$id": "other" } }, &FindOptions::new(), false)
                .unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::ValidationError);

            let err = coll
                .update(&doc! {}, &doc! { "$inc": { n: "one" } }, &FindOptions::new(), false)
                .unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::UpdateError);

            let err = coll
                .update(&doc! {}, &doc! { "$set": { owner: { "$ref": "users" } } }, &FindOptions::new(), true)
                .unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::ValidationError);

            assert_eq!(coll.get_by_id(&id).unwrap(), doc! { "$id": (id.as_str()), n: 1 });
            Ok(())
        },
        cleanup,
    )
}
