use sealdb::collection::FindOptions;
use sealdb::common::Value;
use sealdb::doc;
use sealdb::store::{DbEventInfo, DbEventListener, DbEvents};
use sealdb_int_test::test_util::{cleanup, create_memory_test_context, create_test_context, run_test, sorted_ids};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[test]
fn test_commit_and_reopen() {
    run_test(
        create_test_context,
        |ctx| {
            let users = ctx.db().get_or_open("users", "s3cret", None)?;
            users.save(doc! { name: "alice", age: 31, score: 0.1 })?;
            let last = users.save(doc! { name: "bob", friends: [{ "$ref": "users", "$id": "x" }] })?;
            users.save(doc! { "$id": "fixed", name: "carol" })?;
            assert!(Path::new(ctx.path()).join("users.json").exists());

            let reopened = ctx.reopen()?.get_or_open("users", "s3cret", None)?;
            assert_eq!(
                sorted_ids(&reopened.get_all()),
                sorted_ids(&users.get_all())
            );
            assert_eq!(reopened.last_insert_id(), Some(last.clone()));

            let alice = reopened.find_one(&doc! { name: "alice" })?.unwrap();
            assert_eq!(alice.get("score"), Some(&Value::F64(0.1)));
            let bob = reopened.get_by_id(&last).unwrap();
            assert!(matches!(
                bob.resolve("friends").and_then(Value::as_array).map(|f| &f[0]),
                Some(Value::Ref(_))
            ));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_manual_commit() {
    run_test(
        create_memory_test_context,
        |ctx| {
            let users = ctx.db().collection("users")?;
            users.set_auto_commit(false);
            users.save(doc! { name: "alice" })?;

            assert_eq!(ctx.reopen()?.collection("users")?.size(), 0);
            users.commit()?;
            assert_eq!(ctx.reopen()?.collection("users")?.size(), 1);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_altered_file_opens_empty() {
    run_test(
        create_test_context,
        |ctx| {
            let users = ctx.db().get_or_open("users", "s3cret", None)?;
            users.save(doc! { name: "alice" })?;

            let file = Path::new(ctx.path()).join("users.json");
            let content = std::fs::read_to_string(&file)?;
            std::fs::write(&file, content.replace("alice", "alicf"))?;

            let db = ctx.reopen()?;
            let events = Arc::new(Mutex::new(Vec::<DbEventInfo>::new()));
            let sink = events.clone();
            db.subscribe(DbEventListener::new(move |info| {
                sink.lock().unwrap().push(info);
                Ok(())
            }))?;

            let reopened = db.get_or_open("users", "s3cret", None)?;
            assert_eq!(reopened.size(), 0);
            awaitility::at_most(Duration::from_secs(2)).until(|| !events.lock().unwrap().is_empty());
            let events = events.lock().unwrap();
            assert_eq!(events[0].event(), DbEvents::DataTampered);
            assert_eq!(events[0].source(), "users.json");
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_wrong_secret_opens_empty() {
    run_test(
        create_memory_test_context,
        |ctx| {
            ctx.db().get_or_open("users", "s3cret", None)?.save(doc! { name: "alice" })?;

            let wrong = ctx.reopen()?.get_or_open("users", "guess", None)?;
            assert_eq!(wrong.find(&doc! {}, &FindOptions::new())?.len(), 0);

            let right = ctx.reopen()?.get_or_open("users", "s3cret", None)?;
            assert_eq!(right.size(), 1);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_explicit_directory() {
    run_test(
        create_test_context,
        |ctx| {
            let dir = Path::new(ctx.path()).join("nested");
            let dir = dir.to_string_lossy().into_owned();
            let notes = ctx.db().get_or_open("notes", "s3cret", Some(&dir))?;
            notes.save(doc! { text: "hi" })?;

            assert!(Path::new(&dir).join("notes.json").exists());
            assert!(!Path::new(ctx.path()).join("notes.json").exists());
            Ok(())
        },
        cleanup,
    )
}
