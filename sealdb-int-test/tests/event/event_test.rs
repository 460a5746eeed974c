use sealdb::doc;
use sealdb::errors::{ErrorKind, SealError};
use sealdb::store::{DbEventInfo, DbEventListener, DbEvents};
use sealdb_int_test::test_util::{cleanup, create_memory_test_context, run_test, TestContext};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn wait_for_event<F: Fn() -> bool>(timeout_ms: u64, check: F) {
    awaitility::at_most(Duration::from_millis(timeout_ms)).until(check);
}

fn tamper_with(ctx: &TestContext, name: &str) -> sealdb::errors::SealResult<()> {
    ctx.db().get_or_open(name, "s3cret", None)?.save(doc! { value: 1 })?;
    Ok(())
}

#[test]
fn test_tamper_event() {
    run_test(
        create_memory_test_context,
        |ctx| {
            tamper_with(&ctx, "users")?;
            let db = ctx.reopen()?;

            let received = Arc::new(Mutex::new(None::<DbEventInfo>));
            let sink = received.clone();
            db.subscribe(DbEventListener::new(move |info: DbEventInfo| {
                *sink.lock().unwrap() = Some(info);
                Ok(())
            }))?;

            db.get_or_open("users", "not the secret", None)?;
            wait_for_event(1000, || received.lock().unwrap().is_some());

            let info = received.lock().unwrap().clone().unwrap();
            assert_eq!(info.event(), DbEvents::DataTampered);
            assert_eq!(info.source(), "users.json");
            assert!(info.detail().is_some());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_every_listener_is_notified() {
    run_test(
        create_memory_test_context,
        |ctx| {
            tamper_with(&ctx, "users")?;
            let db = ctx.reopen()?;

            let count = Arc::new(Mutex::new(0));
            for _ in 0..3 {
                let sink = count.clone();
                db.subscribe(DbEventListener::new(move |_| {
                    *sink.lock().unwrap() += 1;
                    Ok(())
                }))?;
            }

            db.get_or_open("users", "wrong", None)?;
            wait_for_event(1000, || *count.lock().unwrap() == 3);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_unsubscribe_stops_delivery() {
    run_test(
        create_memory_test_context,
        |ctx| {
            tamper_with(&ctx, "first")?;
            tamper_with(&ctx, "second")?;
            let db = ctx.reopen()?;

            let sources = Arc::new(Mutex::new(Vec::<String>::new()));
            let sink = sources.clone();
            let subscriber = db.subscribe(DbEventListener::new(move |info: DbEventInfo| {
                sink.lock().unwrap().push(info.source().to_string());
                Ok(())
            }))?;

            db.get_or_open("first", "wrong", None)?;
            wait_for_event(1000, || sources.lock().unwrap().len() == 1);

            if let Some(subscriber) = subscriber {
                db.unsubscribe(subscriber)?;
            }
            db.get_or_open("second", "wrong", None)?;
            std::thread::sleep(Duration::from_millis(100));
            assert_eq!(*sources.lock().unwrap(), vec!["first.json".to_string()]);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_failing_listener_does_not_fail_open() {
    run_test(
        create_memory_test_context,
        |ctx| {
            tamper_with(&ctx, "users")?;
            let db = ctx.reopen()?;
            db.subscribe(DbEventListener::new(|_| {
                Err(SealError::new("listener failed", ErrorKind::EventError))
            }))?;

            let users = db.get_or_open("users", "wrong", None)?;
            assert_eq!(users.size(), 0);
            Ok(())
        },
        cleanup,
    )
}
