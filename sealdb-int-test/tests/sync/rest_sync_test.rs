use sealdb::collection::{Collection, FindOptions};
use sealdb::common::Value;
use sealdb::database::Database;
use sealdb::doc;
use sealdb::errors::{ErrorKind, SealError, SealResult};
use sealdb::store::{DbEventInfo, DbEventListener, DbEvents};
use sealdb::sync::{HttpClient, HttpResponse, RestSyncAdapter};
use sealdb_int_test::test_util::{cleanup, create_memory_test_context, run_test};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone, Default)]
struct ScriptedClient {
    responses: Arc<Mutex<VecDeque<SealResult<HttpResponse>>>>,
    requests: Arc<Mutex<Vec<(String, String)>>>,
}

impl ScriptedClient {
    fn reply(&self, status: u16, body: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(HttpResponse::new(status, body)));
    }

    fn refuse(&self) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(SealError::new("connection refused", ErrorKind::SyncError)));
    }

    fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().unwrap().clone()
    }

    fn next(&self, method: &str, url: &str) -> SealResult<HttpResponse> {
        self.requests
            .lock()
            .unwrap()
            .push((method.to_string(), url.to_string()));
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(HttpResponse::new(200, "[]")))
    }
}

impl HttpClient for ScriptedClient {
    fn get(&self, url: &str) -> SealResult<HttpResponse> {
        self.next("GET", url)
    }

    fn put(&self, url: &str, _body: &[u8]) -> SealResult<HttpResponse> {
        self.next("PUT", url)
    }

    fn delete(&self, url: &str) -> SealResult<HttpResponse> {
        self.next("DELETE", url)
    }
}

fn record_events(db: &Database) -> SealResult<Arc<Mutex<Vec<DbEvents>>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    db.subscribe(DbEventListener::new(move |info: DbEventInfo| {
        sink.lock().unwrap().push(info.event());
        Ok(())
    }))?;
    Ok(events)
}

fn attach(collection: &Collection, client: &ScriptedClient) -> SealResult<()> {
    let adapter = RestSyncAdapter::new("shop:orders", "key", client.clone())?;
    collection.attach_sync(Arc::new(adapter));
    Ok(())
}

#[test]
fn test_load_from_remote() {
    run_test(
        create_memory_test_context,
        |ctx| {
            let db = ctx.db();
            let events = record_events(&db)?;
            let orders = db.collection("orders")?;
            orders.ensure_index_document(&doc! { total: 1 })?;

            let client = ScriptedClient::default();
            client.reply(
                200,
                r#"[{"_id":{"$oid":"a1"},"total":5,"buyer":{"$ref":"users","$id":{"$oid":"u1"}}},
                    {"_id":{"$oid":"a2"},"total":12}]"#,
            );
            attach(&orders, &client)?;

            assert!(orders.sync_load()?);
            assert_eq!(orders.size(), 2);
            assert_eq!(orders.count(&doc! { total: { "$gt": 10 } })?, 1);
            let first = orders.get_by_id("a1").unwrap();
            assert!(matches!(first.get("buyer"), Some(Value::Ref(r)) if r.id() == "u1"));

            assert_eq!(
                client.requests(),
                vec![(
                    "GET".to_string(),
                    "https://api.mongolab.com/api/1/databases/shop/collections/orders?apiKey=key".to_string()
                )]
            );
            awaitility::at_most(Duration::from_secs(1))
                .until(|| events.lock().unwrap().contains(&DbEvents::DownloadSuccess));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_failed_load_keeps_local_data() {
    run_test(
        create_memory_test_context,
        |ctx| {
            let db = ctx.db();
            let events = record_events(&db)?;
            let orders = db.collection("orders")?;
            orders.save(doc! { "$id": "local", total: 1 })?;

            let client = ScriptedClient::default();
            client.reply(500, "boom");
            client.refuse();
            attach(&orders, &client)?;

            assert!(!orders.sync_load()?);
            assert!(!orders.sync_load()?);
            assert_eq!(orders.size(), 1);
            awaitility::at_most(Duration::from_secs(1))
                .until(|| events.lock().unwrap().len() == 2);
            assert!(events.lock().unwrap().iter().all(|e| *e == DbEvents::DownloadError));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_save_replays_deletions() {
    run_test(
        create_memory_test_context,
        |ctx| {
            let db = ctx.db();
            let events = record_events(&db)?;
            let orders = db.collection("orders")?;
            orders.save_many(vec![
                doc! { "$id": "o1", total: 1 },
                doc! { "$id": "o2", total: 2 },
                doc! { "$id": "o3", total: 3 },
            ])?;

            // removals before a sync adapter is attached are not logged
            orders.remove(&doc! { "$id": "o3" }, &FindOptions::new())?;
            assert_eq!(db.deletion_log().size(), 0);

            let client = ScriptedClient::default();
            attach(&orders, &client)?;
            orders.remove(&doc! { total: { "$lte": 2 } }, &FindOptions::new())?;
            assert_eq!(db.deletion_log().size(), 2);

            client.reply(200, "");
            client.reply(200, "");
            client.reply(404, "");
            assert!(orders.sync_save()?);

            let requests = client.requests();
            assert_eq!(requests.len(), 3);
            assert_eq!(requests[0].0, "PUT");
            assert!(requests[1..].iter().all(|(method, _)| method == "DELETE"));
            assert_eq!(db.deletion_log().size(), 1);

            awaitility::at_most(Duration::from_secs(1))
                .until(|| events.lock().unwrap().len() == 3);
            let events = events.lock().unwrap();
            assert_eq!(events[0], DbEvents::UploadSuccess);
            assert!(events.contains(&DbEvents::DeleteSuccess));
            assert!(events.contains(&DbEvents::DeleteError));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_failed_upload_skips_deletions() {
    run_test(
        create_memory_test_context,
        |ctx| {
            let db = ctx.db();
            let orders = db.collection("orders")?;
            let client = ScriptedClient::default();
            attach(&orders, &client)?;
            orders.save(doc! { "$id": "o1" })?;
            orders.remove(&doc! {}, &FindOptions::new())?;

            client.reply(401, "unauthorized");
            assert!(!orders.sync_save()?);
            assert_eq!(client.requests().len(), 1);
            assert_eq!(db.deletion_log().size(), 1);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_sync_without_adapter() {
    run_test(
        create_memory_test_context,
        |ctx| {
            let orders = ctx.db().collection("orders")?;
            assert!(!orders.has_sync());
            assert_eq!(orders.sync_load().unwrap_err().kind(), &ErrorKind::InvalidOperation);

            let client = ScriptedClient::default();
            attach(&orders, &client)?;
            assert!(orders.has_sync());
            orders.detach_sync();
            assert_eq!(orders.sync_save().unwrap_err().kind(), &ErrorKind::InvalidOperation);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_malformed_remote_name() {
    for name in ["orders", ":orders", "shop:", ""] {
        let err = RestSyncAdapter::new(name, "key", ScriptedClient::default()).err().unwrap();
        assert_eq!(err.kind(), &ErrorKind::ValidationError);
    }
}
