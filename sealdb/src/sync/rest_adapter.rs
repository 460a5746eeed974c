use crate::collection::{Collection, Document, FindOptions};
use crate::common::{DEFAULT_SYNC_HOST, DOC_ID, DOC_REF, SYNC_API_PATH};
use crate::doc;
use crate::errors::{ErrorKind, SealError, SealResult};
use crate::store::{notify, DbEvents};
use crate::sync::{encode_component, HttpClient, SyncAdapter};
use serde_json::{Map, Value as JsonValue};

const REMOTE_ID: &str = "_id";
const OBJECT_ID: &str = "$oid";

/// Mirrors a collection to a MongoLab-style REST API.
///
/// The remote is named `database:collection`. Remote documents carry their
/// id as `{"_id": {"$oid": ..}}`, which is mapped to and from `$id`.
///
/// ```rust,ignore
/// let adapter = RestSyncAdapter::new("shop:orders", "api-key", client)?
///     .with_query(doc! { status: "open" });
/// orders.attach_sync(Arc::new(adapter));
/// orders.sync_load()?;
/// ```
pub struct RestSyncAdapter<C> {
    database: String,
    collection: String,
    host: String,
    api_key: String,
    query: Option<Document>,
    client: C,
}

impl<C: HttpClient> RestSyncAdapter<C> {
    pub fn new(remote_name: &str, api_key: &str, client: C) -> SealResult<Self> {
        let (database, collection) = match remote_name.split_once(':') {
            Some((database, collection)) if !database.is_empty() && !collection.is_empty() => {
                (database, collection)
            }
            _ => {
                log::error!("Malformed remote collection name {}", remote_name);
                return Err(SealError::new(
                    &format!(
                        "Malformed remote collection name {}, expected database:collection",
                        remote_name
                    ),
                    ErrorKind::ValidationError,
                ));
            }
        };

        Ok(RestSyncAdapter {
            database: database.to_string(),
            collection: collection.to_string(),
            host: DEFAULT_SYNC_HOST.to_string(),
            api_key: api_key.to_string(),
            query: None,
            client,
        })
    }

    pub fn with_host(mut self, host: &str) -> Self {
        self.host = host.to_string();
        self
    }

    /// Restricts downloads to remote documents matching `query`.
    pub fn with_query(mut self, query: Document) -> Self {
        self.query = Some(query);
        self
    }

    pub fn base_url(&self) -> String {
        format!("https://{}{}", self.host, SYNC_API_PATH)
    }

    fn collection_path(&self) -> String {
        format!(
            "{}/databases/{}/collections/{}",
            self.base_url(),
            self.database,
            self.collection
        )
    }

    fn key_param(&self) -> String {
        format!("apiKey={}", encode_component(&self.api_key))
    }

    fn collection_url(&self) -> SealResult<String> {
        let mut url = format!("{}?{}", self.collection_path(), self.key_param());
        if let Some(query) = &self.query {
            url.push_str("&q=");
            url.push_str(&encode_component(&serde_json::to_string(query)?));
        }
        Ok(url)
    }

    fn document_url(&self, id: &str) -> String {
        format!(
            "{}/{}?{}",
            self.collection_path(),
            encode_component(id),
            self.key_param()
        )
    }

    /// Converts a local document to its remote form.
    fn to_remote(&self, document: &Document) -> SealResult<JsonValue> {
        let mut value = serde_json::to_value(document)?;
        self.rename_ids_for_remote(&mut value);
        Ok(value)
    }

    fn rename_ids_for_remote(&self, value: &mut JsonValue) {
        match value {
            JsonValue::Object(map) => {
                if map.contains_key(DOC_REF) {
                    if let Some(id) = map.remove(DOC_ID) {
                        map.insert(DOC_ID.to_string(), object_id(id));
                    }
                    map.insert(DOC_REF.to_string(), JsonValue::String(self.collection.clone()));
                    return;
                }
                if let Some(id) = map.remove(DOC_ID) {
                    map.insert(REMOTE_ID.to_string(), object_id(id));
                }
                for child in map.values_mut() {
                    self.rename_ids_for_remote(child);
                }
            }
            JsonValue::Array(items) => {
                for item in items.iter_mut() {
                    self.rename_ids_for_remote(item);
                }
            }
            _ => {}
        }
    }

    fn download(&self, collection: &Collection) -> Result<usize, String> {
        let url = self.collection_url().map_err(|e| e.to_string())?;
        let response = self.client.get(&url).map_err(|e| e.to_string())?;
        if !response.is_ok() {
            return Err(format!("status {}: {}", response.status, response.text()));
        }

        let payload: JsonValue =
            serde_json::from_slice(&response.body).map_err(|e| e.to_string())?;
        let JsonValue::Array(items) = payload else {
            return Err("expected an array of documents".to_string());
        };

        let mut documents = Vec::with_capacity(items.len());
        for mut item in items {
            rename_ids_from_remote(&mut item);
            let document: Document = serde_json::from_value(item).map_err(|e| e.to_string())?;
            documents.push(document);
        }
        let count = documents.len();
        collection.save_many(documents).map_err(|e| e.to_string())?;
        Ok(count)
    }

    fn upload(&self, collection: &Collection) -> Result<(), String> {
        let documents = collection
            .get_all()
            .iter()
            .map(|document| self.to_remote(document))
            .collect::<SealResult<Vec<JsonValue>>>()
            .map_err(|e| e.to_string())?;
        let body = serde_json::to_vec(&JsonValue::Array(documents)).map_err(|e| e.to_string())?;

        let url = self.collection_url().map_err(|e| e.to_string())?;
        let response = self.client.put(&url, &body).map_err(|e| e.to_string())?;
        if !response.is_ok() {
            return Err(format!("status {}: {}", response.status, response.text()));
        }
        Ok(())
    }

    /// Sends one remote delete per deletion-log entry of `collection`. An
    /// entry is dropped from the log only once its delete succeeded.
    fn replay_deletions(&self, collection: &Collection) -> SealResult<()> {
        let Some(log) = collection.deletion_log() else {
            return Ok(());
        };
        let entries = log.find(
            &doc! { cl: (collection.name()), cm: "delete" },
            &FindOptions::new(),
        )?;
        log::debug!("Replaying {} deletions of {}", entries.len(), collection.name());

        for entry in entries {
            let Some(id) = entry.id() else {
                continue;
            };
            match self.client.delete(&self.document_url(id)) {
                Ok(response) if response.is_ok() => {
                    log.remove(&doc! { "$id": id }, &FindOptions::new())?;
                    log.commit()?;
                    notify(
                        collection.event_bus(),
                        DbEvents::DeleteSuccess,
                        collection.name(),
                        Some(id.to_string()),
                    );
                }
                Ok(response) => {
                    log::warn!("Remote delete of {} failed with status {}", id, response.status);
                    notify(
                        collection.event_bus(),
                        DbEvents::DeleteError,
                        collection.name(),
                        Some(format!("{}: status {}", id, response.status)),
                    );
                }
                Err(e) => {
                    log::warn!("Remote delete of {} failed: {}", id, e);
                    notify(
                        collection.event_bus(),
                        DbEvents::DeleteError,
                        collection.name(),
                        Some(format!("{}: {}", id, e)),
                    );
                }
            }
        }
        Ok(())
    }
}

impl<C: HttpClient> SyncAdapter for RestSyncAdapter<C> {
    fn load(&self, collection: &Collection) -> SealResult<bool> {
        match self.download(collection) {
            Ok(count) => {
                log::debug!("Downloaded {} documents into {}", count, collection.name());
                notify(collection.event_bus(), DbEvents::DownloadSuccess, collection.name(), None);
                Ok(true)
            }
            Err(e) => {
                log::warn!("Download into {} failed: {}", collection.name(), e);
                notify(collection.event_bus(), DbEvents::DownloadError, collection.name(), Some(e));
                Ok(false)
            }
        }
    }

    fn save(&self, collection: &Collection) -> SealResult<bool> {
        match self.upload(collection) {
            Ok(()) => {
                notify(collection.event_bus(), DbEvents::UploadSuccess, collection.name(), None);
                self.replay_deletions(collection)?;
                Ok(true)
            }
            Err(e) => {
                log::warn!("Upload of {} failed: {}", collection.name(), e);
                notify(collection.event_bus(), DbEvents::UploadError, collection.name(), Some(e));
                Ok(false)
            }
        }
    }
}

fn object_id(id: JsonValue) -> JsonValue {
    let mut map = Map::new();
    map.insert(OBJECT_ID.to_string(), id);
    JsonValue::Object(map)
}

/// Unwraps `{"$oid": x}` into `x`, leaving any other value as is.
fn unwrap_object_id(value: JsonValue) -> JsonValue {
    match value {
        JsonValue::Object(mut map) if map.len() == 1 && map.contains_key(OBJECT_ID) => {
            map.remove(OBJECT_ID).unwrap_or(JsonValue::Null)
        }
        other => other,
    }
}

fn rename_ids_from_remote(value: &mut JsonValue) {
    match value {
        JsonValue::Object(map) => {
            if let Some(id) = map.remove(REMOTE_ID) {
                map.insert(DOC_ID.to_string(), unwrap_object_id(id));
            } else if map.contains_key(DOC_REF) {
                if let Some(id) = map.remove(DOC_ID) {
                    map.insert(DOC_ID.to_string(), unwrap_object_id(id));
                }
                return;
            }
            for (key, child) in map.iter_mut() {
                if key != DOC_ID {
                    rename_ids_from_remote(child);
                }
            }
        }
        JsonValue::Array(items) => {
            for item in items.iter_mut() {
                rename_ids_from_remote(item);
            }
        }
        _ => {}
    }
}
