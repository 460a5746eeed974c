use super::dbref::normalize_refs;
use crate::collection::{limit_to, CollectionData, Document, FindOptions};
use crate::common::{Value, DOC_ID, DOC_REF};
use crate::errors::{ErrorKind, SealError, SealResult};
use crate::filter::{CompiledQuery, QueryCompiler};
use crate::index::{BTreeIndex, IndexDefinition};
use crate::store::{DbEventBus, PersistenceCodec};
use crate::sync::SyncAdapter;
use crate::update::MutationCompiler;
use crate::{doc, ID_GENERATOR};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// A named set of documents with its indexes.
///
/// `Collection` is a cheap handle: clones share the same table. Reads take
/// the collection lock shared, writes take it exclusively, so an index
/// rebuild never interleaves with another operation on the same
/// collection. Changes are durable once [`Collection::commit`] ran, which
/// happens after every write when auto-commit is on.
///
/// # Examples
///
/// ```rust,ignore
/// let users = db.collection("users")?;
/// let id = users.save(doc! { name: "alice", age: 31 })?;
/// users.ensure_index_document(&doc! { age: 1 })?;
///
/// let adults = users.find(&doc! { age: { "$gte": 18 } }, &order_by("name", SortOrder::Ascending))?;
/// users.update(&doc! { "$id": (id.as_str()) }, &doc! { "$inc": { age: 1 } }, &FindOptions::new(), false)?;
/// ```
#[derive(Clone)]
pub struct Collection {
    inner: Arc<CollectionInner>,
}

struct CollectionInner {
    name: String,
    secret: String,
    dir: String,
    data: RwLock<CollectionData>,
    auto_commit: AtomicBool,
    codec: PersistenceCodec,
    deletion_log: Option<Collection>,
    sync: RwLock<Option<Arc<dyn SyncAdapter>>>,
}

impl Collection {
    /// Loads the stored state of `name` from `dir`, or starts empty when
    /// nothing is stored or the stored state fails verification.
    pub(crate) fn open(
        name: &str,
        secret: &str,
        dir: &str,
        codec: PersistenceCodec,
        auto_commit: bool,
        deletion_log: Option<Collection>,
    ) -> SealResult<Collection> {
        let data = match codec.load(name, secret, dir)? {
            Some(state) => CollectionData::from_state(name, state),
            None => CollectionData::new(name),
        };
        log::debug!("Opened collection {} with {} documents", name, data.len());

        Ok(Collection {
            inner: Arc::new(CollectionInner {
                name: name.to_string(),
                secret: secret.to_string(),
                dir: dir.to_string(),
                data: RwLock::new(data),
                auto_commit: AtomicBool::new(auto_commit),
                codec,
                deletion_log,
                sync: RwLock::new(None),
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn set_auto_commit(&self, auto_commit: bool) {
        self.inner.auto_commit.store(auto_commit, Ordering::Relaxed);
    }

    pub fn is_auto_commit(&self) -> bool {
        self.inner.auto_commit.load(Ordering::Relaxed)
    }

    /// The id assigned by the most recent `save` of a document without one.
    pub fn last_insert_id(&self) -> Option<String> {
        self.inner.data.read().last_insert_id.clone()
    }

    /// Creates the index described by `definition` unless an index over the
    /// same fields exists. Returns `true` when an index was built.
    ///
    /// Fails with [`ErrorKind::IndexingError`] when another field set
    /// already owns the same canonical name, e.g. `{a_b: 1}` next to
    /// `{a: 1, b: 1}`.
    pub fn ensure_index(&self, definition: IndexDefinition) -> SealResult<bool> {
        let start = Instant::now();
        let mut data = self.inner.data.write();
        let name = definition.name();
        if let Some(existing) = data.indexes.get(&name) {
            if existing.definition().field_names() == definition.field_names() {
                log::debug!("Index {} already exists on {}", name, self.inner.name);
                return Ok(false);
            }
            log::error!(
                "Index name {} on {} is taken by fields {:?}",
                name,
                self.inner.name,
                existing.definition().field_names()
            );
            return Err(SealError::new(
                &format!("Index name {} is already used by another field set", name),
                ErrorKind::IndexingError,
            ));
        }

        let mut index = BTreeIndex::new(definition);
        index.build(data.documents.values());
        data.indexes.insert(name.clone(), index);
        log::debug!(
            "Created index {} on {} in {:?}",
            name,
            self.inner.name,
            start.elapsed()
        );
        Ok(true)
    }

    /// [`Collection::ensure_index`] from the `{field: 1 | -1, ..}` form.
    pub fn ensure_index_document(&self, spec: &Document) -> SealResult<bool> {
        self.ensure_index(IndexDefinition::from_document(spec)?)
    }

    /// Drops the index over exactly the fields of `definition`. Returns
    /// `false` when there is none.
    pub fn drop_index(&self, definition: &IndexDefinition) -> bool {
        let mut data = self.inner.data.write();
        let name = definition.name();
        let same_fields = data
            .indexes
            .get(&name)
            .is_some_and(|index| index.definition().field_names() == definition.field_names());
        same_fields && data.indexes.remove(&name).is_some()
    }

    pub fn drop_index_document(&self, spec: &Document) -> SealResult<bool> {
        Ok(self.drop_index(&IndexDefinition::from_document(spec)?))
    }

    /// Rebuilds every registered index from the current documents.
    pub fn reindex(&self) {
        let start = Instant::now();
        let mut data = self.inner.data.write();
        data.reindex();
        log::debug!(
            "Rebuilt {} indexes on {} in {:?}",
            data.indexes.len(),
            self.inner.name,
            start.elapsed()
        );
    }

    pub fn index_names(&self) -> Vec<String> {
        self.inner.data.read().indexes.keys().cloned().collect()
    }

    /// Name of the index a query with this filter would use: the one whose
    /// fields are exactly the filter's AND fields.
    pub fn select_index(&self, filter: &Document) -> SealResult<Option<String>> {
        let query = QueryCompiler::compile(filter)?;
        let data = self.inner.data.read();
        Ok(data
            .select_index(&query.and_fields())
            .map(|index| index.name().to_string()))
    }

    pub fn find(&self, filter: &Document, options: &FindOptions) -> SealResult<Vec<Document>> {
        let start = Instant::now();
        let query = QueryCompiler::compile(filter)?;
        let data = self.inner.data.read();

        let mut matches = select(&data, &query, filter);
        options.apply(&mut matches);
        let results: Vec<Document> = matches.into_iter().cloned().collect();
        log::debug!(
            "find on {} returned {} documents in {:?}",
            self.inner.name,
            results.len(),
            start.elapsed()
        );
        Ok(results)
    }

    pub fn find_one(&self, filter: &Document) -> SealResult<Option<Document>> {
        Ok(self.find(filter, &limit_to(1))?.into_iter().next())
    }

    pub fn get_by_id(&self, id: &str) -> Option<Document> {
        self.inner.data.read().documents.get(id).cloned()
    }

    pub fn get_all(&self) -> Vec<Document> {
        self.inner.data.read().documents.values().cloned().collect()
    }

    pub fn size(&self) -> usize {
        self.inner.data.read().len()
    }

    /// Stores `document`, replacing any document with the same id.
    ///
    /// A document without `$id` gets a fresh id, which also becomes
    /// [`Collection::last_insert_id`]. Nested `{"$ref", "$id"}` objects are
    /// turned into references first; a malformed one fails the save.
    pub fn save(&self, mut document: Document) -> SealResult<String> {
        normalize_refs(&mut document)?;
        let id = {
            let mut data = self.inner.data.write();
            self.store(&mut data, document)?
        };

        self.commit_if_auto()?;
        Ok(id)
    }

    /// Saves every document under one lock and commits at most once.
    ///
    /// All documents are validated before any is stored.
    pub fn save_many(&self, mut documents: Vec<Document>) -> SealResult<Vec<String>> {
        for document in documents.iter_mut() {
            normalize_refs(document)?;
            check_document(document, &self.inner.name)?;
        }

        let ids = {
            let mut data = self.inner.data.write();
            let mut ids = Vec::with_capacity(documents.len());
            for document in documents {
                ids.push(self.store(&mut data, document)?);
            }
            ids
        };

        self.commit_if_auto()?;
        Ok(ids)
    }

    fn store(&self, data: &mut CollectionData, mut document: Document) -> SealResult<String> {
        check_document(&document, &self.inner.name)?;
        let id = match document.id() {
            Some(id) => id.to_string(),
            None => {
                let id = unique_id(data);
                document.set_id(&id);
                data.last_insert_id = Some(id.clone());
                id
            }
        };
        data.store(&id, document);
        Ok(id)
    }

    /// Applies `update` to the documents selected by `filter` and
    /// `options`, returning how many were selected.
    ///
    /// Nothing is changed when the update expression is invalid or a
    /// mutated document holds a malformed reference.
    pub fn update(
        &self,
        filter: &Document,
        update: &Document,
        options: &FindOptions,
        upsert: bool,
    ) -> SealResult<usize> {
        let start = Instant::now();
        let mutation = MutationCompiler::compile(update)?;
        let query = QueryCompiler::compile(filter)?;

        let count = {
            let mut data = self.inner.data.write();
            let mut matches = select(&data, &query, filter);
            options.apply(&mut matches);

            let mut updated = Vec::with_capacity(matches.len());
            for document in matches {
                let mut document = document.clone();
                mutation.apply(&mut document, upsert);
                normalize_refs(&mut document)?;
                updated.push(document);
            }

            let count = updated.len();
            for document in updated {
                if let Some(id) = document.id().map(str::to_string) {
                    data.store(&id, document);
                }
            }
            count
        };

        log::debug!(
            "update on {} ({}) touched {} documents in {:?}",
            self.inner.name,
            update,
            count,
            start.elapsed()
        );
        self.commit_if_auto()?;
        Ok(count)
    }

    /// Deletes the documents selected by `filter` and `options`, returning
    /// how many were removed.
    ///
    /// With a sync adapter attached each removal is recorded in the
    /// deletion log so the next upload can delete it remotely.
    pub fn remove(&self, filter: &Document, options: &FindOptions) -> SealResult<usize> {
        let start = Instant::now();
        let query = QueryCompiler::compile(filter)?;

        let removed: Vec<Document> = {
            let mut data = self.inner.data.write();
            let mut matches = select(&data, &query, filter);
            options.apply(&mut matches);
            let ids: Vec<String> = matches
                .into_iter()
                .filter_map(|doc| doc.id().map(str::to_string))
                .collect();
            ids.iter().filter_map(|id| data.delete(id)).collect()
        };

        if self.has_sync() {
            self.log_deletions(&removed)?;
        }

        log::debug!(
            "remove on {} deleted {} documents in {:?}",
            self.inner.name,
            removed.len(),
            start.elapsed()
        );
        self.commit_if_auto()?;
        Ok(removed.len())
    }

    pub fn count(&self, filter: &Document) -> SealResult<usize> {
        let query = QueryCompiler::compile(filter)?;
        let data = self.inner.data.read();
        Ok(select(&data, &query, filter).len())
    }

    /// Counts the documents matching `filter` per distinct value at `path`.
    /// Documents without a value at `path` are not counted.
    pub fn distinct(&self, path: &str, filter: &Document) -> SealResult<BTreeMap<Value, usize>> {
        let query = QueryCompiler::compile(filter)?;
        let data = self.inner.data.read();

        let mut counts = BTreeMap::new();
        for document in select(&data, &query, filter) {
            if let Some(value) = document.resolve(path) {
                *counts.entry(value.clone()).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }

    /// Removes every document. Indexes stay registered, empty.
    pub fn clear(&self) -> SealResult<()> {
        self.inner.data.write().clear();
        log::debug!("Cleared collection {}", self.inner.name);
        self.commit_if_auto()
    }

    /// Signs and writes the current state.
    pub fn commit(&self) -> SealResult<()> {
        let start = Instant::now();
        let mut data = self.inner.data.write();
        let mut state = data.to_state();
        self.inner
            .codec
            .save(&mut state, &self.inner.secret, &self.inner.dir)?;
        data.salt = state.salt;
        log::debug!("Committed {} in {:?}", self.inner.name, start.elapsed());
        Ok(())
    }

    /// Attaches a remote synchronization adapter, replacing any previous
    /// one. From now on removals are recorded in the deletion log.
    pub fn attach_sync(&self, adapter: Arc<dyn SyncAdapter>) {
        *self.inner.sync.write() = Some(adapter);
    }

    pub fn detach_sync(&self) {
        *self.inner.sync.write() = None;
    }

    pub fn has_sync(&self) -> bool {
        self.inner.sync.read().is_some()
    }

    /// Downloads the remote documents into this collection.
    pub fn sync_load(&self) -> SealResult<bool> {
        self.sync_adapter()?.load(self)
    }

    /// Uploads this collection, then replays pending remote deletions.
    pub fn sync_save(&self) -> SealResult<bool> {
        self.sync_adapter()?.save(self)
    }

    pub(crate) fn event_bus(&self) -> &DbEventBus {
        self.inner.codec.event_bus()
    }

    pub(crate) fn deletion_log(&self) -> Option<&Collection> {
        self.inner.deletion_log.as_ref()
    }

    fn sync_adapter(&self) -> SealResult<Arc<dyn SyncAdapter>> {
        self.inner.sync.read().clone().ok_or_else(|| {
            log::error!("No sync adapter attached to {}", self.inner.name);
            SealError::new(
                &format!("No sync adapter attached to {}", self.inner.name),
                ErrorKind::InvalidOperation,
            )
        })
    }

    fn log_deletions(&self, removed: &[Document]) -> SealResult<()> {
        let Some(log) = &self.inner.deletion_log else {
            return Ok(());
        };
        if removed.is_empty() {
            return Ok(());
        }

        let now = chrono::Utc::now().timestamp_millis();
        for document in removed {
            let Some(id) = document.id() else {
                continue;
            };
            log.save(doc! {
                "$id": id,
                cl: (self.inner.name.as_str()),
                ts: now,
                cm: "delete",
                o: (document.clone()),
            })?;
        }
        log.commit()
    }

    fn commit_if_auto(&self) -> SealResult<()> {
        if self.is_auto_commit() {
            self.commit()
        } else {
            Ok(())
        }
    }
}

impl Debug for Collection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.inner.name)
            .field("dir", &self.inner.dir)
            .finish()
    }
}

/// Documents of `data` matching `query`. A filter whose `$id` is a string
/// literal is answered by a direct lookup unless it carries `$or`
/// alternatives.
fn select<'a>(data: &'a CollectionData, query: &CompiledQuery, filter: &Document) -> Vec<&'a Document> {
    match filter.get(DOC_ID).and_then(Value::as_str) {
        Some(id) if query.or_predicates().is_empty() => data
            .documents
            .get(id)
            .filter(|document| query.matches(document))
            .into_iter()
            .collect(),
        _ => query.execute(data),
    }
}

fn check_document(document: &Document, collection: &str) -> SealResult<()> {
    if document.contains_key(DOC_REF) {
        log::error!("Document with a top-level {} key rejected in {}", DOC_REF, collection);
        return Err(SealError::new(
            &format!("{} is reserved and cannot be a document field", DOC_REF),
            ErrorKind::ValidationError,
        ));
    }

    match document.get(DOC_ID) {
        None | Some(Value::String(_)) => Ok(()),
        Some(other) => {
            log::error!("Invalid document id {} in {}", other, collection);
            Err(SealError::new(
                &format!("Document id must be a string, found {}", other),
                ErrorKind::InvalidId,
            ))
        }
    }
}

fn unique_id(data: &CollectionData) -> String {
    loop {
        let id = ID_GENERATOR.next_id();
        if !data.documents.contains_key(&id) {
            return id;
        }
        log::debug!("Generated id {} already taken in {}, drawing again", id, data.name);
    }
}
