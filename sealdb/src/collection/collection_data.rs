use crate::collection::Document;
use crate::common::INDEX_NAME_SEPARATOR;
use crate::index::BTreeIndex;
use crate::store::CollectionState;
use itertools::Itertools;
use std::collections::{BTreeMap, BTreeSet};

/// The document table of a collection together with its indexes.
///
/// Every key of `documents` equals the `$id` of the document it maps to.
/// All writes go through [`CollectionData::store`] and
/// [`CollectionData::delete`] so the indexes never drift from the table.
#[derive(Debug)]
pub struct CollectionData {
    pub(crate) name: String,
    pub(crate) documents: BTreeMap<String, Document>,
    pub(crate) indexes: BTreeMap<String, BTreeIndex>,
    pub(crate) last_insert_id: Option<String>,
    pub(crate) salt: Option<String>,
}

impl CollectionData {
    pub(crate) fn new(name: &str) -> Self {
        CollectionData {
            name: name.to_string(),
            documents: BTreeMap::new(),
            indexes: BTreeMap::new(),
            last_insert_id: None,
            salt: None,
        }
    }

    pub(crate) fn from_state(name: &str, state: CollectionState) -> Self {
        CollectionData {
            name: name.to_string(),
            documents: state.documents,
            indexes: BTreeMap::new(),
            last_insert_id: state.last_insert_id,
            salt: state.salt,
        }
    }

    pub(crate) fn to_state(&self) -> CollectionState {
        let mut state = CollectionState::new(&self.name);
        state.salt = self.salt.clone();
        state.documents = self.documents.clone();
        state.last_insert_id = self.last_insert_id.clone();
        state
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// The index keyed on exactly `fields`, if one is registered.
    pub fn select_index(&self, fields: &BTreeSet<&str>) -> Option<&BTreeIndex> {
        let name = fields.iter().join(INDEX_NAME_SEPARATOR);
        self.indexes
            .get(&name)
            .filter(|index| index.definition().field_names().into_iter().eq(fields.iter().copied()))
    }

    /// Inserts or replaces a document, keyed by its id, and re-indexes it.
    pub(crate) fn store(&mut self, id: &str, document: Document) {
        for index in self.indexes.values_mut() {
            index.insert(&document);
        }
        self.documents.insert(id.to_string(), document);
    }

    pub(crate) fn delete(&mut self, id: &str) -> Option<Document> {
        let document = self.documents.remove(id)?;
        for index in self.indexes.values_mut() {
            index.remove(&document);
        }
        Some(document)
    }

    pub(crate) fn clear(&mut self) {
        self.documents.clear();
        for index in self.indexes.values_mut() {
            index.clear();
        }
    }

    pub(crate) fn reindex(&mut self) {
        let documents = &self.documents;
        for index in self.indexes.values_mut() {
            index.build(documents.values());
        }
    }
}
