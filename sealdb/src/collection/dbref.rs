use crate::collection::Document;
use crate::common::{Value, DOC_ID, DOC_REF};
use crate::database::Database;
use crate::errors::{ErrorKind, SealError, SealResult};

/// A weak, typed reference to a document in a (possibly different)
/// collection.
///
/// A reference never owns its target and is never followed implicitly;
/// call [`DbRef::resolve`] to look the target up. It serializes as
/// `{"$ref": <collection>, "$id": <id>}`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DbRef {
    collection: String,
    id: String,
}

impl DbRef {
    pub fn new(collection: &str, id: &str) -> Self {
        DbRef {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Reads a reference out of its `{"$ref", "$id"}` document form.
    ///
    /// Both fields must be present and hold strings. Any other key, such
    /// as a remote `$db`, is not kept and is logged.
    pub fn from_document(document: &Document) -> SealResult<DbRef> {
        let collection = document.get(DOC_REF).and_then(Value::as_str);
        let id = document.get(DOC_ID).and_then(Value::as_str);
        match (collection, id) {
            (Some(collection), Some(id)) => {
                let dropped: Vec<&str> = document
                    .keys()
                    .map(String::as_str)
                    .filter(|key| *key != DOC_REF && *key != DOC_ID)
                    .collect();
                if !dropped.is_empty() {
                    log::debug!(
                        "Reference to {}/{} drops extra keys {:?}",
                        collection,
                        id,
                        dropped
                    );
                }
                Ok(DbRef::new(collection, id))
            }
            _ => {
                log::error!("illegal object reference: {}", document);
                Err(SealError::new(
                    &format!("illegal object reference: {}", document),
                    ErrorKind::ValidationError,
                ))
            }
        }
    }

    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        doc.put(DOC_REF, self.collection.as_str());
        doc.put(DOC_ID, self.id.as_str());
        doc
    }

    /// Looks up the referenced document through the database registry,
    /// opening the target collection with the default secret if it is not
    /// open yet.
    pub fn resolve(&self, database: &Database) -> SealResult<Option<Document>> {
        let collection = database.collection(&self.collection)?;
        Ok(collection.get_by_id(&self.id))
    }
}

/// Replaces every nested `{"$ref": .., "$id": ..}` document inside `document`
/// with a [`Value::Ref`]. Fails on the first malformed reference.
pub(crate) fn normalize_refs(document: &mut Document) -> SealResult<()> {
    for (_, value) in document.iter_mut() {
        normalize_value(value)?;
    }
    Ok(())
}

fn normalize_value(value: &mut Value) -> SealResult<()> {
    let reference = match value {
        Value::Document(doc) if doc.contains_key(DOC_REF) => DbRef::from_document(doc)?,
        Value::Document(doc) => return normalize_refs(doc),
        Value::Array(items) => {
            for item in items.iter_mut() {
                normalize_value(item)?;
            }
            return Ok(());
        }
        _ => return Ok(()),
    };
    *value = Value::Ref(reference);
    Ok(())
}
