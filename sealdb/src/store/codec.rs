use crate::collection::Document;
use crate::common::{STATE_FORMAT_VERSION, STORAGE_FILE_EXTENSION};
use crate::errors::SealResult;
use crate::store::{notify, DbEventBus, DbEvents, DigestProvider, StorageBackend};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// The persisted form of a collection.
///
/// `documents` is keyed by document id, which keeps the serialized table
/// ordered and the output deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionState {
    pub signature: String,
    pub salt: Option<String>,
    pub name: String,
    pub version: String,
    pub documents: BTreeMap<String, Document>,
    pub last_insert_id: Option<String>,
}

impl CollectionState {
    pub fn new(name: &str) -> Self {
        CollectionState {
            signature: String::new(),
            salt: None,
            name: name.to_string(),
            version: STATE_FORMAT_VERSION.to_string(),
            documents: BTreeMap::new(),
            last_insert_id: None,
        }
    }
}

/// Signs, writes, reads and verifies collection files.
///
/// The signature is `H(H(json + secret) + salt)` where `json` is the state
/// serialized with its `signature` field set to the salt. A state loaded
/// with the wrong secret, or whose bytes were altered, fails verification.
#[derive(Clone)]
pub struct PersistenceCodec {
    backend: Arc<dyn StorageBackend>,
    digest: Arc<dyn DigestProvider>,
    event_bus: DbEventBus,
}

impl PersistenceCodec {
    pub fn new(
        backend: Arc<dyn StorageBackend>,
        digest: Arc<dyn DigestProvider>,
        event_bus: DbEventBus,
    ) -> Self {
        PersistenceCodec {
            backend,
            digest,
            event_bus,
        }
    }

    pub fn file_name(collection: &str) -> String {
        format!("{}.{}", collection, STORAGE_FILE_EXTENSION)
    }

    pub fn digest(&self) -> &Arc<dyn DigestProvider> {
        &self.digest
    }

    pub fn event_bus(&self) -> &DbEventBus {
        &self.event_bus
    }

    /// Signs `state` in place and writes it to `<dir>/<name>.json`.
    ///
    /// A salt is drawn on the first save and kept afterwards.
    pub fn save(&self, state: &mut CollectionState, secret: &str, dir: &str) -> SealResult<()> {
        let salt = match &state.salt {
            Some(salt) => salt.clone(),
            None => {
                let salt = self.new_salt();
                state.salt = Some(salt.clone());
                salt
            }
        };

        state.signature = self.sign(state, secret, &salt)?;
        let bytes = serde_json::to_vec(state)?;
        self.backend
            .write(&Self::file_name(&state.name), dir, &bytes)?;
        log::debug!(
            "Saved {} documents of {} to {}",
            state.documents.len(),
            state.name,
            dir
        );
        Ok(())
    }

    /// Reads and verifies the stored state of `name`.
    ///
    /// Returns `None` when nothing is stored. A payload that does not parse
    /// or does not verify is reported as `DataTampered` and also yields
    /// `None`; only storage failures are errors.
    pub fn load(&self, name: &str, secret: &str, dir: &str) -> SealResult<Option<CollectionState>> {
        let file_name = Self::file_name(name);
        let Some(bytes) = self.backend.read(&file_name, dir)? else {
            return Ok(None);
        };

        let state = match serde_json::from_slice::<CollectionState>(&bytes) {
            Ok(state) => state,
            Err(e) => {
                self.tampered(&file_name, format!("unreadable content: {}", e));
                return Ok(None);
            }
        };

        if !self.verify(&state, secret)? {
            self.tampered(&file_name, "signature mismatch".to_string());
            return Ok(None);
        }
        Ok(Some(state))
    }

    fn verify(&self, state: &CollectionState, secret: &str) -> SealResult<bool> {
        let Some(salt) = &state.salt else {
            return Ok(false);
        };
        let expected = self.sign(state, secret, salt)?;
        Ok(expected == state.signature)
    }

    fn sign(&self, state: &CollectionState, secret: &str, salt: &str) -> SealResult<String> {
        let mut unsigned = state.clone();
        unsigned.signature = salt.to_string();
        let mut payload = serde_json::to_string(&unsigned)?;
        payload.push_str(secret);

        let mut salted = self.digest.digest_hex(payload.as_bytes());
        salted.push_str(salt);
        Ok(self.digest.digest_hex(salted.as_bytes()))
    }

    fn new_salt(&self) -> String {
        let nanos = chrono::Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or_else(|| chrono::Utc::now().timestamp_micros() * 1000);
        self.digest.digest_hex(nanos.to_string().as_bytes())
    }

    fn tampered(&self, file_name: &str, detail: String) {
        log::warn!("{} failed verification ({}), opening empty", file_name, detail);
        notify(&self.event_bus, DbEvents::DataTampered, file_name, Some(detail));
    }
}
