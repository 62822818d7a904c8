use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, RwLock};

use crate::error::{EngineError, Result};
use crate::event::{Event, Signature};
use crate::model::{Model, ModelId};

/// The key-value-capable persistence interface the environment provides.
///
/// Implementations synchronize their own access; every method takes `&self`
/// and may be called concurrently from any number of contexts. The core
/// ships [`MemoryBackend`]; presage-store ships a SQLite implementation.
pub trait ModelBackend: Send + Sync {
    fn get(&self, namespace: &str, id: &ModelId) -> Result<Option<Model>>;
    fn put(&self, namespace: &str, model: &Model) -> Result<()>;
    /// All model ids in the namespace, sorted ascending.
    fn ids(&self, namespace: &str) -> Result<Vec<ModelId>>;
}

/// In-memory backend: one map per namespace.
#[derive(Default)]
pub struct MemoryBackend {
    namespaces: RwLock<HashMap<String, HashMap<ModelId, Model>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ModelBackend for MemoryBackend {
    fn get(&self, namespace: &str, id: &ModelId) -> Result<Option<Model>> {
        let namespaces = self.namespaces.read().unwrap_or_else(|e| e.into_inner());
        Ok(namespaces
            .get(namespace)
            .and_then(|models| models.get(id))
            .cloned())
    }

    fn put(&self, namespace: &str, model: &Model) -> Result<()> {
        let mut namespaces = self.namespaces.write().unwrap_or_else(|e| e.into_inner());
        namespaces
            .entry(namespace.to_string())
            .or_default()
            .insert(model.id().clone(), model.clone());
        Ok(())
    }

    fn ids(&self, namespace: &str) -> Result<Vec<ModelId>> {
        let namespaces = self.namespaces.read().unwrap_or_else(|e| e.into_inner());
        let mut ids: Vec<ModelId> = namespaces
            .get(namespace)
            .map(|models| models.keys().cloned().collect())
            .unwrap_or_default();
        ids.sort_unstable();
        Ok(ids)
    }
}

/// Inverted index from event signature to the models containing it.
///
/// An optimization only: recall through the index must rank identically to
/// a full scan. Maintained by the owning [`ModelStore`] — rebuilt from the
/// backend at open, updated on learn.
#[derive(Default)]
struct SignatureIndex {
    by_signature: HashMap<Signature, BTreeSet<ModelId>>,
}

impl SignatureIndex {
    fn insert(&mut self, model: &Model) {
        for event in model.events() {
            self.by_signature
                .entry(event.signature())
                .or_default()
                .insert(model.id().clone());
        }
    }

    fn candidates(&self, signatures: &[Signature]) -> Vec<ModelId> {
        let mut ids = BTreeSet::new();
        for sig in signatures {
            if let Some(models) = self.by_signature.get(sig) {
                ids.extend(models.iter().cloned());
            }
        }
        ids.into_iter().collect()
    }
}

/// Content-addressed repository of learned models in one namespace.
///
/// Identity is immutable; statistics (frequency, emotive means) mutate
/// under a per-id lock, so concurrent learns from contexts sharing this
/// namespace serialize only when they hit the same model.
pub struct ModelStore {
    backend: Arc<dyn ModelBackend>,
    namespace: String,
    index: RwLock<SignatureIndex>,
    id_locks: Mutex<HashMap<ModelId, Arc<Mutex<()>>>>,
}

impl ModelStore {
    /// Open a namespace view over a backend, rebuilding the signature
    /// index from whatever the backend already holds.
    pub fn open(backend: Arc<dyn ModelBackend>, namespace: &str) -> Result<Self> {
        let mut index = SignatureIndex::default();
        for id in backend.ids(namespace)? {
            match backend.get(namespace, &id)? {
                Some(model) => index.insert(&model),
                None => return Err(EngineError::NotFound(id)),
            }
        }
        Ok(Self {
            backend,
            namespace: namespace.to_string(),
            index: RwLock::new(index),
            id_locks: Mutex::new(HashMap::new()),
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn id_lock(&self, id: &ModelId) -> Arc<Mutex<()>> {
        let mut locks = self.id_locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.entry(id.clone()).or_default().clone()
    }

    /// Learn a sequence: insert a new model with frequency 1, or bump the
    /// existing model's counter and fold in the occurrence's emotives.
    ///
    /// Idempotent at the identity level, never at the statistics level.
    /// Fails with `EmptySequence` for zero events.
    pub fn learn(&self, events: &[Event]) -> Result<ModelId> {
        if events.is_empty() {
            return Err(EngineError::EmptySequence);
        }

        let id = ModelId::of(events);
        let lock = self.id_lock(&id);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

        match self.backend.get(&self.namespace, &id)? {
            Some(mut model) => {
                model.record_occurrence(events);
                self.backend.put(&self.namespace, &model)?;
            }
            None => {
                let model = Model::from_sequence(events.to_vec())?;
                self.backend.put(&self.namespace, &model)?;
                self.index
                    .write()
                    .unwrap_or_else(|e| e.into_inner())
                    .insert(&model);
            }
        }

        Ok(id)
    }

    /// Fetch one model. `NotFound` if the id is unknown.
    pub fn get(&self, id: &ModelId) -> Result<Model> {
        self.backend
            .get(&self.namespace, id)?
            .ok_or_else(|| EngineError::NotFound(id.clone()))
    }

    /// Lazy, restartable iteration in id order. Snapshots the id list up
    /// front and fetches each model on demand.
    pub fn iter(&self) -> Result<ModelIter<'_>> {
        let ids = self.backend.ids(&self.namespace)?;
        Ok(ModelIter {
            store: self,
            ids,
            pos: 0,
        })
    }

    /// Model ids containing at least one of the given event signatures,
    /// sorted ascending. Complete only for exact-match recall: a model with
    /// no signature in common with the query cannot appear here.
    pub fn candidates(&self, signatures: &[Signature]) -> Vec<ModelId> {
        self.index
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .candidates(signatures)
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.backend.ids(&self.namespace)?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

/// Iterator over a namespace's models, id order.
pub struct ModelIter<'a> {
    store: &'a ModelStore,
    ids: Vec<ModelId>,
    pos: usize,
}

impl Iterator for ModelIter<'_> {
    type Item = Result<Model>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.ids.get(self.pos)?.clone();
        self.pos += 1;
        Some(self.store.get(&id))
    }
}
