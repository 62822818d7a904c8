use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::event::Event;
use crate::memory::WorkingMemory;
use crate::model::ModelId;
use crate::predict::{Prediction, segment};
use crate::recall::RecallEngine;
use crate::store::{ModelBackend, ModelStore};

/// Per-context configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// Upper bound on prediction entries returned, applied after ranking.
    pub max_predictions: usize,
    /// Minimum similarity score a model must reach to be recalled.
    pub recall_threshold: f64,
    /// Optional working-memory bound; oldest events evict on append.
    pub max_working_memory: Option<usize>,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            max_predictions: 10,
            recall_threshold: 0.1,
            max_working_memory: None,
        }
    }
}

impl ProcessorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_predictions == 0 {
            return Err(EngineError::InvalidConfiguration(
                "max_predictions must be positive".to_string(),
            ));
        }
        if !self.recall_threshold.is_finite()
            || !(0.0..=1.0).contains(&self.recall_threshold)
        {
            return Err(EngineError::InvalidConfiguration(format!(
                "recall_threshold must lie in [0,1], got {}",
                self.recall_threshold
            )));
        }
        if self.max_working_memory == Some(0) {
            return Err(EngineError::InvalidConfiguration(
                "max_working_memory must be positive when set".to_string(),
            ));
        }
        Ok(())
    }
}

struct ProcessorState {
    memory: WorkingMemory,
    config: ProcessorConfig,
}

/// One isolated universe: a working memory, a configuration, and a view
/// onto one model-store namespace.
///
/// One exclusive lock guards working-memory mutation and the learn path;
/// prediction snapshots under that lock and searches without it, so the
/// model-store scan never blocks appends on other contexts.
pub struct Processor {
    id: String,
    state: Mutex<ProcessorState>,
    store: Arc<ModelStore>,
}

impl Processor {
    fn new(id: &str, config: ProcessorConfig, store: Arc<ModelStore>) -> Self {
        let memory = match config.max_working_memory {
            Some(cap) => WorkingMemory::bounded(cap),
            None => WorkingMemory::new(),
        };
        Self {
            id: id.to_string(),
            state: Mutex::new(ProcessorState { memory, config }),
            store,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn store(&self) -> &Arc<ModelStore> {
        &self.store
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, ProcessorState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Canonicalize one observation and append it to working memory.
    /// A structurally empty observation (no strings, no vectors) carries
    /// nothing to recall against and appends nothing.
    pub fn observe(
        &self,
        strings: Vec<String>,
        vectors: Vec<Vec<f64>>,
        emotives: impl IntoIterator<Item = (String, f64)>,
    ) -> Result<()> {
        let event = Event::canonicalize(strings, vectors, emotives);
        if event.is_structurally_empty() {
            return Ok(());
        }
        self.lock_state().memory.append(event);
        Ok(())
    }

    /// Crystallize the working memory into the model store, then reset the
    /// working memory. A failed learn leaves it untouched.
    pub fn learn(&self) -> Result<ModelId> {
        let mut state = self.lock_state();
        let snapshot = state.memory.snapshot();
        let id = self.store.learn(&snapshot)?;
        state.memory.clear();
        Ok(id)
    }

    pub fn working_memory(&self) -> Vec<Event> {
        self.lock_state().memory.snapshot()
    }

    pub fn clear_working_memory(&self) {
        self.lock_state().memory.clear();
    }

    /// Search the namespace for models continuing the current working
    /// memory and segment each match. The snapshot and configuration are
    /// read under the context lock; the search itself runs without it.
    pub fn predict(&self) -> Result<Vec<Prediction>> {
        let (query, config) = {
            let state = self.lock_state();
            (state.memory.snapshot(), state.config.clone())
        };

        let recalls = RecallEngine::recall(
            &self.store,
            &query,
            config.recall_threshold,
            config.max_predictions,
        )?;

        Ok(recalls.iter().map(|r| segment(r, &query)).collect())
    }

    /// Replace the configuration. Invalid values are rejected and the
    /// previous configuration stays in force.
    pub fn configure(&self, config: ProcessorConfig) -> Result<()> {
        config.validate()?;
        let mut state = self.lock_state();
        state.memory.set_capacity(config.max_working_memory);
        state.config = config;
        Ok(())
    }

    pub fn config(&self) -> ProcessorConfig {
        self.lock_state().config.clone()
    }
}

/// Explicit registry of processor contexts over one shared backend.
///
/// Contexts are created lazily on first reference to an identity. Each
/// context's namespace defaults to its own id (isolation); sharing a
/// namespace is an explicit opt-in via [`ProcessorRegistry::context_with`].
/// Contexts sharing a namespace share one store instance, hence one
/// signature index and one per-id lock table.
pub struct ProcessorRegistry {
    backend: Arc<dyn ModelBackend>,
    defaults: ProcessorConfig,
    contexts: RwLock<HashMap<String, Arc<Processor>>>,
    stores: RwLock<HashMap<String, Arc<ModelStore>>>,
}

impl ProcessorRegistry {
    pub fn new(backend: Arc<dyn ModelBackend>) -> Self {
        Self {
            backend,
            defaults: ProcessorConfig::default(),
            contexts: RwLock::new(HashMap::new()),
            stores: RwLock::new(HashMap::new()),
        }
    }

    /// A registry whose lazily created contexts start from the given
    /// configuration instead of the built-in defaults.
    pub fn with_defaults(backend: Arc<dyn ModelBackend>, defaults: ProcessorConfig) -> Result<Self> {
        defaults.validate()?;
        Ok(Self {
            backend,
            defaults,
            contexts: RwLock::new(HashMap::new()),
            stores: RwLock::new(HashMap::new()),
        })
    }

    fn store_for(&self, namespace: &str) -> Result<Arc<ModelStore>> {
        if let Some(store) = self
            .stores
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(namespace)
        {
            return Ok(Arc::clone(store));
        }

        let mut stores = self.stores.write().unwrap_or_else(|e| e.into_inner());
        if let Some(store) = stores.get(namespace) {
            return Ok(Arc::clone(store));
        }
        let store = Arc::new(ModelStore::open(Arc::clone(&self.backend), namespace)?);
        stores.insert(namespace.to_string(), Arc::clone(&store));
        Ok(store)
    }

    /// The context for an identity, created on first use with its own
    /// namespace.
    pub fn context(&self, id: &str) -> Result<Arc<Processor>> {
        self.context_with(id, id)
    }

    /// The context for an identity, bound to an explicit (possibly shared)
    /// namespace. The namespace binding is fixed at creation; later calls
    /// for an existing context return it regardless of the namespace
    /// argument.
    pub fn context_with(&self, id: &str, namespace: &str) -> Result<Arc<Processor>> {
        if let Some(ctx) = self
            .contexts
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
        {
            return Ok(Arc::clone(ctx));
        }

        let store = self.store_for(namespace)?;
        let mut contexts = self.contexts.write().unwrap_or_else(|e| e.into_inner());
        if let Some(ctx) = contexts.get(id) {
            return Ok(Arc::clone(ctx));
        }
        let ctx = Arc::new(Processor::new(id, self.defaults.clone(), store));
        contexts.insert(id.to_string(), Arc::clone(&ctx));
        Ok(ctx)
    }

    pub fn context_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .contexts
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect();
        ids.sort_unstable();
        ids
    }

    // --- The external operation surface ---

    pub fn observe(
        &self,
        context_id: &str,
        strings: Vec<String>,
        vectors: Vec<Vec<f64>>,
        emotives: impl IntoIterator<Item = (String, f64)>,
    ) -> Result<()> {
        self.context(context_id)?.observe(strings, vectors, emotives)
    }

    pub fn learn(&self, context_id: &str) -> Result<ModelId> {
        self.context(context_id)?.learn()
    }

    pub fn get_working_memory(&self, context_id: &str) -> Result<Vec<Event>> {
        Ok(self.context(context_id)?.working_memory())
    }

    pub fn clear_working_memory(&self, context_id: &str) -> Result<()> {
        self.context(context_id)?.clear_working_memory();
        Ok(())
    }

    pub fn predict(&self, context_id: &str) -> Result<Vec<Prediction>> {
        self.context(context_id)?.predict()
    }

    pub fn configure(&self, context_id: &str, config: ProcessorConfig) -> Result<()> {
        self.context(context_id)?.configure(config)
    }
}
