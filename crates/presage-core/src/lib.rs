//! Presage recall-and-prediction engine.
//!
//! Ingests discrete observations, canonicalizes them into comparable
//! events, accumulates them in per-processor working memory, crystallizes
//! completed sequences into content-addressed models, and answers partial
//! observation streams with ranked predictions segmented into
//! past/present/future/missing/extras.
//!
//! Zero I/O — pure engine with no opinions about transport or persistence.
//! Persistence plugs in through [`ModelBackend`]; presage-store ships the
//! SQLite implementation.

pub mod error;
pub mod event;
pub mod memory;
pub mod model;
pub mod predict;
pub mod processor;
pub mod recall;
pub mod store;

pub use error::{EngineError, Result};
pub use event::{Event, Signature, signatures};
pub use memory::WorkingMemory;
pub use model::{Model, ModelId};
pub use predict::{Prediction, segment};
pub use processor::{Processor, ProcessorConfig, ProcessorRegistry};
pub use recall::{Alignment, EventMatcher, ExactMatcher, MatchSpan, Recall, RecallEngine, align};
pub use store::{MemoryBackend, ModelBackend, ModelIter, ModelStore};
