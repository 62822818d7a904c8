use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::event::Event;

const MODEL_DOMAIN: &[u8] = b"presage.model.v1";

/// Content-addressed model identity: the lowercase hex BLAKE3 digest of a
/// domain-separated encoding of the sequence's event signatures.
///
/// Identical sequences (up to emotive values, which are not structural)
/// always collapse to the same id.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelId(String);

impl ModelId {
    /// Compute the id of a sequence of canonical events.
    pub fn of(events: &[Event]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(MODEL_DOMAIN);
        hasher.update(&(events.len() as u64).to_le_bytes());
        for event in events {
            hasher.update(&event.signature());
        }
        Self(hasher.finalize().to_hex().to_string())
    }

    /// Reconstruct an id from its persisted hex form. Backends use this
    /// when listing keys; nothing re-validates the digest here.
    pub fn from_raw(raw: String) -> Self {
        Self(raw)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An immutable, hash-identified sequence of events learned from a working
/// memory snapshot.
///
/// The identity (id, event structure) never changes. The statistics do:
/// `frequency` counts how many times the sequence has been learned, and
/// each event's emotive map holds the running mean of the values observed
/// at that position across all occurrences.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Model {
    id: ModelId,
    events: Vec<Event>,
    frequency: u64,
}

impl Model {
    /// Build a fresh model from a learned sequence, frequency 1.
    pub fn from_sequence(events: Vec<Event>) -> Result<Self> {
        if events.is_empty() {
            return Err(EngineError::EmptySequence);
        }
        let id = ModelId::of(&events);
        Ok(Self {
            id,
            events,
            frequency: 1,
        })
    }

    pub fn id(&self) -> &ModelId {
        &self.id
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn frequency(&self) -> u64 {
        self.frequency
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Record a re-occurrence of this sequence: bump the counter and fold
    /// the new occurrence's emotives into the per-position running means.
    ///
    /// Positionally aligned: event i of the incoming sequence updates event
    /// i of the model. A name absent from an occurrence contributes 0.0 to
    /// its mean, so a value seen once decays as the sequence keeps
    /// recurring without it.
    pub fn record_occurrence(&mut self, occurrence: &[Event]) {
        debug_assert_eq!(occurrence.len(), self.events.len());
        self.frequency += 1;
        let n = self.frequency as f64;

        for (stored, observed) in self.events.iter_mut().zip(occurrence) {
            // A name can sit in both maps; the union must update it once.
            let names: BTreeSet<String> = stored
                .emotives
                .keys()
                .chain(observed.emotives.keys())
                .cloned()
                .collect();
            for name in names {
                let prior = stored.emotives.get(&name).copied().unwrap_or(0.0);
                let x = observed.emotives.get(&name).copied().unwrap_or(0.0);
                stored.emotives.insert(name, prior + (x - prior) / n);
            }
        }
    }
}
