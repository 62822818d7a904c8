use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// 32-byte BLAKE3 digest of one event's structural content.
pub type Signature = [u8; 32];

const EVENT_DOMAIN: &[u8] = b"presage.event.v1";

/// A single canonicalized observation.
///
/// Strings are sorted lexicographically with duplicates preserved (repeated
/// tokens are meaningful). Vectors are positional and kept in the order
/// given. Emotives map a name to a numeric value; duplicate names within
/// one observation collapse last-write-wins.
///
/// The signature covers strings and vectors only. Emotives are measurements
/// attached to an observation, not part of its structural identity, which
/// is what lets a model aggregate them across re-occurrences.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub strings: Vec<String>,
    pub vectors: Vec<Vec<f64>>,
    pub emotives: BTreeMap<String, f64>,
}

impl Event {
    /// Canonicalize one raw observation.
    ///
    /// Pure: the same input, up to string order and emotive pair order
    /// (later pairs win), always produces an identical Event.
    pub fn canonicalize(
        strings: Vec<String>,
        vectors: Vec<Vec<f64>>,
        emotives: impl IntoIterator<Item = (String, f64)>,
    ) -> Self {
        let mut strings = strings;
        strings.sort_unstable();

        let mut reduced = BTreeMap::new();
        for (name, value) in emotives {
            reduced.insert(name, value);
        }

        Self {
            strings,
            vectors,
            emotives: reduced,
        }
    }

    /// True when the event carries no strings and no vectors.
    pub fn is_structurally_empty(&self) -> bool {
        self.strings.is_empty() && self.vectors.is_empty()
    }

    /// Deterministic digest of the event's structural content.
    ///
    /// Length-prefixed encoding: domain tag, string count, each string as
    /// (len, bytes), vector count, each vector as (len, f64 bits LE).
    /// Equality of signatures is the engine-wide definition of event
    /// equality; float payloads compare bit-exact.
    pub fn signature(&self) -> Signature {
        let mut hasher = blake3::Hasher::new();
        hasher.update(EVENT_DOMAIN);

        hasher.update(&(self.strings.len() as u64).to_le_bytes());
        for s in &self.strings {
            hasher.update(&(s.len() as u64).to_le_bytes());
            hasher.update(s.as_bytes());
        }

        hasher.update(&(self.vectors.len() as u64).to_le_bytes());
        for v in &self.vectors {
            hasher.update(&(v.len() as u64).to_le_bytes());
            for x in v {
                hasher.update(&x.to_le_bytes());
            }
        }

        *hasher.finalize().as_bytes()
    }
}

/// Signatures for a whole sequence, computed once up front so alignment
/// never re-hashes an event.
pub fn signatures(events: &[Event]) -> Vec<Signature> {
    events.iter().map(Event::signature).collect()
}
