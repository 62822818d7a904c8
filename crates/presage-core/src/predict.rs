use serde::{Deserialize, Serialize};

use crate::event::Event;
use crate::model::ModelId;
use crate::recall::Recall;

/// One ranked model match, segmented in time relative to the query.
///
/// Derived and read-only: computed per match, never stored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub model_id: ModelId,
    pub score: f64,
    pub frequency: u64,
    /// Model events strictly before the aligned region.
    pub past: Vec<Event>,
    /// The aligned region itself.
    pub present: Vec<Event>,
    /// Model events strictly after the aligned region.
    pub future: Vec<Event>,
    /// Events inside the aligned region the query did not supply.
    pub missing: Vec<Event>,
    /// Query events no model event accounted for.
    pub extras: Vec<Event>,
}

/// Pure segmentation of a recalled model against the query.
///
/// `missing` is confined to the present: the alignment expected those
/// events between matched positions and the query lacks them. Future
/// events are expected by definition and never counted missing. When
/// nothing matched, the span is empty at position 0 and the entire model
/// is future.
pub fn segment(recall: &Recall, query: &[Event]) -> Prediction {
    let model = &recall.model;
    let events = model.events();
    let span = recall.alignment.span;

    let past = events[..span.start].to_vec();
    let present = events[span.start..span.end].to_vec();
    let future = events[span.end..].to_vec();

    let missing = (span.start..span.end)
        .filter(|idx| !recall.alignment.matched_model.contains(idx))
        .map(|idx| events[idx].clone())
        .collect();

    let extras = (0..query.len())
        .filter(|idx| !recall.alignment.matched_query.contains(idx))
        .map(|idx| query[idx].clone())
        .collect();

    Prediction {
        model_id: model.id().clone(),
        score: recall.score,
        frequency: model.frequency(),
        past,
        present,
        future,
        missing,
        extras,
    }
}
