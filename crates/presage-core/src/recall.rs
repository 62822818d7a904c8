use crate::error::Result;
use crate::event::{Event, Signature, signatures};
use crate::model::Model;
use crate::store::ModelStore;

/// The contiguous region of a model's event sequence aligned with the
/// query. Half-open; empty spans sit at position 0.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MatchSpan {
    pub start: usize,
    pub end: usize,
}

impl MatchSpan {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// How the query lines up against one model's events.
///
/// `matched_model` and `matched_query` are parallel: entry k says model
/// event `matched_model[k]` matched query event `matched_query[k]`. Both
/// are strictly increasing. The span is the minimal contiguous model
/// region covering every matched position.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Alignment {
    pub span: MatchSpan,
    pub matched_model: Vec<usize>,
    pub matched_query: Vec<usize>,
}

impl Alignment {
    pub fn matched_count(&self) -> usize {
        self.matched_model.len()
    }
}

/// Event-level similarity hook. The default is signature equality; a
/// non-exact matcher forces recall down the full-scan path because the
/// signature index only knows about equality.
pub trait EventMatcher {
    fn matches(&self, query: &Event, model: &Event) -> bool;
}

/// Signature equality.
pub struct ExactMatcher;

impl EventMatcher for ExactMatcher {
    fn matches(&self, query: &Event, model: &Event) -> bool {
        query.signature() == model.signature()
    }
}

/// One model that cleared the recall threshold.
#[derive(Clone, Debug)]
pub struct Recall {
    pub model: Model,
    pub score: f64,
    pub alignment: Alignment,
}

/// Longest-common-subsequence alignment over an arbitrary equality
/// predicate `eq(query_idx, model_idx)`.
///
/// dp[i][j] = LCS length of query[i..] vs model[j..], filled back to
/// front. The traceback is deterministic: a match is taken whenever it is
/// optimal; on a tied mismatch the query event is consumed first, which
/// keeps the aligned region as early in the model as possible.
fn align_by(query_len: usize, model_len: usize, eq: impl Fn(usize, usize) -> bool) -> Alignment {
    if query_len == 0 || model_len == 0 {
        return Alignment::default();
    }

    let width = model_len + 1;
    let mut dp = vec![0u32; (query_len + 1) * width];
    for i in (0..query_len).rev() {
        for j in (0..model_len).rev() {
            dp[i * width + j] = if eq(i, j) {
                dp[(i + 1) * width + j + 1] + 1
            } else {
                dp[(i + 1) * width + j].max(dp[i * width + j + 1])
            };
        }
    }

    let mut matched_model = Vec::new();
    let mut matched_query = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < query_len && j < model_len {
        if eq(i, j) && dp[i * width + j] == dp[(i + 1) * width + j + 1] + 1 {
            matched_query.push(i);
            matched_model.push(j);
            i += 1;
            j += 1;
        } else if dp[(i + 1) * width + j] >= dp[i * width + j + 1] {
            i += 1;
        } else {
            j += 1;
        }
    }

    let span = match (matched_model.first(), matched_model.last()) {
        (Some(&first), Some(&last)) => MatchSpan {
            start: first,
            end: last + 1,
        },
        _ => MatchSpan::default(),
    };

    Alignment {
        span,
        matched_model,
        matched_query,
    }
}

/// Align two event sequences under a pluggable matcher.
pub fn align(query: &[Event], model: &[Event], matcher: &impl EventMatcher) -> Alignment {
    align_by(query.len(), model.len(), |i, j| {
        matcher.matches(&query[i], &model[j])
    })
}

/// Fraction of query events that found a corresponding model event, in
/// [0,1]. An empty query scores 0.0 by definition, never a division by
/// zero.
fn score(alignment: &Alignment, query_len: usize) -> f64 {
    if query_len == 0 {
        return 0.0;
    }
    alignment.matched_count() as f64 / query_len as f64
}

/// Stateless search over a model store.
///
/// Ranking is total and deterministic: score descending, then frequency
/// descending, then model id ascending. Candidates below the recall
/// threshold are discarded before ranking; the ranked list is truncated to
/// `limit` entries.
pub struct RecallEngine;

impl RecallEngine {
    /// Threshold-gated search, picking the indexed path when it is valid
    /// (exact matching, threshold above zero) and the full scan otherwise.
    pub fn recall(
        store: &ModelStore,
        query: &[Event],
        threshold: f64,
        limit: usize,
    ) -> Result<Vec<Recall>> {
        if threshold > 0.0 {
            Self::recall_indexed(store, query, threshold, limit)
        } else {
            Self::recall_full_scan(store, query, threshold, limit)
        }
    }

    /// Baseline correctness contract: score every model in the store.
    pub fn recall_full_scan(
        store: &ModelStore,
        query: &[Event],
        threshold: f64,
        limit: usize,
    ) -> Result<Vec<Recall>> {
        let query_sigs = signatures(query);
        let mut passed = Vec::new();

        for model in store.iter()? {
            let model = model?;
            if let Some(recall) = Self::score_model(model, &query_sigs, threshold) {
                passed.push(recall);
            }
        }

        Ok(Self::rank(passed, limit))
    }

    /// Index-accelerated search. Any model scoring above a positive
    /// threshold shares at least one event signature with the query, so
    /// the index's candidate set is complete; a zero threshold admits
    /// zero-score models and falls back to the full scan.
    pub fn recall_indexed(
        store: &ModelStore,
        query: &[Event],
        threshold: f64,
        limit: usize,
    ) -> Result<Vec<Recall>> {
        if threshold <= 0.0 {
            return Self::recall_full_scan(store, query, threshold, limit);
        }

        let query_sigs = signatures(query);
        let mut passed = Vec::new();

        for id in store.candidates(&query_sigs) {
            let model = store.get(&id)?;
            if let Some(recall) = Self::score_model(model, &query_sigs, threshold) {
                passed.push(recall);
            }
        }

        Ok(Self::rank(passed, limit))
    }

    /// Full scan under an arbitrary event matcher.
    pub fn recall_with_matcher(
        store: &ModelStore,
        query: &[Event],
        threshold: f64,
        limit: usize,
        matcher: &impl EventMatcher,
    ) -> Result<Vec<Recall>> {
        let mut passed = Vec::new();

        for model in store.iter()? {
            let model = model?;
            let alignment = align(query, model.events(), matcher);
            let score = score(&alignment, query.len());
            if score >= threshold {
                passed.push(Recall {
                    model,
                    score,
                    alignment,
                });
            }
        }

        Ok(Self::rank(passed, limit))
    }

    fn score_model(model: Model, query_sigs: &[Signature], threshold: f64) -> Option<Recall> {
        let model_sigs = signatures(model.events());
        let alignment = align_by(query_sigs.len(), model_sigs.len(), |i, j| {
            query_sigs[i] == model_sigs[j]
        });
        let score = score(&alignment, query_sigs.len());
        if score >= threshold {
            Some(Recall {
                model,
                score,
                alignment,
            })
        } else {
            None
        }
    }

    fn rank(mut passed: Vec<Recall>, limit: usize) -> Vec<Recall> {
        passed.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| b.model.frequency().cmp(&a.model.frequency()))
                .then_with(|| a.model.id().cmp(b.model.id()))
        });
        passed.truncate(limit);
        passed
    }
}
