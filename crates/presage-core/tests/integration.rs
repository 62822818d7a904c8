//! Integration tests exercising the full pipeline:
//! observe → learn → predict, across module boundaries.

use std::sync::Arc;

use presage_core::{
    EngineError, MemoryBackend, ProcessorConfig, ProcessorRegistry, RecallEngine,
};

fn registry() -> ProcessorRegistry {
    ProcessorRegistry::new(Arc::new(MemoryBackend::new()))
}

fn strs(words: &[&str]) -> Vec<String> {
    words.iter().map(|s| s.to_string()).collect()
}

/// The canonical scenario: learn ["hello"],["world"], observe ["hello"],
/// predict — the match continues into "world".
#[test]
fn hello_world_prediction() {
    let reg = registry();

    reg.observe("p1", strs(&["hello"]), vec![], []).unwrap();
    reg.observe("p1", strs(&["world"]), vec![], []).unwrap();
    let model_id = reg.learn("p1").unwrap();

    reg.clear_working_memory("p1").unwrap();
    reg.observe("p1", strs(&["hello"]), vec![], []).unwrap();

    reg.configure(
        "p1",
        ProcessorConfig {
            recall_threshold: 0.5,
            ..Default::default()
        },
    )
    .unwrap();

    let predictions = reg.predict("p1").unwrap();
    assert_eq!(predictions.len(), 1);

    let p = &predictions[0];
    assert_eq!(p.model_id, model_id);
    assert_eq!(p.present.len(), 1);
    assert_eq!(p.present[0].strings, strs(&["hello"]));
    assert_eq!(p.future.len(), 1);
    assert_eq!(p.future[0].strings, strs(&["world"]));
    assert!(p.past.is_empty());
    assert!(p.missing.is_empty());
    assert!(p.extras.is_empty());
}

/// Learning the same sequence twice yields the same id and frequency 2.
#[test]
fn content_addressing_stable() {
    let reg = registry();

    reg.observe("p1", strs(&["b", "a"]), vec![], []).unwrap();
    let first = reg.learn("p1").unwrap();
    reg.observe("p1", strs(&["a", "b"]), vec![], []).unwrap();
    let second = reg.learn("p1").unwrap();

    assert_eq!(first, second, "canonicalization must ignore string order");
    let ctx = reg.context("p1").unwrap();
    assert_eq!(ctx.store().get(&first).unwrap().frequency(), 2);
}

#[test]
fn learn_empty_working_memory_fails() {
    let reg = registry();
    assert!(matches!(reg.learn("p1"), Err(EngineError::EmptySequence)));
}

/// Zero threshold with a populated store returns entries for any query,
/// ranked by frequency among equal scores.
#[test]
fn zero_threshold_returns_everything() {
    let reg = registry();

    reg.observe("p1", strs(&["alpha"]), vec![], []).unwrap();
    reg.learn("p1").unwrap();
    for _ in 0..3 {
        reg.observe("p1", strs(&["beta"]), vec![], []).unwrap();
        reg.learn("p1").unwrap();
    }

    reg.configure(
        "p1",
        ProcessorConfig {
            recall_threshold: 0.0,
            ..Default::default()
        },
    )
    .unwrap();

    reg.observe("p1", strs(&["unrelated"]), vec![], []).unwrap();
    let predictions = reg.predict("p1").unwrap();
    assert_eq!(predictions.len(), 2);
    assert_eq!(predictions[0].frequency, 3, "frequency breaks the 0.0 tie");
    assert_eq!(predictions[1].frequency, 1);
}

/// Threshold 1.0 admits only models whose aligned region covers the whole
/// query exactly.
#[test]
fn full_threshold_requires_exact_coverage() {
    let reg = registry();

    reg.observe("p1", strs(&["a"]), vec![], []).unwrap();
    reg.observe("p1", strs(&["b"]), vec![], []).unwrap();
    reg.learn("p1").unwrap();

    reg.configure(
        "p1",
        ProcessorConfig {
            recall_threshold: 1.0,
            ..Default::default()
        },
    )
    .unwrap();

    reg.observe("p1", strs(&["a"]), vec![], []).unwrap();
    assert_eq!(reg.predict("p1").unwrap().len(), 1);

    reg.observe("p1", strs(&["mismatch"]), vec![], []).unwrap();
    assert!(reg.predict("p1").unwrap().is_empty());
}

/// Emotive values ride along: re-learning with different values converges
/// on the running mean, visible in prediction output.
#[test]
fn emotives_aggregate_into_predictions() {
    let reg = registry();

    reg.observe(
        "p1",
        strs(&["storm"]),
        vec![],
        [("dread".to_string(), 1.0)],
    )
    .unwrap();
    reg.observe("p1", strs(&["calm"]), vec![], []).unwrap();
    reg.learn("p1").unwrap();

    reg.observe(
        "p1",
        strs(&["storm"]),
        vec![],
        [("dread".to_string(), 0.0)],
    )
    .unwrap();
    reg.observe("p1", strs(&["calm"]), vec![], []).unwrap();
    reg.learn("p1").unwrap();

    reg.configure(
        "p1",
        ProcessorConfig {
            recall_threshold: 0.5,
            ..Default::default()
        },
    )
    .unwrap();

    reg.observe("p1", strs(&["storm"]), vec![], []).unwrap();
    let predictions = reg.predict("p1").unwrap();
    assert_eq!(predictions.len(), 1);

    let dread = predictions[0].present[0].emotives["dread"];
    assert!((dread - 0.5).abs() < 1e-12, "got {dread}");
}

/// Vectors are opaque positional payloads that participate in identity.
#[test]
fn vectors_distinguish_models() {
    let reg = registry();

    reg.observe("p1", strs(&["reading"]), vec![vec![1.0, 2.0]], [])
        .unwrap();
    let with_vector = reg.learn("p1").unwrap();

    reg.observe("p1", strs(&["reading"]), vec![vec![1.0, 2.5]], [])
        .unwrap();
    let other_vector = reg.learn("p1").unwrap();

    assert_ne!(with_vector, other_vector);
}

/// Contexts with distinct namespaces never see each other's models or
/// working memory.
#[test]
fn cross_context_isolation() {
    let reg = registry();

    reg.observe("alpha", strs(&["secret"]), vec![], []).unwrap();
    reg.observe("alpha", strs(&["payload"]), vec![], []).unwrap();
    reg.learn("alpha").unwrap();

    reg.configure(
        "beta",
        ProcessorConfig {
            recall_threshold: 0.0,
            ..Default::default()
        },
    )
    .unwrap();
    reg.observe("beta", strs(&["secret"]), vec![], []).unwrap();

    assert!(
        reg.predict("beta").unwrap().is_empty(),
        "beta's namespace must not contain alpha's models"
    );
    assert_eq!(reg.get_working_memory("beta").unwrap().len(), 1);
}

/// A longer episode: partial observation mid-sequence segments into all
/// five buckets at once.
#[test]
fn full_segmentation() {
    let reg = registry();

    for word in ["wake", "coffee", "commute", "work", "lunch"] {
        reg.observe("p1", strs(&[word]), vec![], []).unwrap();
    }
    reg.learn("p1").unwrap();

    reg.configure(
        "p1",
        ProcessorConfig {
            recall_threshold: 0.3,
            ..Default::default()
        },
    )
    .unwrap();

    // Observed "coffee" and "work" (skipping "commute"), plus noise.
    reg.observe("p1", strs(&["coffee"]), vec![], []).unwrap();
    reg.observe("p1", strs(&["noise"]), vec![], []).unwrap();
    reg.observe("p1", strs(&["work"]), vec![], []).unwrap();

    let predictions = reg.predict("p1").unwrap();
    assert_eq!(predictions.len(), 1);

    let p = &predictions[0];
    let names = |events: &[presage_core::Event]| -> Vec<String> {
        events.iter().map(|e| e.strings.join(" ")).collect()
    };
    assert_eq!(names(&p.past), strs(&["wake"]));
    assert_eq!(names(&p.present), strs(&["coffee", "commute", "work"]));
    assert_eq!(names(&p.future), strs(&["lunch"]));
    assert_eq!(names(&p.missing), strs(&["commute"]));
    assert_eq!(names(&p.extras), strs(&["noise"]));
    assert!((p.score - 2.0 / 3.0).abs() < 1e-12);
}

/// The engine surface stays consistent under concurrent mixed traffic.
#[test]
fn concurrent_mixed_traffic() {
    use std::thread;

    let reg = Arc::new(registry());

    // Shared namespace pair plus isolated contexts.
    reg.context_with("shared-a", "pool").unwrap();
    reg.context_with("shared-b", "pool").unwrap();

    let mut handles = Vec::new();
    for t in 0..4 {
        let reg = Arc::clone(&reg);
        handles.push(thread::spawn(move || {
            let id = if t % 2 == 0 { "shared-a" } else { "shared-b" };
            for _ in 0..25 {
                reg.observe(id, strs(&["ping"]), vec![], []).unwrap();
                reg.observe(id, strs(&["pong"]), vec![], []).unwrap();
                reg.learn(id).unwrap();
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    // 100 learns of the identical sequence collapse to one model.
    let ctx = reg.context("shared-a").unwrap();
    let store = ctx.store();
    assert_eq!(store.len().unwrap(), 1);

    let models: Vec<_> = store.iter().unwrap().collect::<Result<_, _>>().unwrap();
    assert_eq!(models[0].frequency(), 100);

    // And recall still ranks deterministically.
    reg.observe("shared-a", strs(&["ping"]), vec![], []).unwrap();
    let first = reg.predict("shared-a").unwrap();
    let second = reg.predict("shared-a").unwrap();
    assert_eq!(first, second);
}

/// recall() (auto strategy) equals the brute-force scan on a store built
/// through the public surface.
#[test]
fn auto_strategy_equals_full_scan() {
    let reg = registry();

    let sequences: &[&[&str]] = &[
        &["a", "b", "c"],
        &["b", "c"],
        &["c", "d", "e"],
        &["x", "y"],
        &["a", "e"],
    ];
    for seq in sequences {
        for word in *seq {
            reg.observe("p1", strs(&[word]), vec![], []).unwrap();
        }
        reg.learn("p1").unwrap();
    }

    let ctx = reg.context("p1").unwrap();
    let store = ctx.store();
    let query: Vec<presage_core::Event> = ["b", "c"]
        .iter()
        .map(|w| presage_core::Event::canonicalize(strs(&[w]), vec![], []))
        .collect();

    for threshold in [0.0, 0.25, 0.5, 0.75, 1.0] {
        let auto = RecallEngine::recall(store, &query, threshold, 10).unwrap();
        let scan = RecallEngine::recall_full_scan(store, &query, threshold, 10).unwrap();
        assert_eq!(auto.len(), scan.len(), "threshold {threshold}");
        for (a, s) in auto.iter().zip(&scan) {
            assert_eq!(a.model.id(), s.model.id());
            assert_eq!(a.score, s.score);
        }
    }
}
