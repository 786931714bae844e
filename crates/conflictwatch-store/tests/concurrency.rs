//! Concurrent access tests for the event store. No external services needed.

use std::collections::HashSet;

use chrono::{Duration, TimeZone, Utc};
use conflictwatch_core::{EventPatch, FilterSpec, NewConflictEvent, Severity};
use conflictwatch_store::EventStore;

fn event(n: u32) -> NewConflictEvent {
    NewConflictEvent::new(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(i64::from(n)),
        if n % 2 == 0 { "Nigeria" } else { "Cameroon" },
        format!("Site {n}"),
        "Violence against civilians",
        n % 70,
    )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_inserts_are_neither_lost_nor_duplicated() {
    const WRITERS: u32 = 8;
    const PER_WRITER: u32 = 60;

    let store = EventStore::new();
    let mut handles = Vec::new();
    for w in 0..WRITERS {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            for i in 0..PER_WRITER {
                store.insert(event(w * PER_WRITER + i)).await;
            }
        }));
    }
    for handle in handles {
        handle.await.expect("writer task panicked");
    }

    let all = store.query(&FilterSpec::default()).await;
    assert_eq!(all.len(), (WRITERS * PER_WRITER) as usize);
    let ids: HashSet<&str> = all.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids.len(), all.len(), "ids must be unique");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn queries_see_whole_records_during_updates() {
    let store = EventStore::new();
    let stored = store.bulk_insert((0..200).map(event).collect()).await;
    let ids: Vec<String> = stored.into_iter().map(|e| e.id).collect();

    let writer = {
        let store = store.clone();
        let ids = ids.clone();
        tokio::spawn(async move {
            for round in 0..5u32 {
                for id in &ids {
                    // Fatalities and severity must always move together.
                    let patch = EventPatch {
                        fatalities: Some(round * 20),
                        ..EventPatch::default()
                    };
                    store.update(id, patch).await.expect("event exists");
                }
            }
        })
    };

    let reader = {
        let store = store.clone();
        tokio::spawn(async move {
            for _ in 0..50 {
                let snapshot = store.query(&FilterSpec::default()).await;
                assert_eq!(snapshot.len(), 200);
                for e in &snapshot {
                    assert_eq!(e.severity, Severity::from_fatalities(e.fatalities));
                }
                tokio::task::yield_now().await;
            }
        })
    };

    writer.await.expect("writer panicked");
    reader.await.expect("reader panicked");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn deletes_interleaved_with_queries_do_not_panic() {
    let store = EventStore::new();
    let stored = store.bulk_insert((0..300).map(event).collect()).await;

    let deleter = {
        let store = store.clone();
        tokio::spawn(async move {
            for e in stored.iter().step_by(2) {
                assert!(store.delete(&e.id).await);
            }
        })
    };
    let reader = {
        let store = store.clone();
        tokio::spawn(async move {
            for _ in 0..30 {
                let result = store
                    .query(&FilterSpec::default().with_countries(["Nigeria"]))
                    .await;
                assert!(result.iter().all(|e| e.country == "Nigeria"));
            }
        })
    };

    deleter.await.expect("deleter panicked");
    reader.await.expect("reader panicked");
    assert_eq!(store.len().await, 150);
}

#[tokio::test]
async fn query_results_satisfy_every_predicate_and_limit() {
    let store = EventStore::new();
    store.bulk_insert((0..140).map(event).collect()).await;

    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 30, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2024, 1, 1, 2, 0, 0).unwrap();
    let filter = FilterSpec::default()
        .with_severities([Severity::High, Severity::Critical])
        .with_countries(["Nigeria"])
        .between(Some(start), Some(end))
        .with_limit(7);

    let result = store.query(&filter).await;
    assert!(result.len() <= 7);
    assert!(!result.is_empty());
    for e in &result {
        assert!(filter.matches(e));
    }
    for pair in result.windows(2) {
        assert!(pair[0].event_date >= pair[1].event_date);
    }
}
