//! Command handlers. Each returns the JSON it would print so tests can
//! inspect it directly.

use std::path::Path;

use anyhow::Context;
use chrono::Utc;
use conflictwatch_core::{
    compute_stats, load_seed_file, rank_hotspots, FilterSpec, SeedFile, Severity,
};
use conflictwatch_store::EventStore;
use serde_json::json;

fn csv(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(ToOwned::to_owned)
            .collect()
    })
    .unwrap_or_default()
}

/// Load a seed file into a fresh store, deduplicating on the natural key.
///
/// # Errors
///
/// Returns an error if the seed file cannot be read, parsed, or validated.
pub(crate) async fn load_store(path: &Path) -> anyhow::Result<EventStore> {
    let seed = load_seed_file(path).with_context(|| format!("loading {}", path.display()))?;
    Ok(store_from_seed(seed).await)
}

pub(crate) async fn store_from_seed(seed: SeedFile) -> EventStore {
    let store = EventStore::new();
    let summary = store.bulk_upsert(seed.events).await;
    if summary.updated > 0 {
        tracing::warn!(
            duplicates = summary.updated,
            "seed contains records sharing a natural key; later ones win"
        );
    }
    store
}

/// # Errors
///
/// Returns an error if the seed file is unreadable or invalid.
pub(crate) fn run_validate(path: &Path) -> anyhow::Result<String> {
    let seed = load_seed_file(path).with_context(|| format!("validating {}", path.display()))?;
    let critical = seed
        .events
        .iter()
        .filter(|e| Severity::from_fatalities(e.fatalities) == Severity::Critical)
        .count();
    Ok(serde_json::to_string_pretty(&json!({
        "valid": true,
        "events": seed.events.len(),
        "critical": critical,
    }))?)
}

/// # Errors
///
/// Returns an error if the output cannot be serialized.
pub(crate) async fn run_stats(store: &EventStore, country: Option<&str>) -> anyhow::Result<String> {
    let filter = FilterSpec::default()
        .with_countries(csv(country))
        .with_limit(usize::MAX);
    let events = store.query(&filter).await;
    Ok(serde_json::to_string_pretty(&compute_stats(&events, Utc::now()))?)
}

/// # Errors
///
/// Returns an error if the output cannot be serialized.
pub(crate) async fn run_hotspots(store: &EventStore, limit: usize) -> anyhow::Result<String> {
    let events = store.snapshot().await;
    Ok(serde_json::to_string_pretty(&rank_hotspots(&events, limit.max(1)))?)
}

/// # Errors
///
/// Returns an error if a severity is unknown, the filter is invalid, or the
/// output cannot be serialized.
pub(crate) async fn run_query(
    store: &EventStore,
    severity: Option<&str>,
    country: Option<&str>,
    limit: usize,
) -> anyhow::Result<String> {
    let severities = csv(severity)
        .iter()
        .map(|s| s.parse::<Severity>())
        .collect::<Result<Vec<_>, _>>()?;
    let filter = FilterSpec::default()
        .with_severities(severities)
        .with_countries(csv(country))
        .with_limit(limit);
    filter.validate()?;
    Ok(serde_json::to_string_pretty(&store.query(&filter).await)?)
}
