//! Stats and hotspot ranking over an already-materialized slice of events.
//!
//! Both functions are pure: callers hand in a snapshot (usually a store
//! query result) and get a freshly computed value back. Nothing is cached.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::event::{ConflictEvent, Severity};

/// Hotspot count returned when the caller does not ask for one.
pub const DEFAULT_HOTSPOT_LIMIT: usize = 10;

/// Window used for `recent_events`.
const RECENT_WINDOW_HOURS: i64 = 24;

/// Per-severity tallies. All four keys are always present when serialized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
    pub critical: usize,
}

impl SeverityCounts {
    pub fn increment(&mut self, severity: Severity) {
        match severity {
            Severity::Low => self.low += 1,
            Severity::Medium => self.medium += 1,
            Severity::High => self.high += 1,
            Severity::Critical => self.critical += 1,
        }
    }

    #[must_use]
    pub fn get(&self, severity: Severity) -> usize {
        match severity {
            Severity::Low => self.low,
            Severity::Medium => self.medium,
            Severity::High => self.high,
            Severity::Critical => self.critical,
        }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.low + self.medium + self.high + self.critical
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub total_events: usize,
    pub total_fatalities: u64,
    pub affected_countries: usize,
    /// Events dated within the 24 hours up to and including `as_of`.
    pub recent_events: usize,
    pub severity_counts: SeverityCounts,
    pub event_type_counts: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hotspot {
    pub country: String,
    /// Region of the first event seen for this country.
    pub region: Option<String>,
    pub event_count: usize,
    /// Highest severity observed for the country.
    pub severity: Severity,
}

/// Summarize `events` as of the given instant.
#[must_use]
pub fn compute_stats(events: &[ConflictEvent], as_of: DateTime<Utc>) -> StatsSnapshot {
    let recent_cutoff = as_of - Duration::hours(RECENT_WINDOW_HOURS);

    let mut countries: HashSet<&str> = HashSet::new();
    let mut severity_counts = SeverityCounts::default();
    let mut event_type_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut total_fatalities: u64 = 0;
    let mut recent_events = 0;

    for event in events {
        countries.insert(event.country.as_str());
        severity_counts.increment(event.severity);
        *event_type_counts
            .entry(event.event_type.clone())
            .or_default() += 1;
        total_fatalities += u64::from(event.fatalities);
        if event.event_date >= recent_cutoff && event.event_date <= as_of {
            recent_events += 1;
        }
    }

    StatsSnapshot {
        total_events: events.len(),
        total_fatalities,
        affected_countries: countries.len(),
        recent_events,
        severity_counts,
        event_type_counts,
    }
}

/// Rank countries by event count, most active first.
///
/// Ties keep first-encounter order, so repeated calls over the same
/// snapshot return identical output.
#[must_use]
pub fn rank_hotspots(events: &[ConflictEvent], limit: usize) -> Vec<Hotspot> {
    let mut hotspots: Vec<Hotspot> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for event in events {
        if let Some(&i) = index.get(event.country.as_str()) {
            let hotspot = &mut hotspots[i];
            hotspot.event_count += 1;
            hotspot.severity = hotspot.severity.max(event.severity);
        } else {
            index.insert(event.country.as_str(), hotspots.len());
            hotspots.push(Hotspot {
                country: event.country.clone(),
                region: event.region.clone(),
                event_count: 1,
                severity: event.severity,
            });
        }
    }

    // sort_by is stable: equal counts stay in first-encounter order.
    hotspots.sort_by(|a, b| b.event_count.cmp(&a.event_count));
    hotspots.truncate(limit);
    hotspots
}

#[cfg(test)]
#[path = "aggregate_test.rs"]
mod tests;
