use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::{ConflictEvent, Severity};
use crate::CoreError;

/// Result cap applied when a query does not set one.
pub const DEFAULT_QUERY_LIMIT: usize = 1000;

/// Conjunctive query descriptor over conflict events.
///
/// Every field is optional. An empty set means "no constraint" for that
/// dimension rather than "match nothing".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    #[serde(default)]
    pub severities: Vec<Severity>,
    #[serde(default)]
    pub event_types: Vec<String>,
    #[serde(default)]
    pub countries: Vec<String>,
    pub region: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl FilterSpec {
    #[must_use]
    pub fn with_severities(mut self, severities: impl IntoIterator<Item = Severity>) -> Self {
        self.severities = severities.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_event_types<S: Into<String>>(mut self, types: impl IntoIterator<Item = S>) -> Self {
        self.event_types = types.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_countries<S: Into<String>>(
        mut self,
        countries: impl IntoIterator<Item = S>,
    ) -> Self {
        self.countries = countries.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    #[must_use]
    pub fn between(mut self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        self.start_date = start;
        self.end_date = end;
        self
    }

    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn effective_limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_QUERY_LIMIT)
    }

    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] for an inverted date range or a zero
    /// limit.
    pub fn validate(&self) -> Result<(), CoreError> {
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(CoreError::Validation(format!(
                    "start_date {start} is after end_date {end}"
                )));
            }
        }
        if self.limit == Some(0) {
            return Err(CoreError::Validation(
                "limit must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// True when `event` satisfies every supplied predicate.
    #[must_use]
    pub fn matches(&self, event: &ConflictEvent) -> bool {
        if !self.severities.is_empty() && !self.severities.contains(&event.severity) {
            return false;
        }
        if !self.event_types.is_empty() && !self.event_types.iter().any(|t| *t == event.event_type)
        {
            return false;
        }
        if !self.countries.is_empty() && !self.countries.iter().any(|c| *c == event.country) {
            return false;
        }
        if let Some(region) = &self.region {
            if event.region.as_deref() != Some(region.as_str()) {
                return false;
            }
        }
        if self.start_date.is_some_and(|start| event.event_date < start) {
            return false;
        }
        if self.end_date.is_some_and(|end| event.event_date > end) {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::event::NewConflictEvent;

    fn event(country: &str, event_type: &str, fatalities: u32, day: u32) -> ConflictEvent {
        let mut new = NewConflictEvent::new(
            Utc.with_ymd_and_hms(2024, 5, day, 0, 0, 0).unwrap(),
            country,
            "Somewhere",
            event_type,
            fatalities,
        );
        new.region = Some("Eastern Africa".to_string());
        new.into_event(format!("{country}-{day}"), Utc::now())
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(FilterSpec::default().matches(&event("Kenya", "Riots", 0, 1)));
    }

    #[test]
    fn severity_set_is_membership() {
        let filter = FilterSpec::default().with_severities([Severity::High, Severity::Critical]);
        assert!(filter.matches(&event("Kenya", "Riots", 12, 1)));
        assert!(!filter.matches(&event("Kenya", "Riots", 2, 1)));
    }

    #[test]
    fn predicates_combine_with_and() {
        let filter = FilterSpec::default()
            .with_countries(["Kenya"])
            .with_event_types(["Battles"]);
        assert!(filter.matches(&event("Kenya", "Battles", 0, 1)));
        assert!(!filter.matches(&event("Kenya", "Riots", 0, 1)));
        assert!(!filter.matches(&event("Somalia", "Battles", 0, 1)));
    }

    #[test]
    fn region_must_match_exactly() {
        let filter = FilterSpec::default().with_region("Eastern Africa");
        assert!(filter.matches(&event("Kenya", "Riots", 0, 1)));
        let filter = FilterSpec::default().with_region("Western Africa");
        assert!(!filter.matches(&event("Kenya", "Riots", 0, 1)));
    }

    #[test]
    fn date_bounds_are_inclusive() {
        let e = event("Kenya", "Riots", 0, 10);
        let filter = FilterSpec::default().between(Some(e.event_date), Some(e.event_date));
        assert!(filter.matches(&e));
        let filter = FilterSpec::default().between(Some(e.event_date + Duration::seconds(1)), None);
        assert!(!filter.matches(&e));
        let filter = FilterSpec::default().between(None, Some(e.event_date - Duration::seconds(1)));
        assert!(!filter.matches(&e));
    }

    #[test]
    fn validate_rejects_inverted_range_and_zero_limit() {
        let now = Utc::now();
        let filter = FilterSpec::default().between(Some(now), Some(now - Duration::hours(1)));
        assert!(filter.validate().is_err());
        assert!(FilterSpec::default().with_limit(0).validate().is_err());
        assert!(FilterSpec::default().with_limit(5).validate().is_ok());
    }

    #[test]
    fn default_limit_is_one_thousand() {
        assert_eq!(FilterSpec::default().effective_limit(), 1000);
    }
}
