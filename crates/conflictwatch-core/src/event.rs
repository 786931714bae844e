use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::CoreError;

/// Fatality thresholds for severity derivation, checked from the top down.
const CRITICAL_FATALITIES: u32 = 50;
const HIGH_FATALITIES: u32 = 10;
const MEDIUM_FATALITIES: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ];

    /// Derive severity from a fatality count.
    ///
    /// `>= 50` is critical, `>= 10` high, `>= 1` medium, otherwise low.
    #[must_use]
    pub fn from_fatalities(fatalities: u32) -> Self {
        if fatalities >= CRITICAL_FATALITIES {
            Severity::Critical
        } else if fatalities >= HIGH_FATALITIES {
            Severity::High
        } else if fatalities >= MEDIUM_FATALITIES {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            other => Err(CoreError::InvalidSeverity(other.to_string())),
        }
    }
}

/// A stored conflict incident.
///
/// Records are only changed through [`EventPatch`], which re-stamps
/// `last_updated`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictEvent {
    pub id: String,
    /// When the incident occurred, not when it was ingested.
    pub event_date: DateTime<Utc>,
    pub country: String,
    pub region: Option<String>,
    pub location: String,
    pub latitude: Decimal,
    pub longitude: Decimal,
    pub event_type: String,
    pub sub_event_type: Option<String>,
    pub actor1: Option<String>,
    pub actor2: Option<String>,
    pub fatalities: u32,
    pub notes: Option<String>,
    pub source: Option<String>,
    pub source_scale: Option<String>,
    pub severity: Severity,
    pub last_updated: DateTime<Utc>,
}

impl ConflictEvent {
    /// Human-readable location: `location, region, country`, skipping blanks.
    #[must_use]
    pub fn formatted_location(&self) -> String {
        [
            Some(self.location.as_str()),
            self.region.as_deref(),
            Some(self.country.as_str()),
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
    }

    #[must_use]
    pub fn natural_key(&self) -> NaturalKey {
        NaturalKey {
            event_date: self.event_date,
            location: self.location.clone(),
            actor1: self.actor1.clone(),
            actor2: self.actor2.clone(),
        }
    }
}

/// Identifying fields used to recognise the same incident across refreshes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NaturalKey {
    pub event_date: DateTime<Utc>,
    pub location: String,
    pub actor1: Option<String>,
    pub actor2: Option<String>,
}

/// An already-normalized record handed to the store for ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewConflictEvent {
    #[serde(default)]
    pub id: Option<String>,
    pub event_date: DateTime<Utc>,
    pub country: String,
    #[serde(default)]
    pub region: Option<String>,
    pub location: String,
    pub latitude: Decimal,
    pub longitude: Decimal,
    pub event_type: String,
    #[serde(default)]
    pub sub_event_type: Option<String>,
    #[serde(default)]
    pub actor1: Option<String>,
    #[serde(default)]
    pub actor2: Option<String>,
    #[serde(default)]
    pub fatalities: u32,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub source_scale: Option<String>,
}

impl NewConflictEvent {
    /// Minimal record with the required fields; everything optional is unset.
    #[must_use]
    pub fn new(
        event_date: DateTime<Utc>,
        country: impl Into<String>,
        location: impl Into<String>,
        event_type: impl Into<String>,
        fatalities: u32,
    ) -> Self {
        Self {
            id: None,
            event_date,
            country: country.into(),
            region: None,
            location: location.into(),
            latitude: Decimal::ZERO,
            longitude: Decimal::ZERO,
            event_type: event_type.into(),
            sub_event_type: None,
            actor1: None,
            actor2: None,
            fatalities,
            notes: None,
            source: None,
            source_scale: None,
        }
    }

    /// Reject records missing required text fields.
    ///
    /// Coordinates are not range-checked here.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] naming the first offending field.
    pub fn validate(&self) -> Result<(), CoreError> {
        if let Some(id) = &self.id {
            if id.trim().is_empty() {
                return Err(CoreError::Validation("id must not be blank".to_string()));
            }
        }
        for (field, value) in [
            ("country", &self.country),
            ("location", &self.location),
            ("event_type", &self.event_type),
        ] {
            if value.trim().is_empty() {
                return Err(CoreError::Validation(format!("{field} is required")));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn natural_key(&self) -> NaturalKey {
        NaturalKey {
            event_date: self.event_date,
            location: self.location.clone(),
            actor1: self.actor1.clone(),
            actor2: self.actor2.clone(),
        }
    }

    /// Materialize the stored form with the given id and update stamp.
    ///
    /// Severity always comes from `fatalities`.
    #[must_use]
    pub fn into_event(self, id: String, stamped_at: DateTime<Utc>) -> ConflictEvent {
        let severity = Severity::from_fatalities(self.fatalities);
        ConflictEvent {
            id,
            event_date: self.event_date,
            country: self.country,
            region: self.region,
            location: self.location,
            latitude: self.latitude,
            longitude: self.longitude,
            event_type: self.event_type,
            sub_event_type: self.sub_event_type,
            actor1: self.actor1,
            actor2: self.actor2,
            fatalities: self.fatalities,
            notes: self.notes,
            source: self.source,
            source_scale: self.source_scale,
            severity,
            last_updated: stamped_at,
        }
    }
}

// Option<Option<T>>: outer None = leave unchanged, Some(None) = clear,
// Some(Some(v)) = set.
#[allow(clippy::option_option)]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventPatch {
    pub event_date: Option<DateTime<Utc>>,
    pub country: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub region: Option<Option<String>>,
    pub location: Option<String>,
    pub latitude: Option<Decimal>,
    pub longitude: Option<Decimal>,
    pub event_type: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub sub_event_type: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub actor1: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub actor2: Option<Option<String>>,
    pub fatalities: Option<u32>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub source: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub source_scale: Option<Option<String>>,
}

impl EventPatch {
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] if a required field would be blanked.
    pub fn validate(&self) -> Result<(), CoreError> {
        for (field, value) in [
            ("country", &self.country),
            ("location", &self.location),
            ("event_type", &self.event_type),
        ] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                return Err(CoreError::Validation(format!("{field} must not be blank")));
            }
        }
        Ok(())
    }

    /// Merge the patch into `event` and stamp `last_updated`.
    ///
    /// Changing `fatalities` re-derives the severity.
    pub fn apply(self, event: &mut ConflictEvent, stamped_at: DateTime<Utc>) {
        if let Some(v) = self.event_date {
            event.event_date = v;
        }
        if let Some(v) = self.country {
            event.country = v;
        }
        if let Some(v) = self.region {
            event.region = v;
        }
        if let Some(v) = self.location {
            event.location = v;
        }
        if let Some(v) = self.latitude {
            event.latitude = v;
        }
        if let Some(v) = self.longitude {
            event.longitude = v;
        }
        if let Some(v) = self.event_type {
            event.event_type = v;
        }
        if let Some(v) = self.sub_event_type {
            event.sub_event_type = v;
        }
        if let Some(v) = self.actor1 {
            event.actor1 = v;
        }
        if let Some(v) = self.actor2 {
            event.actor2 = v;
        }
        if let Some(v) = self.notes {
            event.notes = v;
        }
        if let Some(v) = self.source {
            event.source = v;
        }
        if let Some(v) = self.source_scale {
            event.source_scale = v;
        }
        if let Some(f) = self.fatalities {
            event.fatalities = f;
            event.severity = Severity::from_fatalities(f);
        }
        event.last_updated = stamped_at;
    }
}

/// Distinguish an explicit `null` (clear) from an absent field (keep).
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Copy a stored event back into ingestion form, keeping its id.
impl From<ConflictEvent> for NewConflictEvent {
    fn from(event: ConflictEvent) -> Self {
        Self {
            id: Some(event.id),
            event_date: event.event_date,
            country: event.country,
            region: event.region,
            location: event.location,
            latitude: event.latitude,
            longitude: event.longitude,
            event_type: event.event_type,
            sub_event_type: event.sub_event_type,
            actor1: event.actor1,
            actor2: event.actor2,
            fatalities: event.fatalities,
            notes: event.notes,
            source: event.source,
            source_scale: event.source_scale,
        }
    }
}
