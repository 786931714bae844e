use conflictwatch_core::{ConflictEvent, Severity};
use serde::{Deserialize, Serialize};

/// Confidence reported when the analyzer could not be reached.
pub const DEFAULT_CONFIDENCE: f64 = 0.3;

/// Structured verdict over a batch of events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisVerdict {
    pub severity: Severity,
    /// In `[0.0, 1.0]`.
    pub confidence: f64,
    #[serde(default)]
    pub key_insights: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub emerging_patterns: Vec<String>,
    /// In `1..=10`.
    pub risk_level: u8,
}

impl AnalysisVerdict {
    /// Safe verdict used whenever analysis fails or times out, so downstream
    /// messages stay well-formed.
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            severity: Severity::Medium,
            confidence: DEFAULT_CONFIDENCE,
            key_insights: vec!["Automated analysis unavailable; showing raw event data".to_string()],
            recommendations: vec!["Review incoming events manually".to_string()],
            emerging_patterns: Vec::new(),
            risk_level: 5,
        }
    }

    /// Clamp numeric fields into their documented ranges.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.confidence = if self.confidence.is_finite() {
            self.confidence.clamp(0.0, 1.0)
        } else {
            DEFAULT_CONFIDENCE
        };
        self.risk_level = self.risk_level.clamp(1, 10);
        self
    }
}

impl Default for AnalysisVerdict {
    fn default() -> Self {
        Self::fallback()
    }
}

/// Alert text used when single-event analysis fails.
#[must_use]
pub fn fallback_alert(event: &ConflictEvent) -> String {
    format!(
        "{} reported in {}: {} fatalities ({} severity)",
        event.event_type,
        event.formatted_location(),
        event.fatalities,
        event.severity
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_is_medium_with_low_confidence() {
        let verdict = AnalysisVerdict::fallback();
        assert_eq!(verdict.severity, Severity::Medium);
        assert!((verdict.confidence - 0.3).abs() < f64::EPSILON);
    }

    #[test]
    fn normalized_clamps_out_of_range_values() {
        let verdict = AnalysisVerdict {
            confidence: 3.5,
            risk_level: 0,
            ..AnalysisVerdict::fallback()
        }
        .normalized();
        assert!((verdict.confidence - 1.0).abs() < f64::EPSILON);
        assert_eq!(verdict.risk_level, 1);

        let verdict = AnalysisVerdict {
            confidence: f64::NAN,
            risk_level: 42,
            ..AnalysisVerdict::fallback()
        }
        .normalized();
        assert!((verdict.confidence - DEFAULT_CONFIDENCE).abs() < f64::EPSILON);
        assert_eq!(verdict.risk_level, 10);
    }
}
