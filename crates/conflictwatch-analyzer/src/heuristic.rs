//! Deterministic local analyzer.
//!
//! Builds a verdict from the batch itself: severity mix, fatality totals,
//! geographic concentration and escalation language in the notes. Used when
//! no remote analysis service is configured.

use std::collections::BTreeMap;

use async_trait::async_trait;
use conflictwatch_core::{rank_hotspots, ConflictEvent, Severity};

use crate::error::AnalyzerError;
use crate::lexicon::escalation_score;
use crate::types::AnalysisVerdict;
use crate::Analyzer;

/// Notes scoring above this are treated as escalatory.
const ESCALATION_THRESHOLD: f32 = 0.3;

/// Fatality total that bumps the risk level by one.
const HEAVY_TOLL: u64 = 100;

#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicAnalyzer;

impl HeuristicAnalyzer {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn base_risk(severity: Severity) -> u8 {
    match severity {
        Severity::Low => 2,
        Severity::Medium => 4,
        Severity::High => 6,
        Severity::Critical => 8,
    }
}

fn notes_score(event: &ConflictEvent) -> f32 {
    event.notes.as_deref().map_or(0.0, escalation_score)
}

#[async_trait]
impl Analyzer for HeuristicAnalyzer {
    async fn analyze_batch(&self, events: &[ConflictEvent]) -> Result<AnalysisVerdict, AnalyzerError> {
        let Some(severity) = events.iter().map(|e| e.severity).max() else {
            return Err(AnalyzerError::EmptyBatch);
        };

        let total_fatalities: u64 = events.iter().map(|e| u64::from(e.fatalities)).sum();
        let hotspots = rank_hotspots(events, 3);

        let mut by_type: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
        for event in events {
            let slot = by_type.entry(event.event_type.as_str()).or_default();
            slot.0 += 1;
            if notes_score(event) > ESCALATION_THRESHOLD {
                slot.1 += 1;
            }
        }
        let escalatory: usize = by_type.values().map(|(_, esc)| esc).sum();

        let mut key_insights = vec![format!(
            "{} events across {} countries with {} reported fatalities",
            events.len(),
            rank_hotspots(events, usize::MAX).len(),
            total_fatalities
        )];
        key_insights.extend(
            hotspots
                .iter()
                .map(|h| format!("{}: {} events, peak severity {}", h.country, h.event_count, h.severity)),
        );

        let mut emerging_patterns: Vec<String> = by_type
            .iter()
            .filter(|(_, (_, esc))| *esc > 0)
            .map(|(event_type, (_, esc))| {
                format!("Escalatory language in {esc} {event_type} report(s)")
            })
            .collect();
        emerging_patterns.extend(
            hotspots
                .iter()
                .filter(|h| {
                    events
                        .iter()
                        .filter(|e| e.country == h.country && e.severity == Severity::Critical)
                        .count()
                        >= 2
                })
                .map(|h| format!("Repeated critical incidents in {}", h.country)),
        );

        let mut recommendations = Vec::new();
        if let Some(top) = hotspots.first() {
            if severity >= Severity::High {
                recommendations.push(format!("Prioritize monitoring of {}", top.country));
            }
        }
        if severity == Severity::Critical {
            recommendations.push("Verify casualty figures against secondary sources".to_string());
        }
        if recommendations.is_empty() {
            recommendations.push("Continue routine monitoring".to_string());
        }

        let mut risk_level = base_risk(severity);
        if total_fatalities >= HEAVY_TOLL {
            risk_level += 1;
        }
        if escalatory * 2 > events.len() {
            risk_level += 1;
        }

        // More corroborating events means a more confident verdict, capped at 0.9.
        #[allow(clippy::cast_precision_loss)]
        let confidence = 0.4 + 0.05 * events.len().min(10) as f64;

        Ok(AnalysisVerdict {
            severity,
            confidence,
            key_insights,
            recommendations,
            emerging_patterns,
            risk_level,
        }
        .normalized())
    }

    async fn analyze_one(&self, event: &ConflictEvent) -> Result<String, AnalyzerError> {
        let mut alert = format!(
            "{} ALERT: {} in {} with {} fatalities",
            event.severity.as_str().to_uppercase(),
            event.event_type,
            event.formatted_location(),
            event.fatalities
        );
        match (event.actor1.as_deref(), event.actor2.as_deref()) {
            (Some(a), Some(b)) => alert.push_str(&format!(". Actors: {a} vs {b}")),
            (Some(a), None) | (None, Some(a)) => alert.push_str(&format!(". Actor: {a}")),
            (None, None) => {}
        }
        if notes_score(event) > ESCALATION_THRESHOLD {
            alert.push_str(". Reports indicate escalation");
        }
        Ok(alert)
    }

    fn name(&self) -> &'static str {
        "heuristic"
    }
}
