//! Messages pushed to live subscribers.
//!
//! Serialized as `{"type": ..., "data": ..., "timestamp": ...}` where
//! `timestamp` is when the message was built, not when the event happened.

use chrono::{DateTime, Utc};
use conflictwatch_analyzer::AnalysisVerdict;
use conflictwatch_core::{ConflictEvent, Severity};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct BroadcastMessage {
    #[serde(flatten)]
    pub payload: MessagePayload,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum MessagePayload {
    ConflictAlert(ConflictAlert),
    AnalysisUpdate(AnalysisUpdate),
    Heartbeat(Heartbeat),
}

#[derive(Debug, Clone, Serialize)]
pub struct ConflictAlert {
    pub event: ConflictEvent,
    pub alert: String,
    pub severity: Severity,
    pub location: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisUpdate {
    pub analysis: AnalysisVerdict,
    pub event_count: usize,
    /// Distinct non-empty regions in the analyzed batch, first-seen order.
    pub regions: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Heartbeat {
    pub subscribers: usize,
    pub status: CycleStatus,
}

/// Scheduler status carried by heartbeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleStatus {
    /// Sent to a new subscriber on connect, before any cycle reports.
    Connected,
    /// Cycle found no high or critical events in the window.
    Quiet,
    /// Cycle analyzed matching events without analyzer failures.
    Active,
    /// Cycle completed but fell back to defaults for at least one call.
    Degraded,
    /// Cycle body hit the tick-interval bound and was cut short.
    TimedOut,
}

impl BroadcastMessage {
    fn now(payload: MessagePayload) -> Self {
        Self {
            payload,
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn conflict_alert(event: ConflictEvent, alert: String) -> Self {
        let severity = event.severity;
        let location = event.formatted_location();
        Self::now(MessagePayload::ConflictAlert(ConflictAlert {
            event,
            alert,
            severity,
            location,
        }))
    }

    #[must_use]
    pub fn analysis_update(analysis: AnalysisVerdict, event_count: usize, regions: Vec<String>) -> Self {
        Self::now(MessagePayload::AnalysisUpdate(AnalysisUpdate {
            analysis,
            event_count,
            regions,
        }))
    }

    #[must_use]
    pub fn heartbeat(subscribers: usize, status: CycleStatus) -> Self {
        Self::now(MessagePayload::Heartbeat(Heartbeat {
            subscribers,
            status,
        }))
    }

    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self.payload {
            MessagePayload::ConflictAlert(_) => "conflict_alert",
            MessagePayload::AnalysisUpdate(_) => "analysis_update",
            MessagePayload::Heartbeat(_) => "heartbeat",
        }
    }
}

#[cfg(test)]
mod tests {
    use conflictwatch_core::NewConflictEvent;

    use super::*;

    #[test]
    fn heartbeat_envelope_shape() {
        let msg = BroadcastMessage::heartbeat(3, CycleStatus::Quiet);
        let json = serde_json::to_value(&msg).expect("serialize");
        assert_eq!(json["type"], "heartbeat");
        assert_eq!(json["data"]["subscribers"], 3);
        assert_eq!(json["data"]["status"], "quiet");
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn conflict_alert_carries_event_and_location() {
        let mut new = NewConflictEvent::new(Utc::now(), "Syria", "Idlib", "Battles", 51);
        new.region = Some("Middle East".to_string());
        let event = new.into_event("evt-9".to_string(), Utc::now());
        let msg = BroadcastMessage::conflict_alert(event, "Heavy fighting".to_string());
        assert_eq!(msg.kind(), "conflict_alert");

        let json = serde_json::to_value(&msg).expect("serialize");
        assert_eq!(json["type"], "conflict_alert");
        assert_eq!(json["data"]["severity"], "critical");
        assert_eq!(json["data"]["location"], "Idlib, Middle East, Syria");
        assert_eq!(json["data"]["event"]["id"], "evt-9");
        assert_eq!(json["data"]["alert"], "Heavy fighting");
    }

    #[test]
    fn analysis_update_carries_verdict() {
        let msg = BroadcastMessage::analysis_update(
            AnalysisVerdict::fallback(),
            4,
            vec!["Sahel".to_string()],
        );
        let json = serde_json::to_value(&msg).expect("serialize");
        assert_eq!(json["type"], "analysis_update");
        assert_eq!(json["data"]["analysis"]["severity"], "medium");
        assert_eq!(json["data"]["event_count"], 4);
        assert_eq!(json["data"]["regions"][0], "Sahel");
    }
}
