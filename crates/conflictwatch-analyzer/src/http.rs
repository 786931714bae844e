//! Client for a remote analysis service.

use std::time::Duration;

use async_trait::async_trait;
use conflictwatch_core::ConflictEvent;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::AnalyzerError;
use crate::types::AnalysisVerdict;
use crate::Analyzer;

/// Remote analyzer speaking JSON over HTTP.
///
/// `POST {base}/v1/analyze/batch` with `{"events": [...]}` returns an
/// [`AnalysisVerdict`]; `POST {base}/v1/analyze/event` with `{"event": {...}}`
/// returns `{"alert": "..."}`.
#[derive(Debug, Clone)]
pub struct HttpAnalyzer {
    client: reqwest::Client,
    batch_url: String,
    event_url: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct BatchRequest<'a> {
    events: &'a [ConflictEvent],
}

#[derive(Serialize)]
struct EventRequest<'a> {
    event: &'a ConflictEvent,
}

#[derive(Deserialize)]
struct AlertResponse {
    alert: String,
}

impl HttpAnalyzer {
    /// Build a client whose every request is bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzerError::Http`] if the HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, AnalyzerError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let base = base_url.trim_end_matches('/');
        Ok(Self {
            client,
            batch_url: format!("{base}/v1/analyze/batch"),
            event_url: format!("{base}/v1/analyze/event"),
            api_key,
        })
    }

    async fn post_json<B: Serialize + Sync, R: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<R, AnalyzerError> {
        let mut request = self.client.post(url).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        tracing::debug!(url, "analyzer: sending request");
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(url, status = status.as_u16(), "analyzer: service returned error status");
            return Err(AnalyzerError::Status(status.as_u16()));
        }

        response
            .json::<R>()
            .await
            .map_err(|e| AnalyzerError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl Analyzer for HttpAnalyzer {
    async fn analyze_batch(&self, events: &[ConflictEvent]) -> Result<AnalysisVerdict, AnalyzerError> {
        if events.is_empty() {
            return Err(AnalyzerError::EmptyBatch);
        }
        let verdict: AnalysisVerdict = self
            .post_json(&self.batch_url, &BatchRequest { events })
            .await?;
        Ok(verdict.normalized())
    }

    async fn analyze_one(&self, event: &ConflictEvent) -> Result<String, AnalyzerError> {
        let response: AlertResponse = self
            .post_json(&self.event_url, &EventRequest { event })
            .await?;
        let alert = response.alert.trim();
        if alert.is_empty() {
            return Err(AnalyzerError::InvalidResponse(
                "empty alert text".to_string(),
            ));
        }
        Ok(alert.to_string())
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use conflictwatch_core::{NewConflictEvent, Severity};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn event() -> ConflictEvent {
        NewConflictEvent::new(Utc::now(), "Haiti", "Port-au-Prince", "Violence against civilians", 11)
            .into_event("evt-1".to_string(), Utc::now())
    }

    fn analyzer(server: &MockServer) -> HttpAnalyzer {
        HttpAnalyzer::new(&server.uri(), Some("k3y".to_string()), Duration::from_secs(2))
            .expect("client")
    }

    #[tokio::test]
    async fn analyze_batch_parses_and_normalizes_verdict() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/analyze/batch"))
            .and(header("authorization", "Bearer k3y"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "severity": "high",
                "confidence": 1.7,
                "key_insights": ["Gang violence concentrated in the capital"],
                "recommendations": [],
                "emerging_patterns": [],
                "risk_level": 7
            })))
            .expect(1)
            .mount(&server)
            .await;

        let verdict = analyzer(&server).analyze_batch(&[event()]).await.unwrap();
        assert_eq!(verdict.severity, Severity::High);
        assert!((verdict.confidence - 1.0).abs() < f64::EPSILON);
        assert_eq!(verdict.risk_level, 7);
        assert_eq!(verdict.key_insights.len(), 1);
    }

    #[tokio::test]
    async fn analyze_batch_maps_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/analyze/batch"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let result = analyzer(&server).analyze_batch(&[event()]).await;
        assert!(matches!(result, Err(AnalyzerError::Status(503))));
    }

    #[tokio::test]
    async fn analyze_batch_rejects_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/analyze/batch"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let result = analyzer(&server).analyze_batch(&[event()]).await;
        assert!(matches!(result, Err(AnalyzerError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn analyze_batch_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/analyze/batch"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let analyzer = HttpAnalyzer::new(&server.uri(), None, Duration::from_millis(100))
            .expect("client");
        let result = analyzer.analyze_batch(&[event()]).await;
        assert!(matches!(result, Err(AnalyzerError::Http(ref e)) if e.is_timeout()));
    }

    #[tokio::test]
    async fn analyze_one_returns_trimmed_alert() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/analyze/event"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"alert": "  Armed group attack in Port-au-Prince \n"})),
            )
            .mount(&server)
            .await;

        let alert = analyzer(&server).analyze_one(&event()).await.unwrap();
        assert_eq!(alert, "Armed group attack in Port-au-Prince");
    }

    #[tokio::test]
    async fn analyze_one_rejects_blank_alert() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/analyze/event"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"alert": " "})))
            .mount(&server)
            .await;

        let result = analyzer(&server).analyze_one(&event()).await;
        assert!(matches!(result, Err(AnalyzerError::InvalidResponse(_))));
    }
}
