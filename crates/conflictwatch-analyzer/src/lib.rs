//! Strategic analysis of conflict events.
//!
//! The monitoring loop only depends on the [`Analyzer`] trait. Two
//! implementations ship here: [`HttpAnalyzer`], which delegates to a remote
//! analysis service, and [`HeuristicAnalyzer`], a deterministic local fallback
//! used when no service is configured.

pub mod error;
pub mod heuristic;
pub mod http;
pub mod lexicon;
pub mod types;

use async_trait::async_trait;
use conflictwatch_core::ConflictEvent;

pub use error::AnalyzerError;
pub use heuristic::HeuristicAnalyzer;
pub use http::HttpAnalyzer;
pub use lexicon::escalation_score;
pub use types::{fallback_alert, AnalysisVerdict};

#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Produce a verdict over a batch of events.
    async fn analyze_batch(&self, events: &[ConflictEvent]) -> Result<AnalysisVerdict, AnalyzerError>;

    /// Produce a one-line alert for a single event.
    async fn analyze_one(&self, event: &ConflictEvent) -> Result<String, AnalyzerError>;

    /// Short label used in logs.
    fn name(&self) -> &'static str;
}
