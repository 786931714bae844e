//! The recurring monitoring cycle.
//!
//! Each tick looks at the last 24 hours of high and critical events, asks the
//! analyzer about them and pushes the results to the hub. Ticks never
//! overlap: a tick that fires while a cycle is still running is skipped.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use conflictwatch_analyzer::{fallback_alert, AnalysisVerdict, Analyzer, AnalyzerError};
use conflictwatch_core::{ConflictEvent, FilterSpec, Severity};
use conflictwatch_store::EventStore;

use crate::hub::BroadcastHub;
use crate::messages::{BroadcastMessage, CycleStatus};

/// Look-back window queried on every cycle.
const WINDOW_HOURS: i64 = 24;
/// Cap on events handed to the analyzer per cycle.
const WINDOW_LIMIT: usize = 50;
/// Cap on `conflict_alert` messages per cycle.
const MAX_ALERTS_PER_CYCLE: usize = 3;

#[derive(Debug, Clone, Copy)]
pub struct MonitorSettings {
    /// Tick interval; also bounds the analysis part of a cycle.
    pub interval: Duration,
    /// Bound on each individual analyzer call.
    pub analyzer_timeout: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Idle,
    Running,
    Stopped,
}

/// Summary of one completed cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub cycle: u64,
    pub matched: usize,
    pub alerts: usize,
    pub status: CycleStatus,
}

/// Counts recorded as a cycle publishes, readable even when the cycle is
/// cut short.
#[derive(Debug, Default)]
struct WindowProgress {
    matched: AtomicUsize,
    alerts: AtomicUsize,
    degraded: AtomicBool,
}

pub struct Monitor {
    store: EventStore,
    hub: Arc<BroadcastHub>,
    analyzer: Arc<dyn Analyzer>,
    settings: MonitorSettings,
    state: Mutex<MonitorState>,
    cycles: AtomicU64,
}

/// Returns the monitor to `Idle` when a cycle ends, even by panic.
struct RunGuard<'a>(&'a Mutex<MonitorState>);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        if *state == MonitorState::Running {
            *state = MonitorState::Idle;
        }
    }
}

impl Monitor {
    #[must_use]
    pub fn new(
        store: EventStore,
        hub: Arc<BroadcastHub>,
        analyzer: Arc<dyn Analyzer>,
        settings: MonitorSettings,
    ) -> Self {
        Self {
            store,
            hub,
            analyzer,
            settings,
            state: Mutex::new(MonitorState::Idle),
            cycles: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn state(&self) -> MonitorState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of cycles started so far.
    #[must_use]
    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.settings.interval
    }

    /// Prevent any further cycle from starting.
    ///
    /// A cycle already in flight runs to completion; once this returns no new
    /// one can begin.
    pub fn stop(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *state != MonitorState::Stopped {
            *state = MonitorState::Stopped;
            tracing::info!("scheduler: monitor stopped");
        }
    }

    fn try_begin(&self) -> Option<RunGuard<'_>> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match *state {
            MonitorState::Idle => {
                *state = MonitorState::Running;
                Some(RunGuard(&self.state))
            }
            MonitorState::Running => {
                tracing::debug!("scheduler: previous cycle still running; skipping tick");
                None
            }
            MonitorState::Stopped => None,
        }
    }

    /// Run one cycle unless another is in flight or the monitor is stopped.
    pub async fn tick(&self) -> Option<CycleReport> {
        let _guard = self.try_begin()?;
        Some(self.run_cycle().await)
    }

    async fn run_cycle(&self) -> CycleReport {
        let cycle = self.cycles.fetch_add(1, Ordering::Relaxed) + 1;

        let progress = WindowProgress::default();
        let finished =
            tokio::time::timeout(self.settings.interval, self.analyze_window(&progress))
                .await
                .is_ok();
        let matched = progress.matched.load(Ordering::Relaxed);
        let alerts = progress.alerts.load(Ordering::Relaxed);

        let status = match (finished, matched) {
            (false, _) => {
                tracing::warn!(
                    cycle,
                    interval_secs = self.settings.interval.as_secs(),
                    "scheduler: cycle exceeded tick interval; cut short"
                );
                CycleStatus::TimedOut
            }
            (true, 0) => CycleStatus::Quiet,
            _ if progress.degraded.load(Ordering::Relaxed) => CycleStatus::Degraded,
            _ => CycleStatus::Active,
        };

        let delivery = self.hub.publish(&BroadcastMessage::heartbeat(
            self.hub.subscriber_count(),
            status,
        ));

        tracing::info!(
            cycle,
            matched,
            alerts,
            ?status,
            subscribers = delivery.delivered,
            dropped = delivery.dropped,
            "scheduler: monitor cycle complete"
        );
        CycleReport {
            cycle,
            matched,
            alerts,
            status,
        }
    }

    async fn analyze_window(&self, progress: &WindowProgress) {
        let now = Utc::now();
        let filter = FilterSpec::default()
            .with_severities([Severity::High, Severity::Critical])
            .between(Some(now - chrono::Duration::hours(WINDOW_HOURS)), Some(now))
            .with_limit(WINDOW_LIMIT);
        let events = self.store.query(&filter).await;

        progress.matched.store(events.len(), Ordering::Relaxed);
        if events.is_empty() {
            return;
        }

        let verdict = match self
            .bounded("analyze_batch", self.analyzer.analyze_batch(&events))
            .await
        {
            Some(verdict) => verdict,
            None => {
                progress.degraded.store(true, Ordering::Relaxed);
                AnalysisVerdict::fallback()
            }
        };
        self.hub.publish(&BroadcastMessage::analysis_update(
            verdict,
            events.len(),
            distinct_regions(&events),
        ));

        for event in events
            .iter()
            .filter(|e| e.severity == Severity::Critical)
            .take(MAX_ALERTS_PER_CYCLE)
        {
            let alert = match self.bounded("analyze_one", self.analyzer.analyze_one(event)).await {
                Some(alert) => alert,
                None => {
                    progress.degraded.store(true, Ordering::Relaxed);
                    fallback_alert(event)
                }
            };
            self.hub
                .publish(&BroadcastMessage::conflict_alert(event.clone(), alert));
            progress.alerts.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Await an analyzer call under the per-call timeout. `None` means the
    /// caller should fall back to defaults.
    async fn bounded<T, F>(&self, call: &'static str, fut: F) -> Option<T>
    where
        F: Future<Output = Result<T, AnalyzerError>>,
    {
        match tokio::time::timeout(self.settings.analyzer_timeout, fut).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                tracing::warn!(
                    analyzer = self.analyzer.name(),
                    call,
                    error = %e,
                    "scheduler: analyzer call failed; using fallback"
                );
                None
            }
            Err(_) => {
                tracing::warn!(
                    analyzer = self.analyzer.name(),
                    call,
                    timeout_secs = self.settings.analyzer_timeout.as_secs(),
                    "scheduler: analyzer call timed out; using fallback"
                );
                None
            }
        }
    }
}

/// Non-empty regions in first-seen order.
fn distinct_regions(events: &[ConflictEvent]) -> Vec<String> {
    let mut regions: Vec<String> = Vec::new();
    for region in events.iter().filter_map(|e| e.region.as_deref()) {
        let region = region.trim();
        if !region.is_empty() && !regions.iter().any(|r| r == region) {
            regions.push(region.to_string());
        }
    }
    regions
}
